use crate::{config::JobSource, WatcherError};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

const E: &str = "Invalid selector";
lazy_static! {
    static ref A: Selector = Selector::parse("a[href]").expect(E);
}

/// A keyword-matched anchor, resolved against the page it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub link: String,
    pub company: String,
}

/// Whole-word, case-insensitive matcher for a literal keyword.
pub fn keyword_regex(keyword: &str) -> Result<Regex, WatcherError> {
    Ok(
        RegexBuilder::new(&format!(r"\b{}\b", regex::escape(keyword)))
            .case_insensitive(true)
            .build()?,
    )
}

/// Resolves `href` against `base`. Absolute hrefs are kept verbatim so the
/// fingerprint sees exactly what the page links to.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if Url::parse(href).is_ok() {
        return Some(href.to_string());
    }
    match base.join(href) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!("Skip unresolvable href {:?}: {}", href, e);
            None
        }
    }
}

/// Visible text of an anchor on one line, whitespace runs collapsed.
fn anchor_text<'a, I: Iterator<Item = &'a str>>(nodes: I) -> String {
    nodes.collect::<String>().split_whitespace().join(" ")
}

#[derive(Debug)]
pub struct KeywordExtractor {
    base: Url,
    company: String,
    matchers: Vec<(String, Regex)>,
}

impl KeywordExtractor {
    pub fn new(source: &JobSource) -> Result<KeywordExtractor, WatcherError> {
        let matchers = source
            .keywords
            .iter()
            .map(|k| keyword_regex(k).map(|r| (k.clone(), r)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(KeywordExtractor {
            base: Url::parse(&source.url)?,
            company: source.company.clone(),
            matchers,
        })
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.matchers.iter().map(|(k, _)| k.as_str())
    }

    /// Candidates for every keyword, in keyword-then-document order.
    ///
    /// An anchor matching several keywords is returned once per keyword.
    pub fn extract(&self, doc: &Html) -> Vec<Candidate> {
        self.matchers
            .iter()
            .flat_map(|(_, regex)| self.extract_with(doc, regex))
            .collect()
    }

    pub fn extract_keyword(&self, doc: &Html, keyword: &str) -> Vec<Candidate> {
        self.matchers
            .iter()
            .filter(|(k, _)| k == keyword)
            .flat_map(|(_, regex)| self.extract_with(doc, regex))
            .collect()
    }

    fn extract_with(&self, doc: &Html, regex: &Regex) -> Vec<Candidate> {
        doc.select(&A)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let text = anchor_text(a.text());
                if !regex.is_match(&text) {
                    return None;
                }
                resolve_link(&self.base, href).map(|link| Candidate {
                    title: text,
                    link,
                    company: self.company.clone(),
                })
            })
            .collect()
    }
}
