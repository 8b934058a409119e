use scraper::Html;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod fingerprint;
pub mod notifier;
pub mod render;
pub mod store;

mod data;
mod error;
mod utils;

pub use config::{JobSource, Settings, WatcherConfig};
pub use data::Table;
pub use error::{NotifyError, WatcherError};
pub use extractor::{Candidate, KeywordExtractor};
pub use notifier::NotificationBatch;
pub use store::SeenRecord;

#[async_trait::async_trait]
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<String, WatcherError>;
}

/// Loads a URL in a browser and returns the final document markup.
#[async_trait::async_trait]
pub trait Renderer {
    async fn render(&self, url: &str) -> Result<String, WatcherError>;
}

#[async_trait::async_trait]
pub trait Storage {
    async fn seen_is_exists<I: AsRef<str> + Send>(
        &self,
        fingerprint: I,
    ) -> Result<bool, WatcherError>;
    async fn seen_insert(&self, record: &SeenRecord) -> Result<(), WatcherError>;
    async fn seen_count(&self) -> Result<u32, WatcherError>;
    async fn seen_get(&self) -> Result<Vec<SeenRecord>, WatcherError>;
}

/// Fire-and-forget delivery. Implementations swallow their own failures.
#[async_trait::async_trait]
pub trait Notifier {
    async fn notify(&self, batch: &NotificationBatch);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RunOptions {
    /// Skip a job whose page or config is broken instead of aborting the run.
    /// Store failures abort regardless.
    pub isolate_failures: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub jobs: usize,
    pub candidates: usize,
    pub new_postings: usize,
    pub failed_jobs: Vec<String>,
}

/// Seen check and insert for one run. Fingerprints recorded earlier in the
/// run are answered locally.
struct SeenFilter<'a, S> {
    storage: &'a S,
    recorded: HashSet<String>,
}

impl<'a, S: Storage + Sync> SeenFilter<'a, S> {
    fn new(storage: &'a S) -> Self {
        SeenFilter {
            storage,
            recorded: HashSet::new(),
        }
    }

    /// Records the candidate if it was never seen before. Returns whether it is new.
    async fn record_if_new(&mut self, candidate: &Candidate) -> Result<bool, WatcherError> {
        let fingerprint = fingerprint::fingerprint(&candidate.link);
        if self.recorded.contains(&fingerprint)
            || self.storage.seen_is_exists(fingerprint.as_str()).await?
        {
            return Ok(false);
        }

        self.storage
            .seen_insert(&SeenRecord {
                fingerprint: fingerprint.clone(),
                url: candidate.link.clone(),
                title: candidate.title.clone(),
                company: candidate.company.clone(),
            })
            .await?;
        self.recorded.insert(fingerprint);
        Ok(true)
    }
}

async fn check_job<F, S>(
    job: &JobSource,
    fetcher: &F,
    seen: &mut SeenFilter<'_, S>,
    batch: &mut NotificationBatch,
) -> Result<usize, WatcherError>
where
    F: Fetch + Sync,
    S: Storage + Sync,
{
    info!("Check {} ({})", job.company, job.url);
    let extractor = KeywordExtractor::new(job)?;
    let html = fetcher.fetch(&job.url).await?;

    let candidates = {
        let doc = Html::parse_document(&html);
        let mut candidates = vec![];
        for keyword in extractor.keywords() {
            let found = extractor.extract_keyword(&doc, keyword);
            debug!("{} anchors match {:?} on {}", found.len(), keyword, job.url);
            candidates.extend(found);
        }
        candidates
    };

    for candidate in &candidates {
        if seen.record_if_new(candidate).await? {
            info!("New posting {:?} at {}", candidate.title, candidate.link);
            batch.push(&candidate.company, &candidate.title, &candidate.link);
        }
    }

    Ok(candidates.len())
}

/// One pass over every job: fetch, extract, drop known postings, notify once.
pub async fn run_watcher<F, S, N>(
    jobs: &[JobSource],
    fetcher: &F,
    storage: &S,
    notifier: &N,
    options: RunOptions,
) -> Result<RunReport, WatcherError>
where
    F: Fetch + Sync,
    S: Storage + Sync,
    N: Notifier + Sync,
{
    let mut report = RunReport {
        jobs: jobs.len(),
        ..RunReport::default()
    };
    let mut batch = NotificationBatch::default();
    let mut seen = SeenFilter::new(storage);

    for job in jobs {
        match check_job(job, fetcher, &mut seen, &mut batch).await {
            Ok(candidates) => report.candidates += candidates,
            Err(e @ WatcherError::DatabaseError(_)) => return Err(e),
            Err(e) if options.isolate_failures => {
                warn!("Skip {} ({}): {}", job.company, job.url, e);
                report.failed_jobs.push(job.url.clone());
            }
            Err(e) => return Err(e),
        }
    }

    report.new_postings = batch.len();
    if batch.is_empty() {
        info!("No new postings");
    } else {
        notifier.notify(&batch).await;
    }

    Ok(report)
}
