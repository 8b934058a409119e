use sha2::{Digest, Sha256};

/// Identity of a posting: lowercase hex SHA-256 of the absolute link.
///
/// No normalization is applied, a trailing slash or reordered query string is
/// a different posting.
pub fn fingerprint<S: AsRef<str>>(link: S) -> String {
    let mut hasher = Sha256::new();
    hasher.update(link.as_ref().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn same_link_same_fingerprint() {
        let link = "https://site.example/jobs/42";
        assert_eq!(fingerprint(link), fingerprint(link));
        assert_eq!(fingerprint(link), fingerprint(link.to_string()));
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn byte_different_links_differ() {
        let links = [
            "https://site.example/jobs/42",
            "https://site.example/jobs/42/",
            "https://Site.example/jobs/42",
            "https://site.example/jobs/42?a=1&b=2",
            "https://site.example/jobs/42?b=2&a=1",
            "http://site.example/jobs/42",
        ];
        for (i, a) in links.iter().enumerate() {
            for b in &links[i + 1..] {
                assert_ne!(fingerprint(a), fingerprint(b), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn fingerprint_format() {
        let fp = fingerprint("https://site.example/careers");
        assert_eq!(fp.len(), 64);
        assert!(fp
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }
}
