//! Content cache keyed by url. An entry is only usable when the server's
//! current validators, etag or modification time, match what was stored,
//! so a HEAD probe can short-circuit the full GET.

use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub modtime: Option<SystemTime>,
}

impl Validators {
    /// A response with neither validator can never be checked for
    /// freshness and is not worth caching.
    pub fn strong(&self) -> bool {
        self.etag.is_some() || self.modtime.is_some()
    }

    fn matches(&self, other: &Validators) -> bool {
        match (&self.etag, &other.etag) {
            (Some(a), Some(b)) => return a == b,
            (None, None) => {}
            _ => return false,
        }
        match (self.modtime, other.modtime) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

pub trait ContentCache {
    /// Is anything stored under this url at all? Decides whether a HEAD
    /// probe is worth the round trip.
    fn probe(&self, url: &str) -> bool;

    /// Body for `url` if the stored validators match the server's.
    fn fetch(&self, url: &str, current: &Validators) -> Option<Vec<u8>>;

    fn store(&mut self, url: &str, validators: &Validators, body: &[u8]);
}

/// In-memory cache, the default when no persistent store is wired up.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, (Validators, Vec<u8>)>,
}

impl ContentCache for MemoryCache {
    fn probe(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    fn fetch(&self, url: &str, current: &Validators) -> Option<Vec<u8>> {
        let (stored, body) = self.entries.get(url)?;
        if !stored.matches(current) {
            return None;
        }
        log::debug!("fetched {url} from cache");
        Some(body.clone())
    }

    fn store(&mut self, url: &str, validators: &Validators, body: &[u8]) {
        if !validators.strong() {
            return;
        }
        log::debug!("storing {url} in cache");
        self.entries
            .insert(url.to_string(), (validators.clone(), body.to_vec()));
    }
}

/// A cache that never holds anything, for callers that opt out.
#[derive(Debug, Default)]
pub struct NoCache;

impl ContentCache for NoCache {
    fn probe(&self, _url: &str) -> bool {
        false
    }

    fn fetch(&self, _url: &str, _current: &Validators) -> Option<Vec<u8>> {
        None
    }

    fn store(&mut self, _url: &str, _validators: &Validators, _body: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn tagged(etag: &str) -> Validators {
        Validators {
            etag: Some(etag.to_string()),
            modtime: None,
        }
    }

    #[test]
    fn matching_etag_serves_the_body() {
        let mut c = MemoryCache::default();
        c.store("http://x/", &tagged("v1"), b"hello");
        assert!(c.probe("http://x/"));
        assert_eq!(c.fetch("http://x/", &tagged("v1")), Some(b"hello".to_vec()));
        assert_eq!(c.fetch("http://x/", &tagged("v2")), None);
    }

    #[test]
    fn modtime_is_the_fallback_validator() {
        let t = UNIX_EPOCH + Duration::from_secs(1_420_320_573);
        let v = Validators {
            etag: None,
            modtime: Some(t),
        };
        let mut c = MemoryCache::default();
        c.store("http://x/", &v, b"data");
        assert_eq!(c.fetch("http://x/", &v), Some(b"data".to_vec()));
        let later = Validators {
            etag: None,
            modtime: Some(t + Duration::from_secs(60)),
        };
        assert_eq!(c.fetch("http://x/", &later), None);
    }

    #[test]
    fn entries_without_validators_are_never_stored() {
        let mut c = MemoryCache::default();
        c.store("http://x/", &Validators::default(), b"data");
        assert!(!c.probe("http://x/"));
    }
}
