//! Small TTL cache for rendered pages.
//!
//! The people listing is the only heavy read path; its rendered HTML is
//! cached per page number for a short window, with a config switch to turn
//! caching off entirely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Entry {
    body: String,
    stored_at: Instant,
}

#[derive(Clone)]
pub struct PageCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
    enabled: bool,
}

impl PageCache {
    pub fn new(ttl: Duration, enabled: bool) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            enabled,
        }
    }

    /// Cache disabled entirely (`FLAGBOARD_CACHE_DISABLED`).
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, false)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.body.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, body: String) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key,
            Entry {
                body,
                stored_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl() {
        let cache = PageCache::new(Duration::from_secs(30), true);
        cache.put("/people?page=1".into(), "<html>".into());
        assert_eq!(cache.get("/people?page=1").as_deref(), Some("<html>"));
        assert_eq!(cache.get("/people?page=2"), None);
    }

    #[test]
    fn entry_expires() {
        let cache = PageCache::new(Duration::from_millis(10), true);
        cache.put("k".into(), "v".into());
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let cache = PageCache::disabled();
        cache.put("k".into(), "v".into());
        assert_eq!(cache.get("k"), None);
    }
}
