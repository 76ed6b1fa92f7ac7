use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dns_types::protocol::types::{DomainName, RecordType};

use crate::trace::RRSet;
use crate::DEFAULT_CACHE_CAPACITY;

const MUTEX_POISON_MESSAGE: &str = "cache mutex poisoned by a panicking holder";

/// `(absolute-name, record-type)`, case-insensitive on the name.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CacheKey {
    name: DomainName,
    rtype: RecordType,
}

impl CacheKey {
    pub fn new(name: &DomainName, rtype: RecordType) -> Self {
        CacheKey {
            name: name.to_lowercase(),
            rtype,
        }
    }
}

/// The value stored per cache entry, plus its insertion-time cost so a
/// cache-hit result can report `cache_saved_ms`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub answer: Vec<RRSet>,
    pub final_ips: Vec<String>,
    pub cname_chain: Vec<String>,
    pub ms: f64,
    expires_at: Instant,
}

struct Cache {
    capacity: usize,
    entries: HashMap<CacheKey, CacheEntry>,
    insertion_order: VecDeque<CacheKey>,
}

impl Cache {
    fn new(capacity: usize) -> Self {
        Cache {
            capacity,
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    fn get(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let expired = match self.entries.get(key) {
            Some(entry) => Instant::now() >= entry.expires_at,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            tracing::trace!(?key, "cache entry expired");
            return None;
        }
        tracing::trace!(?key, "cache hit");
        self.entries.get(key).cloned()
    }

    fn set(
        &mut self,
        key: CacheKey,
        answer: Vec<RRSet>,
        final_ips: Vec<String>,
        cname_chain: Vec<String>,
        ms: f64,
        ttl_secs: f64,
    ) {
        if ttl_secs <= 0.0 {
            tracing::trace!(?key, ttl_secs, "cache set skipped: non-positive ttl");
            return;
        }

        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }

        let expires_at = Instant::now() + Duration::from_secs_f64(ttl_secs);
        self.entries.insert(
            key.clone(),
            CacheEntry {
                answer,
                final_ips,
                cname_chain,
                ms,
                expires_at,
            },
        );
        self.insertion_order.push_back(key.clone());
        tracing::trace!(?key, ttl_secs, "cache insert");
    }

    /// Evicts the oldest entry still present by insertion order (FIFO, not
    /// LRU: `get` never reorders `insertion_order`).
    fn evict_oldest(&mut self) {
        while let Some(candidate) = self.insertion_order.pop_front() {
            if self.entries.remove(&candidate).is_some() {
                tracing::trace!(key = ?candidate, "cache eviction");
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.rtype)
    }
}

/// A cheaply-cloneable handle onto one shared TTL cache: every concurrent
/// resolution holds its own handle onto the same underlying store.
#[derive(Clone)]
pub struct SharedCache {
    cache: Arc<Mutex<Cache>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SharedCache {
            cache: Arc::new(Mutex::new(Cache::new(capacity))),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.cache.lock().expect(MUTEX_POISON_MESSAGE).get(key)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set(
        &self,
        key: CacheKey,
        answer: Vec<RRSet>,
        final_ips: Vec<String>,
        cname_chain: Vec<String>,
        ms: f64,
        ttl_secs: f64,
    ) {
        self.cache
            .lock()
            .expect(MUTEX_POISON_MESSAGE)
            .set(key, answer, final_ips, cname_chain, ms, ttl_secs);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().expect(MUTEX_POISON_MESSAGE).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SharedCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_types::protocol::types::test_util::domain;

    fn key(name: &str, rtype: RecordType) -> CacheKey {
        CacheKey::new(&domain(name), rtype)
    }

    #[test]
    fn get_on_empty_cache_is_absent() {
        let cache = SharedCache::with_capacity(10);
        assert!(cache.get(&key("example.com.", RecordType::A)).is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = SharedCache::with_capacity(10);
        let k = key("example.com.", RecordType::A);
        cache.set(k.clone(), Vec::new(), vec!["1.2.3.4".into()], Vec::new(), 12.0, 300.0);
        let entry = cache.get(&k).expect("entry should be present");
        assert_eq!(entry.final_ips, vec!["1.2.3.4".to_string()]);
        assert_eq!(entry.ms, 12.0);
    }

    #[test]
    fn non_positive_ttl_is_a_no_op() {
        let cache = SharedCache::with_capacity(10);
        let k = key("example.com.", RecordType::A);
        cache.set(k.clone(), Vec::new(), Vec::new(), Vec::new(), 1.0, 0.0);
        assert!(cache.get(&k).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn cache_key_is_case_insensitive() {
        let lower = key("example.com.", RecordType::A);
        let upper = key("EXAMPLE.COM.", RecordType::A);
        assert_eq!(lower, upper);
    }

    #[test]
    fn eviction_is_fifo_not_lru() {
        let cache = SharedCache::with_capacity(2);
        let a = key("a.example.com.", RecordType::A);
        let b = key("b.example.com.", RecordType::A);
        let c = key("c.example.com.", RecordType::A);

        cache.set(a.clone(), Vec::new(), Vec::new(), Vec::new(), 0.0, 300.0);
        cache.set(b.clone(), Vec::new(), Vec::new(), Vec::new(), 0.0, 300.0);

        // touching `a` via get must not protect it from FIFO eviction
        cache.get(&a);

        cache.set(c.clone(), Vec::new(), Vec::new(), Vec::new(), 0.0, 300.0);

        assert!(cache.get(&a).is_none(), "oldest entry should have been evicted");
        assert!(cache.get(&b).is_some());
        assert!(cache.get(&c).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn expired_entry_is_treated_as_absent() {
        let cache = SharedCache::with_capacity(10);
        let k = key("example.com.", RecordType::A);
        cache.set(k.clone(), Vec::new(), Vec::new(), Vec::new(), 0.0, 0.001);
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get(&k).is_none());
    }
}
