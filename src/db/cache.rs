// db/cache.rs
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Cache TTL constants (in seconds)
pub const SESSION_TOTALS_TTL: i64 = 60; // 1 minute

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Small in-process TTL cache. One instance per owning service, nothing
/// global; the clock is injected so tests control expiry.
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, (DateTime<Utc>, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            ttl: Duration::seconds(ttl_seconds),
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((expires_at, value)) if *expires_at > now => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, (expires_at, value));
    }

    pub fn invalidate(&self, key: &K) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn starting_at(now: DateTime<Utc>) -> Self {
            ManualClock {
                now: Mutex::new(now),
            }
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn hit_before_expiry() {
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let cache: TtlCache<&str, i32> = TtlCache::new(60, clock.clone());

        cache.insert("totals", 42);
        clock.advance(59);
        assert_eq!(cache.get(&"totals"), Some(42));
    }

    #[test]
    fn miss_after_expiry() {
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let cache: TtlCache<&str, i32> = TtlCache::new(60, clock.clone());

        cache.insert("totals", 42);
        clock.advance(60);
        assert_eq!(cache.get(&"totals"), None);
    }

    #[test]
    fn insert_refreshes_expiry() {
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let cache: TtlCache<&str, i32> = TtlCache::new(60, clock.clone());

        cache.insert("totals", 1);
        clock.advance(45);
        cache.insert("totals", 2);
        clock.advance(45);
        assert_eq!(cache.get(&"totals"), Some(2));
    }

    #[test]
    fn instances_are_isolated() {
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let a: TtlCache<&str, i32> = TtlCache::new(60, clock.clone());
        let b: TtlCache<&str, i32> = TtlCache::new(60, clock);

        a.insert("totals", 1);
        assert_eq!(b.get(&"totals"), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let cache: TtlCache<&str, i32> = TtlCache::new(60, clock);

        cache.insert("totals", 42);
        cache.invalidate(&"totals");
        assert_eq!(cache.get(&"totals"), None);
    }
}
