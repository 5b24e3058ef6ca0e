//! Generic TTL map with lazy + amortized sweep and hard-cap eviction.
//!
//! Ported from `original_source/core/utils/ttlmap.py`: a `HashMap` for
//! lookups plus a FIFO queue of `(expiry, key)` for amortized sweeping,
//! where a queue entry is only acted upon if it still matches the map's
//! current expiry for that key (tombstone semantics for stale queue
//! records left behind by repeated `touch`).

use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
    time::{Duration, Instant},
};

pub const DEFAULT_MAX_ENTRIES: usize = 200_000;
pub const DEFAULT_SWEEP_EVERY: Duration = Duration::from_secs(1);
pub const DEFAULT_OPS_PER_SWEEP: u32 = 2048;

pub struct TtlMap<K> {
    ttl: Duration,
    max_entries: usize,
    sweep_every: Duration,
    ops_per_sweep: u32,
    on_evict: Option<Box<dyn FnMut(&K) + Send>>,
    map: HashMap<K, Instant>,
    queue: VecDeque<(Instant, K)>,
    ops_since_sweep: u32,
    last_sweep: Instant,
}

impl<K: Eq + Hash + Clone> TtlMap<K> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_config(
            ttl,
            DEFAULT_MAX_ENTRIES,
            DEFAULT_SWEEP_EVERY,
            DEFAULT_OPS_PER_SWEEP,
        )
    }

    pub fn with_config(
        ttl: Duration,
        max_entries: usize,
        sweep_every: Duration,
        ops_per_sweep: u32,
    ) -> Self {
        Self {
            ttl,
            max_entries,
            sweep_every,
            ops_per_sweep,
            on_evict: None,
            map: HashMap::new(),
            queue: VecDeque::new(),
            ops_since_sweep: 0,
            last_sweep: Instant::now(),
        }
    }

    pub fn with_on_evict<F: FnMut(&K) + Send + 'static>(mut self, f: F) -> Self {
        self.on_evict = Some(Box::new(f));
        self
    }

    /// Sets/bumps `key`'s expiry to `now + ttl` and appends a FIFO record.
    /// Enforces the hard cap by force-evicting the oldest live keys
    /// regardless of expiry if the live size exceeds it.
    pub fn touch(&mut self, key: K) {
        let now = Instant::now();
        let expiry = now + self.ttl;
        self.map.insert(key.clone(), expiry);
        self.queue.push_back((expiry, key));
        self.maybe_sweep(now);
        if self.map.len() > self.max_entries {
            self.evict_oldest_hard();
        }
    }

    /// Returns true iff a non-expired entry exists for `key`; lazily evicts
    /// an expired entry it finds along the way.
    pub fn contains(&mut self, key: &K) -> bool {
        let now = Instant::now();
        match self.map.get(key) {
            None => {
                self.maybe_sweep(now);
                false
            }
            Some(&expiry) if expiry <= now => {
                self.map.remove(key);
                self.fire_evict(key);
                false
            }
            Some(_) => {
                self.maybe_sweep(now);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn fire_evict(&mut self, key: &K) {
        if let Some(cb) = self.on_evict.as_mut() {
            cb(key);
        }
    }

    fn maybe_sweep(&mut self, now: Instant) {
        self.ops_since_sweep += 1;
        if self.ops_since_sweep >= self.ops_per_sweep
            || now.saturating_duration_since(self.last_sweep) >= self.sweep_every
        {
            self.sweep(now);
            self.ops_since_sweep = 0;
            self.last_sweep = now;
        }
    }

    fn sweep(&mut self, now: Instant) {
        while let Some((expiry, _)) = self.queue.front() {
            if *expiry > now {
                break;
            }
            let (expiry, key) = self.queue.pop_front().unwrap();
            if self.map.get(&key) == Some(&expiry) {
                self.map.remove(&key);
                self.fire_evict(&key);
            }
        }
    }

    fn evict_oldest_hard(&mut self) {
        let target = self.max_entries;
        while self.map.len() > target {
            let Some((expiry, key)) = self.queue.pop_front() else {
                break;
            };
            if self.map.get(&key) == Some(&expiry) {
                self.map.remove(&key);
                self.fire_evict(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread::sleep;

    #[test]
    fn touch_then_contains_then_expires() {
        let mut map: TtlMap<String> = TtlMap::new(Duration::from_millis(30));
        map.touch("a".to_string());
        assert!(map.contains(&"a".to_string()));
        sleep(Duration::from_millis(50));
        assert!(!map.contains(&"a".to_string()));
    }

    #[test]
    fn len_never_exceeds_cap() {
        let mut map: TtlMap<u32> =
            TtlMap::with_config(Duration::from_secs(60), 3, Duration::from_secs(60), 1_000_000);
        for i in 0..10 {
            map.touch(i);
            assert!(map.len() <= 3);
        }
    }

    #[test]
    fn on_evict_fires_once_per_real_eviction() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let evicted_clone = evicted.clone();
        let mut map: TtlMap<u32> = TtlMap::with_config(
            Duration::from_millis(10),
            1_000,
            Duration::from_millis(1),
            1,
        )
        .with_on_evict(move |k| evicted_clone.lock().unwrap().push(*k));
        map.touch(1);
        sleep(Duration::from_millis(30));
        // A contains() call (or another touch, which triggers maybe_sweep)
        // drives the lazy sweep.
        map.touch(2);
        assert_eq!(*evicted.lock().unwrap(), vec![1]);
    }

    #[test]
    fn touch_bumps_expiry_forward() {
        let mut map: TtlMap<String> = TtlMap::new(Duration::from_millis(40));
        map.touch("a".to_string());
        sleep(Duration::from_millis(20));
        map.touch("a".to_string());
        sleep(Duration::from_millis(25));
        // Original touch would have expired by now; the bumped one hasn't.
        assert!(map.contains(&"a".to_string()));
    }
}
