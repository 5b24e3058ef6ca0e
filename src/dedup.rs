//! First-seen-wins sentence deduplication.
//!
//! Ported from `original_source/dedup.py::Deduplicator`: the dedup key is
//! the literal sentence text and a hit within the TTL window is dropped
//! as a duplicate; a miss (or expired hit) refreshes the TTL and passes.

use std::time::Duration;

use crate::ttlmap::TtlMap;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

pub struct Deduplicator {
    seen: TtlMap<String>,
}

impl Deduplicator {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: TtlMap::new(ttl),
        }
    }

    /// Returns `true` the first time `message` is seen within the TTL
    /// window, `false` for any repeat seen before it expires.
    pub fn is_unique(&mut self, message: &str) -> bool {
        if self.seen.contains(&message.to_string()) {
            return false;
        }
        self.seen.touch(message.to_string());
        true
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn first_occurrence_is_unique() {
        let mut dedup = Deduplicator::new(Duration::from_secs(30));
        assert!(dedup.is_unique("!AIVDM,1,1,,A,abc,0*1A"));
    }

    #[test]
    fn immediate_repeat_is_not_unique() {
        let mut dedup = Deduplicator::new(Duration::from_secs(30));
        let line = "!AIVDM,1,1,,A,abc,0*1A";
        assert!(dedup.is_unique(line));
        assert!(!dedup.is_unique(line));
    }

    #[test]
    fn repeat_after_ttl_is_unique_again() {
        let mut dedup = Deduplicator::new(Duration::from_millis(20));
        let line = "!AIVDM,1,1,,A,abc,0*1A";
        assert!(dedup.is_unique(line));
        sleep(Duration::from_millis(40));
        assert!(dedup.is_unique(line));
    }

    #[test]
    fn distinct_messages_are_independent() {
        let mut dedup = Deduplicator::new(Duration::from_secs(30));
        assert!(dedup.is_unique("!AIVDM,1,1,,A,abc,0*1A"));
        assert!(dedup.is_unique("!AIVDM,1,1,,A,xyz,0*1B"));
    }
}
