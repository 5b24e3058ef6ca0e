//! Multipart AIVDM/AIVDO fragment reassembly.
//!
//! Ported from `original_source/assembler.py::AIVDMAssembler`. Fragments
//! are grouped by `(source_key, seq_id, channel, total)` and released, in
//! fragment order, once `total` fragments for that key have arrived.
//! Stale groups are swept on a 1s default timeout, matching the Python
//! `cleanup_expired` call made on every `feed`. Duplicate `current` values
//! within a group are not defended against — a later duplicate simply
//! overwrites nothing and both copies are kept and sorted together, an
//! acknowledged inherited edge case.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    source: String,
    seq_id: String,
    channel: String,
    total: u32,
}

pub struct AivdmAssembler {
    timeout: Duration,
    fragments: HashMap<GroupKey, Vec<(u32, String)>>,
    timestamps: HashMap<GroupKey, Instant>,
}

impl AivdmAssembler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            fragments: HashMap::new(),
            timestamps: HashMap::new(),
        }
    }

    /// Feeds one sentence belonging to `source`. Returns `Some(lines)`,
    /// in fragment order, once the group completes; `None` while more
    /// fragments are still awaited, or if `line` isn't shaped like an
    /// AIVDM/AIVDO sentence.
    pub fn feed(&mut self, source: &str, line: &str) -> Option<Vec<String>> {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 7 {
            return None;
        }

        let total: u32 = parts[1].parse().ok()?;
        let current: u32 = parts[2].parse().ok()?;
        let key = GroupKey {
            source: source.to_string(),
            seq_id: parts[3].to_string(),
            channel: parts[4].to_string(),
            total,
        };

        let now = Instant::now();
        self.timestamps.insert(key.clone(), now);
        self.fragments
            .entry(key.clone())
            .or_default()
            .push((current, line.to_string()));

        let complete = self
            .fragments
            .get(&key)
            .map(|v| v.len() as u32 == total)
            .unwrap_or(false);

        if complete {
            let mut frags = self.fragments.remove(&key).unwrap();
            self.timestamps.remove(&key);
            frags.sort_by_key(|(idx, _)| *idx);
            return Some(frags.into_iter().map(|(_, line)| line).collect());
        }

        self.cleanup_expired(now);
        None
    }

    fn cleanup_expired(&mut self, now: Instant) {
        let expired: Vec<GroupKey> = self
            .timestamps
            .iter()
            .filter(|(_, &t)| now.saturating_duration_since(t) > self.timeout)
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.fragments.remove(&key);
            self.timestamps.remove(&key);
        }
    }
}

impl Default for AivdmAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
