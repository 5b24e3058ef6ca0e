//! Forward pipeline: turns ingress events into forwarded, TAG-wrapped
//! sentences.
//!
//! Grounded on `original_source/aismixer.py::forward_loop`, generalized
//! with the group-aware `s:` carry-over described in
//! `core/s_policy.py`/`core/state/s_cache.py`'s companion state. Holds
//! the single-writer state the forward pipeline owns exclusively:
//! assembler, deduplicator, s-cache, and the per-multipart-group `s:`
//! context.

use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::debug;

use crate::assembler::AivdmAssembler;
use crate::dedup::Deduplicator;
use crate::event::IngressEvent;
use crate::extract;
use crate::forwarder::Forwarder;
use crate::s_policy::{self, SCache};
use crate::tag;

pub struct ForwardPipeline {
    station_id: String,
    debug_logging: bool,
    assembler: AivdmAssembler,
    dedup: Deduplicator,
    s_cache: SCache,
    /// `(assembler_key, seq_id) -> s` captured from a fragment's own TAG
    /// block, carried forward until the group completes.
    group_s_context: HashMap<(String, String), String>,
}

impl ForwardPipeline {
    pub fn new(station_id: String, debug_logging: bool) -> Self {
        Self {
            station_id,
            debug_logging,
            assembler: AivdmAssembler::default(),
            dedup: Deduplicator::default(),
            s_cache: SCache::default(),
            group_s_context: HashMap::new(),
        }
    }

    /// Processes one ingress event, forwarding zero or more wrapped
    /// sentences through `forwarder`.
    pub fn process(&mut self, event: &IngressEvent, forwarder: &Forwarder) {
        for span in extract::find_spans(&event.raw_line, false) {
            let sentence = &event.raw_line[span.start..span.end];
            let tag_pairs = match (span.tag_start, span.tag_end) {
                (Some(ts), Some(te)) => tag::parse_pairs(&event.raw_line[ts + 1..te]),
                _ => HashMap::new(),
            };

            if let (Some(s), Some(seq_id)) = (tag_pairs.get("s"), sentence_field(sentence, 3)) {
                if tag_pairs.contains_key("g") {
                    self.group_s_context
                        .insert((event.assembler_key.clone(), seq_id.to_string()), s.clone());
                }
            }

            let Some(full_lines) = self.assembler.feed(&event.assembler_key, sentence) else {
                continue;
            };
            let total = full_lines.len();

            for (i, full_line) in full_lines.into_iter().enumerate() {
                if !self.dedup.is_unique(&full_line) {
                    continue;
                }

                let is_first = i == 0;
                let seq_id = sentence_field(&full_line, 3).unwrap_or_default();
                let context_key = (event.assembler_key.clone(), seq_id.to_string());

                let incoming_s = if total == 1 {
                    tag_pairs.get("s").cloned()
                } else {
                    self.group_s_context.get(&context_key).cloned()
                };

                let s_value = s_policy::choose_s_value(
                    Some(self.station_id.as_str()).filter(|s| !s.is_empty()),
                    event.alias_for_s.as_deref(),
                    incoming_s.as_deref(),
                    event.remote_ip.as_deref(),
                );
                self.s_cache.touch(&s_value);

                let wrapped = tag::wrap_with_meta(&full_line, &s_value, unix_now(), is_first);
                if self.debug_logging {
                    debug!(%wrapped, "forwarding sentence");
                }
                forwarder.send(&format!("{wrapped}\r\n"));

                if i + 1 == total {
                    self.group_s_context.remove(&context_key);
                }
            }
        }
    }
}

fn sentence_field(sentence: &str, idx: usize) -> Option<&str> {
    sentence.split(',').nth(idx)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForwardTarget;
    use crate::event::SourceKind;
    use std::net::UdpSocket;

    fn loopback_forwarder() -> (Forwarder, UdpSocket) {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(std::time::Duration::from_millis(500))).unwrap();
        let port = listener.local_addr().unwrap().port();
        let forwarder = Forwarder::new(vec![ForwardTarget {
            host: "127.0.0.1".to_string(),
            port,
        }])
        .unwrap();
        (forwarder, listener)
    }

    fn recv_line(listener: &UdpSocket) -> String {
        let mut buf = [0u8; 1024];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..n]).to_string()
    }

    #[test]
    fn single_fragment_passthrough_carries_station_id() {
        let mut pipeline = ForwardPipeline::new("mix1".to_string(), false);
        let (forwarder, listener) = loopback_forwarder();

        let event = IngressEvent {
            kind: SourceKind::Udp,
            alias_for_s: None,
            remote_ip: Some("10.0.0.1".to_string()),
            assembler_key: "10.0.0.1:5000".to_string(),
            raw_line: "!AIVDM,1,1,,A,13aEOK?P00PD2wVMdLDRhgvL289?,0*26".to_string(),
        };
        pipeline.process(&event, &forwarder);

        let out = recv_line(&listener);
        assert!(out.contains("s:mix1"));
        assert!(out.ends_with("!AIVDM,1,1,,A,13aEOK?P00PD2wVMdLDRhgvL289?,0*26\r\n"));
        assert!(!out.contains("g:"));
    }

    #[test]
    fn multipart_group_emits_full_then_abbreviated_header() {
        let mut pipeline = ForwardPipeline::new("mix1".to_string(), false);
        let (forwarder, listener) = loopback_forwarder();

        let frag1 = IngressEvent {
            kind: SourceKind::Udp,
            alias_for_s: None,
            remote_ip: Some("10.0.0.1".to_string()),
            assembler_key: "src1".to_string(),
            raw_line: "!AIVDM,2,1,3,B,p1,0*2A".to_string(),
        };
        let frag2 = IngressEvent {
            kind: SourceKind::Udp,
            alias_for_s: None,
            remote_ip: Some("10.0.0.1".to_string()),
            assembler_key: "src1".to_string(),
            raw_line: "!AIVDM,2,2,3,B,p2,2*2B".to_string(),
        };

        pipeline.process(&frag1, &forwarder);
        pipeline.process(&frag2, &forwarder);

        let first = recv_line(&listener);
        assert!(first.contains("g:1-2-3"));
        assert!(first.contains("s:mix1"));

        let second = recv_line(&listener);
        assert!(second.contains("g:2-2-3"));
        assert!(!second.contains("s:mix1"));
        assert!(!second.contains("c:"));
    }

    #[test]
    fn duplicate_sentence_is_forwarded_only_once() {
        let mut pipeline = ForwardPipeline::new("mix1".to_string(), false);
        let (forwarder, listener) = loopback_forwarder();

        let event = IngressEvent {
            kind: SourceKind::Udp,
            alias_for_s: None,
            remote_ip: Some("10.0.0.1".to_string()),
            assembler_key: "10.0.0.1:5000".to_string(),
            raw_line: "!AIVDM,1,1,,A,abc,0*1A".to_string(),
        };
        pipeline.process(&event, &forwarder);
        pipeline.process(&event, &forwarder);

        recv_line(&listener);
        assert!(listener.recv_from(&mut [0u8; 16]).is_err());
    }

    #[test]
    fn alias_for_s_overrides_empty_station_id() {
        let mut pipeline = ForwardPipeline::new(String::new(), false);
        let (forwarder, listener) = loopback_forwarder();

        let event = IngressEvent {
            kind: SourceKind::Udp,
            alias_for_s: Some("boat".to_string()),
            remote_ip: Some("10.0.0.1".to_string()),
            assembler_key: "10.0.0.1:5000".to_string(),
            raw_line: "\\s:in,c:1700000000*1A\\!AIVDM,1,1,,A,abc,0*1A".to_string(),
        };
        pipeline.process(&event, &forwarder);

        let out = recv_line(&listener);
        assert!(out.contains("s:boat"));
    }
}
