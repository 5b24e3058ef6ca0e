//! TAG block checksum, wrapping, and extraction.
//!
//! Grounded on `original_source/meta_writer.py`: `nmea_checksum` is a
//! running XOR over every byte of the content, rendered as two uppercase
//! hex digits; `format_header` wraps it as `\content*HH\`. `wrap_with_meta`
//! emits `c:`/`s:`/`g:` fields depending on whether the sentence is part of
//! a multipart group and whether this is the group's first fragment.
//! Unlike the original, the multipart branch is taken whenever the
//! sentence's `total` field is greater than one, not just when it's
//! literally `2` — the original's hardcoded `parts[1] == "2"` check would
//! silently drop the `g:` field for any 3+-fragment group (e.g. AIS type 5
//! static/voyage messages), which the assembler here genuinely supports.
//! `extract_incoming_s` (from `aismixer.py`) pulls an `s:` value back out
//! of a TAG block already present on an inbound line, for priority 3 of
//! `choose_s_value`.

/// XORs every byte of `content` into a single checksum byte, rendered as
/// two uppercase hex digits.
pub fn checksum(content: &str) -> String {
    let sum = content.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("{sum:02X}")
}

/// Wraps `content` as `\content*HH\`.
pub fn format_header(content: &str) -> String {
    format!("\\{content}*{}\\", checksum(content))
}

/// Builds the TAG-prefixed line for a (possibly multipart) AIVDM/AIVDO
/// sentence, mirroring `wrap_with_meta`. `timestamp` is unix seconds.
pub fn wrap_with_meta(nmea_line: &str, station_id: &str, timestamp: i64, is_first: bool) -> String {
    let parts: Vec<&str> = nmea_line.split(',').collect();
    if parts.len() < 4 {
        return nmea_line.to_string();
    }

    let total: u32 = parts[1].parse().unwrap_or(1);
    let header = if total > 1 {
        let seq_id = if parts[3].is_empty() { "0" } else { parts[3] };
        let group_id = format!("{}-{}-{}", parts[2], parts[1], seq_id);
        if is_first {
            format_header(&format!("c:{timestamp},s:{station_id},g:{group_id}"))
        } else {
            format_header(&format!("g:{group_id}"))
        }
    } else {
        format_header(&format!("c:{timestamp},s:{station_id}"))
    };

    format!("{header}{nmea_line}")
}

/// Pulls the `s:` field out of a leading TAG block on `raw`, if present.
/// Returns `None` if `raw` doesn't start with a TAG block or carries no
/// `s:` field — checksum validity is not enforced, matching the original's
/// best-effort extraction.
pub fn extract_incoming_s(raw: &str) -> Option<String> {
    if !raw.starts_with('\\') {
        return None;
    }
    let rest = &raw[1..];
    let end = rest.find('\\')?;
    let body = &rest[..end];
    let body = body.split('*').next().unwrap_or("");
    for pair in body.split(',') {
        if let Some((k, v)) = pair.split_once(':') {
            if k == "s" {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// Parses a TAG block's body (the text between the backslashes, including
/// its trailing `*HH`) into its `k:v` pairs, dropping the checksum.
/// Mirrors `core/s_policy.py::parse_last_tag_pairs`'s pair-splitting.
pub fn parse_pairs(tag_body: &str) -> std::collections::HashMap<String, String> {
    let body = tag_body.split('*').next().unwrap_or("");
    body.split(',')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn checksum_matches_known_value() {
        assert_eq!(checksum("c:1700000000,s:A_B"), "66");
    }

    #[test]
    fn format_header_wraps_with_checksum() {
        assert_eq!(
            format_header("c:1700000000,s:A_B"),
            "\\c:1700000000,s:A_B*66\\"
        );
    }

    #[test]
    fn wrap_single_fragment_sentence() {
        let line = "!AIVDM,1,1,,A,abc,0*1A";
        let wrapped = wrap_with_meta(line, "STATION1", 1700000000, true);
        assert!(wrapped.starts_with("\\c:1700000000,s:STATION1*"));
        assert!(wrapped.ends_with(line));
    }

    #[test]
    fn wrap_multipart_first_fragment_includes_group() {
        let line = "!AIVDM,2,1,9,A,abc,0*1A";
        let wrapped = wrap_with_meta(line, "STATION1", 1700000000, true);
        assert!(wrapped.contains("g:1-2-9"));
        assert!(wrapped.contains("s:STATION1"));
    }

    #[test]
    fn wrap_multipart_later_fragment_omits_c_and_s() {
        let line = "!AIVDM,2,2,9,A,def,0*1B";
        let wrapped = wrap_with_meta(line, "STATION1", 1700000000, false);
        assert!(wrapped.contains("g:2-2-9"));
        assert!(!wrapped.contains("s:STATION1"));
        assert!(!wrapped.contains("c:"));
    }

    #[test]
    fn wrap_three_fragment_group_includes_group_on_every_fragment() {
        let first = wrap_with_meta("!AIVDM,3,1,7,A,aaa,0*1A", "STATION1", 1700000000, true);
        assert!(first.contains("g:1-3-7"));
        assert!(first.contains("s:STATION1"));

        let middle = wrap_with_meta("!AIVDM,3,2,7,A,bbb,0*1B", "STATION1", 1700000000, false);
        assert!(middle.contains("g:2-3-7"));
        assert!(!middle.contains("s:STATION1"));
        assert!(!middle.contains("c:"));

        let last = wrap_with_meta("!AIVDM,3,3,7,A,ccc,0*1C", "STATION1", 1700000000, false);
        assert!(last.contains("g:3-3-7"));
        assert!(!last.contains("s:STATION1"));
        assert!(!last.contains("c:"));
    }

    #[test]
    fn extract_incoming_s_reads_value() {
        let raw = "\\c:1700000000,s:BOAT1*3D\\!AIVDM,1,1,,A,abc,0*1A";
        assert_eq!(extract_incoming_s(raw), Some("BOAT1".to_string()));
    }

    #[test]
    fn extract_incoming_s_none_without_leading_tag() {
        assert_eq!(extract_incoming_s("!AIVDM,1,1,,A,abc,0*1A"), None);
    }

    #[test]
    fn parse_pairs_splits_on_comma_and_colon_and_drops_checksum() {
        let pairs = parse_pairs("c:1700000000,s:BOAT1,g:1-2-9*66");
        assert_eq!(pairs.get("c").map(String::as_str), Some("1700000000"));
        assert_eq!(pairs.get("s").map(String::as_str), Some("BOAT1"));
        assert_eq!(pairs.get("g").map(String::as_str), Some("1-2-9"));
    }
}
