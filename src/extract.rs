//! Scans a raw UDP payload for embedded AIVDM/AIVDO sentences.
//!
//! A direct translation of `original_source/meta_cleaner.py`: talkers are
//! restricted to the known AIS set, and the optional TAG block immediately
//! preceding a sentence is located by walking backwards from `!`, not by
//! parsing the TAG block's own grammar (an unterminated trailing `\` is
//! treated as "no TAG block" rather than an error).

const AIS_TALKERS: [&str; 9] = ["AI", "AB", "AD", "AN", "AR", "AS", "AT", "AX", "BS"];

/// Byte offsets of a located sentence and its optional preceding TAG block
/// within the scanned line. `tag_start`/`tag_end` are `None` when no valid
/// TAG block immediately precedes the sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceSpan {
    pub start: usize,
    pub end: usize,
    pub tag_start: Option<usize>,
    pub tag_end: Option<usize>,
}

/// Returns the literal sentence text for every VDM (and, if
/// `include_vdo`, VDO) sentence found in `line`.
pub fn extract_sentences(line: &str, include_vdo: bool) -> Vec<&str> {
    find_spans(line, include_vdo)
        .into_iter()
        .map(|s| &line[s.start..s.end])
        .collect()
}

/// Returns spans for every matching sentence, with TAG-block boundaries
/// resolved for zero-copy slicing by the caller.
pub fn find_spans(line: &str, include_vdo: bool) -> Vec<SentenceSpan> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'!' {
            i += 1;
            continue;
        }
        match match_sentence_at(line, i, include_vdo) {
            Some(end) => {
                let (tag_start, tag_end) = locate_tag_block(line, i);
                out.push(SentenceSpan {
                    start: i,
                    end,
                    tag_start,
                    tag_end,
                });
                i = end;
            }
            None => i += 1,
        }
    }
    out
}

/// If a recognized `!<talker>VD[MO],...*HH` sentence starts at byte offset
/// `start`, returns its exclusive end offset (just past the two checksum
/// hex digits).
fn match_sentence_at(line: &str, start: usize, include_vdo: bool) -> Option<usize> {
    let rest = line.get(start + 1..)?;
    let talker = rest.get(0..2)?;
    if !AIS_TALKERS.contains(&talker) {
        return None;
    }
    let kind = rest.get(2..5)?;
    let matches_kind = kind == "VDM" || (include_vdo && kind == "VDO");
    if !matches_kind {
        return None;
    }
    if rest.as_bytes().get(5) != Some(&b',') {
        return None;
    }

    let body = &rest[5..];
    let star = body.find('*')?;
    // exactly two hex digits after '*', and no CR/LF inside the sentence.
    let hex = body.get(star + 1..star + 3)?;
    if hex.len() != 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let sentence_body = &body[..star];
    if sentence_body.contains('\r') || sentence_body.contains('\n') {
        return None;
    }

    Some(start + 1 + 2 + 5 + star + 3)
}

/// Walks backward from `sentence_start` (the index of `!`) to find a TAG
/// block of the form `\...\` immediately preceding it.
fn locate_tag_block(line: &str, sentence_start: usize) -> (Option<usize>, Option<usize>) {
    if sentence_start == 0 || line.as_bytes()[sentence_start - 1] != b'\\' {
        return (None, None);
    }
    let tag_end = sentence_start - 1;
    match line[..tag_end].rfind('\\') {
        Some(tag_start) => (Some(tag_start), Some(tag_end)),
        None => (None, None),
    }
}
