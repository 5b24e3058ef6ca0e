//! The unit of work handed from a listener thread to the mixer/pipeline.
//!
//! Mirrors the envelope `aismixer.py`'s UDP and secure listeners build
//! before handing a line to `forwarder.py`: which source kind it came
//! from, what alias (if any) should stand in for its IP under the `s:`
//! TAG field, and the raw sentence text.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Udp,
    Sec,
}

#[derive(Debug, Clone)]
pub struct IngressEvent {
    pub kind: SourceKind,
    /// A configured fixed id or alias-map hit for this source's address.
    /// `None` means the s-policy should fall back to the bracketed IP.
    pub alias_for_s: Option<String>,
    /// The peer address the sentence arrived from, for `ip_to_s` fallback.
    pub remote_ip: Option<String>,
    /// Groups fragments of the same multipart sentence: for UDP inputs this
    /// is the source `(ip, port)`; for secure inputs, the session id.
    pub assembler_key: String,
    pub raw_line: String,
}
