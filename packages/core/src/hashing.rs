//! Canonical content hashing and span fingerprints.
//!
//! Text is canonicalised before hashing so the same logical text yields the
//! same digest on every platform: a leading byte-order mark is dropped, CRLF
//! and lone CR become LF, and trailing spaces and tabs are removed from every
//! line. The digest is SHA-256, encoded as lowercase hex.
//!
//! Span offsets are half-open and count `char`s of the canonical text.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// The single digest algorithm anchors may declare.
pub const FINGERPRINT_ALGO: &str = "sha256";

/// Errors returned by [`span_fingerprint`] for offsets that do not describe a
/// non-empty range of the canonical text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("span start {start} must be strictly less than end {end}")]
    Empty { start: usize, end: usize },

    #[error("span end {end} exceeds canonical text length {len}")]
    OutOfBounds { end: usize, len: usize },
}

/// Returned when a JSON value cannot be put into RFC 8785 canonical form.
#[derive(Debug, Error)]
#[error("JCS canonicalization failed: {0}")]
pub struct EncodingError(String);

/// A digest over a character range of canonical text, in anchor form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanFingerprint {
    pub algo: String,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

/// Canonicalise `text` (BOM, line endings, trailing whitespace).
pub fn canonicalize(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    for (i, line) in unified.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.trim_end_matches(|c| c == ' ' || c == '\t'));
    }
    out
}

/// SHA-256 of the canonical form of `text`, as lowercase hex.
pub fn canonical_hash(text: &str) -> String {
    sha256_hex(canonicalize(text).as_bytes())
}

/// Fingerprint the half-open character range `start..end` of the canonical
/// form of `text`.
///
/// # Errors
///
/// [`RangeError::Empty`] if `start >= end`, [`RangeError::OutOfBounds`] if
/// `end` is past the canonical text's length.
pub fn span_fingerprint(text: &str, start: usize, end: usize) -> Result<SpanFingerprint, RangeError> {
    let canonical = canonicalize(text);
    let span = char_span(&canonical, start, end)?;
    Ok(SpanFingerprint {
        algo: FINGERPRINT_ALGO.to_string(),
        value: sha256_hex(span.as_bytes()),
        start,
        end,
    })
}

/// SHA-256 of the RFC 8785 (JCS) encoding of `value`.
///
/// Object key order and number formatting do not affect the result, so two
/// artifacts that differ only in layout share a digest.
pub fn canonical_json_digest<T: Serialize + ?Sized>(value: &T) -> Result<String, EncodingError> {
    let bytes = serde_jcs::to_vec(value).map_err(|e| EncodingError(e.to_string()))?;
    Ok(sha256_hex(&bytes))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn char_span(text: &str, start: usize, end: usize) -> Result<&str, RangeError> {
    if start >= end {
        return Err(RangeError::Empty { start, end });
    }
    let len = text.chars().count();
    if end > len {
        return Err(RangeError::OutOfBounds { end, len });
    }
    let byte_at = |n: usize| text.char_indices().nth(n).map_or(text.len(), |(i, _)| i);
    Ok(&text[byte_at(start)..byte_at(end)])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
