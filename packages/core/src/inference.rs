//! Lexical scan for hedging language in atoms claimed as `valid`.
//!
//! An atom whose own wording hedges ("likely", "may", "we conclude") is at
//! odds with evidence that claims unqualified validity. The scan is a
//! heuristic: it only ever flags, and its findings are reported in the
//! [`Heuristic`](crate::violation::ViolationClass::Heuristic) class.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Atom, EvidenceStatus};
use crate::violation::{Violation, ViolationKind};

/// Hedging markers, matched case-insensitively as whole words or phrases.
pub const INFERENCE_MARKERS: &[&str] = &[
    "may",
    "might",
    "could",
    "likely",
    "unlikely",
    "suggests",
    "suggest",
    "suggested",
    "possibly",
    "probably",
    "perhaps",
    "presumably",
    "apparently",
    "implied",
    "implies",
    "assumed",
    "typically",
    "generally",
    "therefore",
    "inferred",
    "we conclude",
    "appears to",
];

/// `(?i)\b(?:may|might|...|we\s+conclude|appears\s+to)\b`
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = INFERENCE_MARKERS
        .iter()
        .map(|m| regex::escape(m).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("invalid inference marker regex")
});

/// The first hedging marker in `text`, as it appears there.
pub fn find_marker(text: &str) -> Option<&str> {
    MARKER_RE.find(text).map(|m| m.as_str())
}

/// Flag the atom at `index` if it hedges while any of its evidence statuses
/// is `valid`.
pub fn check_atom(
    index: usize,
    atom: &Atom,
    statuses: &[EvidenceStatus],
    out: &mut Vec<Violation>,
) {
    if !statuses.contains(&EvidenceStatus::Valid) {
        return;
    }
    if let Some(marker) = find_marker(&atom.text) {
        out.push(Violation::new(
            ViolationKind::InferenceStatusConflict,
            format!("atoms[{index}].text"),
            format!(
                "atom {:?} uses hedging marker {marker:?} but its evidence is marked valid",
                atom.id
            ),
        ));
    }
}
