//! Plain-text rendering of validation reports.
//!
//! The output is stable line-oriented text for terminals and CI logs. The
//! JSON form of [`ValidationReport`] is the machine-readable one; this is for
//! people.

use crate::validation::{ValidateError, ValidationReport};
use crate::violation::Violation;

/// Render a report under a verdict header.
///
/// ```text
/// [FAIL] fixtures/i007_path_chain_not_real.json
/// - BrokenChain (structure): paragraph:p1 is not a descendant of section:s1 (...) @ atoms[0].node_path
/// - InferenceStatusConflict (heuristic): atom "a1" uses hedging marker "likely" ... @ atoms[0].text
/// ```
pub fn render_report(label: &str, report: &ValidationReport) -> String {
    let verdict = if report.ok { "PASS" } else { "FAIL" };
    let mut out = format!("[{verdict}] {label}\n");
    for v in &report.violations {
        out.push_str("- ");
        out.push_str(&render_violation(v));
        out.push('\n');
    }
    out
}

/// One violation on a single line, without a trailing newline.
pub fn render_violation(v: &Violation) -> String {
    let mut line = format!("{} ({}): {} @ {}", v.kind, v.class, v.message, v.location);
    if !v.related.is_empty() {
        line.push_str(&format!(" (also {})", v.related.join(", ")));
    }
    line
}

/// Render a structural rejection under a `[FAIL]` header.
pub fn render_error(label: &str, error: &ValidateError) -> String {
    format!("[FAIL] {label}\n- rejected: {error}\n")
}

// --- tests -------------------------------------------------------------------
