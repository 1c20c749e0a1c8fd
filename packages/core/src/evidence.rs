//! Anchor requirements and fingerprint verification for evidence records.
//!
//! What a record must carry depends on its claimed status. That dependency is
//! the [`STATUS_RULES`] table, not branching spread across the validator:
//! adding a status or tightening a requirement is a table edit.
//!
//! Every anchor that is present is checked regardless of status. Span
//! fingerprints are recomputed from the source text and compared with the
//! stored value; node-path anchors go through the same lineage check as atom
//! paths.

use std::collections::HashMap;

use crate::graph::DocumentGraph;
use crate::hashing::{span_fingerprint, FINGERPRINT_ALGO};
use crate::path::{check_node_path, NodePath};
use crate::types::{Anchor, AnchorField, AnchorType, Artifact, Atom, EvidenceRecord, EvidenceStatus};
use crate::validation::ValidateError;
use crate::violation::{Violation, ViolationKind};

// ---------------------------------------------------------------------------
// Source text
// ---------------------------------------------------------------------------

/// Supplies canonical source text by id.
pub trait SourceTexts {
    fn text(&self, id: &str) -> Option<&str>;
}

impl SourceTexts for HashMap<String, String> {
    fn text(&self, id: &str) -> Option<&str> {
        self.get(id).map(String::as_str)
    }
}

/// Source text carried inside the artifact itself: `sources[]` first, then
/// document nodes that captured their `text`. First occurrence wins.
#[derive(Debug, Default)]
pub struct ArtifactSources<'a> {
    sources: HashMap<&'a str, &'a str>,
    nodes: HashMap<&'a str, &'a str>,
}

impl<'a> ArtifactSources<'a> {
    pub fn new(artifact: &'a Artifact) -> Self {
        let mut sources = HashMap::new();
        for s in &artifact.sources {
            sources.entry(s.id.as_str()).or_insert(s.text.as_str());
        }
        let mut nodes = HashMap::new();
        for n in &artifact.document_nodes {
            if let Some(text) = &n.text {
                nodes.entry(n.id.as_str()).or_insert(text.as_str());
            }
        }
        Self { sources, nodes }
    }
}

impl SourceTexts for ArtifactSources<'_> {
    fn text(&self, id: &str) -> Option<&str> {
        self.sources
            .get(id)
            .or_else(|| self.nodes.get(id))
            .copied()
    }
}

// ---------------------------------------------------------------------------
// Status rules
// ---------------------------------------------------------------------------

/// A named test over a single anchor.
#[derive(Debug, Clone, Copy)]
pub struct AnchorPredicate {
    pub description: &'static str,
    pub matches: fn(&Anchor) -> bool,
}

/// What an evidence record with a given status must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct StatusRule {
    pub status: EvidenceStatus,
    /// At least one anchor must match, when set.
    pub required: Option<AnchorPredicate>,
    /// A fingerprint that no longer matches the source is expected, not a
    /// violation.
    pub tolerate_drift: bool,
}

pub const SHA256_SPAN_FINGERPRINT: AnchorPredicate = AnchorPredicate {
    description: "a span_fingerprint anchor with algo sha256",
    matches: is_sha256_span_fingerprint,
};

/// One row per status, in declaration order.
pub static STATUS_RULES: [StatusRule; 5] = [
    StatusRule {
        status: EvidenceStatus::Valid,
        required: Some(SHA256_SPAN_FINGERPRINT),
        tolerate_drift: false,
    },
    StatusRule {
        status: EvidenceStatus::Unverified,
        required: None,
        tolerate_drift: false,
    },
    StatusRule {
        status: EvidenceStatus::Disputed,
        required: None,
        tolerate_drift: false,
    },
    StatusRule {
        status: EvidenceStatus::NeedsReview,
        required: None,
        tolerate_drift: true,
    },
    StatusRule {
        status: EvidenceStatus::Invalid,
        required: None,
        tolerate_drift: false,
    },
];

/// The rule row for `status`.
pub fn rule_for(status: EvidenceStatus) -> &'static StatusRule {
    let row = match status {
        EvidenceStatus::Valid => 0,
        EvidenceStatus::Unverified => 1,
        EvidenceStatus::Disputed => 2,
        EvidenceStatus::NeedsReview => 3,
        EvidenceStatus::Invalid => 4,
    };
    &STATUS_RULES[row]
}

fn is_sha256_span_fingerprint(anchor: &Anchor) -> bool {
    anchor.anchor_type == AnchorType::SpanFingerprint
        && anchor.algo() == Some(FINGERPRINT_ALGO)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Lookups shared by every record of one artifact.
pub struct EvidenceContext<'a> {
    graph: &'a DocumentGraph<'a>,
    sources: &'a dyn SourceTexts,
    atoms: HashMap<&'a str, &'a Atom>,
}

impl<'a> EvidenceContext<'a> {
    pub fn new(artifact: &'a Artifact, graph: &'a DocumentGraph<'a>, sources: &'a dyn SourceTexts) -> Self {
        let mut atoms = HashMap::with_capacity(artifact.atoms.len());
        for atom in &artifact.atoms {
            atoms.entry(atom.id.as_str()).or_insert(atom);
        }
        Self {
            graph,
            sources,
            atoms,
        }
    }
}

/// Check one evidence record at position `index`.
///
/// # Errors
///
/// [`ValidateError::PathSyntax`] if a node-path anchor cannot be parsed.
pub fn check_record(
    index: usize,
    record: &EvidenceRecord,
    ctx: &EvidenceContext<'_>,
    out: &mut Vec<Violation>,
) -> Result<(), ValidateError> {
    let location = format!("evidence[{index}]");
    let rule = rule_for(record.status());

    let atom = ctx.atoms.get(record.atom_id.as_str()).copied();
    if atom.is_none() {
        out.push(Violation::new(
            ViolationKind::UnknownAtom,
            format!("{location}.atom_id"),
            format!("evidence references atom {:?}, which does not exist", record.atom_id),
        ));
    }

    if let Some(required) = rule.required {
        if !record.anchors.iter().any(required.matches) {
            out.push(Violation::new(
                ViolationKind::MissingFingerprintAnchor,
                format!("{location}.anchors"),
                format!(
                    "evidence with status {} must carry {}",
                    record.status(),
                    required.description
                ),
            ));
        }
    }

    let mut text = SourceLookup::resolve(record, atom, ctx.sources);
    if let SourceLookup::Missing { id, explicit: true } = &text {
        out.push(Violation::new(
            ViolationKind::UnresolvedSource,
            format!("{location}.source_id"),
            format!("source {id:?} does not exist"),
        ));
        text = SourceLookup::Reported;
    }

    for (j, anchor) in record.anchors.iter().enumerate() {
        let anchor_location = format!("{location}.anchors[{j}]");
        match anchor.anchor_type {
            AnchorType::SpanFingerprint => {
                check_span_anchor(anchor, &anchor_location, rule, &mut text, out);
            }
            AnchorType::NodePath => {
                check_path_anchor(anchor, &anchor_location, ctx.graph, out)?;
            }
        }
    }
    Ok(())
}

/// Report atoms that no evidence record points at.
pub fn check_coverage(artifact: &Artifact, out: &mut Vec<Violation>) {
    let covered: std::collections::HashSet<&str> =
        artifact.evidence.iter().map(|e| e.atom_id.as_str()).collect();
    for (i, atom) in artifact.atoms.iter().enumerate() {
        if !covered.contains(atom.id.as_str()) {
            out.push(Violation::new(
                ViolationKind::MissingEvidence,
                format!("atoms[{i}]"),
                format!("atom {:?} has no evidence record", atom.id),
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Where a record's anchors point, resolved once per record.
enum SourceLookup<'t> {
    Found { id: String, text: &'t str },
    Missing { id: String, explicit: bool },
    /// No id could be determined at all (unknown atom, no `source_id`).
    Unknown,
    /// Already reported for this record.
    Reported,
}

impl<'t> SourceLookup<'t> {
    fn resolve(record: &EvidenceRecord, atom: Option<&Atom>, sources: &'t dyn SourceTexts) -> Self {
        let (id, explicit) = match (&record.source_id, atom) {
            (Some(id), _) => (id.clone(), true),
            (None, Some(atom)) => match NodePath::parse(&atom.node_path) {
                Ok(path) => (path.terminal().id.to_string(), false),
                Err(_) => return SourceLookup::Unknown,
            },
            (None, None) => return SourceLookup::Unknown,
        };
        match sources.text(&id) {
            Some(text) => SourceLookup::Found { id, text },
            None => SourceLookup::Missing { id, explicit },
        }
    }
}

fn check_span_anchor(
    anchor: &Anchor,
    location: &str,
    rule: &StatusRule,
    text: &mut SourceLookup<'_>,
    out: &mut Vec<Violation>,
) {
    let malformed = |out: &mut Vec<Violation>, message: String| {
        out.push(Violation::new(ViolationKind::MalformedAnchor, location, message));
    };

    let algo = match string_field(&anchor.algo, "algo") {
        Ok(algo) => algo,
        Err(message) => return malformed(out, message),
    };
    match algo {
        Some(FINGERPRINT_ALGO) => {}
        Some(other) => {
            return malformed(
                out,
                format!("unsupported fingerprint algorithm {other:?}; only {FINGERPRINT_ALGO} is accepted"),
            );
        }
        None => return malformed(out, "span_fingerprint anchor has no algo".into()),
    }

    let stored = match string_field(&anchor.value, "value") {
        Ok(Some(v)) if !v.is_empty() => v,
        Ok(_) => return malformed(out, "span_fingerprint anchor has no value".into()),
        Err(message) => return malformed(out, message),
    };

    let (start, end) = match (offset_field(&anchor.start, "start"), offset_field(&anchor.end, "end")) {
        (Ok(Some(s)), Ok(Some(e))) => (s, e),
        (Err(message), _) | (_, Err(message)) => return malformed(out, message),
        _ => return malformed(out, "span_fingerprint anchor needs both start and end".into()),
    };

    let source = match text {
        SourceLookup::Found { id, text } => (id.as_str(), *text),
        SourceLookup::Missing { id, .. } => {
            out.push(Violation::new(
                ViolationKind::UnresolvedSource,
                location,
                format!("no source text available for {id:?}"),
            ));
            *text = SourceLookup::Reported;
            return;
        }
        SourceLookup::Unknown => {
            out.push(Violation::new(
                ViolationKind::UnresolvedSource,
                location,
                "cannot determine which source text the anchor points into",
            ));
            *text = SourceLookup::Reported;
            return;
        }
        SourceLookup::Reported => return,
    };

    let computed = match span_fingerprint(source.1, start, end) {
        Ok(fp) => fp,
        Err(e) => return malformed(out, format!("span {start}..{end} of {:?}: {e}", source.0)),
    };

    if computed.value.eq_ignore_ascii_case(stored) {
        return;
    }
    if rule.tolerate_drift {
        tracing::debug!(
            %location,
            status = %rule.status,
            "fingerprint drift tolerated"
        );
        return;
    }
    out.push(Violation::new(
        ViolationKind::FingerprintMismatch,
        location,
        format!(
            "stored fingerprint {stored} does not match {} computed over {:?}[{start}..{end}]",
            computed.value, source.0
        ),
    ));
}

fn check_path_anchor(
    anchor: &Anchor,
    location: &str,
    graph: &DocumentGraph<'_>,
    out: &mut Vec<Violation>,
) -> Result<(), ValidateError> {
    let raw = match string_field(&anchor.path, "path") {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            out.push(Violation::new(
                ViolationKind::MalformedAnchor,
                location,
                "node_path anchor has no path",
            ));
            return Ok(());
        }
        Err(message) => {
            out.push(Violation::new(ViolationKind::MalformedAnchor, location, message));
            return Ok(());
        }
    };
    let path = NodePath::parse(raw).map_err(|source| ValidateError::PathSyntax {
        location: format!("{location}.path"),
        source,
    })?;
    check_node_path(&path, graph, location, out);
    Ok(())
}

fn string_field<'a>(field: &'a Option<AnchorField<String>>, name: &str) -> Result<Option<&'a str>, String> {
    match field {
        None => Ok(None),
        Some(AnchorField::Typed(value)) => Ok(Some(value.as_str())),
        Some(AnchorField::Raw(raw)) => Err(format!("anchor {name} must be a string, got {raw}")),
    }
}

/// A present offset must be a non-negative integer.
fn offset_field(field: &Option<AnchorField<i64>>, name: &str) -> Result<Option<usize>, String> {
    match field {
        None => Ok(None),
        Some(AnchorField::Typed(n)) => usize::try_from(*n)
            .map(Some)
            .map_err(|_| format!("span {name} must be non-negative, got {n}")),
        Some(AnchorField::Raw(raw)) => Err(format!("span {name} must be a non-negative integer, got {raw}")),
    }
}

// --- tests -------------------------------------------------------------------
