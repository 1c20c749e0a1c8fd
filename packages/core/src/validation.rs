use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::evidence::{self, ArtifactSources, EvidenceContext, SourceTexts};
use crate::graph::{DocumentGraph, GraphError};
use crate::identity;
use crate::inference;
use crate::path::{self, NodePath, PathSyntaxError};
use crate::schema::SchemaValidator;
use crate::types::{Artifact, EvidenceStatus};
use crate::violation::{Violation, ViolationKind};

/// An artifact the semantic validator cannot interpret at all.
///
/// These are structural preconditions, distinct from [`Violation`]s: when one
/// occurs there is no meaningful violation list to return.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("artifact is malformed: {0}")]
    Malformed(String),

    #[error(transparent)]
    Cycle(#[from] GraphError),

    #[error("unparsable node path at {location}: {source}")]
    PathSyntax {
        location: String,
        #[source]
        source: PathSyntaxError,
    },
}

/// The outcome of validating one artifact.
///
/// `ok` is true exactly when `violations` is empty. Violations appear in
/// stage order (graph, identity, paths, evidence, inference) and within a
/// stage in artifact order, so identical input always yields an identical
/// report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            ok: violations.is_empty(),
            violations,
        }
    }

    /// Distinct kinds present, sorted.
    pub fn kinds(&self) -> Vec<ViolationKind> {
        let mut kinds: Vec<_> = self.violations.iter().map(|v| v.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }
}

/// Process exit status the command-line layer reports.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Valid artifact, or every fixture conformant.
    Success = 0,
    /// Validation or conformance failure.
    Failure = 2,
    /// Something other than the artifact went wrong (I/O, internal fault).
    Internal = 3,
}

impl ExitStatus {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl From<&ValidationReport> for ExitStatus {
    fn from(report: &ValidationReport) -> Self {
        if report.ok {
            ExitStatus::Success
        } else {
            ExitStatus::Failure
        }
    }
}

/// Structural rejection of an artifact is a validation failure, not an
/// internal one.
impl From<&ValidateError> for ExitStatus {
    fn from(_: &ValidateError) -> Self {
        ExitStatus::Failure
    }
}

/// Parse artifact JSON text.
pub fn parse_artifact(json: &str) -> Result<Artifact, ValidateError> {
    serde_json::from_str(json).map_err(|e| ValidateError::Malformed(e.to_string()))
}

/// Validate an artifact using the source text it carries.
pub fn validate_artifact(artifact: &Artifact) -> Result<ValidationReport, ValidateError> {
    let sources = ArtifactSources::new(artifact);
    validate_artifact_with(artifact, &sources)
}

/// Validate an artifact, reading anchor source text from `sources`.
///
/// Runs every stage and collects all violations; it never stops at the
/// first one.
///
/// # Errors
///
/// [`ValidateError::Cycle`] for a cyclic parent graph and
/// [`ValidateError::PathSyntax`] for a node path that cannot be parsed.
pub fn validate_artifact_with(
    artifact: &Artifact,
    sources: &dyn SourceTexts,
) -> Result<ValidationReport, ValidateError> {
    let mut violations = Vec::new();

    let graph = DocumentGraph::build(&artifact.document_nodes)?;
    for d in graph.dangling_parents() {
        violations.push(Violation::new(
            ViolationKind::DanglingParent,
            format!("document_nodes[{}].parent_id", d.position),
            format!("node {:?} names parent {:?}, which does not exist", d.node_id, d.parent_id),
        ));
    }

    identity::check_identities(artifact, &mut violations);

    for (i, atom) in artifact.atoms.iter().enumerate() {
        let location = format!("atoms[{i}].node_path");
        let node_path = NodePath::parse(&atom.node_path).map_err(|source| {
            ValidateError::PathSyntax {
                location: location.clone(),
                source,
            }
        })?;
        path::check_node_path(&node_path, &graph, &location, &mut violations);
    }

    let ctx = EvidenceContext::new(artifact, &graph, sources);
    for (i, record) in artifact.evidence.iter().enumerate() {
        evidence::check_record(i, record, &ctx, &mut violations)?;
    }
    evidence::check_coverage(artifact, &mut violations);

    let mut statuses: HashMap<&str, Vec<EvidenceStatus>> = HashMap::new();
    for record in &artifact.evidence {
        statuses
            .entry(record.atom_id.as_str())
            .or_default()
            .push(record.status());
    }
    for (i, atom) in artifact.atoms.iter().enumerate() {
        let atom_statuses = statuses.get(atom.id.as_str()).map_or(&[][..], Vec::as_slice);
        inference::check_atom(i, atom, atom_statuses, &mut violations);
    }

    tracing::debug!(
        nodes = artifact.document_nodes.len(),
        atoms = artifact.atoms.len(),
        evidence = artifact.evidence.len(),
        violations = violations.len(),
        "semantic validation finished"
    );
    Ok(ValidationReport::from_violations(violations))
}

/// Validate raw artifact JSON: the schema check first, then the semantic
/// validator. Schema findings come first in the report as
/// [`ViolationKind::Schema`].
///
/// If the schema check reports problems and the document also cannot be
/// read as an [`Artifact`], the schema findings alone are returned; a
/// document that passes the schema check but still cannot be read is
/// [`ValidateError::Malformed`].
pub fn validate_document(
    document: &Value,
    schema: &dyn SchemaValidator,
) -> Result<ValidationReport, ValidateError> {
    let mut violations: Vec<Violation> = schema
        .validate(document)
        .into_iter()
        .map(|s| {
            let location = if s.path.is_empty() { "/".to_string() } else { s.path };
            Violation::new(ViolationKind::Schema, location, s.message)
        })
        .collect();

    let artifact = match Artifact::deserialize(document) {
        Ok(artifact) => artifact,
        Err(e) if !violations.is_empty() => {
            tracing::debug!("semantic stage skipped, artifact unreadable: {e}");
            return Ok(ValidationReport::from_violations(violations));
        }
        Err(e) => return Err(ValidateError::Malformed(e.to_string())),
    };

    let semantic = validate_artifact(&artifact)?;
    violations.extend(semantic.violations);
    Ok(ValidationReport::from_violations(violations))
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::sha256_hex;
    use crate::schema::StructuralSchema;
    use serde_json::json;

    const P1: &str = "Revenue increased by 12 percent in 2023.";

    fn base() -> Value {
        json!({
            "kdf_version": "0.1",
            "document_nodes": [
                {"id": "doc1", "type": "document", "parent_id": null},
                {"id": "s1", "type": "section", "parent_id": "doc1"},
                {"id": "s2", "type": "section", "parent_id": "doc1"},
                {"id": "p1", "type": "paragraph", "parent_id": "s1", "text": P1},
                {"id": "p2", "type": "paragraph", "parent_id": "s2", "text": "The audit committee met four times."}
            ],
            "atoms": [
                {"id": "a1", "text": P1, "node_path": "document:doc1/section:s1/paragraph:p1"}
            ],
            "evidence": [{
                "atom_id": "a1",
                "validation": {"status": "valid"},
                "anchors": [{
                    "type": "span_fingerprint",
                    "algo": "sha256",
                    "value": sha256_hex(P1.as_bytes()),
                    "start": 0,
                    "end": P1.chars().count()
                }]
            }]
        })
    }

    fn validate(doc: &Value) -> ValidationReport {
        validate_document(doc, &StructuralSchema).unwrap()
    }

    #[test]
    fn well_formed_artifact_is_ok() {
        let report = validate(&base());
        assert_eq!(report.violations, vec![]);
        assert!(report.ok);
        assert_eq!(ExitStatus::from(&report), ExitStatus::Success);
    }

    #[test]
    fn validation_is_deterministic() {
        let mut doc = base();
        doc["atoms"][0]["node_path"] = json!("document:doc1/section:s2/paragraph:p1");
        doc["atoms"].as_array_mut().unwrap().push(json!(
            {"id": "a1", "text": "It probably rose.", "node_path": "paragraph:ghost"}
        ));
        let first = serde_json::to_string(&validate(&doc)).unwrap();
        let second = serde_json::to_string(&validate(&doc)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn all_violations_reported_in_stage_order() {
        let mut doc = base();
        doc["document_nodes"].as_array_mut().unwrap().push(json!(
            {"id": "p9", "type": "paragraph", "parent_id": "ghost"}
        ));
        doc["atoms"] = json!([
            {"id": "a1", "text": "this finding likely indicates fraud", "node_path": "document:doc1/section:s2/paragraph:p1"},
            {"id": "a1", "text": "second", "node_path": "document:doc1"}
        ]);
        doc["evidence"][0]["anchors"] = json!([]);

        let report = validate(&doc);
        let kinds: Vec<_> = report.violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::DanglingParent,
                ViolationKind::DuplicateAtomId,
                ViolationKind::BrokenChain,
                ViolationKind::MissingFingerprintAnchor,
                ViolationKind::InferenceStatusConflict,
            ]
        );
        assert!(!report.ok);
        assert_eq!(ExitStatus::from(&report).code(), 2);
    }

    #[test]
    fn likely_fraud_scenario_conflicts() {
        let mut doc = base();
        doc["atoms"][0]["text"] = json!("this finding likely indicates fraud");
        let report = validate(&doc);
        assert_eq!(report.kinds(), vec![ViolationKind::InferenceStatusConflict]);
    }

    #[test]
    fn missing_fingerprint_iff_no_sha256_span_anchor() {
        let mut doc = base();
        assert!(!validate(&doc).has_kind(ViolationKind::MissingFingerprintAnchor));

        doc["evidence"][0]["anchors"] = json!([{"type": "node_path", "path": "document:doc1"}]);
        assert!(validate(&doc).has_kind(ViolationKind::MissingFingerprintAnchor));
    }

    #[test]
    fn mistyped_anchor_fields_are_violations_not_rejections() {
        let shapes = [
            ("start", json!("0")),
            ("end", json!(1.5)),
            ("end", json!(u64::MAX)),
            ("value", json!(42)),
            ("algo", json!(["sha256"])),
        ];
        for (field, bad) in shapes {
            let mut doc = base();
            doc["atoms"][0]["node_path"] = json!("document:doc1/section:s2/paragraph:p1");
            doc["evidence"][0]["anchors"][0][field] = bad.clone();
            let report = validate_document(&doc, &StructuralSchema)
                .unwrap_or_else(|e| panic!("{field}={bad} rejected: {e}"));
            let kinds: Vec<_> = report.violations.iter().map(|v| v.kind).collect();
            assert!(kinds.contains(&ViolationKind::MalformedAnchor), "{field}={bad}: {kinds:?}");
            assert!(kinds.contains(&ViolationKind::BrokenChain), "{field}={bad}: {kinds:?}");
            let malformed = report
                .violations
                .iter()
                .find(|v| v.kind == ViolationKind::MalformedAnchor)
                .unwrap();
            assert_eq!(malformed.location, "evidence[0].anchors[0]");
        }
    }

    #[test]
    fn cyclic_graph_is_fatal() {
        let mut doc = base();
        doc["document_nodes"][0]["parent_id"] = json!("p1");
        assert!(matches!(
            validate_document(&doc, &StructuralSchema),
            Err(ValidateError::Cycle(_))
        ));
    }

    #[test]
    fn unparsable_atom_path_is_fatal() {
        let mut doc = base();
        doc["atoms"][0]["node_path"] = json!("document:doc1/p1");
        let err = validate_document(&doc, &StructuralSchema).unwrap_err();
        assert!(matches!(err, ValidateError::PathSyntax { ref location, .. } if location == "atoms[0].node_path"));
        assert_eq!(ExitStatus::from(&err), ExitStatus::Failure);
    }

    #[test]
    fn schema_failure_short_circuits_semantic_stage() {
        let mut doc = base();
        doc.as_object_mut().unwrap().remove("evidence");
        let report = validate(&doc);
        assert_eq!(report.kinds(), vec![ViolationKind::Schema]);
        assert_eq!(report.violations[0].location, "/");
    }

    #[test]
    fn schema_clean_but_unreadable_is_malformed() {
        let mut doc = base();
        doc["evidence"][0]["validation"]["status"] = json!("certain");
        assert!(matches!(
            validate_document(&doc, &StructuralSchema),
            Err(ValidateError::Malformed(_))
        ));
    }

    #[test]
    fn external_source_texts_are_honoured() {
        let artifact: Artifact = serde_json::from_value(base()).unwrap();
        let mut texts = HashMap::new();
        texts.insert("p1".to_string(), "Something else entirely, forty chars or so".to_string());
        let report = validate_artifact_with(&artifact, &texts).unwrap();
        assert_eq!(report.kinds(), vec![ViolationKind::FingerprintMismatch]);
    }

    #[test]
    fn parse_artifact_reports_malformed_json() {
        assert!(matches!(parse_artifact("{"), Err(ValidateError::Malformed(_))));
    }
}
