//! Core data types for KDF v0.1 artifacts.
//!
//! This module defines the wire-format structures that make up an artifact:
//! [`Artifact`], [`DocumentNode`], [`Atom`], [`EvidenceRecord`], [`Anchor`]
//! and [`Source`]. All types serialise to and from JSON exactly as they appear
//! in artifact files. Every value here is a read-only view for the duration of
//! one validation run.

use serde::{Deserialize, Serialize};

/// The only artifact format version this validator understands.
pub const SUPPORTED_KDF_VERSION: &str = "0.1";

/// The structural role of a document node.
///
/// Serialises as a lowercase snake_case string (e.g. `"list_item"`). Node
/// paths may abbreviate `document` as `doc`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    #[serde(alias = "doc")]
    Document,
    Section,
    Subsection,
    Heading,
    Paragraph,
    List,
    ListItem,
    Table,
    TableRow,
    TableCell,
    Figure,
    Caption,
    Footnote,
    Page,
}

impl NodeType {
    /// The wire-format spelling of this type.
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeType::Document => "document",
            NodeType::Section => "section",
            NodeType::Subsection => "subsection",
            NodeType::Heading => "heading",
            NodeType::Paragraph => "paragraph",
            NodeType::List => "list",
            NodeType::ListItem => "list_item",
            NodeType::Table => "table",
            NodeType::TableRow => "table_row",
            NodeType::TableCell => "table_cell",
            NodeType::Figure => "figure",
            NodeType::Caption => "caption",
            NodeType::Footnote => "footnote",
            NodeType::Page => "page",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a [`NodeType`] from its wire-format string (or the `doc` alias).
impl std::str::FromStr for NodeType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" | "doc" => Ok(NodeType::Document),
            "section" => Ok(NodeType::Section),
            "subsection" => Ok(NodeType::Subsection),
            "heading" => Ok(NodeType::Heading),
            "paragraph" => Ok(NodeType::Paragraph),
            "list" => Ok(NodeType::List),
            "list_item" => Ok(NodeType::ListItem),
            "table" => Ok(NodeType::Table),
            "table_row" => Ok(NodeType::TableRow),
            "table_cell" => Ok(NodeType::TableCell),
            "figure" => Ok(NodeType::Figure),
            "caption" => Ok(NodeType::Caption),
            "footnote" => Ok(NodeType::Footnote),
            "page" => Ok(NodeType::Page),
            _ => Err(format!("unknown node type {s:?}")),
        }
    }
}

/// The certainty an evidence record claims for its atom.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    /// The evidence has been checked against the source and holds.
    Valid,
    /// Nobody has checked the evidence yet.
    Unverified,
    /// The evidence is contested.
    Disputed,
    /// The source changed since the evidence was captured.
    NeedsReview,
    /// The evidence was checked and does not hold.
    Invalid,
}

impl EvidenceStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            EvidenceStatus::Valid => "valid",
            EvidenceStatus::Unverified => "unverified",
            EvidenceStatus::Disputed => "disputed",
            EvidenceStatus::NeedsReview => "needs_review",
            EvidenceStatus::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for EvidenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EvidenceStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(EvidenceStatus::Valid),
            "unverified" => Ok(EvidenceStatus::Unverified),
            "disputed" => Ok(EvidenceStatus::Disputed),
            "needs_review" => Ok(EvidenceStatus::NeedsReview),
            "invalid" => Ok(EvidenceStatus::Invalid),
            _ => Err(format!(
                "unknown evidence status {s:?}; expected one of: \
                 valid, unverified, disputed, needs_review, invalid"
            )),
        }
    }
}

/// The kind of proof an [`Anchor`] carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnchorType {
    /// A digest over a character range of the canonical source text.
    SpanFingerprint,
    /// A structural pointer into the document forest.
    NodePath,
}

impl std::fmt::Display for AnchorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnchorType::SpanFingerprint => write!(f, "span_fingerprint"),
            AnchorType::NodePath => write!(f, "node_path"),
        }
    }
}

/// A structural node of the source document.
///
/// Nodes form a forest through `parent_id`; a node without a parent is a root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentNode {
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default)]
    pub parent_id: Option<String>,

    /// Canonical text of the node, when the extractor captured it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Canonical source text shipped inside the artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: String,
    pub text: String,
}

/// An extracted factual unit anchored to a structural location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Atom {
    pub id: String,
    pub text: String,

    /// Claimed lineage, `type:id/type:id/...`.
    pub node_path: String,
}

/// The validation state block of an [`EvidenceRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceValidation {
    pub status: EvidenceStatus,
}

/// An anchor field as it appeared on the wire.
///
/// A value of the wrong JSON type is kept as [`AnchorField::Raw`] so the
/// evidence validator can report it as a malformed anchor; it never fails
/// parsing of the whole artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnchorField<T> {
    Typed(T),
    Raw(serde_json::Value),
}

impl<T> AnchorField<T> {
    pub fn typed(&self) -> Option<&T> {
        match self {
            AnchorField::Typed(value) => Some(value),
            AnchorField::Raw(_) => None,
        }
    }
}

impl<T> From<T> for AnchorField<T> {
    fn from(value: T) -> Self {
        AnchorField::Typed(value)
    }
}

/// A cryptographic or positional proof attached to an evidence record.
///
/// Which fields are meaningful depends on [`AnchorType`]: span fingerprints
/// use `algo`, `value`, `start` and `end`; node-path anchors use `path`.
/// Missing or mistyped fields are reported by the evidence validator rather
/// than rejected at parse time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anchor {
    #[serde(rename = "type")]
    pub anchor_type: AnchorType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo: Option<AnchorField<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AnchorField<String>>,

    #[serde(default, alias = "start_offset", skip_serializing_if = "Option::is_none")]
    pub start: Option<AnchorField<i64>>,

    #[serde(default, alias = "end_offset", skip_serializing_if = "Option::is_none")]
    pub end: Option<AnchorField<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<AnchorField<String>>,
}

impl Anchor {
    /// The `algo` field, if present and a string.
    pub fn algo(&self) -> Option<&str> {
        self.algo.as_ref().and_then(AnchorField::typed).map(String::as_str)
    }
}

/// Evidence backing one atom.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceRecord {
    pub atom_id: String,

    /// Id of the source text the anchors point into. When absent, the
    /// terminal node of the atom's `node_path` is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    pub validation: EvidenceValidation,

    #[serde(default)]
    pub anchors: Vec<Anchor>,
}

impl EvidenceRecord {
    pub fn status(&self) -> EvidenceStatus {
        self.validation.status
    }
}

/// A single KDF document instance submitted for validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf_version: Option<String>,

    #[serde(default)]
    pub sources: Vec<Source>,

    pub document_nodes: Vec<DocumentNode>,
    pub atoms: Vec<Atom>,
    pub evidence: Vec<EvidenceRecord>,
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_accepts_doc_alias() {
        assert_eq!("doc".parse::<NodeType>(), Ok(NodeType::Document));
        let node: DocumentNode =
            serde_json::from_str(r#"{"id":"d","type":"doc"}"#).unwrap();
        assert_eq!(node.node_type, NodeType::Document);
        assert_eq!(node.parent_id, None);
    }

    #[test]
    fn node_type_display_matches_wire_format() {
        let json = serde_json::to_string(&NodeType::ListItem).unwrap();
        assert_eq!(json, "\"list_item\"");
        assert_eq!(NodeType::ListItem.to_string(), "list_item");
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("certain".parse::<EvidenceStatus>().is_err());
        let res: Result<EvidenceValidation, _> = serde_json::from_str(r#"{"status":"certain"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn anchor_accepts_offset_aliases() {
        let anchor: Anchor = serde_json::from_str(
            r#"{"type":"span_fingerprint","algo":"sha256","value":"ab","start_offset":2,"end_offset":5}"#,
        )
        .unwrap();
        assert_eq!(anchor.start, Some(AnchorField::Typed(2)));
        assert_eq!(anchor.end, Some(AnchorField::Typed(5)));
    }

    #[test]
    fn mistyped_anchor_fields_still_parse() {
        let anchor: Anchor = serde_json::from_str(
            r#"{"type":"span_fingerprint","algo":7,"value":42,"start":"0","end":18446744073709551615,"path":[]}"#,
        )
        .unwrap();
        assert_eq!(anchor.algo, Some(AnchorField::Raw(serde_json::json!(7))));
        assert_eq!(anchor.algo(), None);
        assert_eq!(anchor.value, Some(AnchorField::Raw(serde_json::json!(42))));
        assert_eq!(anchor.start, Some(AnchorField::Raw(serde_json::json!("0"))));
        assert!(matches!(anchor.end, Some(AnchorField::Raw(_))));
        assert!(matches!(anchor.path, Some(AnchorField::Raw(_))));

        let fractional: Anchor =
            serde_json::from_str(r#"{"type":"span_fingerprint","end":1.5}"#).unwrap();
        assert_eq!(fractional.end, Some(AnchorField::Raw(serde_json::json!(1.5))));
    }

    #[test]
    fn artifact_requires_top_level_arrays() {
        let res: Result<Artifact, _> =
            serde_json::from_str(r#"{"document_nodes":[],"atoms":[]}"#);
        assert!(res.is_err());

        let artifact: Artifact =
            serde_json::from_str(r#"{"document_nodes":[],"atoms":[],"evidence":[]}"#).unwrap();
        assert!(artifact.sources.is_empty());
        assert_eq!(artifact.kdf_version, None);
    }
}
