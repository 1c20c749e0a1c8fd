//! The [`Violation`] record every validator emits.
//!
//! A violation is data, not an error: validators append them to a shared
//! accumulator and validation carries on. Each [`ViolationKind`] belongs to a
//! [`ViolationClass`] so heuristic findings stay distinguishable from hard
//! structural and cryptographic failures.

use serde::{Deserialize, Serialize};

/// What rule a [`Violation`] breaks.
///
/// Serialises as the variant name (e.g. `"BrokenChain"`), which is also the
/// spelling fixture metadata uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViolationKind {
    /// Reported by the external schema check.
    Schema,
    /// A node's `parent_id` names no node in the artifact.
    DanglingParent,
    DuplicateNodeId,
    DuplicateAtomId,
    DuplicateSourceId,
    /// A node path segment names an id that does not exist.
    UnresolvedSegment,
    /// A node path segment declares a type the node does not have.
    TypeMismatch,
    /// A node path segment is not a descendant of the segment before it.
    BrokenChain,
    /// An evidence record points at an atom that does not exist.
    UnknownAtom,
    /// An atom has no evidence record at all.
    MissingEvidence,
    /// The source text an anchor points into cannot be found.
    UnresolvedSource,
    /// A status that requires a sha256 span fingerprint lacks one.
    MissingFingerprintAnchor,
    /// A present anchor is internally inconsistent.
    MalformedAnchor,
    /// A recomputed span fingerprint differs from the stored one.
    FingerprintMismatch,
    /// Hedging language in an atom whose evidence claims `valid`.
    InferenceStatusConflict,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 15] = [
        ViolationKind::Schema,
        ViolationKind::DanglingParent,
        ViolationKind::DuplicateNodeId,
        ViolationKind::DuplicateAtomId,
        ViolationKind::DuplicateSourceId,
        ViolationKind::UnresolvedSegment,
        ViolationKind::TypeMismatch,
        ViolationKind::BrokenChain,
        ViolationKind::UnknownAtom,
        ViolationKind::MissingEvidence,
        ViolationKind::UnresolvedSource,
        ViolationKind::MissingFingerprintAnchor,
        ViolationKind::MalformedAnchor,
        ViolationKind::FingerprintMismatch,
        ViolationKind::InferenceStatusConflict,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ViolationKind::Schema => "Schema",
            ViolationKind::DanglingParent => "DanglingParent",
            ViolationKind::DuplicateNodeId => "DuplicateNodeId",
            ViolationKind::DuplicateAtomId => "DuplicateAtomId",
            ViolationKind::DuplicateSourceId => "DuplicateSourceId",
            ViolationKind::UnresolvedSegment => "UnresolvedSegment",
            ViolationKind::TypeMismatch => "TypeMismatch",
            ViolationKind::BrokenChain => "BrokenChain",
            ViolationKind::UnknownAtom => "UnknownAtom",
            ViolationKind::MissingEvidence => "MissingEvidence",
            ViolationKind::UnresolvedSource => "UnresolvedSource",
            ViolationKind::MissingFingerprintAnchor => "MissingFingerprintAnchor",
            ViolationKind::MalformedAnchor => "MalformedAnchor",
            ViolationKind::FingerprintMismatch => "FingerprintMismatch",
            ViolationKind::InferenceStatusConflict => "InferenceStatusConflict",
        }
    }

    pub const fn class(self) -> ViolationClass {
        match self {
            ViolationKind::Schema
            | ViolationKind::DanglingParent
            | ViolationKind::DuplicateNodeId
            | ViolationKind::DuplicateAtomId
            | ViolationKind::DuplicateSourceId
            | ViolationKind::UnresolvedSegment
            | ViolationKind::TypeMismatch
            | ViolationKind::BrokenChain
            | ViolationKind::UnknownAtom
            | ViolationKind::MissingEvidence => ViolationClass::Structure,
            ViolationKind::UnresolvedSource
            | ViolationKind::MissingFingerprintAnchor
            | ViolationKind::MalformedAnchor
            | ViolationKind::FingerprintMismatch => ViolationClass::Cryptographic,
            ViolationKind::InferenceStatusConflict => ViolationClass::Heuristic,
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViolationKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViolationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown violation kind {s:?}"))
    }
}

/// Broad family of a [`ViolationKind`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViolationClass {
    /// Identity, lineage, and shape rules.
    Structure,
    /// Anchor and fingerprint rules.
    Cryptographic,
    /// Approximate lexical checks; expect false positives.
    Heuristic,
}

impl std::fmt::Display for ViolationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationClass::Structure => write!(f, "structure"),
            ViolationClass::Cryptographic => write!(f, "cryptographic"),
            ViolationClass::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// One broken rule, located in the artifact.
///
/// `location` is a dotted/indexed path such as `evidence[2].anchors[0]`.
/// `related` lists further occurrences when the rule concerns several
/// entities at once (duplicate ids).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub class: ViolationClass,
    pub location: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            class: kind.class(),
            location: location.into(),
            related: Vec::new(),
            message: message.into(),
        }
    }

    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = related;
        self
    }

    pub fn is_heuristic(&self) -> bool {
        self.class == ViolationClass::Heuristic
    }
}
