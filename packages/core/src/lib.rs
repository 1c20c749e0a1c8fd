//! Reference validator for KDF knowledge artifacts.
//!
//! A KDF artifact ties claims ("atoms") extracted from a document back to
//! the document itself: every atom names the node it came from, and every
//! piece of evidence anchors it to a span of source text by a SHA-256
//! fingerprint. This crate checks that those links hold.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Wire types: [`Artifact`], [`DocumentNode`], [`Atom`], [`EvidenceRecord`], [`Anchor`] |
//! | [`hashing`] | Text canonicalization and span fingerprints |
//! | [`graph`] | Parent/child graph of document nodes, cycle detection, ancestry |
//! | [`identity`] | Duplicate id detection |
//! | [`path`] | Node path parsing and resolution |
//! | [`evidence`] | Anchor checks and the status requirement table |
//! | [`inference`] | Hedging-language scan over `valid` atoms |
//! | [`schema`] | Pluggable structural check of raw JSON |
//! | [`violation`] | Violation kinds, classes, and records |
//! | [`validation`] | The orchestrator: [`validate_artifact`] and [`validate_document`] |
//! | [`render`] | Plain-text report rendering |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use kdf::{validate_document, StructuralSchema};
//!
//! let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string("artifact.json")?)?;
//! let report = validate_document(&doc, &StructuralSchema)?;
//! for v in &report.violations {
//!     println!("{}: {} @ {}", v.kind, v.message, v.location);
//! }
//! ```

pub mod evidence;
pub mod graph;
pub mod hashing;
pub mod identity;
pub mod inference;
pub mod path;
pub mod render;
pub mod schema;
pub mod types;
pub mod validation;
pub mod violation;

pub use evidence::{ArtifactSources, SourceTexts};
pub use graph::{DocumentGraph, GraphError};
pub use hashing::{canonical_hash, canonical_json_digest, canonicalize, span_fingerprint, RangeError, SpanFingerprint};
pub use path::{NodePath, PathSyntaxError};
pub use schema::{SchemaValidator, SchemaViolation, StructuralSchema};
pub use types::{
    Anchor, AnchorField, AnchorType, Artifact, Atom, DocumentNode, EvidenceRecord, EvidenceStatus, NodeType, Source,
    SUPPORTED_KDF_VERSION,
};
pub use validation::{
    parse_artifact, validate_artifact, validate_artifact_with, validate_document, ExitStatus, ValidateError,
    ValidationReport,
};
pub use violation::{Violation, ViolationClass, ViolationKind};
