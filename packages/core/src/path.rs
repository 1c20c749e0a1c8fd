//! Node path parsing and lineage verification.
//!
//! A node path such as `document:doc1/section:s1/paragraph:p1` claims a
//! lineage through the document forest. Each segment must resolve, must carry
//! the node's actual type, and must be a descendant (at any depth) of the
//! segment before it. Existence of every id on its own is not enough.

use thiserror::Error;

use crate::graph::DocumentGraph;
use crate::types::NodeType;
use crate::violation::{Violation, ViolationKind};

pub const SEGMENT_DELIMITER: char = '/';
pub const TYPE_DELIMITER: char = ':';

/// Errors returned by [`NodePath::parse`]. Indexes are zero-based.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathSyntaxError {
    #[error("node path is empty")]
    Empty,

    #[error("segment {index} is empty")]
    EmptySegment { index: usize },

    #[error("segment {index} ({segment:?}) is not of the form type:id")]
    MissingTypeDelimiter { index: usize, segment: String },

    #[error("segment {index} ({segment:?}) has an empty type")]
    EmptyType { index: usize, segment: String },

    #[error("segment {index} ({segment:?}) has an empty id")]
    EmptyId { index: usize, segment: String },
}

/// One `type:id` step of a [`NodePath`]. The declared type is kept verbatim
/// so an unknown type is reported as a mismatch, not a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment<'a> {
    pub declared_type: &'a str,
    pub id: &'a str,
}

impl std::fmt::Display for PathSegment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{TYPE_DELIMITER}{}", self.declared_type, self.id)
    }
}

/// A parsed node path borrowing from its source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath<'a> {
    raw: &'a str,
    segments: Vec<PathSegment<'a>>,
}

impl<'a> NodePath<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, PathSyntaxError> {
        if raw.is_empty() {
            return Err(PathSyntaxError::Empty);
        }
        let segments = raw
            .split(SEGMENT_DELIMITER)
            .enumerate()
            .map(|(index, segment)| {
                if segment.is_empty() {
                    return Err(PathSyntaxError::EmptySegment { index });
                }
                let (declared_type, id) = segment.split_once(TYPE_DELIMITER).ok_or_else(|| {
                    PathSyntaxError::MissingTypeDelimiter {
                        index,
                        segment: segment.to_string(),
                    }
                })?;
                if declared_type.is_empty() {
                    return Err(PathSyntaxError::EmptyType {
                        index,
                        segment: segment.to_string(),
                    });
                }
                if id.is_empty() {
                    return Err(PathSyntaxError::EmptyId {
                        index,
                        segment: segment.to_string(),
                    });
                }
                Ok(PathSegment { declared_type, id })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn segments(&self) -> &[PathSegment<'a>] {
        &self.segments
    }

    /// The last segment: the location the path ultimately names.
    pub fn terminal(&self) -> PathSegment<'a> {
        // parse() never yields an empty segment list
        self.segments[self.segments.len() - 1]
    }
}

/// Verify `path` against `graph`, appending one violation per faulty segment.
///
/// An unresolved segment breaks the chain: the next segment is only checked
/// for existence and type, never for descent from the unresolved one. A type
/// mismatch does not stop descent checks, since the node itself exists.
pub fn check_node_path(
    path: &NodePath<'_>,
    graph: &DocumentGraph<'_>,
    location: &str,
    out: &mut Vec<Violation>,
) {
    let mut previous: Option<PathSegment<'_>> = None;

    for (index, segment) in path.segments().iter().enumerate() {
        let Some(node) = graph.resolve(segment.id) else {
            out.push(Violation::new(
                ViolationKind::UnresolvedSegment,
                location,
                format!(
                    "segment {index} ({segment}) of {:?} names no document node",
                    path.as_str()
                ),
            ));
            previous = None;
            continue;
        };

        let declared = segment.declared_type.parse::<NodeType>().ok();
        if declared != Some(node.node_type) {
            out.push(Violation::new(
                ViolationKind::TypeMismatch,
                location,
                format!(
                    "segment {index} ({segment}) declares type {:?} but node {:?} is a {}",
                    segment.declared_type, node.id, node.node_type
                ),
            ));
        }

        if let Some(prev) = previous {
            if !graph.is_descendant(prev.id, segment.id) {
                let lineage = graph
                    .lineage(segment.id)
                    .iter()
                    .map(|n| format!("{}{TYPE_DELIMITER}{}", n.node_type, n.id))
                    .collect::<Vec<_>>()
                    .join(" > ");
                out.push(Violation::new(
                    ViolationKind::BrokenChain,
                    location,
                    format!(
                        "{segment} is not a descendant of {prev} (actual lineage: {lineage})"
                    ),
                ));
            }
        }
        previous = Some(*segment);
    }
}

// --- tests -------------------------------------------------------------------
