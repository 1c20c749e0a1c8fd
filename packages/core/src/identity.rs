//! Global uniqueness of ids within each namespace.
//!
//! Document nodes, atoms, and sources are independent namespaces: `p1` may
//! name both a node and an atom. The whole artifact is always scanned so every
//! duplicate is reported in one pass.

use std::collections::HashMap;

use crate::types::Artifact;
use crate::violation::{Violation, ViolationKind};

/// An id value that occurs more than once, with the positions of every
/// occurrence in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate<'a> {
    pub id: &'a str,
    pub positions: Vec<usize>,
}

/// Find every repeated value in `ids`, ordered by first occurrence.
pub fn find_duplicates<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<Duplicate<'a>> {
    let mut seen: HashMap<&'a str, Vec<usize>> = HashMap::new();
    let mut order: Vec<&'a str> = Vec::new();
    for (i, id) in ids.into_iter().enumerate() {
        let positions = seen.entry(id).or_default();
        if positions.is_empty() {
            order.push(id);
        }
        positions.push(i);
    }
    order
        .into_iter()
        .filter_map(|id| {
            let positions = seen.remove(id)?;
            (positions.len() > 1).then_some(Duplicate { id, positions })
        })
        .collect()
}

/// Report duplicate node, atom, and source ids, in that order.
pub fn check_identities(artifact: &Artifact, out: &mut Vec<Violation>) {
    let namespaces = [
        (
            ViolationKind::DuplicateNodeId,
            "document_nodes",
            "node",
            find_duplicates(artifact.document_nodes.iter().map(|n| n.id.as_str())),
        ),
        (
            ViolationKind::DuplicateAtomId,
            "atoms",
            "atom",
            find_duplicates(artifact.atoms.iter().map(|a| a.id.as_str())),
        ),
        (
            ViolationKind::DuplicateSourceId,
            "sources",
            "source",
            find_duplicates(artifact.sources.iter().map(|s| s.id.as_str())),
        ),
    ];

    for (kind, table, noun, duplicates) in namespaces {
        for dup in duplicates {
            let locations: Vec<String> = dup
                .positions
                .iter()
                .map(|p| format!("{table}[{p}]"))
                .collect();
            let message = format!(
                "{noun} id {:?} occurs {} times ({})",
                dup.id,
                locations.len(),
                locations.join(", ")
            );
            let (first, rest) = locations.split_first().map_or_else(
                || (String::new(), Vec::new()),
                |(first, rest)| (first.clone(), rest.to_vec()),
            );
            out.push(Violation::new(kind, first, message).with_related(rest));
        }
    }
}
