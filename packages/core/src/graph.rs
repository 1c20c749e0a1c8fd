use std::collections::HashMap;

use thiserror::Error;

use crate::types::DocumentNode;

/// Errors returned by [`DocumentGraph::build`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("parent chain through node {node_id:?} is cyclic")]
    Cycle { node_id: String },
}

/// A node whose `parent_id` does not resolve. It is treated as a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingParent<'a> {
    /// Position of the node in `document_nodes`.
    pub position: usize,
    pub node_id: &'a str,
    pub parent_id: &'a str,
}

/// The document forest: an arena of nodes, each holding the arena index of
/// its parent.
///
/// Ids are indexed by first occurrence; later duplicates stay in the arena
/// (so their own parent edges are checked for cycles) but cannot be resolved
/// by id. Duplicate ids are reported by the identity validator.
#[derive(Debug)]
pub struct DocumentGraph<'a> {
    nodes: Vec<Entry<'a>>,
    index: HashMap<&'a str, usize>,
    dangling: Vec<DanglingParent<'a>>,
}

#[derive(Debug)]
struct Entry<'a> {
    node: &'a DocumentNode,
    parent: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl<'a> DocumentGraph<'a> {
    /// Build the forest from the artifact's flat node table.
    ///
    /// # Errors
    ///
    /// [`GraphError::Cycle`] if following parent pointers from some node does
    /// not reach a root.
    pub fn build(nodes: &'a [DocumentNode]) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id.as_str()).or_insert(i);
        }

        let mut dangling = Vec::new();
        let entries: Vec<Entry<'a>> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let parent = node.parent_id.as_deref().and_then(|pid| {
                    let found = index.get(pid).copied();
                    if found.is_none() {
                        dangling.push(DanglingParent {
                            position: i,
                            node_id: &node.id,
                            parent_id: pid,
                        });
                    }
                    found
                });
                Entry { node, parent }
            })
            .collect();

        let graph = Self {
            nodes: entries,
            index,
            dangling,
        };
        graph.check_acyclic()?;

        tracing::debug!(
            nodes = graph.nodes.len(),
            roots = graph.roots().count(),
            dangling = graph.dangling.len(),
            "document graph built"
        );
        Ok(graph)
    }

    /// Look up a node by id.
    pub fn resolve(&self, id: &str) -> Option<&'a DocumentNode> {
        self.index.get(id).map(|&i| self.nodes[i].node)
    }

    /// Whether `descendant_id` lies strictly below `ancestor_id`.
    ///
    /// Walks parent pointers upward from `descendant_id` until `ancestor_id`
    /// is met or a root is reached. A node is not its own descendant.
    pub fn is_descendant(&self, ancestor_id: &str, descendant_id: &str) -> bool {
        let (Some(&ancestor), Some(&descendant)) =
            (self.index.get(ancestor_id), self.index.get(descendant_id))
        else {
            return false;
        };
        let mut current = self.nodes[descendant].parent;
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.nodes[i].parent;
        }
        false
    }

    /// The chain from the root down to `id` inclusive. Empty if `id` does not
    /// resolve.
    pub fn lineage(&self, id: &str) -> Vec<&'a DocumentNode> {
        let Some(&start) = self.index.get(id) else {
            return vec![];
        };
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            chain.push(self.nodes[i].node);
            current = self.nodes[i].parent;
        }
        chain.reverse();
        chain
    }

    /// Nodes without a (resolvable) parent, in artifact order.
    pub fn roots(&self) -> impl Iterator<Item = &'a DocumentNode> + '_ {
        self.nodes
            .iter()
            .filter(|e| e.parent.is_none())
            .map(|e| e.node)
    }

    /// Nodes whose `parent_id` does not resolve, in artifact order.
    pub fn dangling_parents(&self) -> &[DanglingParent<'a>] {
        &self.dangling
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // Three-colour walk up the parent pointers. Every node is finished at
    // most once, so the whole check is linear in the number of nodes.
    fn check_acyclic(&self) -> Result<(), GraphError> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut trail = Vec::new();

        for start in 0..self.nodes.len() {
            let mut current = Some(start);
            while let Some(i) = current {
                match marks[i] {
                    Mark::Done => break,
                    Mark::InProgress => {
                        return Err(GraphError::Cycle {
                            node_id: self.nodes[i].node.id.clone(),
                        });
                    }
                    Mark::Unvisited => {
                        marks[i] = Mark::InProgress;
                        trail.push(i);
                        current = self.nodes[i].parent;
                    }
                }
            }
            for i in trail.drain(..) {
                marks[i] = Mark::Done;
            }
        }
        Ok(())
    }
}

// --- tests -------------------------------------------------------------------
