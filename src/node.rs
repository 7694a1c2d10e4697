//! Provenance chain shared by collections, file sets and generators.
//!
//! Each derived object owns a copy of the lineage it came from. The chain is
//! only read for diagnostics; no data ever flows through it.

use std::fmt;

/// One step in a provenance chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    label: &'static str,
    parent: Option<Box<Node>>,
}

impl Node {
    /// Start a new chain.
    pub const fn root(label: &'static str) -> Self {
        Self { label, parent: None }
    }

    /// Start a chain below an optional parent.
    pub fn new(label: &'static str, parent: Option<&Node>) -> Self {
        Self {
            label,
            parent: parent.map(|p| Box::new(p.clone())),
        }
    }

    /// Derive a child step from this node.
    pub fn derive(&self, label: &'static str) -> Self {
        Self::new(label, Some(self))
    }

    pub const fn label(&self) -> &'static str {
        self.label
    }

    pub fn parent(&self) -> Option<&Node> {
        self.parent.as_deref()
    }

    /// Iterate from this node up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(Some(self), |n| n.parent())
    }

    /// Number of steps above this node.
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }
}

impl fmt::Display for Node {
    /// Renders the chain root first: `listdir > filter > map`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<_> = self.ancestors().map(Node::label).collect();
        labels.reverse();
        write!(f, "{}", labels.join(" > "))
    }
}
