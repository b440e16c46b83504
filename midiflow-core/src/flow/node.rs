//! Flow node identifiers and payloads.

use crate::modifier::Modifier;
use crate::types::Pattern;
use std::fmt;

/// Opaque index of a node inside one [`PatternFlow`](super::PatternFlow).
///
/// Ids are handed out in insertion order and never reused, even after the
/// node is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node produces: a stored pattern, or a transform of its inputs
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Source(Pattern),
    Transform(Modifier),
}

/// One vertex of the flow graph
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatternFlowNode {
    pub(super) kind: NodeKind,
    pub(super) inputs: Vec<NodeId>,
}

impl PatternFlowNode {
    pub(super) fn source(pattern: Pattern) -> Self {
        PatternFlowNode {
            kind: NodeKind::Source(pattern),
            inputs: Vec::new(),
        }
    }

    pub(super) fn transform(modifier: Modifier, inputs: Vec<NodeId>) -> Self {
        PatternFlowNode {
            kind: NodeKind::Transform(modifier),
            inputs,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Input node ids, in the order the modifier receives them
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn is_source(&self) -> bool {
        matches!(self.kind, NodeKind::Source(_))
    }

    /// The stored pattern of a source node
    pub fn pattern(&self) -> Option<&Pattern> {
        match &self.kind {
            NodeKind::Source(pattern) => Some(pattern),
            NodeKind::Transform(_) => None,
        }
    }

    /// The modifier of a transform node
    pub fn modifier(&self) -> Option<&Modifier> {
        match &self.kind {
            NodeKind::Source(_) => None,
            NodeKind::Transform(modifier) => Some(modifier),
        }
    }
}

impl fmt::Display for PatternFlowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Source(pattern) => write!(
                f,
                "source({} notes, {})",
                pattern.len(),
                pattern.duration()
            ),
            NodeKind::Transform(modifier) => {
                write!(f, "{} <-", modifier)?;
                for input in &self.inputs {
                    write!(f, " {}", input)?;
                }
                Ok(())
            }
        }
    }
}
