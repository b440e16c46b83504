//! Validation errors shared by patterns, modifiers, flows and timelines.
//!
//! Every failure is synchronous, deterministic and caused by the caller;
//! nothing in the core is retried.

use crate::flow::NodeId;
use crate::modifier::Arity;
use crate::types::time::Time;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a note already starts at {start}")]
    OccupiedSlot { start: Time },
    #[error("no note starts at {start}")]
    NotFound { start: Time },
    #[error("time {time} would be negative")]
    NegativeTime { time: Time },
    #[error("{modifier} expects {expected} input(s), got {actual}")]
    Arity {
        modifier: String,
        expected: Arity,
        actual: usize,
    },
    #[error("connecting {input} into {node} would create a cycle")]
    Cycle { node: NodeId, input: NodeId },
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("notes overlap at {start}")]
    Overlap { start: Time },
    #[error("invalid note: {0}")]
    InvalidNote(String),
    #[error("invalid duration {duration}: {reason}")]
    InvalidDuration { duration: Time, reason: String },
    #[error("invalid parameter for {modifier}: {message}")]
    InvalidParameter { modifier: String, message: String },
    #[error("invalid MIDI channel {0} (expected 0-15)")]
    InvalidChannel(u8),
    #[error("invalid MIDI program {0} (expected 0-127)")]
    InvalidProgram(u8),
    #[error("invalid playback config: {0}")]
    InvalidConfig(String),
    #[error("time out of range: {0}")]
    TimeOverflow(String),
    #[error("node {node} is still used by {dependents:?}")]
    NodeInUse {
        node: NodeId,
        dependents: Vec<NodeId>,
    },
    #[error("node {node} is not a {expected} node")]
    WrongNodeKind { node: NodeId, expected: &'static str },
    #[error("evaluating node {node} failed: {source}")]
    Evaluation {
        node: NodeId,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Wrap an error raised while evaluating `node`.
    ///
    /// Already-wrapped errors keep the id of the node that actually failed.
    pub fn at_node(self, node: NodeId) -> Self {
        match self {
            err @ ValidationError::Evaluation { .. } => err,
            other => ValidationError::Evaluation {
                node,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, unwrapping evaluation context
    pub fn root_cause(&self) -> &ValidationError {
        match self {
            ValidationError::Evaluation { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn parameter(modifier: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidParameter {
            modifier: modifier.to_string(),
            message: message.into(),
        }
    }
}
