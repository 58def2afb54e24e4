//! This module contains errors caused by driving the interpolation tree in a
//! way that its node lifecycle does not allow.

use thiserror::Error;

use crate::{error::dependency, ir::Value, tree::NodeId};

/// Errors in the use of the interpolation tree by the scheduler.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Node {node} does not exist or has already been retired")]
    NoSuchNode { node: NodeId },

    #[error("Node {node} has already been split")]
    AlreadySplit { node: NodeId },

    #[error("Node {node} still has live children and cannot be retired")]
    NotALeaf { node: NodeId },

    #[error("No node is currently being executed")]
    NoCurrentNode,

    #[error("Branch condition {condition} on node {node} cannot be resolved: {source}")]
    UnresolvedCondition {
        node:      NodeId,
        condition: Value,
        source:    dependency::Error,
    },
}

/// The result type for tree operations that can only fail through misuse.
pub type Result<T> = std::result::Result<T, Error>;
