//! This module contains the primary error type for the engine's interface. It
//! also re-exports the more specific error types that are subsystem-specific.

pub mod container;
pub mod dependency;
pub mod solver;
pub mod tree;

use thiserror::Error;

/// The interface result type for the library.
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Subsystems return the more-specific child
/// error types as appropriate.
pub type Result<T> = std::result::Result<T, Error>;

/// The interface error type for the library.
///
/// Every error returned from the interface is fatal to the exploration: it
/// indicates a defect in the host, and continuing would risk unsound pruning.
/// Inconclusive solver results are not errors, and never surface here.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// Invariant violations detected while building the dependency graph.
    #[error(transparent)]
    Dependency(#[from] dependency::LocatedError),

    /// Misuse of the interpolation tree's node lifecycle.
    #[error(transparent)]
    Tree(#[from] tree::Error),

    /// An unknown error, represented as a string.
    #[error("Unknown Error: {_0:?}")]
    Other(String),
}

impl Error {
    /// Constructs an unknown error with the provided `message`.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
