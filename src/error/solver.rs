//! This module contains the errors that a constraint solver may report.
//!
//! None of these are fatal to the engine: a solver error during a subsumption
//! check simply means that the check fails.

use std::time::Duration;

use thiserror::Error;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Solver query timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Solver failure: {_0}")]
    Failure(String),
}

impl Error {
    /// Constructs a generic failure with the provided `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }
}
