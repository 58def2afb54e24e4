//! This module contains custom data structures used in the implementation of
//! the engine.

pub mod arena;
