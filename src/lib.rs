//! This library implements the interpolation and subsumption engine of a
//! symbolic executor. It learns, from every fully explored subtree of the
//! execution tree, a summary of why that subtree was safe, and uses those
//! summaries to prune later paths whose remaining exploration is already
//! covered.
//!
//! Note that this library does not execute programs itself, nor does it solve
//! constraints. It is driven by a host symbolic executor, and talks to the
//! host's constraint solver through the [`Solver`] trait.
//!
//! # How it Works
//!
//! From a very high level, pruning is performed as follows:
//!
//! 1. The host mirrors its execution tree in an [`InterpolationTree`],
//!    reporting every instruction that it executes on the current path. The
//!    tree records in a [`dependency::ValueGraph`] which values each value was
//!    computed from, and which memory each pointer may point to.
//! 2. When a branch is infeasible or a memory access is proven to be in bounds,
//!    the values responsible are marked as core. Core values are the ones an
//!    interpolant has to preserve.
//! 3. When a subtree is finished, each of its nodes is summarised as a
//!    [`subsumption::SubsumptionTableEntry`]: the core path constraints and the
//!    core memory contents at the node's program point.
//! 4. Before exploring a node, the host asks the tree whether any entry at the
//!    same program point and call stack covers the node's state. If the
//!    [`Solver`] proves that one does, the node need not be explored.
//!
//! # Basic Usage
//!
//! The host creates a tree, reports each node's instructions and retires each
//! leaf when its path ends. A path reaching a program point that was already
//! explored without learning anything is subsumed immediately.
//!
//! ```
//! use std::time::Duration;
//!
//! use symbolic_interpolation::{
//!     expr::Expr,
//!     ir::{FunctionId, Instruction, InstructionId, InstructionKind},
//!     solver::{Error, SatResult, Solver, Validity},
//!     Config,
//!     InterpolationTree,
//! };
//!
//! struct Unknowing;
//!
//! impl Solver for Unknowing {
//!     fn evaluate(&mut self, _: &[Expr], _: &Expr, _: Duration) -> Result<Validity, Error> {
//!         Ok(Validity::Unknown)
//!     }
//!
//!     fn check_sat(&mut self, _: &[Expr], _: Duration) -> Result<SatResult, Error> {
//!         Ok(SatResult::Unknown("unsupported".into()))
//!     }
//!
//!     fn unsat_core(&self) -> Vec<Expr> {
//!         vec![]
//!     }
//! }
//!
//! let instruction = |id| Instruction::new(InstructionId::new(id), FunctionId::new(0), "main", InstructionKind::Other);
//!
//! let mut tree = InterpolationTree::new(Config::default());
//! let root = tree.root();
//! tree.set_current_node(root, &instruction(1))?;
//! let (left, right) = tree.split(root)?;
//!
//! tree.set_current_node(left, &instruction(2))?;
//! tree.remove(left)?;
//!
//! tree.set_current_node(right, &instruction(2))?;
//! assert!(tree.subsumption_check(&mut Unknowing, None)?);
//! tree.remove(right)?;
//!
//! assert_eq!(tree.statistics().subsumption_successes, 1);
//! # Ok::<(), symbolic_interpolation::Error>(())
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod config;
pub mod constant;
pub mod data;
pub mod dependency;
pub mod error;
pub mod expr;
pub mod ir;
pub mod solver;
pub mod statistics;
pub mod subsumption;
pub mod tree;

// Re-exports to provide the library interface.
pub use config::{Config, OffsetMismatchPolicy};
pub use error::{Error, Result};
pub use solver::Solver;
pub use statistics::Statistics;
pub use tree::{InterpolationTree, NodeId};
