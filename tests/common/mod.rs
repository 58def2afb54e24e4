//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use std::time::Duration;

use symbolic_interpolation::{
    expr::{Array, Expr},
    ir::{ConstantId, FunctionId, Instruction, InstructionId, InstructionKind, Value},
    solver::{Error, SatResult, Solver, Validity},
};

/// A solver that gives the same scripted answers to every query, and records
/// the queries it was asked.
#[derive(Debug)]
pub struct ScriptedSolver {
    pub validity: Validity,
    pub sat:      SatResult,
    pub core:     Vec<Expr>,
    pub queries:  Vec<Expr>,
}

impl ScriptedSolver {
    /// Constructs a solver that answers every validity query with `validity`
    /// and every satisfiability query with `sat`.
    #[allow(unused)] // It is actually
    pub fn new(validity: Validity, sat: SatResult) -> Self {
        Self {
            validity,
            sat,
            core: vec![],
            queries: vec![],
        }
    }

    /// Constructs a solver that can never decide anything.
    #[allow(unused)] // It is actually
    pub fn unknowing() -> Self {
        Self::new(Validity::Unknown, SatResult::Unknown("scripted".into()))
    }
}

impl Solver for ScriptedSolver {
    fn evaluate(&mut self, _constraints: &[Expr], query: &Expr, _timeout: Duration) -> Result<Validity, Error> {
        self.queries.push(query.clone());
        Ok(self.validity)
    }

    fn check_sat(&mut self, constraints: &[Expr], _timeout: Duration) -> Result<SatResult, Error> {
        self.queries.extend(constraints.iter().cloned());
        Ok(self.sat.clone())
    }

    fn unsat_core(&self) -> Vec<Expr> {
        self.core.clone()
    }
}

/// Constructs the instruction `%id` of the function `main`.
#[allow(unused)] // It is actually
pub fn instr(id: u32, kind: InstructionKind) -> Instruction {
    Instruction::new(InstructionId::new(id), FunctionId::new(0), "main", kind)
}

/// Gets the value produced by the instruction `%id`.
#[allow(unused)] // It is actually
pub fn val(id: u32) -> Value {
    Value::Instruction(InstructionId::new(id))
}

#[allow(unused)] // It is actually
pub fn constant(id: u32) -> Value {
    Value::Constant(ConstantId::new(id))
}

/// Gets the `index`th argument of `main`.
#[allow(unused)] // It is actually
pub fn argument(index: u32) -> Value {
    Value::Argument {
        function: FunctionId::new(0),
        index,
    }
}

/// Constructs a 32-bit symbolic variable named `name`.
#[allow(unused)] // It is actually
pub fn var(name: &str) -> Expr {
    Expr::read(Array::new(name), 32)
}

#[allow(unused)] // It is actually
pub fn int(value: u64) -> Expr {
    Expr::constant(value, 32)
}
