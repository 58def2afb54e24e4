//! This module contains the interface through which the engine talks to the
//! host's constraint solver.
//!
//! The engine never decides satisfiability itself beyond constant folding. It
//! asks the solver whether a subsumption query is valid under a state's path
//! constraints, and afterwards asks it for the unsat core that justified the
//! answer.

use std::time::Duration;

pub use crate::error::solver::Error;
use crate::expr::Expr;

/// The answer to a validity query.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Validity {
    /// The query holds in every model of the constraints.
    True,

    /// The negation of the query holds in every model of the constraints.
    False,

    /// Neither, or the solver could not tell.
    Unknown,
}

/// Result of a satisfiability check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

/// Abstract constraint solver interface.
pub trait Solver {
    /// Decides the validity of `query` under `constraints`, giving up after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// If the solver fails or times out.
    fn evaluate(
        &mut self,
        constraints: &[Expr],
        query: &Expr,
        timeout: Duration,
    ) -> Result<Validity, Error>;

    /// Checks whether the conjunction of `constraints` is satisfiable.
    ///
    /// # Errors
    ///
    /// If the solver fails or times out.
    fn check_sat(&mut self, constraints: &[Expr], timeout: Duration) -> Result<SatResult, Error>;

    /// Gets the constraints that made the most recent successful validity query
    /// hold.
    fn unsat_core(&self) -> Vec<Expr>;

    /// Checks whether `query` must hold under `constraints`.
    ///
    /// # Errors
    ///
    /// If the solver fails or times out.
    fn must_be_true(
        &mut self,
        constraints: &[Expr],
        query: &Expr,
        timeout: Duration,
    ) -> Result<bool, Error> {
        Ok(self.evaluate(constraints, query, timeout)? == Validity::True)
    }

    /// Checks whether `query` may hold under `constraints`.
    ///
    /// # Errors
    ///
    /// If the solver fails or times out.
    fn may_be_true(
        &mut self,
        constraints: &[Expr],
        query: &Expr,
        timeout: Duration,
    ) -> Result<bool, Error> {
        Ok(self.evaluate(constraints, query, timeout)? != Validity::False)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::time::Duration;

    use crate::{
        expr::Expr,
        solver::{Error, SatResult, Solver, Validity},
    };

    /// A solver that replays a fixed answer and records what it was asked.
    #[derive(Debug)]
    pub struct MockSolver {
        pub validity:   Result<Validity, Error>,
        pub sat:        SatResult,
        pub core:       Vec<Expr>,
        pub queries:    Vec<Expr>,
        pub sat_checks: usize,
    }

    impl MockSolver {
        pub fn answering(validity: Validity) -> Self {
            Self {
                validity:   Ok(validity),
                sat:        SatResult::Unknown("unscripted".into()),
                core:       vec![],
                queries:    vec![],
                sat_checks: 0,
            }
        }

        pub fn failing(error: Error) -> Self {
            let mut solver = Self::answering(Validity::Unknown);
            solver.validity = Err(error);
            solver
        }
    }

    impl Solver for MockSolver {
        fn evaluate(
            &mut self,
            _constraints: &[Expr],
            query: &Expr,
            _timeout: Duration,
        ) -> Result<Validity, Error> {
            self.queries.push(query.clone());
            self.validity.clone()
        }

        fn check_sat(
            &mut self,
            _constraints: &[Expr],
            _timeout: Duration,
        ) -> Result<SatResult, Error> {
            self.sat_checks += 1;
            Ok(self.sat.clone())
        }

        fn unsat_core(&self) -> Vec<Expr> {
            self.core.clone()
        }
    }

    #[test]
    fn defaulted_queries_follow_validity() -> anyhow::Result<()> {
        let mut solver = MockSolver::answering(Validity::Unknown);
        let query = Expr::true_();
        let timeout = Duration::from_secs(1);

        assert!(!solver.must_be_true(&[], &query, timeout)?);
        assert!(solver.may_be_true(&[], &query, timeout)?);

        solver.validity = Ok(Validity::False);
        assert!(!solver.may_be_true(&[], &query, timeout)?);
        assert_eq!(solver.queries.len(), 3);

        Ok(())
    }
}
