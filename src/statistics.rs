//! This module contains the counters and timers of an interpolation tree.

use std::{
    fmt::{Display, Formatter},
    time::Duration,
};

use serde::Serialize;

/// The counters and accumulated timings of one [`crate::tree::InterpolationTree`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Statistics {
    /// The number of nodes created, including the root.
    pub nodes_created: usize,

    /// The number of splits performed.
    pub splits: usize,

    /// The number of nodes retired.
    pub retirements: usize,

    /// The number of instructions executed across all paths.
    pub instructions: usize,

    /// The number of subsumption checks performed.
    pub subsumption_checks: usize,

    /// The number of subsumption checks that succeeded.
    pub subsumption_successes: usize,

    /// The number of solver queries issued by subsumption checks.
    pub solver_calls: usize,

    /// The number of solver queries that failed or timed out.
    pub solver_failures: usize,

    /// The number of entries inserted into the subsumption table.
    pub entries_inserted: usize,

    /// The number of distinct program points with table entries.
    pub program_points: usize,

    /// Accumulated wall time per operation.
    pub time: Timings,
}

/// Accumulated wall time per operation class.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Timings {
    pub execute:             Duration,
    pub split:               Duration,
    pub remove:              Duration,
    pub subsumption_check:   Duration,
    pub solver:              Duration,
    pub mark_path_condition: Duration,
}

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the fraction of subsumption checks that succeeded, in percent.
    #[must_use]
    pub fn subsumption_rate(&self) -> f64 {
        if self.subsumption_checks == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.subsumption_successes as f64 / self.subsumption_checks as f64;
        rate * 100.0
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Nodes created = {}", self.nodes_created)?;
        writeln!(f, "Splits = {}", self.splits)?;
        writeln!(f, "Nodes retired = {}", self.retirements)?;
        writeln!(f, "Instructions executed = {}", self.instructions)?;
        writeln!(
            f,
            "Subsumption checks (succeeded) = {} ({}, {:.2}%)",
            self.subsumption_checks,
            self.subsumption_successes,
            self.subsumption_rate()
        )?;
        writeln!(
            f,
            "Solver calls for subsumption checks (failed) = {} ({})",
            self.solver_calls, self.solver_failures
        )?;
        writeln!(f, "Table entries = {}", self.entries_inserted)?;
        writeln!(f, "Program points with entries = {}", self.program_points)?;
        write!(f, "{}", self.time)
    }
}

impl Display for Timings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rows = [
            ("execute", self.execute),
            ("split", self.split),
            ("remove", self.remove),
            ("subsumption check", self.subsumption_check),
            ("solver", self.solver),
            ("mark path condition", self.mark_path_condition),
        ];
        for (name, time) in rows {
            writeln!(f, "Time for {name} (ms) = {:.2}", time.as_secs_f64() * 1000.0)?;
        }
        Ok(())
    }
}
