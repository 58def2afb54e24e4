//! This module contains constants that are needed throughout the codebase.

use std::time::Duration;

/// The default timeout for the solver queries issued by a subsumption check.
pub const DEFAULT_SUBSUMPTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether pointer values are compared through bounds checks rather than exact
/// addresses by default.
pub const DEFAULT_BOUND_INTERPOLATION: bool = true;

/// Whether interpolants are existentially quantified over shadow variables by
/// default.
pub const DEFAULT_EXISTENTIAL_INTERPOLANTS: bool = true;

/// The width in bits of addresses and offsets in the host program.
pub const POINTER_WIDTH_BITS: u32 = crate::expr::POINTER_WIDTH;

/// The reason recorded on values that are marked as core because of a memory
/// access whose bounds check succeeded.
pub const BOUNDS_CHECK_REASON: &str = "pointer use";

/// The reason recorded on values that are marked as core because a branch
/// condition was part of an unsat core.
pub const PATH_CONDITION_REASON: &str = "path condition";

/// The reason recorded on values that are marked as core because a pointer
/// contributed a bound to a successful subsumption check.
pub const SUBSUMPTION_POINTER_REASON: &str = "pointer bound in subsumption";
