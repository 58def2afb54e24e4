//! This module contains the configuration for the interpolation engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constant::{
    DEFAULT_BOUND_INTERPOLATION,
    DEFAULT_EXISTENTIAL_INTERPOLANTS,
    DEFAULT_SUBSUMPTION_TIMEOUT,
};

/// The configuration for the interpolation engine.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Config {
    /// Whether pointer values in stored memory are compared through bounds
    /// checks instead of exact address equalities.
    ///
    /// Bounds checks allow a path to be subsumed by an entry recorded with
    /// different absolute addresses, as long as every access stays within the
    /// bounds that made the recorded subtree safe.
    ///
    /// Defaults to [`DEFAULT_BOUND_INTERPOLATION`].
    pub bound_interpolation: bool,

    /// Whether to force exact address equalities in interpolants even when
    /// `bound_interpolation` is enabled.
    ///
    /// Defaults to `false`.
    pub exact_address_interpolant: bool,

    /// Whether the symbols of an interpolant are renamed to shadow symbols and
    /// existentially quantified.
    ///
    /// Defaults to [`DEFAULT_EXISTENTIAL_INTERPOLANTS`].
    pub existential_interpolants: bool,

    /// What to do when pointer arithmetic produces an address that does not
    /// equal its base plus its offset, or an offset bound that does not exceed
    /// its offset.
    ///
    /// Defaults to [`OffsetMismatchPolicy::Warn`].
    pub offset_mismatch: OffsetMismatchPolicy,

    /// The timeout used for subsumption checks when the caller does not supply
    /// one.
    ///
    /// Defaults to [`DEFAULT_SUBSUMPTION_TIMEOUT`].
    pub subsumption_timeout: Duration,

    /// Nodes whose program point is in a function whose name starts with one
    /// of these prefixes are never stored in the subsumption table.
    ///
    /// Defaults to empty.
    pub untabled_function_prefixes: Vec<String>,

    /// Whether the interpolation tree records a graph of itself that can be
    /// rendered in DOT format.
    ///
    /// Defaults to `false`.
    pub tree_graph: bool,
}

impl Config {
    /// Sets the `bound_interpolation` config parameter to `value`.
    #[must_use]
    pub fn with_bound_interpolation(mut self, value: bool) -> Self {
        self.bound_interpolation = value;
        self
    }

    /// Sets the `exact_address_interpolant` config parameter to `value`.
    #[must_use]
    pub fn with_exact_address_interpolant(mut self, value: bool) -> Self {
        self.exact_address_interpolant = value;
        self
    }

    /// Sets the `existential_interpolants` config parameter to `value`.
    #[must_use]
    pub fn with_existential_interpolants(mut self, value: bool) -> Self {
        self.existential_interpolants = value;
        self
    }

    /// Sets the `offset_mismatch` config parameter to `value`.
    #[must_use]
    pub fn with_offset_mismatch(mut self, value: OffsetMismatchPolicy) -> Self {
        self.offset_mismatch = value;
        self
    }

    /// Sets the `subsumption_timeout` config parameter to `value`.
    #[must_use]
    pub fn with_subsumption_timeout(mut self, value: Duration) -> Self {
        self.subsumption_timeout = value;
        self
    }

    /// Adds `prefix` to the `untabled_function_prefixes` config parameter.
    #[must_use]
    pub fn with_untabled_function_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.untabled_function_prefixes.push(prefix.into());
        self
    }

    /// Sets the `tree_graph` config parameter to `value`.
    #[must_use]
    pub fn with_tree_graph(mut self, value: bool) -> Self {
        self.tree_graph = value;
        self
    }

    /// Checks whether pointer values should be interpolated through their
    /// bounds.
    #[must_use]
    pub fn uses_bounds(&self) -> bool {
        self.bound_interpolation && !self.exact_address_interpolant
    }

    /// Checks whether a node in the function named `function_name` may be
    /// stored in the subsumption table.
    #[must_use]
    pub fn is_tabled_function(&self, function_name: &str) -> bool {
        !self
            .untabled_function_prefixes
            .iter()
            .any(|prefix| function_name.starts_with(prefix.as_str()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bound_interpolation:        DEFAULT_BOUND_INTERPOLATION,
            exact_address_interpolant:  false,
            existential_interpolants:   DEFAULT_EXISTENTIAL_INTERPOLANTS,
            offset_mismatch:            OffsetMismatchPolicy::default(),
            subsumption_timeout:        DEFAULT_SUBSUMPTION_TIMEOUT,
            untabled_function_prefixes: vec![],
            tree_graph:                 false,
        }
    }
}

/// The policy for inconsistent offset arithmetic on memory locations.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum OffsetMismatchPolicy {
    /// Treat the mismatch as a fatal invariant violation.
    Abort,

    /// Repair the location, trusting the offset, and emit a warning.
    #[default]
    Warn,

    /// Repair the location silently.
    Ignore,
}

#[cfg(test)]
mod test {
    use crate::config::{Config, OffsetMismatchPolicy};

    #[test]
    fn bounds_are_disabled_by_exact_addresses() {
        let config = Config::default();
        assert!(config.uses_bounds());
        assert!(!config.clone().with_exact_address_interpolant(true).uses_bounds());
        assert!(!config.with_bound_interpolation(false).uses_bounds());
    }

    #[test]
    fn untabled_functions_match_on_prefix() {
        let config = Config::default()
            .with_untabled_function_prefix("rt_")
            .with_offset_mismatch(OffsetMismatchPolicy::Abort);

        assert!(!config.is_tabled_function("rt_assume"));
        assert!(config.is_tabled_function("main"));
        assert_eq!(config.offset_mismatch, OffsetMismatchPolicy::Abort);
    }
}
