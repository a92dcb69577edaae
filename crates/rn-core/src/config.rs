//! Rebuild configuration.

/// What the network rebuild does when a Link fails to bind (unknown
/// typology, unknown marker template, bad neighbor index, …).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// Stop at the first failure, discard every synthesized Lane in the
    /// network and return the error.  Nothing is left half-linked.
    #[default]
    Abort,
    /// Strip the failing Link of its Lanes, report it, and keep going with
    /// the others.  Nodes touching a failed Link are not connected.
    IsolateLink,
}

/// Tunables for the network rebuild (`rn_network::Network::rebuild`).
///
/// Typically built in code or loaded from the JSON network description by
/// the `rn-io` crate.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RebuildConfig {
    /// A trimming point closer than this (metres) to an existing design-line
    /// vertex replaces that vertex instead of being inserted next to it.
    pub snap_tolerance: f64,

    /// Speed limit (km/h) given to Links created without one.
    pub default_max_speed: f64,

    pub failure_policy: FailurePolicy,

    /// Link Lanes across simple Nodes and hand other Nodes to the junction
    /// expander.  Disable to inspect the per-Link lane sets on their own.
    pub connect_at_nodes: bool,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 1e-4,
            default_max_speed: 70.0,
            failure_policy: FailurePolicy::Abort,
            connect_at_nodes: true,
        }
    }
}
