//! Junction-expansion extension point.
//!
//! Nodes with one entering and one leaving Link are linked by the network
//! itself.  Every other Node is handed to a [`JunctionExpander`], which
//! decides which approach Lane feeds which exit Lane.  The network validates
//! the answer and joins each pair through its own connecting Lane, so every
//! connecting Lane ends up with exactly one down Lane.
//!
//! Geometric heuristics that derive a turn matrix from leg angles and lane
//! counts belong in an implementation of this trait, not in the network.

use std::collections::BTreeMap;

use rn_core::{LinkId, NodeId};

use crate::lane::LaneKey;
use crate::link::Link;
use crate::network::Network;
use crate::node::Node;
use crate::{NetworkError, NetworkResult};

/// One approach Lane joined to one exit Lane across a Node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LaneConnection {
    /// A Lane in the last CrossSection of a Link entering the Node.
    pub from: LaneKey,
    /// A Lane in the first CrossSection of a Link leaving the Node.
    pub to:   LaneKey,
}

/// Read-only view of one Node and its legs, handed to an expander.
pub struct JunctionContext<'a> {
    network: &'a Network,
    node:    &'a Node,
}

impl<'a> JunctionContext<'a> {
    pub(crate) fn new(network: &'a Network, node: &'a Node) -> Self {
        Self { network, node }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn network(&self) -> &'a Network {
        self.network
    }

    pub fn entering(&self) -> impl Iterator<Item = &'a Link> + 'a {
        let network = self.network;
        self.node.entering().iter().filter_map(move |&id| network.link(id))
    }

    pub fn leaving(&self) -> impl Iterator<Item = &'a Link> + 'a {
        let network = self.network;
        self.node.leaving().iter().filter_map(move |&id| network.link(id))
    }

    /// Lanes of the last CrossSection of `link`, left to right.
    pub fn approach_lanes(&self, link: LinkId) -> Vec<LaneKey> {
        self.network
            .link(link)
            .and_then(|l| {
                let last = l.cross_sections().len().checked_sub(1)?;
                Some(l.cross_sections()[last].lane_keys(last))
            })
            .unwrap_or_default()
    }

    /// Lanes of the first CrossSection of `link`, left to right.
    pub fn exit_lanes(&self, link: LinkId) -> Vec<LaneKey> {
        self.network
            .link(link)
            .and_then(|l| l.cross_section_at_node(false).map(|cs| cs.lane_keys(0)))
            .unwrap_or_default()
    }
}

/// Decides the Lane connections at a Node that is not simple.
pub trait JunctionExpander {
    /// Return the connections for `ctx.node()`, or `None` to leave the Node
    /// unexpanded (its Links then stay in `LinkState::LinkedWithinLink`).
    fn expand(&self, ctx: &JunctionContext<'_>) -> NetworkResult<Option<Vec<LaneConnection>>>;
}

/// Leaves every junction unexpanded.
pub struct NoopJunctionExpander;

impl JunctionExpander for NoopJunctionExpander {
    fn expand(&self, _ctx: &JunctionContext<'_>) -> NetworkResult<Option<Vec<LaneConnection>>> {
        Ok(None)
    }
}

// ── LaneAssignmentExpander ────────────────────────────────────────────────────

/// One row of a turn/lane-assignment table.  Lane numbers count the Lanes
/// of the approach (or exit) CrossSection from the left, starting at 0.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LaneAssignment {
    pub from_link: LinkId,
    pub from_lane: usize,
    pub to_link:   LinkId,
    pub to_lane:   usize,
}

/// Expands Nodes from an explicit lane-assignment table.
///
/// Nodes without an entry are left unexpanded.
#[derive(Clone, Debug, Default)]
pub struct LaneAssignmentExpander {
    by_node: BTreeMap<NodeId, Vec<LaneAssignment>>,
}

impl LaneAssignmentExpander {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, node: NodeId, assignment: LaneAssignment) -> &mut Self {
        self.by_node.entry(node).or_default().push(assignment);
        self
    }

    pub fn assignments(&self, node: NodeId) -> &[LaneAssignment] {
        self.by_node.get(&node).map(Vec::as_slice).unwrap_or_default()
    }
}

impl JunctionExpander for LaneAssignmentExpander {
    fn expand(&self, ctx: &JunctionContext<'_>) -> NetworkResult<Option<Vec<LaneConnection>>> {
        let node = ctx.node().id();
        let Some(rows) = self.by_node.get(&node) else {
            return Ok(None);
        };

        rows.iter()
            .map(|a| {
                let from = ctx.approach_lanes(a.from_link).get(a.from_lane).copied().ok_or_else(|| {
                    NetworkError::InvalidConnection {
                        node,
                        reason: format!("{} has no approach lane {}", a.from_link, a.from_lane),
                    }
                })?;
                let to = ctx.exit_lanes(a.to_link).get(a.to_lane).copied().ok_or_else(|| {
                    NetworkError::InvalidConnection {
                        node,
                        reason: format!("{} has no exit lane {}", a.to_link, a.to_lane),
                    }
                })?;
                Ok(LaneConnection { from, to })
            })
            .collect::<NetworkResult<Vec<_>>>()
            .map(Some)
    }
}
