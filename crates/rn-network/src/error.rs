//! Network-subsystem error type.

use thiserror::Error;

use rn_core::{LinkId, NodeId};

/// Errors produced by `rn-network`.
///
/// Everything here is a configuration error in the sense that retrying the
/// same call cannot succeed; the caller has to fix the network description.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    #[error("link name {0:?} already exists in the network")]
    DuplicateLinkName(String),

    #[error("invalid link name {0:?}: expected [a-zA-Z_][a-zA-Z_0-9]*")]
    InvalidLinkName(String),

    #[error("link {link:?} has no {end} node")]
    MissingEndpoint { link: String, end: &'static str },

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("node {0} already exists in network")]
    DuplicateNode(NodeId),

    #[error("node id {0} is reserved")]
    InvalidNodeId(NodeId),

    #[error("no link ids left")]
    LinkIdsExhausted,

    #[error("link {0} not found in network")]
    LinkNotFound(LinkId),

    #[error("node {node} still has {links} incident link(s)")]
    NodeInUse { node: NodeId, links: usize },

    #[error("link {link:?}: cross-section element {section}/{element} has no typology name")]
    UnnamedTypology { link: String, section: usize, element: usize },

    #[error("link {link:?}: undefined cross-section element typology {name:?}")]
    UnknownTypology { link: String, name: String },

    #[error("link {link:?}: no road marker template for road marker type {kind:?}")]
    UnknownMarker { link: String, kind: String },

    #[error("link {link:?}: road marker template {kind:?} has no width")]
    MarkerWidthUnset { link: String, kind: String },

    #[error(
        "link {link:?}: element {section}/{element} has neighbor index {neighbor} \
         but the next cross-section has only {available} element(s)"
    )]
    NeighborOutOfRange {
        link:      String,
        section:   usize,
        element:   usize,
        neighbor:  usize,
        available: usize,
    },

    #[error("invalid speed limit {0:?}: expected a number between 5 and 200 km/h")]
    InvalidSpeedLimit(String),

    #[error("invalid lane connection at node {node}: {reason}")]
    InvalidConnection { node: NodeId, reason: String },
}

pub type NetworkResult<T> = Result<T, NetworkError>;
