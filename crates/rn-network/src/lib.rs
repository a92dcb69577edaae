//! `rn-network`: road network model and lane-graph builder.
//!
//! A network is a set of [`Node`]s joined by directed [`Link`]s.  The road
//! surface of a Link is described by [`CrossSection`]s: ordered, left to
//! right lists of [`CrossSectionElement`]s (lanes, shoulders, medians) with
//! longitudinal road markers.  [`Network::rebuild`] turns that description
//! into a lane graph: [`Lane`]s with centre lines and `down`/`up` edges,
//! within Links, across simple Nodes, and through junctions via a
//! [`JunctionExpander`].
//!
//! # Crate layout
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`network`]     | `Network` (ownership, editing, rebuild), `RebuildReport`   |
//! | [`node`]        | `Node`                                                     |
//! | [`link`]        | `Link`, `LinkBuilder`, `LinkState`                         |
//! | [`section`]     | `CrossSection`, `CrossSectionElement`, `RoadMarkerAlong`   |
//! | [`lane`]        | `Lane`, `LaneRef`, `LaneKey` and the other keys            |
//! | [`registry`]    | `Typology`, `MarkerTemplate` and their registries          |
//! | [`design_line`] | raw and trimmed design lines                               |
//! | [`synthesis`]   | typology binding, marker geometry, lane synthesis          |
//! | [`continuity`]  | lane pairing between successive cross-sections             |
//! | [`junction`]    | `JunctionExpander` trait and implementations               |
//! | [`validate`]    | link-name and speed-limit validation                       |
//! | [`error`]       | `NetworkError`, `NetworkResult<T>`                         |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                        |
//! |------------|---------------------------------------------------------------|
//! | `parallel` | Runs the per-Link rebuild phase on Rayon.                     |

pub mod continuity;
pub mod design_line;
pub mod error;
pub mod junction;
pub mod lane;
pub mod link;
pub mod network;
pub mod node;
pub mod registry;
pub mod section;
pub mod synthesis;
pub mod validate;

#[cfg(test)]
mod tests;

pub use error::{NetworkError, NetworkResult};
pub use junction::{
    JunctionContext, JunctionExpander, LaneAssignment, LaneAssignmentExpander, LaneConnection,
    NoopJunctionExpander,
};
pub use lane::{ElementKey, Lane, LaneKey, LaneOwner, LaneRef, SectionKey};
pub use link::{Link, LinkBuilder, LinkState};
pub use network::{Network, RebuildReport};
pub use node::Node;
pub use registry::{MarkerTemplate, MarkerTemplateRegistry, Registries, Typology, TypologyRegistry};
pub use section::{CrossSection, CrossSectionElement, RoadMarkerAlong};
pub use validate::{parse_speed_limit, validate_link_name};
