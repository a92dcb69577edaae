//! Persisted record types.
//!
//! A network description is one JSON document:
//!
//! ```json
//! {
//!   "config": { "snapTolerance": 0.0001, "failurePolicy": "Abort" },
//!   "typologies": [ { "name": "road", "drivable": true } ],
//!   "markerTemplates": [ { "type": "|", "width": 0.1 } ],
//!   "nodes": [ { "id": 1, "name": "a", "x": 0.0, "y": 0.0, "radius": 8.0 } ],
//!   "links": [ {
//!     "name": "main", "fromNode": 1, "toNode": 2, "distance": 100.0,
//!     "intermediatePoint": [ { "x": 50.0, "y": 5.0 } ],
//!     "crossSections": [ {
//!       "longitudinalPosition": 0.0,
//!       "elements": [ {
//!         "typology": "road", "width": 3.2, "neighbor": 0,
//!         "markers": [ { "type": "|", "lateral": 0.1 }, { "type": "|", "lateral": 3.1 } ]
//!       } ]
//!     } ]
//!   } ]
//! }
//! ```
//!
//! Every field except the identifying ones has a default, so hand-written
//! files can stay short.  `fromNode`/`toNode` are optional here only so that
//! a missing endpoint is reported with the name of the Link record instead
//! of as a generic parse error.

use serde::{Deserialize, Serialize};

use rn_core::RebuildConfig;

/// Neighbor value meaning "no counterpart in the next cross-section".
pub const NO_NEIGHBOR: i64 = -1;

fn no_neighbor() -> i64 {
    NO_NEIGHBOR
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config:           Option<RebuildConfig>,
    #[serde(default)]
    pub typologies:       Vec<TypologyRecord>,
    #[serde(default)]
    pub marker_templates: Vec<MarkerTemplateRecord>,
    #[serde(default)]
    pub nodes:            Vec<NodeRecord>,
    #[serde(default)]
    pub links:            Vec<LinkRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypologyRecord {
    pub name:     String,
    pub drivable: bool,
    /// Rendering class; defaults to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class:    Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerTemplateRecord {
    #[serde(rename = "type")]
    pub kind:  String,
    /// Stripe width in metres.  A template without a width can be loaded,
    /// but any Link using it fails to rebuild.
    #[serde(default)]
    pub width: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id:     u32,
    #[serde(default)]
    pub name:   String,
    pub x:      f64,
    pub y:      f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z:      Option<f64>,
    /// Footprint radius in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub name:                String,
    #[serde(default)]
    pub from_node:           Option<u32>,
    #[serde(default)]
    pub to_node:             Option<u32>,
    /// Stored length in metres; computed from the geometry when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance:            Option<f64>,
    #[serde(default)]
    pub priority:            bool,
    /// km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed:           Option<f64>,
    #[serde(default, rename = "intermediatePoint")]
    pub intermediate_points: Vec<VertexRecord>,
    #[serde(default)]
    pub cross_sections:      Vec<CrossSectionRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSectionRecord {
    pub longitudinal_position: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub lateral_offset:        f64,
    #[serde(default)]
    pub elements:              Vec<CrossSectionElementRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSectionElementRecord {
    #[serde(default)]
    pub typology: Option<String>,
    pub width:    f64,
    /// Index of the counterpart element in the next cross-section, or
    /// [`NO_NEIGHBOR`].
    #[serde(default = "no_neighbor")]
    pub neighbor: i64,
    #[serde(default)]
    pub markers:  Vec<RoadMarkerRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadMarkerRecord {
    #[serde(rename = "type")]
    pub kind:    String,
    /// Offset from the left edge of the element, metres.
    pub lateral: f64,
}
