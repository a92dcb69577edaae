//! `rn-io`: persisted network descriptions and lane-graph export.
//!
//! | Module      | Contents                                                     |
//! |-------------|--------------------------------------------------------------|
//! | [`records`] | serde record types of the JSON network description           |
//! | [`loader`]  | `load_json`, `from_reader`, `build_network`, `describe`, `save_json` |
//! | [`export`]  | `write_lane_graph_csv`: one CSV row per lane-graph edge      |
//! | [`error`]   | `IoError`, `IoResult<T>`                                     |
//!
//! # Usage
//!
//! ```rust,ignore
//! use rn_io::{load_json, write_lane_graph_csv};
//!
//! let mut net = load_json(Path::new("network.json"))?;
//! net.rebuild()?;
//! write_lane_graph_csv(&net, Path::new("lanes.csv"))?;
//! ```

pub mod error;
pub mod export;
pub mod loader;
pub mod records;


pub use error::{IoError, IoResult};
pub use export::{write_lane_graph, write_lane_graph_csv};
pub use loader::{build_network, describe, from_reader, link_from_record, load_json, save_json};
pub use records::{
    CrossSectionElementRecord, CrossSectionRecord, LinkRecord, MarkerTemplateRecord, NetworkDescription,
    NodeRecord, RoadMarkerRecord, TypologyRecord, VertexRecord,
};
