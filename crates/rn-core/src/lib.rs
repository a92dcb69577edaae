//! `rn-core`: foundational types for the `rn` road network workspace.
//!
//! This crate is a dependency of every other `rn-*` crate.  It has no
//! `rn-*` dependencies and no mandatory external ones (only optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                      |
//! |------------|---------------------------------------------------------------|
//! | [`ids`]    | `NodeId`, `LinkId`                                            |
//! | [`geom`]   | `Vertex`, `Circle`, segment and polyline functions            |
//! | [`config`] | `RebuildConfig`, `FailurePolicy`                              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod geom;
pub mod ids;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{FailurePolicy, RebuildConfig};
pub use geom::{Circle, Vertex};
pub use ids::{LinkId, NodeId};
