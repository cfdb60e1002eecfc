//! Incremental topology for parcel maps.
//!
//! Lines (segments, polylines, circular arcs) are cut into dividers where
//! they meet, and the dividers are traced into polygons and islands. Edits
//! mark lines as moved; `TopologyMap::settle` re-cuts only what they touch
//! and rebuilds only the rings around it.

pub mod config;
pub mod error;
pub mod geojson_io;
pub mod geometry;
pub mod graph;
pub mod index;
pub mod map;
pub mod model;
pub mod noding;
pub mod shared;
pub mod utils;
pub mod wasm;

pub use config::TopologyConfig;
pub use error::{RejectReason, Result, TopologyError};
pub use geometry::{Curve, LineShape};
pub use graph::BuildReport;
pub use map::{SettleReport, TopologyMap};
pub use model::{
    Divider, DividerId, DividerKind, Face, Label, LabelId, LineFeature, LineId, Ring, RingId,
    Side, Terminal, TerminalId, TerminalOrigin,
};
pub use noding::IntersectReport;
pub use shared::SharedTopology;
