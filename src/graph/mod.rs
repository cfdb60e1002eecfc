//! Face assembly over the divider graph.

pub mod adjacency;
pub mod builder;
pub mod islands;

pub use builder::{BuildReport, PolygonBuilder};
