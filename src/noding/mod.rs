//! Noding: finding where lines meet and cutting them into dividers there.

pub mod cutter;
pub mod finder;
pub mod intersector;

pub use cutter::{CutElement, CutEvent, DividerCutter};
pub use finder::{
    graze_kind, GrazeKind, HitPoint, IntersectionData, IntersectionFinder, IntersectionKind,
    IntersectionResult, LineIntersections, SelfHit,
};
pub use intersector::{IntersectReport, LineIntersector};
