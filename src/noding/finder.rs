use std::ops::ControlFlow;

use geo_types::Coord;
use smallvec::SmallVec;

use crate::error::Result;
use crate::geometry::{grow, intersect_curves, self_intersections, Curve, CurveHit};
use crate::index::{IndexedItem, KindMask};
use crate::map::TopologyMap;
use crate::model::{Divider, DividerId, LineId, TerminalId};
use crate::utils::parallel;

/// Where a coincident stretch lies on the candidate divider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrazeKind {
    /// Covers the whole candidate.
    Total,
    /// Begins at the candidate's start terminal.
    Start,
    /// Strictly inside the candidate.
    Interior,
    /// Ends at the candidate's end terminal.
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntersectionKind {
    Simple,
    /// Lands on a terminal or on an end of either curve.
    Vertex,
    Graze(GrazeKind),
}

/// A hit position, collapsed onto an existing terminal when one lies within
/// tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitPoint {
    pub position: Coord<f64>,
    pub terminal: Option<TerminalId>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionData {
    pub kind: IntersectionKind,
    /// Distances along the source; equal for point hits.
    pub source: (f64, f64),
    /// Distances along the candidate matching `source.0` and `source.1`.
    pub other: (f64, f64),
    pub at: (HitPoint, HitPoint),
}

impl IntersectionData {
    pub fn is_graze(&self) -> bool {
        matches!(self.kind, IntersectionKind::Graze(_))
    }
}

/// Everything found between the source and one candidate divider.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionResult {
    pub divider: DividerId,
    pub line: LineId,
    pub data: SmallVec<[IntersectionData; 2]>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelfHit {
    pub at: HitPoint,
    pub first: f64,
    pub second: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineIntersections {
    pub results: Vec<IntersectionResult>,
    pub self_hits: Vec<SelfHit>,
}

impl LineIntersections {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.self_hits.is_empty()
    }
}

/// Read-only search for everything a curve crosses or grazes.
pub struct IntersectionFinder<'a> {
    map: &'a TopologyMap,
    tolerance: f64,
}

impl<'a> IntersectionFinder<'a> {
    pub fn new(map: &'a TopologyMap) -> Self {
        Self {
            map,
            tolerance: map.config.length_tolerance,
        }
    }

    /// Intersections of a whole line with the current dividers of every
    /// other topological line, plus its own self-crossings.
    pub fn find_for_line(&self, line: LineId) -> Result<LineIntersections> {
        let feature = self.map.line_ref(line)?;
        let results = self.find(&feature.curve, line);
        let self_hits = self_intersections(&feature.curve, self.tolerance)
            .into_iter()
            .map(|(position, first, second)| SelfHit {
                at: self.hit_point(position),
                first,
                second,
            })
            .collect();
        let found = LineIntersections { results, self_hits };
        log::trace!(
            "line {:?}: {} candidate hit(s), {} self-crossing(s)",
            line,
            found.results.len(),
            found.self_hits.len()
        );
        Ok(found)
    }

    /// Intersections of a single divider with the dividers of other lines.
    pub fn find_for_divider(&self, divider: DividerId) -> Result<Vec<IntersectionResult>> {
        let source = self.map.divider_ref(divider)?;
        Ok(self.find(&source.curve, source.line))
    }

    fn find(&self, source: &Curve, exclude: LineId) -> Vec<IntersectionResult> {
        let window = grow(source.window(), self.tolerance);
        let mut candidates: Vec<DividerId> = Vec::new();
        self.map
            .index
            .query_window(Some(window), KindMask::DIVIDERS, |item| {
                if let IndexedItem::Divider(d) = item {
                    if self.is_candidate(d, exclude) {
                        candidates.push(d);
                    }
                }
                ControlFlow::Continue(())
            });
        candidates.sort();
        parallel::filter_map_collect(
            &candidates,
            self.map.config.parallel_threshold,
            |d| self.intersect_divider(source, *d),
        )
    }

    fn is_candidate(&self, d: DividerId, exclude: LineId) -> bool {
        let Some(divider) = self.map.dividers.get(d) else {
            return false;
        };
        divider.line != exclude
            && !divider.is_overlap()
            && self
                .map
                .lines
                .get(divider.line)
                .map_or(false, |l| l.topological)
    }

    fn intersect_divider(&self, source: &Curve, d: DividerId) -> Option<IntersectionResult> {
        let divider = self.map.dividers.get(d)?;
        let hits = intersect_curves(source, &divider.curve, self.tolerance);
        if hits.is_empty() {
            return None;
        }
        let source_length = source.length();
        let data = hits
            .iter()
            .map(|hit| self.classify(hit, source_length, divider))
            .collect();
        Some(IntersectionResult {
            divider: d,
            line: divider.line,
            data,
        })
    }

    fn classify(&self, hit: &CurveHit, source_length: f64, divider: &Divider) -> IntersectionData {
        match *hit {
            CurveHit::Crossing {
                position,
                along_a,
                along_b,
            } => {
                let at = self.hit_point(position);
                let at_end = |along: f64, length: f64| {
                    along <= self.tolerance || along >= length - self.tolerance
                };
                let kind = if at.terminal.is_some()
                    || at_end(along_a, source_length)
                    || at_end(along_b, divider.curve.length())
                {
                    IntersectionKind::Vertex
                } else {
                    IntersectionKind::Simple
                };
                IntersectionData {
                    kind,
                    source: (along_a, along_a),
                    other: (along_b, along_b),
                    at: (at, at),
                }
            }
            CurveHit::Overlap {
                start,
                end,
                along_a,
                along_b,
            } => IntersectionData {
                kind: IntersectionKind::Graze(graze_kind(
                    along_b,
                    divider.curve.length(),
                    self.tolerance,
                )),
                source: along_a,
                other: along_b,
                at: (self.hit_point(start), self.hit_point(end)),
            },
        }
    }

    fn hit_point(&self, position: Coord<f64>) -> HitPoint {
        match self.map.index.find_terminal(position, self.tolerance) {
            Some(t) => HitPoint {
                position: self.map.terminals[t].position,
                terminal: Some(t),
            },
            None => HitPoint {
                position,
                terminal: None,
            },
        }
    }
}

/// Classifies a coincident stretch `(b0, b1)` of a candidate of the given
/// length. A stretch touching an end is never interior.
pub fn graze_kind(other: (f64, f64), length: f64, tolerance: f64) -> GrazeKind {
    let lo = other.0.min(other.1);
    let hi = other.0.max(other.1);
    match (lo <= tolerance, hi >= length - tolerance) {
        (true, true) => GrazeKind::Total,
        (true, false) => GrazeKind::Start,
        (false, true) => GrazeKind::End,
        (false, false) => GrazeKind::Interior,
    }
}
