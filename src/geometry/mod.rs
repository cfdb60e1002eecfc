//! Curve primitives used by line features and dividers.
//!
//! Every curve is parametrised by distance along it from its start, which is
//! the common currency of the finder and the cutter.

pub mod arc;
pub mod intersection;

pub use arc::CircularArc;
pub use intersection::{intersect_curves, self_intersections, CurveHit};

use geo_types::{Coord, Line, LineString, Rect};
use smallvec::SmallVec;

use crate::error::{RejectReason, Result};
use arc::{distance, normalize_angle};

/// How a line runs between its two end points.
#[derive(Clone, Debug, PartialEq)]
pub enum LineShape {
    Segment,
    /// Interior vertices, in order from the start point.
    MultiSegment(Vec<Coord<f64>>),
    Arc {
        center: Coord<f64>,
        clockwise: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Curve {
    Segment(Line<f64>),
    MultiSegment(LineString<f64>),
    Arc(CircularArc),
}

/// One analytic piece of a curve, with its distance from the curve start.
#[derive(Clone, Copy, Debug)]
pub enum Piece {
    Segment { line: Line<f64>, offset: f64 },
    Arc { arc: CircularArc, offset: f64 },
}

impl Piece {
    pub fn offset(&self) -> f64 {
        match self {
            Piece::Segment { offset, .. } | Piece::Arc { offset, .. } => *offset,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Piece::Segment { line, .. } => segment_length(line),
            Piece::Arc { arc, .. } => arc.length(),
        }
    }

    pub fn start(&self) -> Coord<f64> {
        match self {
            Piece::Segment { line, .. } => line.start,
            Piece::Arc { arc, .. } => arc.start,
        }
    }

    pub fn end(&self) -> Coord<f64> {
        match self {
            Piece::Segment { line, .. } => line.end,
            Piece::Arc { arc, .. } => arc.end,
        }
    }

    /// Closest point: `(local along, distance)`.
    pub fn project(&self, p: Coord<f64>) -> (f64, f64) {
        match self {
            Piece::Segment { line, .. } => project_on_segment(line, p),
            Piece::Arc { arc, .. } => arc.project(p),
        }
    }
}

impl Curve {
    pub fn from_shape(start: Coord<f64>, end: Coord<f64>, shape: &LineShape) -> Result<Curve> {
        match shape {
            LineShape::Segment => Ok(Curve::Segment(Line::new(start, end))),
            LineShape::MultiSegment(vertices) => {
                if vertices.is_empty() {
                    return Ok(Curve::Segment(Line::new(start, end)));
                }
                let mut coords = Vec::with_capacity(vertices.len() + 2);
                coords.push(start);
                coords.extend(vertices.iter().copied());
                coords.push(end);
                Ok(Curve::MultiSegment(LineString::new(coords)))
            }
            LineShape::Arc { center, clockwise } => {
                if distance(*center, start) <= 0.0 {
                    return Err(RejectReason::InvalidShape(
                        "arc centre coincides with its start point".into(),
                    )
                    .into());
                }
                Ok(Curve::Arc(CircularArc::from_endpoints(
                    *center, start, end, *clockwise,
                )))
            }
        }
    }

    pub fn start(&self) -> Coord<f64> {
        match self {
            Curve::Segment(line) => line.start,
            Curve::MultiSegment(ls) => ls.0[0],
            Curve::Arc(arc) => arc.start,
        }
    }

    pub fn end(&self) -> Coord<f64> {
        match self {
            Curve::Segment(line) => line.end,
            Curve::MultiSegment(ls) => ls.0[ls.0.len() - 1],
            Curve::Arc(arc) => arc.end,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Curve::Segment(line) => segment_length(line),
            Curve::MultiSegment(ls) => ls.lines().map(|l| segment_length(&l)).sum(),
            Curve::Arc(arc) => arc.length(),
        }
    }

    pub fn pieces(&self) -> SmallVec<[Piece; 4]> {
        match self {
            Curve::Segment(line) => smallvec::smallvec![Piece::Segment {
                line: *line,
                offset: 0.0
            }],
            Curve::MultiSegment(ls) => {
                let mut offset = 0.0;
                ls.lines()
                    .map(|line| {
                        let piece = Piece::Segment { line, offset };
                        offset += segment_length(&line);
                        piece
                    })
                    .collect()
            }
            Curve::Arc(arc) => smallvec::smallvec![Piece::Arc {
                arc: *arc,
                offset: 0.0
            }],
        }
    }

    pub fn window(&self) -> Rect<f64> {
        match self {
            Curve::Segment(line) => Rect::new(line.start, line.end),
            Curve::MultiSegment(ls) => {
                let mut min = ls.0[0];
                let mut max = ls.0[0];
                for c in &ls.0 {
                    min.x = min.x.min(c.x);
                    min.y = min.y.min(c.y);
                    max.x = max.x.max(c.x);
                    max.y = max.y.max(c.y);
                }
                Rect::new(min, max)
            }
            Curve::Arc(arc) => arc.window(),
        }
    }

    pub fn position_at(&self, along: f64) -> Coord<f64> {
        match self {
            Curve::Segment(line) => point_on_segment(line, along),
            Curve::MultiSegment(_) => {
                let pieces = self.pieces();
                for piece in &pieces {
                    if along <= piece.offset() + piece.length() {
                        if let Piece::Segment { line, offset } = piece {
                            return point_on_segment(line, along - offset);
                        }
                    }
                }
                self.end()
            }
            Curve::Arc(arc) => arc.position_at(along),
        }
    }

    pub fn midpoint(&self) -> Coord<f64> {
        self.position_at(self.length() / 2.0)
    }

    /// Closest point over the whole curve: `(along, distance)`.
    pub fn project(&self, p: Coord<f64>) -> (f64, f64) {
        self.pieces()
            .iter()
            .map(|piece| {
                let (local, dist) = piece.project(p);
                (piece.offset() + local, dist)
            })
            .fold((0.0, f64::INFINITY), |best, cand| {
                if cand.1 < best.1 {
                    cand
                } else {
                    best
                }
            })
    }

    /// Like `project`, but where the curve passes within `tolerance` of `p`
    /// more than once, prefers the pass nearest to `hint`.
    pub fn locate_near(&self, p: Coord<f64>, hint: f64, tolerance: f64) -> (f64, f64) {
        let candidates: SmallVec<[(f64, f64); 4]> = self
            .pieces()
            .iter()
            .map(|piece| {
                let (local, dist) = piece.project(p);
                (piece.offset() + local, dist)
            })
            .collect();
        let best = candidates
            .iter()
            .map(|c| c.1)
            .fold(f64::INFINITY, f64::min);
        candidates
            .into_iter()
            .filter(|c| c.1 <= best + tolerance)
            .fold((hint, f64::INFINITY), |chosen, cand| {
                if chosen.1.is_infinite() || (cand.0 - hint).abs() < (chosen.0 - hint).abs() {
                    cand
                } else {
                    chosen
                }
            })
    }

    pub fn distance_to(&self, p: Coord<f64>) -> f64 {
        self.project(p).1
    }

    /// The portion of the curve between two distances, `from < to`.
    pub fn sub_curve(&self, from: f64, to: f64) -> Curve {
        let length = self.length();
        let from = from.clamp(0.0, length);
        let to = to.clamp(from, length);
        match self {
            Curve::Segment(line) => Curve::Segment(Line::new(
                point_on_segment(line, from),
                point_on_segment(line, to),
            )),
            Curve::MultiSegment(ls) => {
                let mut coords = vec![self.position_at(from)];
                let mut along = 0.0;
                for line in ls.lines() {
                    along += segment_length(&line);
                    if along > from && along < to {
                        coords.push(line.end);
                    }
                }
                coords.push(self.position_at(to));
                if coords.len() == 2 {
                    Curve::Segment(Line::new(coords[0], coords[1]))
                } else {
                    Curve::MultiSegment(LineString::new(coords))
                }
            }
            Curve::Arc(arc) => Curve::Arc(arc.sub_arc(from, to)),
        }
    }

    /// Pins the end points onto the given positions (terminal snapping).
    pub fn with_endpoints(mut self, start: Coord<f64>, end: Coord<f64>) -> Curve {
        match &mut self {
            Curve::Segment(line) => {
                line.start = start;
                line.end = end;
            }
            Curve::MultiSegment(ls) => {
                let last = ls.0.len() - 1;
                ls.0[0] = start;
                ls.0[last] = end;
            }
            Curve::Arc(arc) => {
                arc.start = start;
                arc.end = end;
            }
        }
        self
    }

    pub fn reversed(&self) -> Curve {
        match self {
            Curve::Segment(line) => Curve::Segment(Line::new(line.end, line.start)),
            Curve::MultiSegment(ls) => {
                Curve::MultiSegment(LineString::new(ls.0.iter().rev().copied().collect()))
            }
            Curve::Arc(arc) => Curve::Arc(arc.reversed()),
        }
    }

    /// Direction of travel leaving the start point, in `(-PI, PI]`.
    pub fn start_tangent(&self) -> f64 {
        match self {
            Curve::Segment(line) => normalize_angle(line.dy().atan2(line.dx())),
            Curve::MultiSegment(ls) => ls
                .lines()
                .find(|l| segment_length(l) > 0.0)
                .map(|l| normalize_angle(l.dy().atan2(l.dx())))
                .unwrap_or(0.0),
            Curve::Arc(arc) => arc.start_tangent(),
        }
    }

    /// Signed curvature leaving the start point.
    pub fn start_curvature(&self) -> f64 {
        match self {
            Curve::Arc(arc) => arc.curvature(),
            _ => 0.0,
        }
    }

    /// Contribution of this curve to a ring's signed area (Green's theorem),
    /// measured relative to `origin` to keep large coordinates well
    /// conditioned.
    pub fn signed_area_term(&self, origin: Coord<f64>) -> f64 {
        let chord = |a: Coord<f64>, b: Coord<f64>| {
            let a = a - origin;
            let b = b - origin;
            0.5 * (a.x * b.y - b.x * a.y)
        };
        match self {
            Curve::Segment(line) => chord(line.start, line.end),
            Curve::MultiSegment(ls) => ls.lines().map(|l| chord(l.start, l.end)).sum(),
            Curve::Arc(arc) => chord(arc.start, arc.end) + arc.segment_area(),
        }
    }

    /// Vertices of a chord approximation, start and end included.
    pub fn densify(&self, chord_tolerance: f64) -> Vec<Coord<f64>> {
        match self {
            Curve::Segment(line) => vec![line.start, line.end],
            Curve::MultiSegment(ls) => ls.0.clone(),
            Curve::Arc(arc) => arc.densify(chord_tolerance),
        }
    }
}

pub fn segment_length(line: &Line<f64>) -> f64 {
    line.dx().hypot(line.dy())
}

fn point_on_segment(line: &Line<f64>, along: f64) -> Coord<f64> {
    let length = segment_length(line);
    if along <= 0.0 || length == 0.0 {
        return line.start;
    }
    if along >= length {
        return line.end;
    }
    let t = along / length;
    Coord {
        x: line.start.x + line.dx() * t,
        y: line.start.y + line.dy() * t,
    }
}

/// Closest point on a segment: `(along, distance)`.
pub fn project_on_segment(line: &Line<f64>, p: Coord<f64>) -> (f64, f64) {
    let length = segment_length(line);
    if length == 0.0 {
        return (0.0, distance(line.start, p));
    }
    let ux = line.dx() / length;
    let uy = line.dy() / length;
    let along = ((p.x - line.start.x) * ux + (p.y - line.start.y) * uy).clamp(0.0, length);
    let foot = Coord {
        x: line.start.x + ux * along,
        y: line.start.y + uy * along,
    };
    (along, distance(foot, p))
}

/// Expands a window by `margin` on every side.
pub fn grow(window: Rect<f64>, margin: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: window.min().x - margin,
            y: window.min().y - margin,
        },
        Coord {
            x: window.max().x + margin,
            y: window.max().y + margin,
        },
    )
}

#[cfg(test)]
mod tests;
