//! Analytic intersection of segments and circular arcs under a length
//! tolerance.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo_types::{Coord, Line, Rect};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::f64::consts::TAU;

use super::arc::{angle_of, distance, CircularArc};
use super::{grow, project_on_segment, segment_length, Curve, Piece};

/// One intersection between curve `a` and curve `b`, measured as distances
/// along each curve from its start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CurveHit {
    Crossing {
        position: Coord<f64>,
        along_a: f64,
        along_b: f64,
    },
    /// A coincident stretch. `along_a` is increasing; `along_b` holds the
    /// distances on `b` matching `along_a.0` and `along_a.1` respectively.
    Overlap {
        start: Coord<f64>,
        end: Coord<f64>,
        along_a: (f64, f64),
        along_b: (f64, f64),
    },
}

#[derive(Clone, Copy, Debug)]
struct RawCrossing {
    position: Coord<f64>,
    along_a: f64,
    along_b: f64,
    at_vertex: bool,
}

#[derive(Clone, Copy, Debug)]
struct RawOverlap {
    along_a: (f64, f64),
    along_b: (f64, f64),
}

#[derive(Default)]
struct Hits {
    crossings: SmallVec<[RawCrossing; 4]>,
    overlaps: SmallVec<[RawOverlap; 2]>,
}

impl Hits {
    fn crossing(&mut self, position: Coord<f64>, along_a: f64, along_b: f64, at_vertex: bool) {
        self.crossings.push(RawCrossing {
            position,
            along_a,
            along_b,
            at_vertex,
        });
    }

    fn overlap(&mut self, along_a: (f64, f64), along_b: (f64, f64)) {
        self.overlaps.push(RawOverlap { along_a, along_b });
    }

    fn shifted(self, offset_a: f64, offset_b: f64) -> Hits {
        Hits {
            crossings: self
                .crossings
                .into_iter()
                .map(|c| RawCrossing {
                    along_a: c.along_a + offset_a,
                    along_b: c.along_b + offset_b,
                    ..c
                })
                .collect(),
            overlaps: self
                .overlaps
                .into_iter()
                .map(|o| RawOverlap {
                    along_a: (o.along_a.0 + offset_a, o.along_a.1 + offset_a),
                    along_b: (o.along_b.0 + offset_b, o.along_b.1 + offset_b),
                })
                .collect(),
        }
    }
}

/// Every crossing and coincident stretch between `a` and `b`, ordered by
/// distance along `a`.
pub fn intersect_curves(a: &Curve, b: &Curve, tolerance: f64) -> SmallVec<[CurveHit; 2]> {
    let mut all = Hits::default();
    let pieces_b = b.pieces();
    for pa in a.pieces().iter() {
        let window_a = grow(piece_window(pa), tolerance);
        for pb in pieces_b.iter() {
            if !windows_touch(&window_a, &piece_window(pb)) {
                continue;
            }
            let hits = intersect_pieces(pa, pb, tolerance).shifted(pa.offset(), pb.offset());
            all.crossings.extend(hits.crossings);
            all.overlaps.extend(hits.overlaps);
        }
    }
    finish(all, a, tolerance)
}

/// Places where a multi-segment curve crosses itself, as
/// `(position, first along, second along)`. The curve's own end points are
/// never reported.
pub fn self_intersections(curve: &Curve, tolerance: f64) -> Vec<(Coord<f64>, f64, f64)> {
    let Curve::MultiSegment(_) = curve else {
        return Vec::new();
    };
    let length = curve.length();
    let pieces = curve.pieces();
    let mut found: Vec<(Coord<f64>, f64, f64)> = Vec::new();
    let is_end = |along: f64| along <= tolerance || along >= length - tolerance;
    for i in 0..pieces.len() {
        for j in (i + 2)..pieces.len() {
            let hits = intersect_pieces(&pieces[i], &pieces[j], tolerance)
                .shifted(pieces[i].offset(), pieces[j].offset());
            let mut points: SmallVec<[(Coord<f64>, f64, f64); 4]> = hits
                .crossings
                .iter()
                .map(|c| (c.position, c.along_a, c.along_b))
                .collect();
            for o in &hits.overlaps {
                points.push((curve.position_at(o.along_a.0), o.along_a.0, o.along_b.0));
                points.push((curve.position_at(o.along_a.1), o.along_a.1, o.along_b.1));
            }
            for (position, first, second) in points {
                if is_end(first) || is_end(second) {
                    continue;
                }
                let duplicate = found.iter().any(|(_, f, s)| {
                    (f - first).abs() <= tolerance && (s - second).abs() <= tolerance
                });
                if !duplicate {
                    found.push((position, first, second));
                }
            }
        }
    }
    found.sort_by(|x, y| x.1.partial_cmp(&y.1).unwrap_or(Ordering::Equal));
    found
}

fn piece_window(piece: &Piece) -> Rect<f64> {
    match piece {
        Piece::Segment { line, .. } => Rect::new(line.start, line.end),
        Piece::Arc { arc, .. } => arc.window(),
    }
}

fn windows_touch(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

fn intersect_pieces(pa: &Piece, pb: &Piece, tolerance: f64) -> Hits {
    let mut hits = match (pa, pb) {
        (Piece::Segment { line: a, .. }, Piece::Segment { line: b, .. }) => {
            segment_segment(a, b, tolerance)
        }
        (Piece::Segment { line, .. }, Piece::Arc { arc, .. }) => {
            segment_arc(line, arc, tolerance, false)
        }
        (Piece::Arc { arc, .. }, Piece::Segment { line, .. }) => {
            segment_arc(line, arc, tolerance, true)
        }
        (Piece::Arc { arc: a, .. }, Piece::Arc { arc: b, .. }) => arc_arc(a, b, tolerance),
    };
    endpoint_hits(pa, pb, tolerance, &mut hits);
    hits
}

/// End points of either piece lying within tolerance of the other piece.
/// These are the T-junctions and near misses the analytic formulas round
/// away.
fn endpoint_hits(pa: &Piece, pb: &Piece, tolerance: f64, hits: &mut Hits) {
    for (position, along_b) in [(pb.start(), 0.0), (pb.end(), pb.length())] {
        let (along_a, dist) = pa.project(position);
        if dist <= tolerance {
            hits.crossing(position, along_a, along_b, true);
        }
    }
    for (position, along_a) in [(pa.start(), 0.0), (pa.end(), pa.length())] {
        let (along_b, dist) = pb.project(position);
        if dist <= tolerance {
            hits.crossing(position, along_a, along_b, true);
        }
    }
}

fn segment_segment(a: &Line<f64>, b: &Line<f64>, tolerance: f64) -> Hits {
    let mut hits = Hits::default();
    let la = segment_length(a);
    let lb = segment_length(b);
    if la == 0.0 || lb == 0.0 {
        return hits;
    }
    let (ux, uy) = (a.dx() / la, a.dy() / la);
    let (vx, vy) = (b.dx() / lb, b.dy() / lb);
    let off_a = |p: Coord<f64>| ((p.x - a.start.x) * uy - (p.y - a.start.y) * ux).abs();
    let off_b = |p: Coord<f64>| ((p.x - b.start.x) * vy - (p.y - b.start.y) * vx).abs();
    let collinear = (off_a(b.start) <= tolerance && off_a(b.end) <= tolerance)
        || (off_b(a.start) <= tolerance && off_b(a.end) <= tolerance);

    if collinear {
        let t0 = (b.start.x - a.start.x) * ux + (b.start.y - a.start.y) * uy;
        let t1 = (b.end.x - a.start.x) * ux + (b.end.y - a.start.y) * uy;
        let sign = if t1 >= t0 { 1.0 } else { -1.0 };
        let b_at = |t: f64| ((t - t0) * sign).clamp(0.0, lb);
        let lo = t0.min(t1).max(0.0);
        let hi = t0.max(t1).min(la);
        if hi - lo > tolerance {
            hits.overlap((lo, hi), (b_at(lo), b_at(hi)));
        } else if hi - lo >= -tolerance {
            let t = ((lo + hi) / 2.0).clamp(0.0, la);
            let position = Coord {
                x: a.start.x + ux * t,
                y: a.start.y + uy * t,
            };
            hits.crossing(position, t, b_at(t), false);
        }
        return hits;
    }

    if let Some(LineIntersection::SinglePoint { intersection, .. }) = line_intersection(*a, *b) {
        let (along_a, _) = project_on_segment(a, intersection);
        let (along_b, _) = project_on_segment(b, intersection);
        hits.crossing(intersection, along_a, along_b, false);
    }
    hits
}

/// `swapped` means the arc is curve `a` and the segment is curve `b`.
fn segment_arc(seg: &Line<f64>, arc: &CircularArc, tolerance: f64, swapped: bool) -> Hits {
    let mut hits = Hits::default();
    let length = segment_length(seg);
    if length == 0.0 {
        return hits;
    }
    let (ux, uy) = (seg.dx() / length, seg.dy() / length);
    let fx = seg.start.x - arc.center.x;
    let fy = seg.start.y - arc.center.y;
    let tc = -(fx * ux + fy * uy);
    let closest = Coord {
        x: seg.start.x + ux * tc,
        y: seg.start.y + uy * tc,
    };
    let h = distance(closest, arc.center);
    let r = arc.radius;
    if h > r + tolerance {
        return hits;
    }
    let params: SmallVec<[f64; 2]> = if (h - r).abs() <= tolerance {
        smallvec::smallvec![tc]
    } else {
        let w = (r * r - h * h).sqrt();
        smallvec::smallvec![tc - w, tc + w]
    };
    for t in params {
        if t < -tolerance || t > length + tolerance {
            continue;
        }
        let t = t.clamp(0.0, length);
        let position = Coord {
            x: seg.start.x + ux * t,
            y: seg.start.y + uy * t,
        };
        if let Some(along_arc) = arc.along_of_angle(angle_of(arc.center, position), tolerance) {
            if swapped {
                hits.crossing(position, along_arc, t, false);
            } else {
                hits.crossing(position, t, along_arc, false);
            }
        }
    }
    hits
}

fn arc_arc(a: &CircularArc, b: &CircularArc, tolerance: f64) -> Hits {
    let d = distance(a.center, b.center);
    if d <= tolerance && (a.radius - b.radius).abs() <= tolerance {
        return co_circular(a, b, tolerance);
    }
    let mut hits = Hits::default();
    if d == 0.0 || d > a.radius + b.radius + tolerance || d < (a.radius - b.radius).abs() - tolerance
    {
        return hits;
    }
    let x = (a.radius * a.radius - b.radius * b.radius + d * d) / (2.0 * d);
    let h2 = a.radius * a.radius - x * x;
    let (dx, dy) = ((b.center.x - a.center.x) / d, (b.center.y - a.center.y) / d);
    let base = Coord {
        x: a.center.x + dx * x,
        y: a.center.y + dy * x,
    };
    let mut points: SmallVec<[Coord<f64>; 2]> = SmallVec::new();
    if h2 <= 0.0 || h2.sqrt() <= tolerance / 2.0 {
        points.push(base);
    } else {
        let h = h2.sqrt();
        points.push(Coord {
            x: base.x - dy * h,
            y: base.y + dx * h,
        });
        points.push(Coord {
            x: base.x + dy * h,
            y: base.y - dx * h,
        });
    }
    for p in points {
        let along_a = a.along_of_angle(angle_of(a.center, p), tolerance);
        let along_b = b.along_of_angle(angle_of(b.center, p), tolerance);
        if let (Some(along_a), Some(along_b)) = (along_a, along_b) {
            hits.crossing(p, along_a, along_b, false);
        }
    }
    hits
}

/// Two arcs on the same circle: overlap of their angular ranges.
fn co_circular(a: &CircularArc, b: &CircularArc, tolerance: f64) -> Hits {
    let mut hits = Hits::default();
    let circumference = TAU * a.radius;
    let (la, lb) = (a.length(), b.length());
    let same_direction = (a.sweep >= 0.0) == (b.sweep >= 0.0);
    let anchor = if same_direction {
        b.start_angle
    } else {
        b.start_angle + b.sweep
    };
    let s = if a.sweep >= 0.0 {
        (anchor - a.start_angle).rem_euclid(TAU) * a.radius
    } else {
        (a.start_angle - anchor).rem_euclid(TAU) * a.radius
    };
    for shift in [s - circumference, s] {
        let b_at = |t: f64| {
            if same_direction {
                (t - shift).clamp(0.0, lb)
            } else {
                (lb - (t - shift)).clamp(0.0, lb)
            }
        };
        let lo = shift.max(0.0);
        let hi = (shift + lb).min(la);
        if hi - lo > tolerance {
            hits.overlap((lo, hi), (b_at(lo), b_at(hi)));
        } else if hi - lo >= -tolerance {
            let t = ((lo + hi) / 2.0).clamp(0.0, la);
            hits.crossing(a.position_at(t), t, b_at(t), false);
        }
    }
    hits
}

fn finish(all: Hits, a: &Curve, tolerance: f64) -> SmallVec<[CurveHit; 2]> {
    let mut overlaps: Vec<RawOverlap> = all.overlaps.into_vec();
    overlaps.sort_by(|x, y| x.along_a.0.partial_cmp(&y.along_a.0).unwrap_or(Ordering::Equal));
    let mut merged: Vec<RawOverlap> = Vec::with_capacity(overlaps.len());
    for o in overlaps {
        if let Some(last) = merged.last_mut() {
            if o.along_a.0 <= last.along_a.1 + tolerance
                && (o.along_b.0 - last.along_b.1).abs() <= tolerance
            {
                if o.along_a.1 > last.along_a.1 {
                    last.along_a.1 = o.along_a.1;
                    last.along_b.1 = o.along_b.1;
                }
                continue;
            }
        }
        merged.push(o);
    }

    let within = |value: f64, (p, q): (f64, f64)| {
        value >= p.min(q) - tolerance && value <= p.max(q) + tolerance
    };
    let mut crossings: Vec<RawCrossing> = all
        .crossings
        .into_iter()
        .filter(|c| {
            !merged
                .iter()
                .any(|o| within(c.along_a, o.along_a) && within(c.along_b, o.along_b))
        })
        .collect();
    crossings.sort_by(|x, y| {
        x.along_a
            .partial_cmp(&y.along_a)
            .unwrap_or(Ordering::Equal)
            .then(x.along_b.partial_cmp(&y.along_b).unwrap_or(Ordering::Equal))
    });
    let mut kept: Vec<RawCrossing> = Vec::with_capacity(crossings.len());
    for c in crossings {
        let twin = kept.iter_mut().find(|k| {
            (k.along_a - c.along_a).abs() <= tolerance && (k.along_b - c.along_b).abs() <= tolerance
        });
        match twin {
            Some(k) => {
                if c.at_vertex && !k.at_vertex {
                    *k = c;
                }
            }
            None => kept.push(c),
        }
    }

    let mut out: SmallVec<[CurveHit; 2]> = SmallVec::new();
    out.extend(kept.into_iter().map(|c| CurveHit::Crossing {
        position: c.position,
        along_a: c.along_a,
        along_b: c.along_b,
    }));
    out.extend(merged.into_iter().map(|o| CurveHit::Overlap {
        start: a.position_at(o.along_a.0),
        end: a.position_at(o.along_a.1),
        along_a: o.along_a,
        along_b: o.along_b,
    }));
    out.sort_by(|x, y| first_along(x).partial_cmp(&first_along(y)).unwrap_or(Ordering::Equal));
    out
}

fn first_along(hit: &CurveHit) -> f64 {
    match hit {
        CurveHit::Crossing { along_a, .. } => *along_a,
        CurveHit::Overlap { along_a, .. } => along_a.0,
    }
}
