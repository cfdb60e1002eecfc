use geo_types::{Coord, Rect};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// A circular arc. The sweep is signed: positive runs counter-clockwise.
///
/// `start` and `end` are carried explicitly so that an arc bounded by two
/// terminals ends exactly on them, independent of trigonometric round-off.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircularArc {
    pub center: Coord<f64>,
    pub radius: f64,
    pub start_angle: f64,
    pub sweep: f64,
    pub start: Coord<f64>,
    pub end: Coord<f64>,
}

impl CircularArc {
    pub fn new(center: Coord<f64>, radius: f64, start_angle: f64, sweep: f64) -> Self {
        let mut arc = Self {
            center,
            radius,
            start_angle,
            sweep,
            start: center,
            end: center,
        };
        arc.start = arc.point_at_angle(start_angle);
        arc.end = arc.point_at_angle(start_angle + sweep);
        arc
    }

    /// Arc around `center` from `start` to `end`. The radius is taken from
    /// `start`; coincident end points describe a full circle.
    pub fn from_endpoints(
        center: Coord<f64>,
        start: Coord<f64>,
        end: Coord<f64>,
        clockwise: bool,
    ) -> Self {
        let radius = (start - center).x.hypot((start - center).y);
        let a0 = angle_of(center, start);
        let a1 = angle_of(center, end);
        let full = |s: f64| if s * radius <= 1e-12 { TAU } else { s };
        let sweep = if clockwise {
            -full((a0 - a1).rem_euclid(TAU))
        } else {
            full((a1 - a0).rem_euclid(TAU))
        };
        Self {
            center,
            radius,
            start_angle: a0,
            sweep,
            start,
            end,
        }
    }

    pub fn length(&self) -> f64 {
        self.radius * self.sweep.abs()
    }

    fn direction(&self) -> f64 {
        if self.sweep >= 0.0 {
            1.0
        } else {
            -1.0
        }
    }

    pub fn is_full_circle(&self) -> bool {
        self.sweep.abs() >= TAU - 1e-12
    }

    pub fn point_at_angle(&self, angle: f64) -> Coord<f64> {
        Coord {
            x: self.center.x + self.radius * angle.cos(),
            y: self.center.y + self.radius * angle.sin(),
        }
    }

    pub fn position_at(&self, along: f64) -> Coord<f64> {
        if along <= 0.0 {
            return self.start;
        }
        if along >= self.length() {
            return self.end;
        }
        self.point_at_angle(self.start_angle + self.direction() * along / self.radius)
    }

    /// Distance along the arc of the point at `angle`, if that angle lies on
    /// the arc (allowing `tolerance` of arc length beyond either end).
    pub fn along_of_angle(&self, angle: f64, tolerance: f64) -> Option<f64> {
        let offset = if self.sweep >= 0.0 {
            (angle - self.start_angle).rem_euclid(TAU)
        } else {
            (self.start_angle - angle).rem_euclid(TAU)
        };
        let along = offset * self.radius;
        let length = self.length();
        if along <= length + tolerance {
            Some(along.min(length))
        } else if TAU * self.radius - along <= tolerance {
            Some(0.0)
        } else {
            None
        }
    }

    /// Closest point on the arc: `(along, distance)`.
    pub fn project(&self, p: Coord<f64>) -> (f64, f64) {
        let d = p - self.center;
        let from_center = d.x.hypot(d.y);
        if from_center > 0.0 {
            if let Some(along) = self.along_of_angle(d.y.atan2(d.x), 0.0) {
                return (along, (from_center - self.radius).abs());
            }
        }
        let to_start = distance(p, self.start);
        let to_end = distance(p, self.end);
        if to_start <= to_end {
            (0.0, to_start)
        } else {
            (self.length(), to_end)
        }
    }

    pub fn sub_arc(&self, from: f64, to: f64) -> CircularArc {
        let dir = self.direction();
        let start_angle = self.start_angle + dir * from / self.radius;
        CircularArc {
            center: self.center,
            radius: self.radius,
            start_angle,
            sweep: dir * (to - from) / self.radius,
            start: self.position_at(from),
            end: self.position_at(to),
        }
    }

    pub fn reversed(&self) -> CircularArc {
        CircularArc {
            center: self.center,
            radius: self.radius,
            start_angle: self.start_angle + self.sweep,
            sweep: -self.sweep,
            start: self.end,
            end: self.start,
        }
    }

    pub fn window(&self) -> Rect<f64> {
        let mut min = Coord {
            x: self.start.x.min(self.end.x),
            y: self.start.y.min(self.end.y),
        };
        let mut max = Coord {
            x: self.start.x.max(self.end.x),
            y: self.start.y.max(self.end.y),
        };
        for quadrant in [0.0, FRAC_PI_2, PI, -FRAC_PI_2] {
            if self.along_of_angle(quadrant, 0.0).is_some() {
                let p = self.point_at_angle(quadrant);
                min.x = min.x.min(p.x);
                min.y = min.y.min(p.y);
                max.x = max.x.max(p.x);
                max.y = max.y.max(p.y);
            }
        }
        Rect::new(min, max)
    }

    /// Direction of travel leaving the start point.
    pub fn start_tangent(&self) -> f64 {
        normalize_angle(self.start_angle + self.direction() * FRAC_PI_2)
    }

    /// Signed curvature; positive bends to the left of travel.
    pub fn curvature(&self) -> f64 {
        self.direction() / self.radius
    }

    /// Area between the arc and its chord, signed by sweep direction.
    pub fn segment_area(&self) -> f64 {
        0.5 * self.radius * self.radius * (self.sweep - self.sweep.sin())
    }

    /// Chord approximation whose sagitta never exceeds `chord_tolerance`.
    pub fn densify(&self, chord_tolerance: f64) -> Vec<Coord<f64>> {
        let step = if chord_tolerance >= self.radius {
            FRAC_PI_2
        } else {
            (2.0 * (1.0 - chord_tolerance / self.radius).acos()).max(1e-4)
        };
        let count = ((self.sweep.abs() / step).ceil() as usize).clamp(1, 4096);
        let mut coords = Vec::with_capacity(count + 1);
        coords.push(self.start);
        for i in 1..count {
            let angle = self.start_angle + self.sweep * (i as f64) / (count as f64);
            coords.push(self.point_at_angle(angle));
        }
        coords.push(self.end);
        coords
    }
}

pub fn angle_of(center: Coord<f64>, p: Coord<f64>) -> f64 {
    (p.y - center.y).atan2(p.x - center.x)
}

pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Maps an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f64) -> f64 {
    angle.sin().atan2(angle.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quarter() -> CircularArc {
        CircularArc::from_endpoints(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 0.0, y: 10.0 },
            false,
        )
    }

    #[test]
    fn test_quarter_arc_measures() {
        let arc = quarter();
        assert_relative_eq!(arc.length(), 10.0 * FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(arc.start_tangent(), FRAC_PI_2, epsilon = 1e-9);
        let mid = arc.position_at(arc.length() / 2.0);
        assert_relative_eq!(mid.x, 10.0 * (PI / 4.0).cos(), epsilon = 1e-9);
        assert_relative_eq!(mid.y, 10.0 * (PI / 4.0).sin(), epsilon = 1e-9);
    }

    #[test]
    fn test_clockwise_sweep_is_negative() {
        let arc = CircularArc::from_endpoints(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 10.0, y: 0.0 },
            true,
        );
        assert_relative_eq!(arc.sweep, -FRAC_PI_2, epsilon = 1e-9);
        assert!(arc.curvature() < 0.0);
    }

    #[test]
    fn test_full_circle_from_coincident_ends() {
        let p = Coord { x: 5.0, y: 0.0 };
        let arc = CircularArc::from_endpoints(Coord { x: 0.0, y: 0.0 }, p, p, false);
        assert!(arc.is_full_circle());
        assert_relative_eq!(arc.segment_area(), PI * 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_window_includes_bulge() {
        let arc = CircularArc::from_endpoints(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: -10.0, y: 0.0 },
            false,
        );
        let window = arc.window();
        assert_relative_eq!(window.max().y, 10.0, epsilon = 1e-9);
        assert_relative_eq!(window.min().y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_project_off_arc_goes_to_nearest_end() {
        let arc = quarter();
        let (along, dist) = arc.project(Coord { x: 10.0, y: -5.0 });
        assert_eq!(along, 0.0);
        assert_relative_eq!(dist, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_densify_respects_chord_tolerance() {
        let arc = quarter();
        let coords = arc.densify(1e-3);
        for w in coords.windows(2) {
            let mid = Coord {
                x: (w[0].x + w[1].x) / 2.0,
                y: (w[0].y + w[1].y) / 2.0,
            };
            assert!(10.0 - distance(mid, arc.center) <= 1e-3 + 1e-12);
        }
    }
}
