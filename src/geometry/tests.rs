use super::*;
use approx::assert_relative_eq;
use std::f64::consts::PI;

fn c(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

#[test]
fn test_multisegment_parametrisation() {
    let curve = Curve::from_shape(
        c(0.0, 0.0),
        c(10.0, 10.0),
        &LineShape::MultiSegment(vec![c(10.0, 0.0)]),
    )
    .unwrap();
    assert_relative_eq!(curve.length(), 20.0);
    let p = curve.position_at(15.0);
    assert_relative_eq!(p.x, 10.0);
    assert_relative_eq!(p.y, 5.0);
    let (along, dist) = curve.project(c(11.0, 4.0));
    assert_relative_eq!(along, 14.0);
    assert_relative_eq!(dist, 1.0);
}

#[test]
fn test_sub_curve_keeps_interior_vertices() {
    let curve = Curve::from_shape(
        c(0.0, 0.0),
        c(10.0, 10.0),
        &LineShape::MultiSegment(vec![c(10.0, 0.0)]),
    )
    .unwrap();
    match curve.sub_curve(5.0, 15.0) {
        Curve::MultiSegment(ls) => {
            assert_eq!(ls.0, vec![c(5.0, 0.0), c(10.0, 0.0), c(10.0, 5.0)]);
        }
        other => panic!("expected a multi-segment, got {:?}", other),
    }
    assert!(matches!(curve.sub_curve(1.0, 4.0), Curve::Segment(_)));
}

#[test]
fn test_sub_curves_tile_the_original() {
    let curve = Curve::from_shape(
        c(10.0, 0.0),
        c(-10.0, 0.0),
        &LineShape::Arc {
            center: c(0.0, 0.0),
            clockwise: false,
        },
    )
    .unwrap();
    let length = curve.length();
    let cuts = [0.0, 3.0, 12.5, length];
    let mut total = 0.0;
    for w in cuts.windows(2) {
        let piece = curve.sub_curve(w[0], w[1]);
        assert_relative_eq!(piece.start().x, curve.position_at(w[0]).x, epsilon = 1e-9);
        assert_relative_eq!(piece.end().y, curve.position_at(w[1]).y, epsilon = 1e-9);
        total += piece.length();
    }
    assert_relative_eq!(total, length, epsilon = 1e-9);
}

#[test]
fn test_signed_area_of_square() {
    let origin = c(0.0, 0.0);
    let sides = [
        Curve::Segment(Line::new(c(0.0, 0.0), c(10.0, 0.0))),
        Curve::Segment(Line::new(c(10.0, 0.0), c(10.0, 10.0))),
        Curve::Segment(Line::new(c(10.0, 10.0), c(0.0, 10.0))),
        Curve::Segment(Line::new(c(0.0, 10.0), c(0.0, 0.0))),
    ];
    let area: f64 = sides.iter().map(|s| s.signed_area_term(origin)).sum();
    assert_relative_eq!(area, 100.0);
    let reversed: f64 = sides.iter().map(|s| s.reversed().signed_area_term(origin)).sum();
    assert_relative_eq!(reversed, -100.0);
}

#[test]
fn test_signed_area_of_half_disc() {
    let arc = Curve::from_shape(
        c(10.0, 0.0),
        c(-10.0, 0.0),
        &LineShape::Arc {
            center: c(0.0, 0.0),
            clockwise: false,
        },
    )
    .unwrap();
    let diameter = Curve::Segment(Line::new(c(-10.0, 0.0), c(10.0, 0.0)));
    // large offset origin exercises the conditioning
    let origin = c(1.0e6, -2.0e6);
    let area = arc.signed_area_term(origin) + diameter.signed_area_term(origin);
    assert_relative_eq!(area, 50.0 * PI, epsilon = 1e-6);
}

#[test]
fn test_tangent_and_curvature() {
    let seg = Curve::Segment(Line::new(c(0.0, 0.0), c(0.0, -3.0)));
    assert_relative_eq!(seg.start_tangent(), -PI / 2.0, epsilon = 1e-12);
    assert_eq!(seg.start_curvature(), 0.0);
    let cw = Curve::from_shape(
        c(0.0, 10.0),
        c(10.0, 0.0),
        &LineShape::Arc {
            center: c(0.0, 0.0),
            clockwise: true,
        },
    )
    .unwrap();
    assert_relative_eq!(cw.start_tangent(), 0.0, epsilon = 1e-12);
    assert!(cw.start_curvature() < 0.0);
}

#[test]
fn test_locate_near_prefers_hint() {
    let bowtie = Curve::from_shape(
        c(0.0, 0.0),
        c(0.0, 10.0),
        &LineShape::MultiSegment(vec![c(10.0, 10.0), c(10.0, 0.0)]),
    )
    .unwrap();
    let first = 50f64.sqrt();
    let second = 2.0 * 50f64.sqrt() + 10.0 + 50f64.sqrt();
    let (along, _) = bowtie.locate_near(c(5.0, 5.0), second - 0.1, 1e-3);
    assert_relative_eq!(along, second, epsilon = 1e-9);
    let (along, _) = bowtie.locate_near(c(5.0, 5.0), 0.5, 1e-3);
    assert_relative_eq!(along, first, epsilon = 1e-9);
}

#[test]
fn test_with_endpoints_pins_ends() {
    let seg = Curve::Segment(Line::new(c(0.0, 0.0), c(10.0, 0.0)));
    let pinned = seg.sub_curve(2.0, 4.0).with_endpoints(c(2.0, 0.0005), c(4.0, 0.0));
    assert_eq!(pinned.start(), c(2.0, 0.0005));
    assert_eq!(pinned.end(), c(4.0, 0.0));
}

#[test]
fn test_arc_centre_on_start_is_rejected() {
    let result = Curve::from_shape(
        c(0.0, 0.0),
        c(1.0, 0.0),
        &LineShape::Arc {
            center: c(0.0, 0.0),
            clockwise: false,
        },
    );
    assert!(result.is_err());
}
