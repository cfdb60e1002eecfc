use approx::assert_abs_diff_eq;
use geo_types::Coord;
use parcel_topology::{DividerKind, LineId, LineShape, TerminalOrigin, TopologyMap};

fn square(map: &mut TopologyMap, lo: f64, hi: f64) -> Vec<LineId> {
    let corners = [(lo, lo), (hi, lo), (hi, hi), (lo, hi)];
    let points: Vec<_> = corners
        .iter()
        .map(|&(x, y)| map.add_point(Coord { x, y }).unwrap())
        .collect();
    (0..4)
        .map(|i| {
            map.add_line(points[i], points[(i + 1) % 4], LineShape::Segment, true)
                .unwrap()
        })
        .collect()
}

fn segment(map: &mut TopologyMap, a: (f64, f64), b: (f64, f64)) -> LineId {
    let start = map.add_point(Coord { x: a.0, y: a.1 }).unwrap();
    let end = map.add_point(Coord { x: b.0, y: b.1 }).unwrap();
    map.add_line(start, end, LineShape::Segment, true).unwrap()
}

#[test]
fn test_single_square() {
    let mut map = TopologyMap::default();
    square(&mut map, 0.0, 10.0);
    map.settle().unwrap();

    let polygons: Vec<_> = map.polygons().collect();
    assert_eq!(polygons.len(), 1);
    let (id, polygon) = polygons[0];
    assert_abs_diff_eq!(polygon.area, 100.0, epsilon = 1e-9);
    assert!(polygon.islands().is_empty());
    assert_abs_diff_eq!(map.net_area(id).unwrap(), 100.0, epsilon = 1e-9);

    // the square's exterior has nothing around it
    let islands: Vec<_> = map.islands().collect();
    assert_eq!(islands.len(), 1);
    assert!(islands[0].1.is_floating());
    assert!(map.islands_needing_rebuild().is_empty());
}

#[test]
fn test_square_with_island() {
    let mut map = TopologyMap::default();
    square(&mut map, 0.0, 10.0);
    square(&mut map, 3.0, 7.0);
    map.settle().unwrap();

    let outer = map.polygon_at(Coord { x: 1.0, y: 1.0 }).unwrap();
    let inner = map.polygon_at(Coord { x: 5.0, y: 5.0 }).unwrap();
    assert_ne!(outer, inner);

    let outer_ring = map.ring(outer).unwrap();
    assert_abs_diff_eq!(outer_ring.area, 100.0, epsilon = 1e-9);
    assert_eq!(outer_ring.islands().len(), 1);
    let island = map.ring(outer_ring.islands()[0]).unwrap();
    assert_abs_diff_eq!(island.area, -16.0, epsilon = 1e-9);
    assert_eq!(island.container(), Some(outer));
    assert_abs_diff_eq!(map.net_area(outer).unwrap(), 84.0, epsilon = 1e-9);
    assert_abs_diff_eq!(map.ring(inner).unwrap().area, 16.0, epsilon = 1e-9);
}

#[test]
fn test_crossing_segments_dangle() {
    let mut map = TopologyMap::default();
    let a = segment(&mut map, (0.0, 0.0), (10.0, 10.0));
    let b = segment(&mut map, (0.0, 10.0), (10.0, 0.0));
    map.settle().unwrap();

    let synthetic: Vec<_> = map
        .terminals()
        .filter(|(_, t)| t.origin == TerminalOrigin::Intersection)
        .collect();
    assert_eq!(synthetic.len(), 1);
    assert_abs_diff_eq!(synthetic[0].1.position.x, 5.0, epsilon = 1e-9);
    assert_abs_diff_eq!(synthetic[0].1.position.y, 5.0, epsilon = 1e-9);

    assert_eq!(map.dividers().count(), 4);
    let flags: usize = map
        .dividers()
        .map(|(_, d)| usize::from(d.dangle.start) + usize::from(d.dangle.end))
        .sum();
    assert_eq!(flags, 4);
    assert_eq!(map.rings().count(), 0);

    for line in [a, b] {
        assert!(map.has_topology(line));
        assert!(map.is_start_dangle(line));
        assert!(map.is_end_dangle(line));
    }
}

#[test]
fn test_coincident_segments_overlap() {
    let mut map = TopologyMap::default();
    let a = segment(&mut map, (0.0, 0.0), (5.0, 0.0));
    let b = segment(&mut map, (0.0, 0.0), (5.0, 0.0));
    map.settle().unwrap();

    let overlaps: Vec<_> = map.dividers().filter(|(_, d)| d.is_overlap()).collect();
    assert_eq!(overlaps.len(), 1);
    let (_, overlap) = overlaps[0];
    assert_eq!(overlap.kind, DividerKind::LineOverlap);
    assert_abs_diff_eq!(overlap.curve.length(), 5.0, epsilon = 1e-9);

    // the lower id keeps the ordinary divider
    let (owner, other) = if a < b { (a, b) } else { (b, a) };
    assert_eq!(overlap.line, other);
    let owned = map.line_dividers(owner);
    assert_eq!(owned.len(), 1);
    assert_eq!(map.divider(owned[0]).unwrap().kind, DividerKind::Line);

    assert_eq!(map.rings().count(), 0);
    assert!(!overlap.forms_faces());
}

#[test]
fn test_every_side_covered_once() {
    let mut map = TopologyMap::default();
    square(&mut map, 0.0, 10.0);
    square(&mut map, 5.0, 15.0);
    segment(&mut map, (-5.0, 2.0), (20.0, 2.0));
    segment(&mut map, (12.0, 12.0), (30.0, 30.0));
    map.settle().unwrap();

    let mut owner = std::collections::HashMap::new();
    for (ring_id, ring) in map.rings() {
        for side in &ring.sides {
            assert!(owner.insert(*side, ring_id).is_none());
        }
    }
    for (id, divider) in map.dividers() {
        for forward in [true, false] {
            let side = parcel_topology::Side::new(id, forward);
            let in_ring = owner.contains_key(&side);
            if divider.is_overlap() || divider.is_dangle() {
                assert!(!in_ring);
            } else {
                assert!(in_ring);
                assert_eq!(divider.face(forward), owner.get(&side).copied());
            }
        }
    }
    assert!(map.polygons().count() >= 3);
}
