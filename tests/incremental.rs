use approx::assert_abs_diff_eq;
use geo_types::Coord;
use parcel_topology::{LineId, LineShape, RingId, TerminalId, TopologyError, TopologyMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn point(map: &mut TopologyMap, x: f64, y: f64) -> TerminalId {
    map.add_point(Coord { x, y }).unwrap()
}

fn segment(map: &mut TopologyMap, a: (f64, f64), b: (f64, f64)) -> LineId {
    let start = point(map, a.0, a.1);
    let end = point(map, b.0, b.1);
    map.add_line(start, end, LineShape::Segment, true).unwrap()
}

fn square(map: &mut TopologyMap, lo: f64, hi: f64) -> Vec<LineId> {
    let corners = [(lo, lo), (hi, lo), (hi, hi), (lo, hi)];
    (0..4)
        .map(|i| segment(map, corners[i], corners[(i + 1) % 4]))
        .collect()
}

/// Every line's pieces as rounded spans along it, with their overlap flag.
fn partition(map: &TopologyMap) -> Vec<(LineId, Vec<(i64, i64, bool)>)> {
    let round = |v: f64| (v * 1e6).round() as i64;
    let mut lines: Vec<_> = map
        .lines()
        .map(|(id, _)| {
            let pieces = map
                .line_dividers(id)
                .iter()
                .map(|d| {
                    let d = map.divider(*d).unwrap();
                    (round(d.from), round(d.to), d.is_overlap())
                })
                .collect();
            (id, pieces)
        })
        .collect();
    lines.sort_by_key(|(id, _)| *id);
    lines
}

fn ring_areas(map: &TopologyMap) -> Vec<i64> {
    let mut areas: Vec<i64> = map
        .rings()
        .map(|(_, r)| (r.area * 1e6).round() as i64)
        .collect();
    areas.sort();
    areas
}

/// Dividers of every line tile it end to end, and their geometry matches.
fn assert_coverage(map: &TopologyMap) {
    for (id, line) in map.lines() {
        if !line.topological {
            continue;
        }
        let dividers = map.line_dividers(id);
        assert!(!dividers.is_empty(), "line {:?} has no dividers", id);
        let first = map.divider(dividers[0]).unwrap();
        let last = map.divider(dividers[dividers.len() - 1]).unwrap();
        assert_eq!(first.start, line.start);
        assert_eq!(last.end, line.end);
        assert_abs_diff_eq!(first.from, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(last.to, line.curve.length(), epsilon = 1e-6);

        let mut total = 0.0;
        for pair in dividers.windows(2) {
            let a = map.divider(pair[0]).unwrap();
            let b = map.divider(pair[1]).unwrap();
            assert_eq!(a.end, b.start);
            assert_abs_diff_eq!(a.to, b.from, epsilon = 1e-9);
        }
        for d in dividers {
            let d = map.divider(*d).unwrap();
            assert!(d.to > d.from);
            total += d.curve.length();
            let start = map.terminal(d.start).unwrap().position;
            let end = map.terminal(d.end).unwrap().position;
            assert_abs_diff_eq!(d.curve.start().x, start.x, epsilon = 1e-9);
            assert_abs_diff_eq!(d.curve.start().y, start.y, epsilon = 1e-9);
            assert_abs_diff_eq!(d.curve.end().x, end.x, epsilon = 1e-9);
            assert_abs_diff_eq!(d.curve.end().y, end.y, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(total, line.curve.length(), epsilon = 1e-3);
    }
}

#[test]
fn test_coverage_with_arcs_and_polylines() {
    let mut map = TopologyMap::default();
    let start = point(&mut map, 0.0, 0.0);
    let end = point(&mut map, 10.0, 10.0);
    let bend = map
        .add_line(
            start,
            end,
            LineShape::MultiSegment(vec![Coord { x: 10.0, y: 0.0 }]),
            true,
        )
        .unwrap();

    // lower half circle of radius 10 around (10, 5)
    let left = point(&mut map, 0.0, 5.0);
    let right = point(&mut map, 20.0, 5.0);
    let arc = map
        .add_line(
            left,
            right,
            LineShape::Arc {
                center: Coord { x: 10.0, y: 5.0 },
                clockwise: false,
            },
            true,
        )
        .unwrap();
    segment(&mut map, (5.0, -8.0), (5.0, 12.0));
    map.settle().unwrap();

    assert_coverage(&map);
    // the arc meets the polyline's first leg and the vertical
    assert_eq!(map.line_dividers(arc).len(), 3);
    assert_eq!(map.line_dividers(bend).len(), 3);
    assert!(map.polygons().count() >= 1);
}

#[test]
fn test_settle_is_idempotent() {
    let mut map = TopologyMap::default();
    square(&mut map, 0.0, 10.0);
    square(&mut map, 3.0, 7.0);
    segment(&mut map, (5.0, -2.0), (5.0, 3.0));
    map.settle().unwrap();

    let dividers: Vec<_> = map.dividers().map(|(id, _)| id).collect();
    let rings: Vec<RingId> = map.rings().map(|(id, _)| id).collect();

    let report = map.settle().unwrap();
    assert_eq!(report.intersect.lines_recut, 0);
    assert_eq!(report.build.rings_created, 0);
    assert_eq!(report.build.rings_retired, 0);
    assert_eq!(map.dividers().map(|(id, _)| id).collect::<Vec<_>>(), dividers);
    assert_eq!(map.rings().map(|(id, _)| id).collect::<Vec<_>>(), rings);
}

#[test]
fn test_rebuild_reproduces_rings() {
    let mut map = TopologyMap::default();
    square(&mut map, 0.0, 10.0);
    square(&mut map, 3.0, 7.0);
    segment(&mut map, (0.0, 5.0), (3.0, 5.0));
    map.settle().unwrap();
    let before = partition(&map);
    let areas = ring_areas(&map);
    let mut rings: Vec<RingId> = map.rings().map(|(id, _)| id).collect();
    rings.sort();

    let report = map.rebuild_all().unwrap();
    assert_eq!(report.build.rings_created, 0);
    assert_eq!(partition(&map), before);
    assert_eq!(ring_areas(&map), areas);
    let mut after: Vec<RingId> = map.rings().map(|(id, _)| id).collect();
    after.sort();
    assert_eq!(after, rings);
}

#[test]
fn test_partition_does_not_depend_on_order() {
    let mut lines = vec![
        ((0.0, 0.0), (10.0, 0.0)),
        ((10.0, 0.0), (10.0, 10.0)),
        ((10.0, 10.0), (0.0, 10.0)),
        ((0.0, 10.0), (0.0, 0.0)),
        ((-2.0, 5.0), (12.0, 5.0)),
        ((5.0, -2.0), (5.0, 12.0)),
        ((0.0, 0.0), (10.0, 10.0)),
        ((2.0, 0.0), (8.0, 0.0)),
        ((1.0, 9.0), (9.0, 1.0)),
    ];
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..5 {
        lines.shuffle(&mut rng);
        let mut map = TopologyMap::default();
        for (i, (a, b)) in lines.iter().enumerate() {
            segment(&mut map, *a, *b);
            if i % 3 == 2 {
                map.settle().unwrap();
            }
        }
        map.settle().unwrap();
        assert_coverage(&map);

        let incremental = partition(&map);
        let areas = ring_areas(&map);
        map.rebuild_all().unwrap();
        assert_eq!(partition(&map), incremental);
        assert_eq!(ring_areas(&map), areas);
    }
}

#[test]
fn test_moving_a_line_heals_the_cut_it_left() {
    let mut map = TopologyMap::default();
    let across = segment(&mut map, (0.0, 5.0), (10.0, 5.0));
    let bottom = point(&mut map, 5.0, 0.0);
    let top = point(&mut map, 5.0, 10.0);
    let mover = map.add_line(bottom, top, LineShape::Segment, true).unwrap();
    map.settle().unwrap();
    assert_eq!(map.line_dividers(across).len(), 2);
    assert_eq!(map.line_dividers(mover).len(), 2);

    map.move_point(bottom, Coord { x: 20.0, y: 0.0 }).unwrap();
    map.move_point(top, Coord { x: 20.0, y: 10.0 }).unwrap();
    map.settle().unwrap();

    assert_eq!(map.line_dividers(across).len(), 1);
    assert_eq!(map.line_dividers(mover).len(), 1);
    assert_eq!(map.terminals().count(), 4);
    assert_coverage(&map);
}

#[test]
fn test_failed_edit_leaves_map_unchanged() {
    let mut map = TopologyMap::default();
    square(&mut map, 0.0, 10.0);
    map.settle().unwrap();
    let before = partition(&map);
    let rings: Vec<RingId> = map.rings().map(|(id, _)| id).collect();
    let terminals = map.terminals().count();

    let err = map
        .edit(|map| {
            // a line splitting the square, then a refused one
            segment(map, (5.0, -1.0), (5.0, 11.0));
            let p = map.add_point(Coord { x: 20.0, y: 20.0 })?;
            map.add_line(p, p, LineShape::Segment, true)
        })
        .unwrap_err();
    assert!(matches!(err, TopologyError::Rejected(_)));

    assert_eq!(partition(&map), before);
    assert_eq!(map.rings().map(|(id, _)| id).collect::<Vec<_>>(), rings);
    assert_eq!(map.terminals().count(), terminals);
    assert!(map.moved_lines().is_empty());
}

#[test]
fn test_rejected_move_changes_nothing() {
    let mut map = TopologyMap::default();
    let a = point(&mut map, 0.0, 0.0);
    let b = point(&mut map, 10.0, 0.0);
    let line = map
        .add_line(
            a,
            b,
            LineShape::MultiSegment(vec![Coord { x: 5.0, y: 0.0 }]),
            true,
        )
        .unwrap();
    map.settle().unwrap();

    // the end cannot be dropped onto the start point
    let err = map.move_point(b, Coord { x: 0.0, y: 0.0 }).unwrap_err();
    assert!(matches!(err, TopologyError::Rejected(_)));
    assert!(map.moved_lines().is_empty());
    assert_eq!(map.terminal(b).unwrap().position, Coord { x: 10.0, y: 0.0 });
    assert_eq!(map.line_dividers(line).len(), 1);
}

#[test]
fn test_island_floats_when_its_container_goes() {
    let mut map = TopologyMap::default();
    let outer = square(&mut map, 0.0, 10.0);
    square(&mut map, 3.0, 7.0);
    map.settle().unwrap();

    let ends: Vec<(TerminalId, TerminalId)> = outer
        .iter()
        .map(|id| {
            let line = map.line(*id).unwrap();
            (line.start, line.end)
        })
        .collect();
    for id in &outer {
        map.delete_line(*id).unwrap();
    }
    map.settle().unwrap();

    assert_eq!(map.polygons().count(), 1);
    let islands: Vec<_> = map.islands().collect();
    assert_eq!(islands.len(), 1);
    assert!(islands[0].1.is_floating());
    let island = islands[0].0;

    for (start, end) in ends {
        map.add_line(start, end, LineShape::Segment, true).unwrap();
    }
    map.settle().unwrap();

    let container = map.polygon_at(Coord { x: 1.0, y: 1.0 }).unwrap();
    assert_eq!(map.ring(island).unwrap().container(), Some(container));
    assert_abs_diff_eq!(map.net_area(container).unwrap(), 84.0, epsilon = 1e-9);
    assert!(map.islands_needing_rebuild().is_empty());
}

#[test]
fn test_labels_follow_their_polygon() {
    let mut map = TopologyMap::default();
    square(&mut map, 0.0, 10.0);
    map.settle().unwrap();
    let label = map.add_label(Coord { x: 2.0, y: 2.0 }, "lot 4").unwrap();
    let parcel = map.label(label).unwrap().polygon.unwrap();

    square(&mut map, 20.0, 30.0);
    map.settle().unwrap();
    map.move_label(label, Coord { x: 25.0, y: 25.0 }).unwrap();
    let moved_to = map.label(label).unwrap().polygon.unwrap();
    assert_ne!(moved_to, parcel);
    assert!(map.labels_of(parcel).is_empty());
    assert_eq!(map.labels_of(moved_to), &[label]);

    map.delete_label(label).unwrap();
    assert!(map.labels_of(moved_to).is_empty());
}
