//! Island and label containment.
//!
//! Both attach to the smallest polygon strictly containing a probe point;
//! candidates come from the index, exact containment from `geo`.

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use geo::Contains;
use geo_types::{Coord, LineString, Point, Polygon};

use crate::index::{IndexedItem, KindMask};
use crate::map::TopologyMap;
use crate::model::{Face, LabelId, RingId};

/// Resolves every pending island and label, plus those a new polygon may
/// now enclose. Returns the number of floating islands in the map.
pub(crate) fn resolve(map: &mut TopologyMap, new_polygons: &[RingId]) -> usize {
    let mut islands: BTreeSet<RingId> = std::mem::take(&mut map.pending_islands);
    let mut labels: BTreeSet<LabelId> = std::mem::take(&mut map.pending_labels);
    for polygon in new_polygons {
        let Some(window) = map.rings.get(*polygon).map(|r| r.window) else {
            continue;
        };
        map.index
            .query_window(Some(window), KindMask::ISLANDS, |item| {
                if let IndexedItem::Island(id) = item {
                    islands.insert(id);
                }
                ControlFlow::Continue(())
            });
        labels.extend(
            map.labels
                .iter()
                .filter(|(_, l)| window_contains(window, l.position))
                .map(|(id, _)| id),
        );
    }

    for island in islands {
        if map.rings.get(island).map_or(false, |r| r.is_island()) {
            let container = find_container(map, island);
            set_container(map, island, container);
        }
    }
    for label in labels {
        resolve_label(map, label);
    }

    let floating = map.rings.values().filter(|r| r.is_floating()).count();
    log::debug!("{} floating island(s)", floating);
    floating
}

fn window_contains(window: geo_types::Rect<f64>, p: Coord<f64>) -> bool {
    p.x >= window.min().x && p.x <= window.max().x && p.y >= window.min().y && p.y <= window.max().y
}

/// Probes at the midpoint of the island's first side. The ring across that
/// side lies inside the island's own component and is never its container.
fn find_container(map: &TopologyMap, island: RingId) -> Option<RingId> {
    let side = *map.rings.get(island)?.sides.first()?;
    let divider = map.dividers.get(side.divider)?;
    let across = divider.face(!side.forward);
    polygon_containing(map, divider.curve.midpoint(), across)
}

/// The smallest polygon whose interior contains `position`.
pub(crate) fn polygon_containing(
    map: &TopologyMap,
    position: Coord<f64>,
    exclude: Option<RingId>,
) -> Option<RingId> {
    let probe = Point::from(position);
    map.index
        .polygons_at(position)
        .into_iter()
        .filter(|id| Some(*id) != exclude)
        .filter_map(|id| {
            let ring = map.rings.get(id).filter(|r| r.is_polygon())?;
            let shape = Polygon::new(outline(map, id)?, vec![]);
            shape.contains(&probe).then_some((id, ring.area))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// The ring's boundary as a closed chord approximation, in traversal order.
pub fn outline(map: &TopologyMap, ring: RingId) -> Option<LineString<f64>> {
    let ring = map.rings.get(ring)?;
    let chord = map.config.arc_chord_tolerance;
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for side in &ring.sides {
        let divider = map.dividers.get(side.divider)?;
        let points = divider.side_curve(side.forward).densify(chord);
        let skip = usize::from(!coords.is_empty());
        coords.extend(points.into_iter().skip(skip));
    }
    if coords.len() < 3 {
        return None;
    }
    let mut line = LineString::new(coords);
    line.close();
    Some(line)
}

fn set_container(map: &mut TopologyMap, island: RingId, container: Option<RingId>) {
    let previous = map.rings.get(island).and_then(|r| r.container());
    if let Some(previous) = previous {
        forget_island(map, previous, island);
    }
    if let Some(Face::Island { container: slot }) = map.rings.get_mut(island).map(|r| &mut r.face) {
        *slot = container;
    }
    if let Some(Face::Polygon { islands, .. }) =
        container.and_then(|c| map.rings.get_mut(c)).map(|r| &mut r.face)
    {
        if !islands.contains(&island) {
            islands.push(island);
        }
    }
}

/// Removes an island from a polygon's list.
pub(crate) fn forget_island(map: &mut TopologyMap, polygon: RingId, island: RingId) {
    if let Some(Face::Polygon { islands, .. }) = map.rings.get_mut(polygon).map(|r| &mut r.face) {
        islands.retain(|i| *i != island);
    }
}

/// Attaches a label to the polygon now containing it.
pub(crate) fn resolve_label(map: &mut TopologyMap, label: LabelId) {
    let Some(position) = map.labels.get(label).map(|l| l.position) else {
        return;
    };
    let target = polygon_containing(map, position, None);
    let previous = map.labels.get(label).and_then(|l| l.polygon);
    if let Some(previous) = previous.filter(|p| Some(*p) != target) {
        if let Some(Face::Polygon { labels, .. }) = map.rings.get_mut(previous).map(|r| &mut r.face) {
            labels.retain(|l| *l != label);
        }
    }
    if let Some(l) = map.labels.get_mut(label) {
        l.polygon = target;
    }
    if let Some(Face::Polygon { labels, .. }) =
        target.and_then(|t| map.rings.get_mut(t)).map(|r| &mut r.face)
    {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
}
