use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use geo_types::Rect;

use crate::error::{Result, TopologyError};
use crate::map::TopologyMap;
use crate::model::{DangleFlags, DividerId, Face, Ring, RingId, Side, SideKey, TerminalId};

use super::{adjacency, islands};

/// Outcome of one polygon build.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildReport {
    pub rings_created: usize,
    /// Rebuilt rings that kept their id because their sides were unchanged.
    pub rings_kept: usize,
    pub rings_retired: usize,
    pub dangling_dividers: usize,
    pub floating_islands: usize,
}

/// Rebuilds rings over a settled divider set.
pub struct PolygonBuilder;

impl PolygonBuilder {
    pub fn build(map: &mut TopologyMap) -> Result<BuildReport> {
        let unsettled = map.lines.values().filter(|l| l.moved).count() + map.recut.len();
        if unsettled > 0 {
            return Err(TopologyError::Unsettled { lines: unsettled });
        }
        adjacency::verify(map)?;

        let mut report = BuildReport {
            dangling_dividers: Self::mark_dangles(map),
            ..BuildReport::default()
        };

        let mut retired = Self::retire_dirty(map);
        let traced = Self::trace_free_sides(map)?;

        let mut new_polygons = Vec::new();
        for sides in traced {
            let signature = Self::signature(map, &sides)?;
            let (id, kept) = match retired.remove(&signature) {
                Some(id) => (Self::revive(map, id, sides, signature)?, true),
                None => (Self::create(map, sides, signature)?, false),
            };
            if kept {
                report.rings_kept += 1;
            } else {
                report.rings_created += 1;
            }
            let ring = &map.rings[id];
            if ring.is_polygon() {
                new_polygons.push(id);
            } else {
                map.pending_islands.insert(id);
            }
            log::trace!(
                "ring {:?}: {} side(s), area {}",
                id,
                ring.sides.len(),
                ring.area
            );
        }

        let mut dropped: Vec<RingId> = retired.into_values().collect();
        dropped.sort();
        report.rings_retired = dropped.len();
        for id in dropped {
            Self::discard(map, id);
        }

        report.floating_islands = islands::resolve(map, &new_polygons);
        log::debug!(
            "build: {} ring(s) created, {} kept, {} retired, {} dangling divider(s), {} floating island(s)",
            report.rings_created,
            report.rings_kept,
            report.rings_retired,
            report.dangling_dividers,
            report.floating_islands
        );
        Ok(report)
    }

    /// Prunes degree-1 terminals until none is left and flags the pruned
    /// divider ends. Changed flags dirty the rings around the divider.
    /// Returns the number of dangling dividers.
    fn mark_dangles(map: &mut TopologyMap) -> usize {
        let original: HashMap<TerminalId, usize> = map
            .terminals
            .iter()
            .map(|(id, t)| (id, t.outgoing.len()))
            .collect();
        let mut degree = original.clone();
        let mut flags: HashMap<DividerId, DangleFlags> = HashMap::new();
        let mut pruned: HashSet<DividerId> = HashSet::new();

        let mut tips: Vec<TerminalId> = original
            .iter()
            .filter(|(_, d)| **d == 1)
            .map(|(id, _)| *id)
            .collect();
        tips.sort();
        let mut queue: VecDeque<TerminalId> = tips.into();

        while let Some(t) = queue.pop_front() {
            if degree.get(&t).copied() != Some(1) {
                continue;
            }
            let Some(side) = map.terminals[t]
                .outgoing
                .iter()
                .map(|e| e.side)
                .find(|s| !pruned.contains(&s.divider))
            else {
                continue;
            };
            let Some(divider) = map.dividers.get(side.divider) else {
                continue;
            };
            pruned.insert(side.divider);
            degree.insert(t, 0);
            let entry = flags.entry(side.divider).or_default();
            if side.forward {
                entry.start = true;
            } else {
                entry.end = true;
            }
            let other = divider.destination(side.forward);
            let left = match degree.get_mut(&other) {
                Some(d) => {
                    *d = d.saturating_sub(1);
                    *d
                }
                None => continue,
            };
            if left == 1 {
                queue.push_back(other);
            } else if left == 0 && original.get(&other).copied() == Some(1) {
                // an isolated divider dangles at both ends
                if side.forward {
                    entry.end = true;
                } else {
                    entry.start = true;
                }
            }
        }

        let ids: Vec<DividerId> = map.dividers.keys().collect();
        let mut dangling = 0;
        for id in ids {
            let divider = &mut map.dividers[id];
            let next = if divider.is_overlap() {
                DangleFlags::default()
            } else {
                flags.get(&id).copied().unwrap_or_default()
            };
            if next.any() {
                dangling += 1;
            }
            if divider.dangle != next {
                divider.dangle = next;
                let (start, end, left, right) =
                    (divider.start, divider.end, divider.left, divider.right);
                map.dirty_rings.extend(left);
                map.dirty_rings.extend(right);
                map.touch_terminal(start);
                map.touch_terminal(end);
            }
        }
        dangling
    }

    /// Takes dirty rings out of the graph, keyed by their sorted sides so a
    /// ring traced again with the same sides can keep its id.
    fn retire_dirty(map: &mut TopologyMap) -> HashMap<Vec<SideKey>, RingId> {
        let dirty: BTreeSet<RingId> = std::mem::take(&mut map.dirty_rings);
        let mut retired = HashMap::with_capacity(dirty.len());
        for id in dirty {
            let Some(ring) = map.rings.get_mut(id) else {
                continue;
            };
            let polygon = ring.is_polygon();
            let window = ring.window;
            let sides = std::mem::take(&mut ring.sides);
            let signature = std::mem::take(&mut ring.signature);
            let (orphaned, owner) = match &mut ring.face {
                Face::Polygon { islands, .. } => (std::mem::take(islands), None),
                Face::Island { container } => (Vec::new(), container.take()),
            };
            if let Some(owner) = owner {
                islands::forget_island(map, owner, id);
            }
            for island in orphaned {
                if let Some(Face::Island { container }) =
                    map.rings.get_mut(island).map(|r| &mut r.face)
                {
                    *container = None;
                }
                map.pending_islands.insert(island);
            }
            for side in sides {
                if let Some(divider) = map.dividers.get_mut(side.divider) {
                    let face = divider.face_mut(side.forward);
                    if *face == Some(id) {
                        *face = None;
                    }
                }
            }
            map.index.remove_ring(id, window, polygon);
            map.pending_islands.remove(&id);
            retired.insert(signature, id);
        }
        retired
    }

    /// Traces a ring from every face-forming side that has no ring yet.
    fn trace_free_sides(map: &TopologyMap) -> Result<Vec<Vec<Side>>> {
        let mut ids: Vec<DividerId> = map
            .dividers
            .iter()
            .filter(|(_, d)| d.forms_faces())
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        let limit = 2 * ids.len() + 1;
        let mut visited: HashSet<Side> = HashSet::new();
        let mut rings = Vec::new();
        for id in ids {
            for forward in [true, false] {
                let side = Side::new(id, forward);
                if visited.contains(&side) || map.dividers[id].face(forward).is_some() {
                    continue;
                }
                rings.push(Self::trace_ring(map, side, &mut visited, limit)?);
            }
        }
        Ok(rings)
    }

    fn trace_ring(
        map: &TopologyMap,
        start: Side,
        visited: &mut HashSet<Side>,
        limit: usize,
    ) -> Result<Vec<Side>> {
        let mut sides = Vec::new();
        let mut current = start;
        loop {
            let divider = map.divider_ref(current.divider)?;
            if !visited.insert(current) || divider.face(current.forward).is_some() {
                return Err(TopologyError::BrokenAdjacency {
                    terminal: divider.origin(current.forward),
                    divider: current.divider,
                });
            }
            sides.push(current);
            let next = adjacency::next_side(map, current)?;
            if next == start {
                return Ok(sides);
            }
            if sides.len() > limit {
                return Err(TopologyError::Corrupt(format!(
                    "ring from {:?} does not close",
                    start
                )));
            }
            current = next;
        }
    }

    fn signature(map: &TopologyMap, sides: &[Side]) -> Result<Vec<SideKey>> {
        let tolerance = map.tolerance();
        let mut keys = sides
            .iter()
            .map(|s| Ok(map.divider_ref(s.divider)?.side_key(s.forward, tolerance)))
            .collect::<Result<Vec<_>>>()?;
        keys.sort();
        Ok(keys)
    }

    fn measure(map: &TopologyMap, sides: &[Side]) -> Result<(f64, Rect<f64>)> {
        let first = map.divider_ref(sides[0].divider)?;
        let origin = map.terminal_ref(first.origin(sides[0].forward))?.position;
        let mut area = 0.0;
        let mut min = first.window.min();
        let mut max = first.window.max();
        for side in sides {
            let divider = map.divider_ref(side.divider)?;
            area += divider.side_curve(side.forward).signed_area_term(origin);
            min.x = min.x.min(divider.window.min().x);
            min.y = min.y.min(divider.window.min().y);
            max.x = max.x.max(divider.window.max().x);
            max.y = max.y.max(divider.window.max().y);
        }
        Ok((area, Rect::new(min, max)))
    }

    fn claim_sides(map: &mut TopologyMap, id: RingId, sides: &[Side]) {
        for side in sides {
            if let Some(divider) = map.dividers.get_mut(side.divider) {
                *divider.face_mut(side.forward) = Some(id);
            }
        }
    }

    fn create(map: &mut TopologyMap, sides: Vec<Side>, signature: Vec<SideKey>) -> Result<RingId> {
        let (area, window) = Self::measure(map, &sides)?;
        let face = if area > 0.0 {
            Face::Polygon {
                islands: Vec::new(),
                labels: Vec::new(),
            }
        } else {
            Face::Island { container: None }
        };
        let polygon = matches!(face, Face::Polygon { .. });
        let id = map.rings.insert(Ring {
            sides: sides.clone(),
            area,
            window,
            face,
            signature,
        });
        Self::claim_sides(map, id, &sides);
        map.index.insert_ring(id, window, polygon);
        Ok(id)
    }

    fn revive(
        map: &mut TopologyMap,
        id: RingId,
        sides: Vec<Side>,
        signature: Vec<SideKey>,
    ) -> Result<RingId> {
        let (area, window) = Self::measure(map, &sides)?;
        Self::claim_sides(map, id, &sides);
        let ring = map
            .rings
            .get_mut(id)
            .ok_or_else(|| TopologyError::Corrupt(format!("retired ring {:?} vanished", id)))?;
        ring.sides = sides;
        ring.signature = signature;
        ring.area = area;
        ring.window = window;
        let polygon = ring.is_polygon();
        map.index.insert_ring(id, window, polygon);
        Ok(id)
    }

    /// Drops a retired ring for good. Its labels go back to resolution.
    fn discard(map: &mut TopologyMap, id: RingId) {
        let Some(ring) = map.rings.remove(id) else {
            return;
        };
        for label in ring.labels() {
            if let Some(l) = map.labels.get_mut(*label) {
                l.polygon = None;
                map.pending_labels.insert(*label);
            }
        }
        map.pending_islands.remove(&id);
    }
}
