//! Per-terminal angular order of face-forming half-edges.
//!
//! Lists are kept sorted as dividers come and go, so ring tracing never has
//! to sort.

use std::cmp::Ordering;

use crate::error::{Result, TopologyError};
use crate::map::TopologyMap;
use crate::model::{DividerId, HalfEdge, Side, TerminalId};
use crate::utils::parallel;

/// Tangent directions closer than this are treated as equal and ordered by
/// curvature instead.
const ANGLE_EPSILON: f64 = 1e-12;

/// Counter-clockwise order of departure. Curves leaving on a shared tangent
/// are ordered by how far they bend left, so the one bending right comes
/// first.
pub fn compare(a: &HalfEdge, b: &HalfEdge) -> Ordering {
    if (a.angle - b.angle).abs() > ANGLE_EPSILON {
        return a.angle.total_cmp(&b.angle);
    }
    a.curvature
        .total_cmp(&b.curvature)
        .then_with(|| a.side.cmp(&b.side))
}

fn half_edges(map: &TopologyMap, id: DividerId) -> Result<[(TerminalId, HalfEdge); 2]> {
    let divider = map.divider_ref(id)?;
    let forward = &divider.curve;
    let reverse = divider.curve.reversed();
    Ok([
        (
            divider.start,
            HalfEdge {
                side: Side::new(id, true),
                angle: forward.start_tangent(),
                curvature: forward.start_curvature(),
            },
        ),
        (
            divider.end,
            HalfEdge {
                side: Side::new(id, false),
                angle: reverse.start_tangent(),
                curvature: reverse.start_curvature(),
            },
        ),
    ])
}

/// Inserts both half-edges of a divider at their sorted positions.
pub(crate) fn attach(map: &mut TopologyMap, id: DividerId) -> Result<()> {
    for (terminal, half) in half_edges(map, id)? {
        let outgoing = &mut map.terminal_mut(terminal)?.outgoing;
        let at = outgoing.partition_point(|e| compare(e, &half) == Ordering::Less);
        outgoing.insert(at, half);
    }
    Ok(())
}

pub(crate) fn detach(map: &mut TopologyMap, id: DividerId) {
    let Some((start, end)) = map.dividers.get(id).map(|d| (d.start, d.end)) else {
        return;
    };
    for terminal in [start, end] {
        if let Some(t) = map.terminals.get_mut(terminal) {
            t.outgoing.retain(|e| e.side.divider != id);
        }
    }
}

/// Recomputes every terminal's list from the divider arena.
pub(crate) fn rebuild(map: &mut TopologyMap) -> Result<()> {
    for terminal in map.terminals.values_mut() {
        terminal.outgoing.clear();
    }
    let ids: Vec<DividerId> = map
        .dividers
        .iter()
        .filter(|(_, d)| !d.is_overlap())
        .map(|(id, _)| id)
        .collect();
    for id in ids {
        for (terminal, half) in half_edges(map, id)? {
            map.terminal_mut(terminal)?.outgoing.push(half);
        }
    }
    let threshold = map.config.parallel_threshold;
    let mut lists: Vec<&mut Vec<HalfEdge>> =
        map.terminals.values_mut().map(|t| &mut t.outgoing).collect();
    parallel::iterate_mut(&mut lists, threshold, |list| list.sort_by(compare));
    Ok(())
}

/// Checks that every terminal holds exactly one half-edge for each
/// non-overlap divider end listed on it, and nothing else.
pub(crate) fn verify(map: &TopologyMap) -> Result<()> {
    for (id, terminal) in &map.terminals {
        let mut listed: Vec<DividerId> = terminal.dividers.to_vec();
        listed.sort();
        listed.dedup();
        let mut expected: Vec<Side> = Vec::with_capacity(terminal.outgoing.len());
        for d in listed {
            let divider = map.dividers.get(d).ok_or(TopologyError::BrokenAdjacency {
                terminal: id,
                divider: d,
            })?;
            if divider.is_overlap() {
                continue;
            }
            for forward in [true, false] {
                if divider.origin(forward) == id {
                    expected.push(Side::new(d, forward));
                }
            }
        }
        let mut present: Vec<Side> = terminal.outgoing.iter().map(|e| e.side).collect();
        expected.sort();
        present.sort();
        if expected == present {
            continue;
        }
        let divider = expected
            .iter()
            .zip(&present)
            .find(|(a, b)| a != b)
            .map(|(a, b)| a.min(b).divider)
            .or_else(|| {
                let shorter = expected.len().min(present.len());
                expected
                    .get(shorter)
                    .or_else(|| present.get(shorter))
                    .map(|s| s.divider)
            });
        if let Some(divider) = divider {
            return Err(TopologyError::BrokenAdjacency {
                terminal: id,
                divider,
            });
        }
    }
    Ok(())
}

/// The side that continues a ring after `arriving`: the first non-dangling
/// half-edge clockwise from the arriving side's twin, which keeps the face
/// on the left of travel.
pub(crate) fn next_side(map: &TopologyMap, arriving: Side) -> Result<Side> {
    let divider = map.divider_ref(arriving.divider)?;
    let at = divider.destination(arriving.forward);
    let broken = || TopologyError::BrokenAdjacency {
        terminal: at,
        divider: arriving.divider,
    };
    let outgoing = &map.terminals.get(at).ok_or_else(broken)?.outgoing;
    let twin = arriving.twin();
    let position = outgoing
        .iter()
        .position(|e| e.side == twin)
        .ok_or_else(broken)?;
    let len = outgoing.len();
    for i in 1..=len {
        let candidate = outgoing[(position + len - i) % len].side;
        let forms_faces = map
            .dividers
            .get(candidate.divider)
            .map_or(false, |d| d.forms_faces());
        if forms_faces {
            return Ok(candidate);
        }
    }
    Err(broken())
}
