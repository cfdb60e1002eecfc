use std::collections::{BTreeMap, BTreeSet};

use crate::error::{RejectReason, Result};
use crate::map::TopologyMap;
use crate::model::{DividerId, LineId, TerminalOrigin};

use super::cutter::{CutEvent, DividerCutter};
use super::finder::{IntersectionFinder, IntersectionKind};

/// Outcome of one intersection pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntersectReport {
    /// Lines cut from scratch, moved or not.
    pub lines_recut: usize,
    /// Pre-existing dividers split by a recut line.
    pub dividers_split: usize,
    pub terminals_released: usize,
}

/// Drives the finder and the cutter until no line is left moved.
pub struct LineIntersector;

impl LineIntersector {
    pub fn run(map: &mut TopologyMap) -> Result<IntersectReport> {
        let tolerance = map.tolerance();
        let moved = map.moved_lines();
        for id in &moved {
            let line = map.line_ref(*id)?;
            if line.topological && line.curve.length() <= tolerance {
                return Err(RejectReason::ZeroLength { line: Some(*id) }.into());
            }
        }

        // Every line whose cut can depend on a moved line is recut from
        // scratch, so the result does not depend on processing order.
        let mut recut: BTreeSet<LineId> = std::mem::take(&mut map.recut);
        for id in &moved {
            if map.line_ref(*id)?.topological {
                recut.insert(*id);
                recut.extend(map.neighbours_of_line(*id));
            }
        }
        recut.retain(|id| map.lines.get(*id).map_or(false, |l| l.topological));

        let mut report = IntersectReport::default();
        let mut touched = Vec::new();
        for id in &recut {
            touched.extend(map.clear_line_dividers(*id));
        }
        report.terminals_released += map.release_terminals(touched);

        for id in &recut {
            report.dividers_split += Self::process_line(map, *id)?;
            report.lines_recut += 1;
        }

        for id in moved {
            if let Some(line) = map.lines.get_mut(id) {
                line.moved = false;
            }
        }
        let orphans: Vec<_> = map
            .terminals
            .iter()
            .filter(|(_, t)| t.origin == TerminalOrigin::Intersection && t.dividers.is_empty())
            .map(|(id, _)| id)
            .collect();
        report.terminals_released += map.release_terminals(orphans);

        log::debug!(
            "intersect: {} line(s) recut, {} divider(s) split, {} terminal(s) released",
            report.lines_recut,
            report.dividers_split,
            report.terminals_released
        );
        Ok(report)
    }

    /// Cuts one line against the current partition, then cuts the dividers
    /// it crossed. Returns how many existing dividers were split.
    fn process_line(map: &mut TopologyMap, id: LineId) -> Result<usize> {
        let found = IntersectionFinder::new(map).find_for_line(id)?;

        let mut own: Vec<CutEvent> = Vec::new();
        let mut others: BTreeMap<DividerId, Vec<CutEvent>> = BTreeMap::new();
        for result in &found.results {
            // the smaller line id keeps the ordinary divider over a graze
            let source_owns = id < result.line;
            let events = others.entry(result.divider).or_default();
            for data in &result.data {
                match data.kind {
                    IntersectionKind::Graze(kind) => {
                        log::trace!(
                            "line {:?} grazes divider {:?} ({:?})",
                            id,
                            result.divider,
                            kind
                        );
                        let (lo, hi, at_lo, at_hi) = if data.other.0 <= data.other.1 {
                            (data.other.0, data.other.1, data.at.0, data.at.1)
                        } else {
                            (data.other.1, data.other.0, data.at.1, data.at.0)
                        };
                        if source_owns {
                            own.push(CutEvent::Point {
                                along: data.source.0,
                                at: data.at.0,
                            });
                            own.push(CutEvent::Point {
                                along: data.source.1,
                                at: data.at.1,
                            });
                            events.push(CutEvent::Overlap {
                                from: lo,
                                to: hi,
                                start: at_lo,
                                end: at_hi,
                            });
                        } else {
                            own.push(CutEvent::Overlap {
                                from: data.source.0,
                                to: data.source.1,
                                start: data.at.0,
                                end: data.at.1,
                            });
                            events.push(CutEvent::Point {
                                along: lo,
                                at: at_lo,
                            });
                            events.push(CutEvent::Point {
                                along: hi,
                                at: at_hi,
                            });
                        }
                    }
                    IntersectionKind::Simple | IntersectionKind::Vertex => {
                        own.push(CutEvent::Point {
                            along: data.source.0,
                            at: data.at.0,
                        });
                        events.push(CutEvent::Point {
                            along: data.other.0,
                            at: data.at.0,
                        });
                    }
                }
            }
        }
        for hit in &found.self_hits {
            own.push(CutEvent::Point {
                along: hit.first,
                at: hit.at,
            });
            own.push(CutEvent::Point {
                along: hit.second,
                at: hit.at,
            });
        }

        DividerCutter::cut_line(map, id, &own)?;

        let mut split = 0;
        for (divider, events) in others {
            if !map.dividers.contains_key(divider) {
                continue;
            }
            if DividerCutter::cut_divider(map, divider, &events)?.is_some() {
                split += 1;
            }
        }
        Ok(split)
    }
}
