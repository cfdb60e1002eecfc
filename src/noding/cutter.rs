use std::cmp::Ordering;

use crate::error::{Result, TopologyError};
use crate::geometry::Curve;
use crate::map::TopologyMap;
use crate::model::{Divider, DividerId, DividerKind, LineId, TerminalId};

use super::finder::HitPoint;

/// Something that splits a divider, located by distance from its start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CutEvent {
    Point {
        along: f64,
        at: HitPoint,
    },
    /// A stretch coincident with a divider owned by another line.
    Overlap {
        from: f64,
        to: f64,
        start: HitPoint,
        end: HitPoint,
    },
}

impl CutEvent {
    fn hint(&self) -> f64 {
        match self {
            CutEvent::Point { along, .. } => *along,
            CutEvent::Overlap { from, .. } => *from,
        }
    }
}

/// One replacement piece, in distances along the curve being cut.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CutElement {
    pub from: f64,
    pub to: f64,
    pub start: TerminalId,
    pub end: TerminalId,
    pub overlap: bool,
}

/// Splits lines and dividers into consecutive, gap-free elements bounded by
/// terminals.
pub struct DividerCutter;

impl DividerCutter {
    /// Cuts an uncut line into dividers and installs them.
    pub fn cut_line(map: &mut TopologyMap, line: LineId, events: &[CutEvent]) -> Result<Vec<DividerId>> {
        let feature = map.line_ref(line)?;
        if !feature.dividers.is_empty() {
            return Err(TopologyError::Corrupt(format!(
                "line {:?} is cut while it still has dividers",
                line
            )));
        }
        let curve = feature.curve.clone();
        let ends = (feature.start, feature.end);
        let elements = Self::plan(map, line, &curve, ends, events)?;
        let whole = elements.len() == 1;
        let mut ids = Vec::with_capacity(elements.len());
        for e in &elements {
            let kind = DividerKind::classify(whole, e.overlap);
            ids.push(Self::install(map, line, kind, &curve, e, (e.from, e.to))?);
        }
        map.lines[line].dividers = ids;
        Self::coalesce_overlaps(map, line)?;
        Ok(map.lines[line].dividers.clone())
    }

    /// Re-cuts one existing divider. Returns `None`, leaving the divider
    /// untouched, when the events would reproduce it unchanged.
    pub fn cut_divider(
        map: &mut TopologyMap,
        divider: DividerId,
        events: &[CutEvent],
    ) -> Result<Option<Vec<DividerId>>> {
        let old = map.divider_ref(divider)?.clone();
        let elements = Self::plan(map, old.line, &old.curve, (old.start, old.end), events)?;
        if let [only] = elements.as_slice() {
            if only.overlap == old.is_overlap() {
                return Ok(None);
            }
        }

        let tolerance = map.tolerance();
        let line_length = map.line_ref(old.line)?.curve.length();
        let position = map
            .line_ref(old.line)?
            .dividers
            .iter()
            .position(|d| *d == divider)
            .ok_or_else(|| {
                TopologyError::Corrupt(format!(
                    "divider {:?} is not listed by its line {:?}",
                    divider, old.line
                ))
            })?;
        map.remove_divider(divider);

        let mut ids = Vec::with_capacity(elements.len());
        for e in &elements {
            let span = (old.from + e.from, old.from + e.to);
            let whole = span.0 <= tolerance && span.1 >= line_length - tolerance;
            let kind = DividerKind::classify(whole, e.overlap);
            ids.push(Self::install(map, old.line, kind, &old.curve, e, span)?);
        }
        let dividers = &mut map.lines[old.line].dividers;
        dividers.remove(position);
        for (offset, id) in ids.iter().enumerate() {
            dividers.insert(position + offset, *id);
        }
        Self::coalesce_overlaps(map, old.line)?;
        log::trace!("divider {:?} split into {} piece(s)", divider, ids.len());
        Ok(Some(ids))
    }

    /// Turns events into elements, resolving every boundary to a terminal.
    /// Boundaries within tolerance collapse; a boundary that re-projects
    /// behind its predecessor is an error.
    pub fn plan(
        map: &mut TopologyMap,
        line: LineId,
        curve: &Curve,
        (start, end): (TerminalId, TerminalId),
        events: &[CutEvent],
    ) -> Result<Vec<CutElement>> {
        let tolerance = map.tolerance();
        let length = curve.length();

        let mut spans: Vec<(f64, f64, HitPoint, HitPoint)> = events
            .iter()
            .filter_map(|e| match *e {
                CutEvent::Overlap {
                    from,
                    to,
                    start,
                    end,
                } => Some((from.clamp(0.0, length), to.clamp(0.0, length), start, end)),
                CutEvent::Point { .. } => None,
            })
            .collect();
        spans.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut merged: Vec<(f64, f64, HitPoint, HitPoint)> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(last) if span.0 <= last.1 + tolerance => {
                    if span.1 > last.1 {
                        last.1 = span.1;
                        last.3 = span.3;
                    }
                }
                _ => merged.push(span),
            }
        }
        let inside_span = |along: f64| {
            merged
                .iter()
                .any(|s| along > s.0 + tolerance && along < s.1 - tolerance)
        };

        let mut cuts: Vec<(f64, HitPoint)> = Vec::with_capacity(events.len() + 2 * merged.len());
        let mut ordered: Vec<&CutEvent> = events.iter().collect();
        ordered.sort_by(|a, b| a.hint().total_cmp(&b.hint()));
        for event in ordered {
            if let CutEvent::Point { along, at } = *event {
                if !inside_span(along) {
                    cuts.push((along.clamp(0.0, length), at));
                }
            }
        }
        for s in &merged {
            cuts.push((s.0, s.2));
            cuts.push((s.1, s.3));
        }
        cuts.retain(|(along, _)| *along > tolerance && *along < length - tolerance);
        cuts.sort_by(|a, b| {
            a.0.total_cmp(&b.0).then_with(|| {
                // known terminals first, so they win the merge below
                match (a.1.terminal.is_some(), b.1.terminal.is_some()) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => Ordering::Equal,
                }
            })
        });

        let mut boundaries: Vec<(f64, TerminalId)> = vec![(0.0, start)];
        for (hint, at) in cuts {
            let &(previous, last_terminal) = boundaries
                .last()
                .ok_or_else(|| TopologyError::Corrupt("empty boundary list".into()))?;
            if hint - previous <= tolerance {
                continue;
            }
            let terminal = match at.terminal.filter(|t| map.terminals.contains_key(*t)) {
                Some(t) => t,
                None => map.find_or_create_terminal(at.position),
            };
            let position = map.terminal_ref(terminal)?.position;
            let (along, _) = curve.locate_near(position, hint, tolerance);
            if along < previous - tolerance {
                return Err(TopologyError::NonMonotonicCut {
                    line,
                    along,
                    previous,
                });
            }
            if terminal == last_terminal || along - previous <= tolerance {
                continue;
            }
            if terminal == end && length - along <= tolerance {
                continue;
            }
            boundaries.push((along, terminal));
        }

        let &(previous, _) = boundaries
            .last()
            .ok_or_else(|| TopologyError::Corrupt("empty boundary list".into()))?;
        if previous > length + tolerance {
            return Err(TopologyError::NonMonotonicCut {
                line,
                along: length,
                previous,
            });
        }
        boundaries.push((length, end));

        let mut elements = Vec::with_capacity(boundaries.len() - 1);
        for pair in boundaries.windows(2) {
            let (from, a) = pair[0];
            let (to, b) = pair[1];
            let mid = 0.5 * (from + to);
            elements.push(CutElement {
                from,
                to,
                start: a,
                end: b,
                overlap: merged.iter().any(|s| mid > s.0 && mid < s.1),
            });
        }
        for (_, t) in &boundaries {
            map.touch_terminal(*t);
        }
        Ok(elements)
    }

    fn install(
        map: &mut TopologyMap,
        line: LineId,
        kind: DividerKind,
        curve: &Curve,
        element: &CutElement,
        span: (f64, f64),
    ) -> Result<DividerId> {
        let start = map.terminal_ref(element.start)?.position;
        let end = map.terminal_ref(element.end)?.position;
        let geometry = curve
            .sub_curve(element.from, element.to)
            .with_endpoints(start, end);
        map.insert_divider(Divider::new(
            line,
            kind,
            (element.start, element.end),
            span,
            geometry,
        ))
    }

    /// Merges runs of adjacent overlap dividers of a line into one.
    fn coalesce_overlaps(map: &mut TopologyMap, line: LineId) -> Result<()> {
        let tolerance = map.tolerance();
        let feature = map.line_ref(line)?;
        let curve = feature.curve.clone();
        let length = curve.length();
        let current = feature.dividers.clone();

        let mut result: Vec<DividerId> = Vec::with_capacity(current.len());
        let mut i = 0;
        while i < current.len() {
            let mut j = i;
            while j < current.len() && map.divider_ref(current[j])?.is_overlap() {
                j += 1;
            }
            if j - i < 2 {
                result.push(current[i]);
                i += 1;
                continue;
            }
            let first = map.divider_ref(current[i])?;
            let last = map.divider_ref(current[j - 1])?;
            let element = CutElement {
                from: first.from,
                to: last.to,
                start: first.start,
                end: last.end,
                overlap: true,
            };
            for d in &current[i..j] {
                map.remove_divider(*d);
            }
            let whole = element.from <= tolerance && element.to >= length - tolerance;
            let kind = DividerKind::classify(whole, true);
            result.push(Self::install(
                map,
                line,
                kind,
                &curve,
                &element,
                (element.from, element.to),
            )?);
            i = j;
        }
        map.lines[line].dividers = result;
        Ok(())
    }
}
