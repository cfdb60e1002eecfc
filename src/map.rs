//! The topology context: feature store, divider graph, rings and the
//! spatial index, mutated only through `&mut TopologyMap`.

use std::collections::BTreeSet;

use geo_types::Coord;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::config::TopologyConfig;
use crate::error::{RejectReason, Result, TopologyError};
use crate::geometry::{Curve, LineShape};
use crate::graph::{adjacency, islands, BuildReport, PolygonBuilder};
use crate::index::{IndexedItem, KindMask, SpatialIndex};
use crate::model::{
    Divider, DividerId, Face, Label, LabelId, LineFeature, LineId, Ring, RingId, Terminal,
    TerminalId, TerminalOrigin,
};
use crate::noding::{IntersectReport, LineIntersector};

/// Outcome of one `settle` pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettleReport {
    pub intersect: IntersectReport,
    pub build: BuildReport,
}

#[derive(Clone)]
pub struct TopologyMap {
    pub(crate) config: TopologyConfig,
    pub(crate) terminals: SlotMap<TerminalId, Terminal>,
    pub(crate) lines: SlotMap<LineId, LineFeature>,
    pub(crate) dividers: SlotMap<DividerId, Divider>,
    pub(crate) rings: SlotMap<RingId, Ring>,
    pub(crate) labels: SlotMap<LabelId, Label>,
    pub(crate) index: SpatialIndex,
    /// Lines whose dividers must be rebuilt even though they did not move.
    pub(crate) recut: BTreeSet<LineId>,
    /// Rings whose boundary may no longer be valid.
    pub(crate) dirty_rings: BTreeSet<RingId>,
    /// Islands whose container must be searched for again.
    pub(crate) pending_islands: BTreeSet<RingId>,
    pub(crate) pending_labels: BTreeSet<LabelId>,
}

impl Default for TopologyMap {
    fn default() -> Self {
        Self::empty(TopologyConfig::default())
    }
}

impl TopologyMap {
    pub fn new(config: TopologyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::empty(config))
    }

    fn empty(config: TopologyConfig) -> Self {
        Self {
            config,
            terminals: SlotMap::with_key(),
            lines: SlotMap::with_key(),
            dividers: SlotMap::with_key(),
            rings: SlotMap::with_key(),
            labels: SlotMap::with_key(),
            index: SpatialIndex::new(),
            recut: BTreeSet::new(),
            dirty_rings: BTreeSet::new(),
            pending_islands: BTreeSet::new(),
            pending_labels: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub(crate) fn tolerance(&self) -> f64 {
        self.config.length_tolerance
    }

    // ---------------------------------------------------------------------
    // Edits
    // ---------------------------------------------------------------------

    /// Adds a point feature. A position within tolerance of an existing
    /// terminal yields that terminal, promoted to a point feature if it was
    /// an intersection terminal.
    pub fn add_point(&mut self, position: Coord<f64>) -> Result<TerminalId> {
        check_finite(position)?;
        if let Some(existing) = self.index.find_terminal(position, self.tolerance()) {
            let terminal = self.terminal_mut(existing)?;
            terminal.origin = TerminalOrigin::Point;
            return Ok(existing);
        }
        let id = self
            .terminals
            .insert(Terminal::new(position, TerminalOrigin::Point));
        self.index.insert_terminal(id, position);
        Ok(id)
    }

    /// Moves a point feature, dragging the ends of its lines along. The lines
    /// are marked moved; the next `intersect` re-cuts them.
    pub fn move_point(&mut self, id: TerminalId, position: Coord<f64>) -> Result<()> {
        check_finite(position)?;
        let terminal = self
            .terminals
            .get(id)
            .ok_or(RejectReason::UnknownPoint(id))?;
        if !terminal.is_point() {
            return Err(RejectReason::NotAPoint(id).into());
        }
        let old = terminal.position;

        let mut landing = None;
        for item in self.coincident_terminals(position) {
            if item == id {
                continue;
            }
            if self.terminals[item].is_point() {
                return Err(RejectReason::CoincidentPoint.into());
            }
            landing = Some(item);
        }

        // validate every reshaped line before touching anything
        let attached: Vec<LineId> = terminal.lines.to_vec();
        let mut reshaped = Vec::with_capacity(attached.len());
        for line_id in attached {
            let line = self.line_ref(line_id)?;
            let start = if line.start == id {
                position
            } else {
                self.terminal_ref(line.start)?.position
            };
            let end = if line.end == id {
                position
            } else {
                self.terminal_ref(line.end)?.position
            };
            let curve = Curve::from_shape(start, end, &line.shape)?;
            if line.topological && curve.length() <= self.tolerance() {
                return Err(RejectReason::ZeroLength {
                    line: Some(line_id),
                }
                .into());
            }
            reshaped.push((line_id, curve));
        }

        // lines cut at this terminal must drop their stale cut
        let mut stale: BTreeSet<LineId> = self.lines_through(id);
        if let Some(synthetic) = landing {
            stale.extend(self.lines_through(synthetic));
        }

        self.index.remove_terminal(id, old);
        self.index.insert_terminal(id, position);
        self.terminals[id].position = position;
        for (line_id, curve) in reshaped {
            let line = &mut self.lines[line_id];
            line.curve = curve;
            line.moved = true;
            stale.remove(&line_id);
        }
        self.recut.extend(stale);
        log::trace!("moved point {:?} from {:?} to {:?}", id, old, position);
        Ok(())
    }

    /// Removes a point feature no line ends at.
    pub fn delete_point(&mut self, id: TerminalId) -> Result<()> {
        let terminal = self
            .terminals
            .get(id)
            .ok_or(RejectReason::UnknownPoint(id))?;
        if !terminal.is_point() {
            return Err(RejectReason::NotAPoint(id).into());
        }
        if !terminal.lines.is_empty() {
            return Err(RejectReason::PointInUse {
                lines: terminal.lines.len(),
            }
            .into());
        }
        if terminal.dividers.is_empty() {
            let position = terminal.position;
            self.index.remove_terminal(id, position);
            self.terminals.remove(id);
        } else {
            // still a crossing of other lines; let the next pass decide
            let through = self.lines_through(id);
            self.terminals[id].origin = TerminalOrigin::Intersection;
            self.recut.extend(through);
        }
        Ok(())
    }

    pub fn add_line(
        &mut self,
        start: TerminalId,
        end: TerminalId,
        shape: LineShape,
        topological: bool,
    ) -> Result<LineId> {
        for t in [start, end] {
            let terminal = self.terminals.get(t).ok_or(RejectReason::UnknownPoint(t))?;
            if !terminal.is_point() {
                return Err(RejectReason::NotAPoint(t).into());
            }
        }
        if start == end && matches!(shape, LineShape::Segment) {
            return Err(RejectReason::SelfReference.into());
        }
        let curve = Curve::from_shape(
            self.terminals[start].position,
            self.terminals[end].position,
            &shape,
        )?;
        if curve.length() <= self.tolerance() {
            return Err(RejectReason::ZeroLength { line: None }.into());
        }
        let id = self.lines.insert(LineFeature {
            start,
            end,
            shape,
            curve,
            topological,
            moved: topological,
            dividers: Vec::new(),
        });
        self.terminals[start].lines.push(id);
        if end != start {
            self.terminals[end].lines.push(id);
        }
        Ok(id)
    }

    pub fn delete_line(&mut self, id: LineId) -> Result<()> {
        let line = self.lines.get(id).ok_or(RejectReason::UnknownLine(id))?;
        let (start, end) = (line.start, line.end);
        let neighbours = self.neighbours_of_line(id);
        let touched = self.clear_line_dividers(id);
        for t in [start, end] {
            if let Some(terminal) = self.terminals.get_mut(t) {
                terminal.lines.retain(|l| *l != id);
            }
        }
        self.lines.remove(id);
        self.recut.remove(&id);
        self.recut.extend(neighbours);
        self.release_terminals(touched);
        Ok(())
    }

    /// Toggles whether a line takes part in the topology. Turning it off
    /// drops its dividers; turning it on queues it for intersection.
    pub fn set_topological(&mut self, id: LineId, topological: bool) -> Result<()> {
        let line = self.lines.get(id).ok_or(RejectReason::UnknownLine(id))?;
        if line.topological == topological {
            return Ok(());
        }
        if topological {
            let line = &mut self.lines[id];
            line.topological = true;
            line.moved = true;
        } else {
            let neighbours = self.neighbours_of_line(id);
            let touched = self.clear_line_dividers(id);
            let line = &mut self.lines[id];
            line.topological = false;
            line.moved = false;
            self.recut.remove(&id);
            self.recut.extend(neighbours);
            self.release_terminals(touched);
        }
        Ok(())
    }

    /// Queues a line for re-intersection.
    pub fn mark_moved(&mut self, id: LineId) -> Result<()> {
        let line = self
            .lines
            .get_mut(id)
            .ok_or(RejectReason::UnknownLine(id))?;
        line.moved = true;
        Ok(())
    }

    pub fn add_label(&mut self, position: Coord<f64>, text: impl Into<String>) -> Result<LabelId> {
        check_finite(position)?;
        let id = self.labels.insert(Label {
            position,
            text: text.into(),
            polygon: None,
        });
        islands::resolve_label(self, id);
        Ok(id)
    }

    pub fn move_label(&mut self, id: LabelId, position: Coord<f64>) -> Result<()> {
        check_finite(position)?;
        let label = self.labels.get_mut(id).ok_or(RejectReason::UnknownLabel)?;
        label.position = position;
        islands::resolve_label(self, id);
        Ok(())
    }

    pub fn delete_label(&mut self, id: LabelId) -> Result<()> {
        let label = self.labels.remove(id).ok_or(RejectReason::UnknownLabel)?;
        if let Some(polygon) = label.polygon {
            if let Some(Face::Polygon { labels, .. }) = self.rings.get_mut(polygon).map(|r| &mut r.face) {
                labels.retain(|l| *l != id);
            }
        }
        self.pending_labels.remove(&id);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Processing
    // ---------------------------------------------------------------------

    /// Re-intersects every moved line, together with the lines whose cuts
    /// they invalidated.
    pub fn intersect(&mut self) -> Result<IntersectReport> {
        self.transaction(LineIntersector::run)
    }

    /// Rebuilds every ring touched since the last build. Requires a settled
    /// divider set.
    pub fn build_polygons(&mut self) -> Result<BuildReport> {
        self.transaction(PolygonBuilder::build)
    }

    /// `intersect` followed by `build_polygons`, as one transaction.
    pub fn settle(&mut self) -> Result<SettleReport> {
        self.transaction(Self::settle_in_place)
    }

    /// Runs `f` and settles the result. If either fails the map is left
    /// exactly as it was.
    pub fn edit<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TopologyMap) -> Result<T>,
    {
        self.transaction(|map| {
            let value = f(map)?;
            map.settle_in_place()?;
            Ok(value)
        })
    }

    /// Discards every divider and ring and rebuilds them from line geometry.
    pub fn rebuild_all(&mut self) -> Result<SettleReport> {
        self.transaction(|map| {
            let rings: Vec<RingId> = map.rings.keys().collect();
            map.dirty_rings.extend(rings);
            let lines: Vec<LineId> = map.lines.keys().collect();
            let mut touched = Vec::new();
            for id in lines {
                touched.extend(map.clear_line_dividers(id));
                let line = &mut map.lines[id];
                line.moved = line.topological;
            }
            map.recut.clear();
            map.release_terminals(touched);
            let intersect = LineIntersector::run(map)?;
            adjacency::rebuild(map)?;
            let build = PolygonBuilder::build(map)?;
            Ok(SettleReport { intersect, build })
        })
    }

    fn settle_in_place(&mut self) -> Result<SettleReport> {
        let intersect = LineIntersector::run(self)?;
        let build = PolygonBuilder::build(self)?;
        Ok(SettleReport { intersect, build })
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TopologyMap) -> Result<T>,
    {
        let snapshot = self.snapshot_without_index();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_fatal() {
                    log::warn!("topology update aborted and rolled back: {}", err);
                } else {
                    log::warn!("edit rejected: {}", err);
                }
                *self = snapshot;
                self.reindex();
                Err(err)
            }
        }
    }

    /// A copy of the arenas and queues. The index is left empty; `reindex`
    /// rebuilds it from the arenas when the copy is restored.
    fn snapshot_without_index(&self) -> TopologyMap {
        TopologyMap {
            config: self.config.clone(),
            terminals: self.terminals.clone(),
            lines: self.lines.clone(),
            dividers: self.dividers.clone(),
            rings: self.rings.clone(),
            labels: self.labels.clone(),
            index: SpatialIndex::new(),
            recut: self.recut.clone(),
            dirty_rings: self.dirty_rings.clone(),
            pending_islands: self.pending_islands.clone(),
            pending_labels: self.pending_labels.clone(),
        }
    }

    fn reindex(&mut self) {
        self.index = SpatialIndex::bulk_load(
            self.terminals.iter().map(|(id, t)| (id, t.position)),
            self.dividers.iter().map(|(id, d)| (id, d.window)),
            self.rings
                .iter()
                .map(|(id, r)| (id, r.window, r.is_polygon())),
        );
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn terminal(&self, id: TerminalId) -> Option<&Terminal> {
        self.terminals.get(id)
    }

    pub fn line(&self, id: LineId) -> Option<&LineFeature> {
        self.lines.get(id)
    }

    pub fn divider(&self, id: DividerId) -> Option<&Divider> {
        self.dividers.get(id)
    }

    pub fn ring(&self, id: RingId) -> Option<&Ring> {
        self.rings.get(id)
    }

    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(id)
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TerminalId, &Terminal)> {
        self.terminals.iter()
    }

    pub fn lines(&self) -> impl Iterator<Item = (LineId, &LineFeature)> {
        self.lines.iter()
    }

    pub fn dividers(&self) -> impl Iterator<Item = (DividerId, &Divider)> {
        self.dividers.iter()
    }

    pub fn rings(&self) -> impl Iterator<Item = (RingId, &Ring)> {
        self.rings.iter()
    }

    pub fn polygons(&self) -> impl Iterator<Item = (RingId, &Ring)> {
        self.rings.iter().filter(|(_, r)| r.is_polygon())
    }

    pub fn islands(&self) -> impl Iterator<Item = (RingId, &Ring)> {
        self.rings.iter().filter(|(_, r)| r.is_island())
    }

    pub fn line_dividers(&self, id: LineId) -> &[DividerId] {
        self.lines
            .get(id)
            .map(|l| l.dividers.as_slice())
            .unwrap_or(&[])
    }

    pub fn labels_of(&self, polygon: RingId) -> &[LabelId] {
        self.rings.get(polygon).map(|r| r.labels()).unwrap_or(&[])
    }

    /// Whether the line has dividers in the current partition.
    pub fn has_topology(&self, id: LineId) -> bool {
        self.lines
            .get(id)
            .map_or(false, |l| l.topological && !l.dividers.is_empty())
    }

    /// Whether the line's first divider dangles at the line's start.
    pub fn is_start_dangle(&self, id: LineId) -> bool {
        self.lines
            .get(id)
            .and_then(|l| l.dividers.first())
            .map_or(false, |d| self.divider_is_start_dangle(*d))
    }

    pub fn is_end_dangle(&self, id: LineId) -> bool {
        self.lines
            .get(id)
            .and_then(|l| l.dividers.last())
            .map_or(false, |d| self.divider_is_end_dangle(*d))
    }

    pub fn divider_is_start_dangle(&self, id: DividerId) -> bool {
        self.dividers.get(id).map_or(false, |d| d.dangle.start)
    }

    pub fn divider_is_end_dangle(&self, id: DividerId) -> bool {
        self.dividers.get(id).map_or(false, |d| d.dangle.end)
    }

    /// Islands still waiting for their container to be resolved.
    pub fn islands_needing_rebuild(&self) -> Vec<RingId> {
        self.pending_islands
            .iter()
            .copied()
            .filter(|id| self.rings.contains_key(*id))
            .collect()
    }

    /// Lines with pending re-intersection.
    pub fn moved_lines(&self) -> Vec<LineId> {
        self.lines
            .iter()
            .filter(|(_, l)| l.moved)
            .map(|(id, _)| id)
            .collect()
    }

    /// Polygon area less the area of the islands it owns.
    pub fn net_area(&self, polygon: RingId) -> Option<f64> {
        let ring = self.rings.get(polygon).filter(|r| r.is_polygon())?;
        let holes: f64 = ring
            .islands()
            .iter()
            .filter_map(|i| self.rings.get(*i))
            .map(|i| i.area.abs())
            .sum();
        Some(ring.area - holes)
    }

    /// The smallest polygon strictly containing `position`.
    pub fn polygon_at(&self, position: Coord<f64>) -> Option<RingId> {
        islands::polygon_containing(self, position, None)
    }

    /// The topological line passing closest to `position`, within `tolerance`.
    pub fn line_at(&self, position: Coord<f64>, tolerance: f64) -> Option<LineId> {
        let item = self
            .index
            .query_closest(position, tolerance, KindMask::DIVIDERS, |item| match item {
                IndexedItem::Divider(d) => self
                    .dividers
                    .get(d)
                    .map_or(f64::INFINITY, |d| d.curve.distance_to(position)),
                _ => f64::INFINITY,
            })?;
        match item {
            IndexedItem::Divider(d) => self.dividers.get(d).map(|d| d.line),
            _ => None,
        }
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    // ---------------------------------------------------------------------
    // Graph maintenance shared by the noding and graph stages
    // ---------------------------------------------------------------------

    pub(crate) fn terminal_ref(&self, id: TerminalId) -> Result<&Terminal> {
        self.terminals
            .get(id)
            .ok_or_else(|| TopologyError::Corrupt(format!("missing terminal {:?}", id)))
    }

    pub(crate) fn terminal_mut(&mut self, id: TerminalId) -> Result<&mut Terminal> {
        self.terminals
            .get_mut(id)
            .ok_or_else(|| TopologyError::Corrupt(format!("missing terminal {:?}", id)))
    }

    pub(crate) fn line_ref(&self, id: LineId) -> Result<&LineFeature> {
        self.lines
            .get(id)
            .ok_or_else(|| TopologyError::Corrupt(format!("missing line {:?}", id)))
    }

    pub(crate) fn divider_ref(&self, id: DividerId) -> Result<&Divider> {
        self.dividers
            .get(id)
            .ok_or_else(|| TopologyError::Corrupt(format!("missing divider {:?}", id)))
    }

    fn coincident_terminals(&self, position: Coord<f64>) -> SmallVec<[TerminalId; 2]> {
        let tolerance = self.tolerance();
        let mut found = SmallVec::new();
        let window = crate::geometry::grow(geo_types::Rect::new(position, position), tolerance);
        self.index
            .query_window(Some(window), KindMask::TERMINALS, |item| {
                if let IndexedItem::Terminal(t) = item {
                    if self
                        .terminals
                        .get(t)
                        .map_or(false, |term| distance(term.position, position) <= tolerance)
                    {
                        found.push(t);
                    }
                }
                std::ops::ControlFlow::Continue(())
            });
        found
    }

    /// The terminal at `position`, created as an intersection terminal when
    /// none exists.
    pub(crate) fn find_or_create_terminal(&mut self, position: Coord<f64>) -> TerminalId {
        if let Some(existing) = self.index.find_terminal(position, self.tolerance()) {
            return existing;
        }
        let id = self
            .terminals
            .insert(Terminal::new(position, TerminalOrigin::Intersection));
        self.index.insert_terminal(id, position);
        id
    }

    /// Installs a divider: arena, index, terminal lists and adjacency.
    pub(crate) fn insert_divider(&mut self, divider: Divider) -> Result<DividerId> {
        let (start, end, window, overlap) =
            (divider.start, divider.end, divider.window, divider.is_overlap());
        self.terminal_ref(start)?;
        self.terminal_ref(end)?;
        let id = self.dividers.insert(divider);
        self.index.insert_divider(id, window);
        self.terminals[start].dividers.push(id);
        self.terminals[end].dividers.push(id);
        if !overlap {
            adjacency::attach(self, id)?;
        }
        self.touch_terminal(start);
        self.touch_terminal(end);
        Ok(id)
    }

    /// Uninstalls a divider, dirtying every ring that used it or meets it.
    pub(crate) fn remove_divider(&mut self, id: DividerId) -> Option<Divider> {
        let (start, end, left, right) = {
            let d = self.dividers.get(id)?;
            (d.start, d.end, d.left, d.right)
        };
        self.dirty_rings.extend(left);
        self.dirty_rings.extend(right);
        adjacency::detach(self, id);
        for t in [start, end] {
            if let Some(terminal) = self.terminals.get_mut(t) {
                terminal.dividers.retain(|d| *d != id);
            }
        }
        let divider = self.dividers.remove(id)?;
        self.index.remove_divider(id, divider.window);
        self.touch_terminal(start);
        self.touch_terminal(end);
        Some(divider)
    }

    /// Marks every ring incident on a terminal for rebuild.
    pub(crate) fn touch_terminal(&mut self, id: TerminalId) {
        let Some(terminal) = self.terminals.get(id) else {
            return;
        };
        for d in &terminal.dividers {
            if let Some(divider) = self.dividers.get(*d) {
                self.dirty_rings.extend(divider.left);
                self.dirty_rings.extend(divider.right);
            }
        }
    }

    /// Removes every divider of a line; returns the terminals they ended at.
    pub(crate) fn clear_line_dividers(&mut self, id: LineId) -> Vec<TerminalId> {
        let Some(line) = self.lines.get_mut(id) else {
            return Vec::new();
        };
        let dividers = std::mem::take(&mut line.dividers);
        let mut touched = Vec::with_capacity(dividers.len() + 1);
        for d in dividers {
            if let Some(removed) = self.remove_divider(d) {
                touched.push(removed.start);
                touched.push(removed.end);
            }
        }
        touched
    }

    /// Drops intersection terminals no divider ends at any more.
    pub(crate) fn release_terminals<I>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = TerminalId>,
    {
        let mut released = 0;
        for t in candidates {
            let unused = self.terminals.get(t).map_or(false, |term| {
                term.origin == TerminalOrigin::Intersection && term.dividers.is_empty()
            });
            if unused {
                if let Some(term) = self.terminals.remove(t) {
                    self.index.remove_terminal(t, term.position);
                    released += 1;
                }
            }
        }
        released
    }

    /// Lines with a divider ending at the terminal.
    pub(crate) fn lines_through(&self, id: TerminalId) -> BTreeSet<LineId> {
        self.terminals
            .get(id)
            .map(|t| {
                t.dividers
                    .iter()
                    .filter_map(|d| self.dividers.get(*d))
                    .map(|d| d.line)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Other lines sharing a terminal with any of this line's dividers.
    pub(crate) fn neighbours_of_line(&self, id: LineId) -> BTreeSet<LineId> {
        let mut out = BTreeSet::new();
        for d in self.line_dividers(id) {
            if let Some(divider) = self.dividers.get(*d) {
                out.extend(self.lines_through(divider.start));
                out.extend(self.lines_through(divider.end));
            }
        }
        out.remove(&id);
        out
    }
}

fn check_finite(position: Coord<f64>) -> Result<()> {
    if position.x.is_finite() && position.y.is_finite() {
        Ok(())
    } else {
        Err(RejectReason::InvalidShape(format!("non-finite coordinate {:?}", position)).into())
    }
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[test]
    fn test_add_point_reuses_coincident_terminal() {
        let mut map = TopologyMap::default();
        let a = map.add_point(c(1.0, 1.0)).unwrap();
        let b = map.add_point(c(1.0004, 1.0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(map.terminals().count(), 1);
    }

    #[test]
    fn test_add_line_rejections() {
        let mut map = TopologyMap::default();
        let a = map.add_point(c(0.0, 0.0)).unwrap();
        assert_eq!(
            map.add_line(a, a, LineShape::Segment, true),
            Err(RejectReason::SelfReference.into())
        );
        let arc = LineShape::Arc {
            center: c(0.0, 0.0),
            clockwise: false,
        };
        assert!(matches!(
            map.add_line(a, a, arc, true),
            Err(TopologyError::Rejected(RejectReason::InvalidShape(_)))
        ));
        assert!(map.lines().next().is_none());
    }

    #[test]
    fn test_new_topological_line_is_moved() {
        let mut map = TopologyMap::default();
        let a = map.add_point(c(0.0, 0.0)).unwrap();
        let b = map.add_point(c(5.0, 0.0)).unwrap();
        let line = map.add_line(a, b, LineShape::Segment, true).unwrap();
        let other = map.add_line(a, b, LineShape::Segment, false).unwrap();
        assert_eq!(map.moved_lines(), vec![line]);
        assert!(!map.has_topology(line));
        assert!(!map.has_topology(other));
    }

    #[test]
    fn test_delete_point_in_use() {
        let mut map = TopologyMap::default();
        let a = map.add_point(c(0.0, 0.0)).unwrap();
        let b = map.add_point(c(5.0, 0.0)).unwrap();
        let line = map.add_line(a, b, LineShape::Segment, true).unwrap();
        assert_eq!(
            map.delete_point(a),
            Err(RejectReason::PointInUse { lines: 1 }.into())
        );
        map.delete_line(line).unwrap();
        map.delete_point(a).unwrap();
        assert!(map.terminal(a).is_none());
    }

    #[test]
    fn test_move_point_onto_point_is_rejected() {
        let mut map = TopologyMap::default();
        let a = map.add_point(c(0.0, 0.0)).unwrap();
        map.add_point(c(5.0, 0.0)).unwrap();
        assert_eq!(
            map.move_point(a, c(5.0, 0.0005)),
            Err(RejectReason::CoincidentPoint.into())
        );
        assert_eq!(map.terminal(a).unwrap().position, c(0.0, 0.0));
    }

    #[test]
    fn test_rollback_restores_the_index() {
        let mut map = TopologyMap::default();
        let corners = [c(0.0, 0.0), c(10.0, 0.0), c(10.0, 10.0), c(0.0, 10.0)];
        let ids: Vec<TerminalId> = corners.iter().map(|p| map.add_point(*p).unwrap()).collect();
        let mut sides = Vec::new();
        for i in 0..4 {
            sides.push(
                map.add_line(ids[i], ids[(i + 1) % 4], LineShape::Segment, true)
                    .unwrap(),
            );
        }
        map.settle().unwrap();
        let parcel = map.polygon_at(c(5.0, 5.0)).unwrap();

        // settle a split, then fail the edit afterwards
        let result = map.edit(|map| {
            let a = map.add_point(c(5.0, -2.0))?;
            let b = map.add_point(c(5.0, 12.0))?;
            map.add_line(a, b, LineShape::Segment, true)?;
            map.settle_in_place()?;
            assert_eq!(map.polygons().count(), 2);
            map.add_line(a, a, LineShape::Segment, true)
        });
        assert_eq!(result, Err(RejectReason::SelfReference.into()));

        assert_eq!(map.polygon_at(c(2.0, 5.0)), Some(parcel));
        assert_eq!(map.polygon_at(c(8.0, 5.0)), Some(parcel));
        assert!(map.index().find_terminal(c(5.0, -2.0), 1e-3).is_none());
        assert!(map.index().find_terminal(c(5.0, 0.0), 1e-3).is_none());
        assert_eq!(map.line_at(c(10.0, 5.0), 0.1), Some(sides[1]));
        assert_eq!(map.line_at(c(5.0, 11.0), 0.1), None);
    }

    #[test]
    fn test_invalid_config() {
        let config = TopologyConfig::new().with_length_tolerance(-1.0);
        assert!(TopologyMap::new(config).is_err());
    }
}
