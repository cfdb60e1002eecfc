//! R-tree index over terminals, dividers and rings.
//!
//! The index holds keys and extents only. The map inserts and removes items
//! as it mutates its arenas, so a query always sees the current graph.

use std::ops::{BitOr, ControlFlow};

use geo_types::{Coord, Rect};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::model::{DividerId, RingId, TerminalId};

/// Wrapper for an arena key to be indexable by rstar.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Indexed<K> {
    key: K,
    envelope: AABB<[f64; 2]>,
}

impl<K> RTreeObject for Indexed<K> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl<K> PointDistance for Indexed<K> {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope.distance_2(point)
    }
}

fn aabb(window: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [window.min().x, window.min().y],
        [window.max().x, window.max().y],
    )
}

fn point(c: Coord<f64>) -> [f64; 2] {
    [c.x, c.y]
}

/// Which kinds of item a query visits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindMask(u8);

impl KindMask {
    pub const TERMINALS: KindMask = KindMask(1);
    pub const DIVIDERS: KindMask = KindMask(2);
    pub const POLYGONS: KindMask = KindMask(4);
    pub const ISLANDS: KindMask = KindMask(8);
    pub const RINGS: KindMask = KindMask(4 | 8);
    pub const ALL: KindMask = KindMask(15);

    pub fn contains(self, other: KindMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for KindMask {
    type Output = KindMask;

    fn bitor(self, rhs: KindMask) -> KindMask {
        KindMask(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexedItem {
    Terminal(TerminalId),
    Divider(DividerId),
    Polygon(RingId),
    Island(RingId),
}

#[derive(Clone)]
pub struct SpatialIndex {
    terminals: RTree<Indexed<TerminalId>>,
    dividers: RTree<Indexed<DividerId>>,
    polygons: RTree<Indexed<RingId>>,
    islands: RTree<Indexed<RingId>>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self {
            terminals: RTree::new(),
            dividers: RTree::new(),
            polygons: RTree::new(),
            islands: RTree::new(),
        }
    }

    /// Builds all four trees in one pass from current extents.
    pub fn bulk_load<T, D, R>(terminals: T, dividers: D, rings: R) -> Self
    where
        T: IntoIterator<Item = (TerminalId, Coord<f64>)>,
        D: IntoIterator<Item = (DividerId, Rect<f64>)>,
        R: IntoIterator<Item = (RingId, Rect<f64>, bool)>,
    {
        let terminals = terminals
            .into_iter()
            .map(|(key, position)| Indexed {
                key,
                envelope: AABB::from_point(point(position)),
            })
            .collect();
        let dividers = dividers
            .into_iter()
            .map(|(key, window)| Indexed {
                key,
                envelope: aabb(window),
            })
            .collect();
        let (polygons, islands): (Vec<_>, Vec<_>) =
            rings.into_iter().partition(|(_, _, polygon)| *polygon);
        let ring_items = |items: Vec<(RingId, Rect<f64>, bool)>| -> Vec<Indexed<RingId>> {
            items
                .into_iter()
                .map(|(key, window, _)| Indexed {
                    key,
                    envelope: aabb(window),
                })
                .collect()
        };
        Self {
            terminals: RTree::bulk_load(terminals),
            dividers: RTree::bulk_load(dividers),
            polygons: RTree::bulk_load(ring_items(polygons)),
            islands: RTree::bulk_load(ring_items(islands)),
        }
    }

    pub fn insert_terminal(&mut self, key: TerminalId, position: Coord<f64>) {
        self.terminals.insert(Indexed {
            key,
            envelope: AABB::from_point(point(position)),
        });
    }

    pub fn remove_terminal(&mut self, key: TerminalId, position: Coord<f64>) -> bool {
        self.terminals
            .remove(&Indexed {
                key,
                envelope: AABB::from_point(point(position)),
            })
            .is_some()
    }

    pub fn insert_divider(&mut self, key: DividerId, window: Rect<f64>) {
        self.dividers.insert(Indexed {
            key,
            envelope: aabb(window),
        });
    }

    pub fn remove_divider(&mut self, key: DividerId, window: Rect<f64>) -> bool {
        self.dividers
            .remove(&Indexed {
                key,
                envelope: aabb(window),
            })
            .is_some()
    }

    pub fn insert_ring(&mut self, key: RingId, window: Rect<f64>, polygon: bool) {
        let item = Indexed {
            key,
            envelope: aabb(window),
        };
        if polygon {
            self.polygons.insert(item);
        } else {
            self.islands.insert(item);
        }
    }

    pub fn remove_ring(&mut self, key: RingId, window: Rect<f64>, polygon: bool) -> bool {
        let item = Indexed {
            key,
            envelope: aabb(window),
        };
        if polygon {
            self.polygons.remove(&item).is_some()
        } else {
            self.islands.remove(&item).is_some()
        }
    }

    /// Visits every item of the masked kinds whose extent intersects
    /// `window`, or every item when `window` is `None`. Returning
    /// `ControlFlow::Break` from `visit` stops the query.
    pub fn query_window<F>(&self, window: Option<Rect<f64>>, mask: KindMask, mut visit: F)
    where
        F: FnMut(IndexedItem) -> ControlFlow<()>,
    {
        let _ = self.visit_all(window.map(aabb), mask, &mut visit);
    }

    fn visit_all<F>(
        &self,
        envelope: Option<AABB<[f64; 2]>>,
        mask: KindMask,
        visit: &mut F,
    ) -> ControlFlow<()>
    where
        F: FnMut(IndexedItem) -> ControlFlow<()>,
    {
        visit_tree(&self.terminals, envelope, mask, KindMask::TERMINALS, IndexedItem::Terminal, visit)?;
        visit_tree(&self.dividers, envelope, mask, KindMask::DIVIDERS, IndexedItem::Divider, visit)?;
        visit_tree(&self.polygons, envelope, mask, KindMask::POLYGONS, IndexedItem::Polygon, visit)?;
        visit_tree(&self.islands, envelope, mask, KindMask::ISLANDS, IndexedItem::Island, visit)
    }

    /// Nearest item of the masked kinds within `tolerance` of `position`.
    /// Extents only pre-filter; `exact` measures the true distance.
    pub fn query_closest<F>(
        &self,
        position: Coord<f64>,
        tolerance: f64,
        mask: KindMask,
        exact: F,
    ) -> Option<IndexedItem>
    where
        F: Fn(IndexedItem) -> f64,
    {
        let p = point(position);
        let r2 = tolerance * tolerance;
        let mut best: Option<(f64, IndexedItem)> = None;
        let mut consider = |item: IndexedItem| {
            let d = exact(item);
            if d <= tolerance && best.map_or(true, |(b, _)| d < b) {
                best = Some((d, item));
            }
        };
        if mask.contains(KindMask::TERMINALS) {
            self.terminals
                .locate_within_distance(p, r2)
                .for_each(|e| consider(IndexedItem::Terminal(e.key)));
        }
        if mask.contains(KindMask::DIVIDERS) {
            self.dividers
                .locate_within_distance(p, r2)
                .for_each(|e| consider(IndexedItem::Divider(e.key)));
        }
        if mask.contains(KindMask::POLYGONS) {
            self.polygons
                .locate_within_distance(p, r2)
                .for_each(|e| consider(IndexedItem::Polygon(e.key)));
        }
        if mask.contains(KindMask::ISLANDS) {
            self.islands
                .locate_within_distance(p, r2)
                .for_each(|e| consider(IndexedItem::Island(e.key)));
        }
        best.map(|(_, item)| item)
    }

    /// The terminal coincident with `position`, if any.
    pub fn find_terminal(&self, position: Coord<f64>, tolerance: f64) -> Option<TerminalId> {
        let p = point(position);
        self.terminals
            .locate_within_distance(p, tolerance * tolerance)
            .map(|e| (e.envelope.distance_2(&p), e.key))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, key)| key)
    }

    /// Polygons whose extent contains `position`; exact containment is the
    /// caller's test.
    pub fn polygons_at(&self, position: Coord<f64>) -> Vec<RingId> {
        self.polygons
            .locate_all_at_point(&point(position))
            .map(|e| e.key)
            .collect()
    }

    pub fn len(&self, mask: KindMask) -> usize {
        let mut n = 0;
        if mask.contains(KindMask::TERMINALS) {
            n += self.terminals.size();
        }
        if mask.contains(KindMask::DIVIDERS) {
            n += self.dividers.size();
        }
        if mask.contains(KindMask::POLYGONS) {
            n += self.polygons.size();
        }
        if mask.contains(KindMask::ISLANDS) {
            n += self.islands.size();
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.len(KindMask::ALL) == 0
    }
}

fn visit_tree<K: Copy, F>(
    tree: &RTree<Indexed<K>>,
    envelope: Option<AABB<[f64; 2]>>,
    mask: KindMask,
    kind: KindMask,
    wrap: fn(K) -> IndexedItem,
    visit: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(IndexedItem) -> ControlFlow<()>,
{
    if !mask.contains(kind) {
        return ControlFlow::Continue(());
    }
    match envelope {
        Some(envelope) => {
            for e in tree.locate_in_envelope_intersecting(&envelope) {
                visit(wrap(e.key))?;
            }
        }
        None => {
            for e in tree.iter() {
                visit(wrap(e.key))?;
            }
        }
    }
    ControlFlow::Continue(())
}
