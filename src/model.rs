//! Arena records of the topology graph.
//!
//! Everything refers to everything else through slotmap keys; back
//! references (island to container, divider to ring) are plain lookups.

use geo_types::{Coord, Rect};
use smallvec::SmallVec;

use crate::geometry::{Curve, LineShape};

slotmap::new_key_type! {
    /// A point feature or a synthetic intersection terminal.
    pub struct TerminalId;
    /// A line feature.
    pub struct LineId;
    /// A topological edge: one contiguous piece of one line.
    pub struct DividerId;
    /// A closed ring of divider sides (polygon or island).
    pub struct RingId;
    /// An attribute label placed inside a polygon.
    pub struct LabelId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalOrigin {
    /// A durable, user-visible point feature.
    Point,
    /// Created where dividers cross without an existing point.
    Intersection,
}

#[derive(Clone, Debug)]
pub struct Terminal {
    pub position: Coord<f64>,
    pub origin: TerminalOrigin,
    /// Lines that start or end here.
    pub lines: SmallVec<[LineId; 4]>,
    /// Every divider with an end here, overlaps included. A divider that
    /// starts and ends here is listed twice.
    pub dividers: SmallVec<[DividerId; 4]>,
    /// Face-forming half-edges leaving this terminal.
    /// INVARIANT: sorted counter-clockwise by departure angle.
    pub outgoing: Vec<HalfEdge>,
}

impl Terminal {
    pub fn new(position: Coord<f64>, origin: TerminalOrigin) -> Self {
        Self {
            position,
            origin,
            lines: SmallVec::new(),
            dividers: SmallVec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn is_point(&self) -> bool {
        self.origin == TerminalOrigin::Point
    }
}

/// One face-adjacent direction of a divider. The forward side is traversed
/// start to end and faces the divider's left; the reverse side faces its
/// right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Side {
    pub divider: DividerId,
    pub forward: bool,
}

impl Side {
    pub fn new(divider: DividerId, forward: bool) -> Self {
        Self { divider, forward }
    }

    pub fn twin(self) -> Self {
        Self {
            divider: self.divider,
            forward: !self.forward,
        }
    }
}

/// A side named by the stretch of line it runs along rather than by divider,
/// so it survives a re-cut that reproduces the same pieces. Distances are in
/// whole multiples of the length tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SideKey {
    pub line: LineId,
    pub forward: bool,
    pub from: i64,
    pub to: i64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfEdge {
    pub side: Side,
    /// Departure direction in `(-PI, PI]`.
    pub angle: f64,
    /// Signed curvature at departure, breaks ties between tangent curves.
    pub curvature: f64,
}

#[derive(Clone, Debug)]
pub struct LineFeature {
    pub start: TerminalId,
    pub end: TerminalId,
    pub shape: LineShape,
    pub curve: Curve,
    pub topological: bool,
    /// Pending re-intersection.
    pub moved: bool,
    /// Ordered start to end, gap-free and non-overlapping.
    pub dividers: Vec<DividerId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DividerKind {
    /// The whole, uncut line.
    Line,
    /// An ordinary cut piece of a line.
    Section,
    /// A piece coincident with another line's divider.
    SectionOverlap,
    /// A whole line coincident with other dividers.
    LineOverlap,
}

impl DividerKind {
    pub fn is_overlap(self) -> bool {
        matches!(self, DividerKind::SectionOverlap | DividerKind::LineOverlap)
    }

    pub fn classify(whole_line: bool, overlap: bool) -> Self {
        match (whole_line, overlap) {
            (true, false) => DividerKind::Line,
            (false, false) => DividerKind::Section,
            (false, true) => DividerKind::SectionOverlap,
            (true, true) => DividerKind::LineOverlap,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DangleFlags {
    pub start: bool,
    pub end: bool,
}

impl DangleFlags {
    pub fn any(self) -> bool {
        self.start || self.end
    }
}

#[derive(Clone, Debug)]
pub struct Divider {
    pub line: LineId,
    pub kind: DividerKind,
    pub start: TerminalId,
    pub end: TerminalId,
    /// Distances along the owning line.
    pub from: f64,
    pub to: f64,
    pub curve: Curve,
    pub window: Rect<f64>,
    pub left: Option<RingId>,
    pub right: Option<RingId>,
    pub dangle: DangleFlags,
}

impl Divider {
    pub fn new(
        line: LineId,
        kind: DividerKind,
        (start, end): (TerminalId, TerminalId),
        (from, to): (f64, f64),
        curve: Curve,
    ) -> Self {
        let window = curve.window();
        Self {
            line,
            kind,
            start,
            end,
            from,
            to,
            curve,
            window,
            left: None,
            right: None,
            dangle: DangleFlags::default(),
        }
    }

    pub fn is_overlap(&self) -> bool {
        self.kind.is_overlap()
    }

    pub fn is_dangle(&self) -> bool {
        self.dangle.any()
    }

    /// Takes part in face assembly.
    pub fn forms_faces(&self) -> bool {
        !self.is_overlap() && !self.is_dangle()
    }

    pub fn face(&self, forward: bool) -> Option<RingId> {
        if forward {
            self.left
        } else {
            self.right
        }
    }

    pub fn face_mut(&mut self, forward: bool) -> &mut Option<RingId> {
        if forward {
            &mut self.left
        } else {
            &mut self.right
        }
    }

    /// Terminal a side departs from.
    pub fn origin(&self, forward: bool) -> TerminalId {
        if forward {
            self.start
        } else {
            self.end
        }
    }

    /// Terminal a side arrives at.
    pub fn destination(&self, forward: bool) -> TerminalId {
        if forward {
            self.end
        } else {
            self.start
        }
    }

    /// Geometry in the direction of travel of a side.
    pub fn side_key(&self, forward: bool, tolerance: f64) -> SideKey {
        SideKey {
            line: self.line,
            forward,
            from: (self.from / tolerance).round() as i64,
            to: (self.to / tolerance).round() as i64,
        }
    }

    pub fn side_curve(&self, forward: bool) -> Curve {
        if forward {
            self.curve.clone()
        } else {
            self.curve.reversed()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Face {
    Polygon {
        islands: Vec<RingId>,
        labels: Vec<LabelId>,
    },
    /// `container == None` is a floating island.
    Island { container: Option<RingId> },
}

#[derive(Clone, Debug)]
pub struct Ring {
    /// In traversal order; the face lies to the left of travel.
    pub sides: Vec<Side>,
    /// Signed: positive for polygons, negative for islands.
    pub area: f64,
    pub window: Rect<f64>,
    pub face: Face,
    /// Sorted keys of `sides`, fixed when the ring was traced.
    pub signature: Vec<SideKey>,
}

impl Ring {
    pub fn is_polygon(&self) -> bool {
        matches!(self.face, Face::Polygon { .. })
    }

    pub fn is_island(&self) -> bool {
        matches!(self.face, Face::Island { .. })
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.face, Face::Island { container: None })
    }

    pub fn container(&self) -> Option<RingId> {
        match self.face {
            Face::Island { container } => container,
            Face::Polygon { .. } => None,
        }
    }

    pub fn islands(&self) -> &[RingId] {
        match &self.face {
            Face::Polygon { islands, .. } => islands,
            Face::Island { .. } => &[],
        }
    }

    pub fn labels(&self) -> &[LabelId] {
        match &self.face {
            Face::Polygon { labels, .. } => labels,
            Face::Island { .. } => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub position: Coord<f64>,
    pub text: String,
    pub polygon: Option<RingId>,
}
