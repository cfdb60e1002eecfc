use thiserror::Error;

use crate::model::{DividerId, LineId, TerminalId};

/// Why an edit was refused before it touched the topology.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectReason {
    #[error("line {line:?} has zero length")]
    ZeroLength { line: Option<LineId> },

    #[error("a straight segment cannot start and end at the same point")]
    SelfReference,

    #[error("unknown point {0:?}")]
    UnknownPoint(TerminalId),

    #[error("unknown line {0:?}")]
    UnknownLine(LineId),

    #[error("unknown label")]
    UnknownLabel,

    #[error("point is still the end of {lines} line(s)")]
    PointInUse { lines: usize },

    #[error("terminal {0:?} is an intersection terminal, not a point feature")]
    NotAPoint(TerminalId),

    #[error("another point already exists within tolerance of the target position")]
    CoincidentPoint,

    #[error("invalid line shape: {0}")]
    InvalidShape(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Rejected input: {0}")]
    Rejected(#[from] RejectReason),

    /// A cut position lies behind the previous one along the curve.
    #[error("Non-monotonic cut on line {line:?}: {along} follows {previous}")]
    NonMonotonicCut {
        line: LineId,
        along: f64,
        previous: f64,
    },

    /// Ring tracing could not continue at a terminal.
    #[error("Broken adjacency at terminal {terminal:?} arriving on divider {divider:?}")]
    BrokenAdjacency {
        terminal: TerminalId,
        divider: DividerId,
    },

    /// Polygons were requested while lines still await intersection.
    #[error("{lines} line(s) still await intersection")]
    Unsettled { lines: usize },

    #[error("Topology corrupt: {0}")]
    Corrupt(String),
}

impl TopologyError {
    /// Internal-consistency failures abort the enclosing edit; rejected input
    /// is the caller's to fix.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TopologyError::Rejected(_) | TopologyError::Unsettled { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TopologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_are_not_fatal() {
        let err: TopologyError = RejectReason::SelfReference.into();
        assert!(!err.is_fatal());
        assert!(!TopologyError::Unsettled { lines: 2 }.is_fatal());
        assert!(TopologyError::Corrupt("missing terminal".into()).is_fatal());
    }

    #[test]
    fn test_messages() {
        let err: TopologyError = RejectReason::PointInUse { lines: 3 }.into();
        assert_eq!(
            err.to_string(),
            "Rejected input: point is still the end of 3 line(s)"
        );
    }
}
