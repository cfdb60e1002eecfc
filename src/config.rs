use crate::error::{RejectReason, Result};

/// Tolerances and tuning knobs shared by every stage of the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct TopologyConfig {
    /// Positions closer than this are the same terminal; curves closer than
    /// this are collinear.
    pub length_tolerance: f64,
    /// Maximum sagitta when an arc is approximated by chords.
    pub arc_chord_tolerance: f64,
    /// Candidate count above which the finder evaluates in parallel.
    pub parallel_threshold: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            length_tolerance: 1e-3,
            arc_chord_tolerance: 1e-4,
            parallel_threshold: 1000,
        }
    }
}

impl TopologyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_length_tolerance(mut self, tolerance: f64) -> Self {
        self.length_tolerance = tolerance;
        self
    }

    pub fn with_arc_chord_tolerance(mut self, tolerance: f64) -> Self {
        self.arc_chord_tolerance = tolerance;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("length_tolerance", self.length_tolerance),
            ("arc_chord_tolerance", self.arc_chord_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(RejectReason::InvalidConfig(format!(
                    "{name} must be a positive finite number, got {value}"
                ))
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerance() {
        let config = TopologyConfig::default();
        assert_eq!(config.length_tolerance, 1e-3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        assert!(TopologyConfig::new().with_length_tolerance(0.0).validate().is_err());
        assert!(TopologyConfig::new().with_arc_chord_tolerance(f64::NAN).validate().is_err());
    }
}
