//! The configurable parameters of a comparison run
use std::fmt::Display;
use std::str::FromStr;

use crate::averagine::AveragineModel;
use crate::capture::PrecursorCaptureResolver;
use crate::elements::ElementTable;
use crate::envelope::{EnvelopeParams, EstimationStrategy, IsotopeEnvelopeEngine};
use crate::matching::SpectralMatcher;
use crate::spline::SplineParams;
use crate::stats::ScoreInterpretation;
use crate::validity::ValidityPolicy;

/// Which isotopic peaks of a fragment may establish that it was observed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum MonoisotopicSearch {
    /// Only the monoisotopic peak
    #[default]
    Monoisotopic,
    /// Any isotope up to the largest captured precursor isotope
    AnyCaptured,
}

impl Display for MonoisotopicSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monoisotopic => f.write_str("monoisotopic"),
            Self::AnyCaptured => f.write_str("any-captured"),
        }
    }
}

impl FromStr for MonoisotopicSearch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monoisotopic" | "mono" => Ok(Self::Monoisotopic),
            "any-captured" | "any" => Ok(Self::AnyCaptured),
            _ => Err(format!("Unknown isotope search mode {s:?}")),
        }
    }
}

/// Every tunable of the comparison engine in one place
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineParams {
    /// Peak matching tolerance in parts-per-million
    pub ppm_tolerance: f64,
    /// Trailing isotopes below this fraction of the tallest peak are dropped unless captured
    pub truncation_threshold: f64,
    /// The number of isotopes the unconditioned strategies compute
    pub lookahead: usize,
    /// Identifications must beat this score to be considered
    pub score_threshold: f64,
    pub score_interpretation: ScoreInterpretation,
    pub min_precursor_charge: i32,
    pub validity_policy: ValidityPolicy,
    pub mono_search: MonoisotopicSearch,
    /// Whether approximate distributions are padded or cut to the reference length before
    /// scoring. When unset, length mismatches score as failures.
    pub align_to_reference: bool,
    /// The isolation half-width used when a spectrum does not report one
    pub default_isolation_half_width: f64,
    /// A shift applied to the isolation window before resolving the captured isotopes
    pub isolation_offset: f64,
    /// The strategies to compare, in output order
    pub strategies: Vec<EstimationStrategy>,
    pub spline: SplineParams,
}

impl Default for EngineParams {
    fn default() -> Self {
        let envelope = EnvelopeParams::default();
        Self {
            ppm_tolerance: 20.0,
            truncation_threshold: envelope.truncation_threshold,
            lookahead: envelope.lookahead,
            score_threshold: 0.01,
            score_interpretation: ScoreInterpretation::LowerIsBetter,
            min_precursor_charge: 2,
            validity_policy: ValidityPolicy::default(),
            mono_search: MonoisotopicSearch::default(),
            align_to_reference: true,
            default_isolation_half_width: 0.8,
            isolation_offset: 0.0,
            strategies: EstimationStrategy::ALL.to_vec(),
            spline: SplineParams::default(),
        }
    }
}

impl EngineParams {
    pub fn envelope_params(&self) -> EnvelopeParams {
        EnvelopeParams {
            lookahead: self.lookahead,
            truncation_threshold: self.truncation_threshold,
        }
    }

    pub fn matcher(&self) -> SpectralMatcher {
        SpectralMatcher::new(self.ppm_tolerance)
    }

    pub fn capture_resolver(&self) -> PrecursorCaptureResolver {
        PrecursorCaptureResolver::new(self.isolation_offset, self.default_isolation_half_width)
    }

    pub fn needs_splines(&self) -> bool {
        self.strategies.iter().any(|s| s.requires_splines())
    }

    /// Build the envelope engine, with a spline table only if a spline strategy is enabled
    pub fn build_engine(&self) -> IsotopeEnvelopeEngine {
        let engine = IsotopeEnvelopeEngine::new(
            ElementTable::default(),
            AveragineModel::default(),
            self.envelope_params(),
        );
        if self.needs_splines() {
            engine.with_splines(self.spline)
        } else {
            engine
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = EngineParams::default();
        assert_eq!(params.ppm_tolerance, 20.0);
        assert_eq!(params.strategies.len(), 7);
        assert!(params.needs_splines());
        assert!(params.score_interpretation.passes(0.001, params.score_threshold));

        let params = EngineParams {
            strategies: vec![EstimationStrategy::ApproxFragment],
            ..Default::default()
        };
        let engine = params.build_engine();
        assert!(engine.splines().is_none());
        assert_eq!(engine.params.lookahead, 7);
    }

    #[test]
    fn test_build_engine() {
        let params = EngineParams {
            lookahead: 9,
            truncation_threshold: 0.05,
            ..Default::default()
        };
        let engine = params.build_engine();
        assert_eq!(engine.params.lookahead, 9);
        assert_eq!(engine.params.truncation_threshold, 0.05);
        assert!(engine.splines().is_some());
    }

    #[test]
    fn test_parse_search() {
        assert_eq!(
            "any".parse::<MonoisotopicSearch>(),
            Ok(MonoisotopicSearch::AnyCaptured)
        );
        assert!("every".parse::<MonoisotopicSearch>().is_err());
    }
}
