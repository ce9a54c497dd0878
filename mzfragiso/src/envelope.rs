//! Theoretical isotope envelopes of precursor and fragment ions under several estimation
//! strategies of increasing approximation.
use std::fmt::Display;
use std::str::FromStr;

use tracing::trace;

use crate::averagine::AveragineModel;
use crate::capture::CaptureSet;
use crate::distribution::IsotopeDistribution;
use crate::elements::ElementTable;
use crate::error::EnvelopeError;
use crate::peptide::Ion;
use crate::spline::{IsotopeSplineTable, SplineParams};

/// The ways an ion's isotope envelope can be estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EstimationStrategy {
    /// The ion's own exact distribution, ignoring which precursor isotopes were isolated
    #[cfg_attr(feature = "serde", serde(rename = "exact_precursor"))]
    ExactPrecursor,
    /// The fragment's exact distribution conditioned on the captured precursor isotopes
    #[cfg_attr(feature = "serde", serde(rename = "exact_conditional"))]
    ExactConditional,
    /// An averagine estimate from the ion's average weight alone
    #[cfg_attr(feature = "serde", serde(rename = "approx_precursor"))]
    ApproxPrecursor,
    /// An averagine estimate of the fragment conditioned on the captured precursor isotopes
    #[cfg_attr(feature = "serde", serde(rename = "approx_fragment"))]
    ApproxFragment,
    /// As [`EstimationStrategy::ApproxFragment`] with known sulfur counts
    #[cfg_attr(feature = "serde", serde(rename = "approx_fragment_S"))]
    ApproxFragmentSulfur,
    /// As [`EstimationStrategy::ApproxFragment`], read from an interpolation table
    #[cfg_attr(feature = "serde", serde(rename = "spline_fragment"))]
    SplineFragment,
    /// As [`EstimationStrategy::ApproxFragmentSulfur`], read from an interpolation table
    #[cfg_attr(feature = "serde", serde(rename = "spline_fragment_S"))]
    SplineFragmentSulfur,
}

impl EstimationStrategy {
    pub const ALL: [EstimationStrategy; 7] = [
        Self::ExactPrecursor,
        Self::ExactConditional,
        Self::ApproxPrecursor,
        Self::ApproxFragment,
        Self::ApproxFragmentSulfur,
        Self::SplineFragment,
        Self::SplineFragmentSulfur,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::ExactPrecursor => "exact_precursor",
            Self::ExactConditional => "exact_conditional",
            Self::ApproxPrecursor => "approx_precursor",
            Self::ApproxFragment => "approx_fragment",
            Self::ApproxFragmentSulfur => "approx_fragment_S",
            Self::SplineFragment => "spline_fragment",
            Self::SplineFragmentSulfur => "spline_fragment_S",
        }
    }

    /// Whether the strategy is conditioned on the capture set, and so needs a non-empty one
    pub const fn requires_capture(&self) -> bool {
        !matches!(self, Self::ExactPrecursor | Self::ApproxPrecursor)
    }

    pub const fn requires_splines(&self) -> bool {
        matches!(self, Self::SplineFragment | Self::SplineFragmentSulfur)
    }
}

impl Display for EstimationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EstimationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown estimation strategy {s:?}"))
    }
}

/// Parameters shared by every estimation strategy
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvelopeParams {
    /// How many isotopes the unconditioned strategies compute
    pub lookahead: usize,
    /// Trailing isotopes below this fraction of the tallest peak and beyond the
    /// largest captured isotope are dropped
    pub truncation_threshold: f64,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            lookahead: 7,
            truncation_threshold: 0.1,
        }
    }
}

/// The ion whose envelope is wanted, the precursor it came from and which of that
/// precursor's isotopes were isolated
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeRequest<'a> {
    pub ion: &'a Ion,
    pub precursor: &'a Ion,
    pub capture: &'a CaptureSet,
}

impl<'a> EnvelopeRequest<'a> {
    pub fn new(ion: &'a Ion, precursor: &'a Ion, capture: &'a CaptureSet) -> Self {
        Self {
            ion,
            precursor,
            capture,
        }
    }
}

type StrategyFn = fn(&IsotopeEnvelopeEngine, &EnvelopeRequest) -> Result<Vec<f64>, EnvelopeError>;

/// Produces theoretical isotope distributions for ions.
///
/// Owns the element table, averagine model and the optional spline table, so one engine
/// is built per run and shared by reference across workers.
#[derive(Debug, Clone)]
pub struct IsotopeEnvelopeEngine {
    pub table: ElementTable,
    pub averagine: AveragineModel,
    pub params: EnvelopeParams,
    splines: Option<IsotopeSplineTable>,
}

impl Default for IsotopeEnvelopeEngine {
    fn default() -> Self {
        Self::new(ElementTable::default(), AveragineModel::default(), EnvelopeParams::default())
    }
}

impl IsotopeEnvelopeEngine {
    pub fn new(table: ElementTable, averagine: AveragineModel, params: EnvelopeParams) -> Self {
        Self {
            table,
            averagine,
            params,
            splines: None,
        }
    }

    /// Build the interpolation table the spline strategies read from
    pub fn with_splines(mut self, spline_params: SplineParams) -> Self {
        self.splines = Some(IsotopeSplineTable::build(
            &self.averagine,
            &self.table,
            spline_params,
        ));
        self
    }

    pub fn splines(&self) -> Option<&IsotopeSplineTable> {
        self.splines.as_ref()
    }

    fn dispatch(strategy: EstimationStrategy) -> StrategyFn {
        match strategy {
            EstimationStrategy::ExactPrecursor => Self::exact_precursor,
            EstimationStrategy::ExactConditional => Self::exact_conditional,
            EstimationStrategy::ApproxPrecursor => Self::approx_precursor,
            EstimationStrategy::ApproxFragment => Self::approx_fragment,
            EstimationStrategy::ApproxFragmentSulfur => Self::approx_fragment_sulfur,
            EstimationStrategy::SplineFragment => Self::spline_fragment,
            EstimationStrategy::SplineFragmentSulfur => Self::spline_fragment_sulfur,
        }
    }

    /// The depth of the unconditioned strategies, extended to cover the capture set
    fn unconditioned_depth(&self, capture: &CaptureSet) -> usize {
        capture
            .largest()
            .map(|i| i + 1)
            .unwrap_or_default()
            .max(self.params.lookahead)
    }

    fn exact_precursor(&self, request: &EnvelopeRequest) -> Result<Vec<f64>, EnvelopeError> {
        let depth = self.unconditioned_depth(request.capture);
        Ok(self.table.isotope_distribution(&request.ion.formula, depth))
    }

    fn exact_conditional(&self, request: &EnvelopeRequest) -> Result<Vec<f64>, EnvelopeError> {
        let complement = request.precursor.formula - request.ion.formula;
        Ok(self.table.conditional_fragment_distribution(
            &request.ion.formula,
            &complement,
            request.capture,
        ))
    }

    fn approx_precursor(&self, request: &EnvelopeRequest) -> Result<Vec<f64>, EnvelopeError> {
        let depth = self.unconditioned_depth(request.capture);
        Ok(self
            .averagine
            .distribution(request.ion.average_weight, depth, &self.table))
    }

    fn approx_fragment(&self, request: &EnvelopeRequest) -> Result<Vec<f64>, EnvelopeError> {
        Ok(self.averagine.fragment_distribution(
            request.precursor.average_weight,
            request.ion.average_weight,
            request.capture,
            &self.table,
        ))
    }

    fn approx_fragment_sulfur(&self, request: &EnvelopeRequest) -> Result<Vec<f64>, EnvelopeError> {
        Ok(self.averagine.fragment_distribution_with_sulfur(
            request.precursor.average_weight,
            request.precursor.sulfur_count(),
            request.ion.average_weight,
            request.ion.sulfur_count(),
            request.capture,
            &self.table,
        ))
    }

    fn spline_fragment(&self, request: &EnvelopeRequest) -> Result<Vec<f64>, EnvelopeError> {
        let splines = self
            .splines
            .as_ref()
            .ok_or(EnvelopeError::SplineTableMissing(EstimationStrategy::SplineFragment))?;
        Ok(splines.fragment_distribution(
            &self.averagine,
            &self.table,
            request.precursor.average_weight,
            request.ion.average_weight,
            request.capture,
        ))
    }

    fn spline_fragment_sulfur(&self, request: &EnvelopeRequest) -> Result<Vec<f64>, EnvelopeError> {
        let splines = self.splines.as_ref().ok_or(EnvelopeError::SplineTableMissing(
            EstimationStrategy::SplineFragmentSulfur,
        ))?;
        Ok(splines.fragment_distribution_with_sulfur(
            &self.averagine,
            &self.table,
            request.precursor.average_weight,
            request.precursor.sulfur_count(),
            request.ion.average_weight,
            request.ion.sulfur_count(),
            request.capture,
        ))
    }

    /// Estimate the isotope distribution of `request.ion` with `strategy`.
    ///
    /// The raw distribution is truncated, dropping trailing isotopes below
    /// [`EnvelopeParams::truncation_threshold`] of the tallest peak that lie beyond the
    /// largest captured isotope, then renormalized to sum to 1. Isotope `i` sits at
    /// `ion.mono_mz() + i * isotopic_shift(ion.charge)`.
    ///
    /// # Errors
    /// - [`EnvelopeError::InvalidCharge`] if the ion charge is not positive
    /// - [`EnvelopeError::EmptyCaptureSet`] if `strategy` is conditioned on the capture set
    ///   and it is empty
    /// - [`EnvelopeError::SplineTableMissing`] if a spline strategy is requested before
    ///   [`IsotopeEnvelopeEngine::with_splines`] was called
    pub fn estimate(
        &self,
        strategy: EstimationStrategy,
        request: &EnvelopeRequest,
    ) -> Result<IsotopeDistribution, EnvelopeError> {
        if request.ion.charge < 1 {
            return Err(EnvelopeError::InvalidCharge(request.ion.charge));
        }
        if strategy.requires_capture() && request.capture.is_empty() {
            return Err(EnvelopeError::EmptyCaptureSet(strategy));
        }
        let raw = Self::dispatch(strategy)(self, request)?;
        let mut dist =
            IsotopeDistribution::from_probabilities(request.ion.mono_mz(), request.ion.charge, &raw);
        dist.truncate_uncaptured(self.params.truncation_threshold, request.capture.largest());
        dist.renormalize();
        trace!(
            "Estimated {} isotopes for {} with {strategy}",
            dist.len(),
            request.ion.name()
        );
        Ok(dist)
    }
}
