//! Estimate the isotope envelopes of peptide fragment ions, conditioned on which
//! precursor isotopes the isolation window captured, and measure how well each
//! estimate agrees with observed spectra.
pub mod elements;
pub mod composition;
pub mod peptide;
pub mod error;

pub mod capture;
pub mod distribution;
pub mod normalize;
pub mod isotopes;
pub mod averagine;
pub mod spline;
pub mod envelope;

pub mod matching;
pub mod stats;
pub mod validity;
pub mod counters;
pub mod params;

pub mod batch;
pub mod digest;
pub mod shard;
pub mod theoretical;
pub mod training;
pub mod targeted;

pub use crate::batch::{
    BatchOrchestrator, ComparisonRecord, IonRecord, PeptideSpectrumMatch, SpectrumContext,
    SpectrumOutcome,
};
pub use crate::capture::{CaptureSet, CaptureWindow, PrecursorCaptureResolver};
pub use crate::counters::RunCounters;
pub use crate::distribution::{IsotopeDistribution, IsotopePeak};
pub use crate::elements::{Element, ElementTable};
pub use crate::envelope::{EstimationStrategy, IsotopeEnvelopeEngine};
pub use crate::error::{EnvelopeError, FormulaError, NormalizationError, ProcessingError, ShardError};
pub use crate::matching::{PeakLookup, SpectralMatcher};
pub use crate::normalize::NormalizationMode;
pub use crate::params::{EngineParams, MonoisotopicSearch};
pub use crate::peptide::{Ion, IonType, PeptideSequence};
pub use crate::shard::JobShard;
pub use crate::stats::{ScoreInterpretation, ScoreSet};
pub use crate::validity::ValidityPolicy;
