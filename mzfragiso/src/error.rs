//! Error types shared across the crate
use thiserror::Error;

use crate::envelope::EstimationStrategy;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("Unknown element symbol {0:?}")]
    UnknownElement(String),
    #[error("Malformed element count in {0:?}")]
    MalformedCount(String),
    #[error("Unknown amino acid residue {residue:?} in {sequence:?}")]
    UnknownResidue { residue: char, sequence: String },
    #[error("Empty peptide sequence")]
    EmptySequence,
    #[error("Ion charge must be a positive integer, got {0}")]
    InvalidCharge(i32),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvelopeError {
    #[error("The {0} strategy requires at least one captured precursor isotope")]
    EmptyCaptureSet(EstimationStrategy),
    #[error("Charge must be a positive integer, got {0}")]
    InvalidCharge(i32),
    #[error("The {0} strategy requires an isotope spline table, but none was built")]
    SplineTableMissing(EstimationStrategy),
}

/// Failures while processing one spectrum's identifications
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    #[error("Invalid peptide in spectrum {spectrum_index}: {source}")]
    Peptide {
        spectrum_index: usize,
        #[source]
        source: FormulaError,
    },
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NormalizationError {
    #[error("Cannot renormalize a distribution whose total is {0}")]
    NonPositiveTotal(f64),
    #[error("Cannot max-normalize a distribution whose largest value is {0}")]
    NonPositiveMaximum(f64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShardError {
    #[error("The job count must be at least 1")]
    NoJobs,
    #[error("Job id {job_id} is outside of 1..={job_count}")]
    JobOutOfRange { job_id: usize, job_count: usize },
    #[error("Could not parse a job specification from {0:?}, expected JOB/COUNT")]
    Malformed(String),
}
