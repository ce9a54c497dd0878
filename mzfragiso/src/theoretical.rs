//! Comparing the estimation strategies against the exact conditional distribution
//! without any spectra, over an in-silico digest
use itertools::iproduct;
use tracing::{debug, info};

use crate::capture::CaptureSet;
use crate::digest::{Digestion, ProteinEntry};
use crate::distribution::IsotopeDistribution;
use crate::envelope::{EnvelopeRequest, EstimationStrategy, IsotopeEnvelopeEngine};
use crate::error::EnvelopeError;
use crate::peptide::{Ion, IonType, PeptideSequence};
use crate::shard::JobShard;
use crate::stats::ScoreSet;

/// The agreement between one strategy and the exact conditional distribution of one
/// fragment at one capture depth
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TheoreticalRecord {
    pub correlation: f64,
    pub total_variation: f64,
    pub chi_squared: f64,
    pub precursor_mass: f64,
    pub fragment_mass: f64,
    /// The largest captured precursor isotope, the capture set being `0..=max_captured`
    pub max_captured: usize,
    pub fragment_sulfurs: i32,
    pub complement_sulfurs: i32,
    pub method: EstimationStrategy,
    pub peptide: String,
    pub ion: String,
}

#[derive(Debug, Clone)]
pub struct TheoreticalComparison {
    pub engine: IsotopeEnvelopeEngine,
    pub digestion: Digestion,
    pub strategies: Vec<EstimationStrategy>,
    /// Capture sets `0..=k` are tried for every `k` in `1..=max_captured`
    pub max_captured: usize,
}

impl TheoreticalComparison {
    pub fn new(
        engine: IsotopeEnvelopeEngine,
        digestion: Digestion,
        strategies: &[EstimationStrategy],
    ) -> Self {
        let strategies = strategies
            .iter()
            .copied()
            .filter(|s| *s != EstimationStrategy::ExactConditional)
            .collect();
        Self {
            engine,
            digestion,
            strategies,
            max_captured: 10,
        }
    }

    /// Score every strategy for every b and y ion of `peptide` at every capture depth.
    ///
    /// Fragments are singly charged and taken from a singly charged precursor, so the
    /// complement is the neutral remainder of the peptide.
    pub fn compare_peptide(
        &self,
        peptide: &PeptideSequence,
    ) -> Result<Vec<TheoreticalRecord>, EnvelopeError> {
        let table = &self.engine.table;
        let n = peptide.len();
        let mut records = Vec::new();
        let Ok(precursor) = Ion::precursor(peptide.clone(), 1, table) else {
            return Ok(records);
        };
        let mut fragments = Vec::with_capacity(n.saturating_sub(1) * 2);
        for i in 1..n {
            for (seq, kind) in [
                (peptide.prefix(i), IonType::PrefixFragment),
                (peptide.suffix(n - i), IonType::SuffixFragment),
            ] {
                if let Ok(ion) = Ion::new(seq, kind, 1, table) {
                    fragments.push(ion);
                }
            }
        }

        for (fragment, k) in iproduct!(fragments.iter(), 1..=self.max_captured) {
            let capture = CaptureSet::up_to(k);
            let request = EnvelopeRequest::new(fragment, &precursor, &capture);
            let reference = self
                .engine
                .estimate(EstimationStrategy::ExactConditional, &request)?
                .realigned(k + 1);
            let fragment_sulfurs = fragment.sulfur_count();
            for strategy in self.strategies.iter().copied() {
                let estimate: IsotopeDistribution =
                    self.engine.estimate(strategy, &request)?.realigned(k + 1);
                let scores = ScoreSet::compare(&estimate, &reference);
                records.push(TheoreticalRecord {
                    correlation: scores.correlation,
                    total_variation: scores.total_variation,
                    chi_squared: scores.chi_squared,
                    precursor_mass: precursor.average_weight,
                    fragment_mass: fragment.average_weight,
                    max_captured: k,
                    fragment_sulfurs,
                    complement_sulfurs: precursor.sulfur_count() - fragment_sulfurs,
                    method: strategy,
                    peptide: peptide.to_string(),
                    ion: fragment.name(),
                });
            }
        }
        Ok(records)
    }

    /// Digest `protein` and compare every peptide, skipping peptides with residues the
    /// composition model does not know
    pub fn compare_protein(
        &self,
        protein: &ProteinEntry,
    ) -> Result<Vec<TheoreticalRecord>, EnvelopeError> {
        let mut records = Vec::new();
        for peptide in self.digestion.digest(&protein.sequence) {
            match PeptideSequence::new(peptide) {
                Ok(peptide) => records.extend(self.compare_peptide(&peptide)?),
                Err(e) => debug!("Skipping peptide of {}: {e}", protein.identifier),
            }
        }
        Ok(records)
    }

    /// Compare this job's share of `proteins`
    pub fn run(
        &self,
        proteins: &[ProteinEntry],
        shard: JobShard,
    ) -> Result<Vec<TheoreticalRecord>, EnvelopeError> {
        let mut records = Vec::new();
        let mut n_proteins = 0;
        for protein in shard.select(proteins) {
            records.extend(self.compare_protein(protein)?);
            n_proteins += 1;
        }
        info!(
            "Job {shard} compared {} records from {n_proteins} of {} proteins",
            records.len(),
            proteins.len()
        );
        Ok(records)
    }
}
