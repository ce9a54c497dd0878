//! Comparing estimated fragment isotope envelopes with identified spectra
use tracing::{debug, trace, warn};

use crate::capture::{CaptureSet, CaptureWindow, PrecursorCaptureResolver};
use crate::counters::RunCounters;
use crate::distribution::{IsotopeDistribution, IsotopePeak};
use crate::envelope::{EnvelopeRequest, EstimationStrategy, IsotopeEnvelopeEngine};
use crate::error::ProcessingError;
use crate::matching::{PeakLookup, SpectralMatcher};
use crate::normalize::{normalized, NormalizationMode};
use crate::params::{EngineParams, MonoisotopicSearch};
use crate::peptide::{fragment_ions, Ion, PeptideSequence};
use crate::stats::ScoreSet;

/// One candidate peptide identification of a spectrum
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeptideSpectrumMatch {
    pub spectrum_index: usize,
    pub psm_index: usize,
    pub hit_index: usize,
    pub sequence: String,
    pub charge: i32,
    pub score: f64,
}

/// The parts of a spectrum the comparison needs
#[derive(Debug)]
pub struct SpectrumContext<'a, P: PeakLookup + ?Sized> {
    pub index: usize,
    pub native_id: &'a str,
    pub peaks: &'a P,
    /// The selected ion m/z, if the spectrum reported one
    pub precursor_mz: Option<f64>,
    pub isolation: Option<CaptureWindow>,
}

/// A fragment ion considered for a PSM, whether or not it was found
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IonRecord {
    pub ion_id: usize,
    pub spectrum_index: usize,
    pub psm_index: usize,
    pub hit_index: usize,
    pub precursor_sequence: String,
    pub precursor_charge: i32,
    pub ion_sequence: String,
    pub ion_type: String,
    pub ion_charge: i32,
    pub formula: String,
    pub mono_weight: f64,
    pub mz: f64,
    pub search_tolerance: f64,
    pub found: bool,
}

/// The scores of one strategy's estimate for one found ion
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ComparisonRecord {
    pub ion_id: usize,
    pub method: EstimationStrategy,
    pub valid: bool,
    pub mono_weight: f64,
    pub ion_charge: i32,
    pub search_depth: usize,
    pub capture: String,
    pub capture_start: usize,
    pub capture_end: usize,
    pub correlation_observed: f64,
    pub chi_squared_observed: f64,
    pub total_variation_observed: f64,
    pub correlation_reference: f64,
    pub chi_squared_reference: f64,
    pub total_variation_reference: f64,
    pub complete: bool,
    pub complete_at_depth: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IonOutcome {
    pub ion: IonRecord,
    pub comparisons: Vec<ComparisonRecord>,
}

/// Everything produced from one spectrum
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SpectrumOutcome {
    pub ions: Vec<IonOutcome>,
    pub counters: RunCounters,
}

impl SpectrumOutcome {
    /// Assign sequential ion ids starting at `first_id`, returning the next free id
    pub fn number_ions(&mut self, first_id: usize) -> usize {
        let mut next_id = first_id;
        for outcome in self.ions.iter_mut() {
            outcome.ion.ion_id = next_id;
            for comparison in outcome.comparisons.iter_mut() {
                comparison.ion_id = next_id;
            }
            next_id += 1;
        }
        next_id
    }
}

/// Runs the identification-driven comparison, one spectrum at a time.
///
/// Holds no mutable state: every call returns the records and [`RunCounters`] of its
/// spectrum, so spectra may be processed in any order or in parallel and merged after.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    pub params: EngineParams,
    pub engine: IsotopeEnvelopeEngine,
    pub matcher: SpectralMatcher,
    pub resolver: PrecursorCaptureResolver,
}

impl BatchOrchestrator {
    pub fn new(params: EngineParams) -> Self {
        let engine = params.build_engine();
        let matcher = params.matcher();
        let resolver = params.capture_resolver();
        Self {
            params,
            engine,
            matcher,
            resolver,
        }
    }

    fn locate_fragment<P: PeakLookup + ?Sized>(
        &self,
        ion: &Ion,
        capture: &CaptureSet,
        peaks: &P,
    ) -> Option<IsotopePeak> {
        match self.params.mono_search {
            MonoisotopicSearch::Monoisotopic => self.matcher.find_peak(ion.mono_mz(), peaks),
            MonoisotopicSearch::AnyCaptured => {
                let last = capture.largest().unwrap_or_default();
                self.matcher
                    .find_first((0..=last).map(|i| ion.isotope_mz(i)), peaks)
                    .map(|(_, peak)| peak)
            }
        }
    }

    pub fn process_spectrum<P: PeakLookup + ?Sized>(
        &self,
        spectrum: &SpectrumContext<'_, P>,
        psms: &[PeptideSpectrumMatch],
    ) -> Result<SpectrumOutcome, ProcessingError> {
        let mut outcome = SpectrumOutcome::default();
        outcome.counters.spectra_processed += 1;
        for psm in psms {
            outcome.counters.peptide_hits += 1;
            if !self
                .params
                .score_interpretation
                .passes(psm.score, self.params.score_threshold)
            {
                continue;
            }
            outcome.counters.peptide_hits_passing += 1;
            outcome.counters.record_charge(psm.charge);
            if psm.charge < self.params.min_precursor_charge {
                continue;
            }
            match self.process_psm(spectrum, psm, &mut outcome) {
                Ok(()) => {}
                Err(ProcessingError::Peptide { source, .. }) => {
                    warn!(
                        "Skipping PSM {} of spectrum {} ({}): {source}",
                        psm.psm_index, spectrum.index, spectrum.native_id
                    );
                    outcome.counters.invalid_peptides += 1;
                }
                Err(e) => return Err(e),
            }
        }
        debug!(
            "Spectrum {} ({}) produced {} ion records from {} PSMs",
            spectrum.index,
            spectrum.native_id,
            outcome.ions.len(),
            psms.len()
        );
        Ok(outcome)
    }

    fn process_psm<P: PeakLookup + ?Sized>(
        &self,
        spectrum: &SpectrumContext<'_, P>,
        psm: &PeptideSpectrumMatch,
        outcome: &mut SpectrumOutcome,
    ) -> Result<(), ProcessingError> {
        let peptide_error = |source| ProcessingError::Peptide {
            spectrum_index: spectrum.index,
            source,
        };
        let sequence = PeptideSequence::new(&psm.sequence).map_err(peptide_error)?;
        let precursor =
            Ion::precursor(sequence, psm.charge, &self.engine.table).map_err(peptide_error)?;

        let window = self.resolver.window_for(
            spectrum.precursor_mz.unwrap_or_else(|| precursor.mono_mz()),
            spectrum.isolation,
        );
        let capture = self
            .resolver
            .resolve(precursor.mono_mz(), precursor.charge, &window)?;
        if capture.is_empty() {
            trace!(
                "No isotope of {} ({}) fell in the isolation window of spectrum {}",
                psm.sequence,
                psm.charge,
                spectrum.index
            );
            outcome.counters.empty_captures += 1;
            return Ok(());
        }

        for ion in fragment_ions(&precursor, &self.engine.table) {
            outcome.counters.ions_searched += 1;
            let found = self
                .locate_fragment(&ion, &capture, spectrum.peaks)
                .is_some();
            let record = IonRecord {
                ion_id: 0,
                spectrum_index: spectrum.index,
                psm_index: psm.psm_index,
                hit_index: psm.hit_index,
                precursor_sequence: psm.sequence.clone(),
                precursor_charge: psm.charge,
                ion_sequence: ion.sequence.to_string(),
                ion_type: ion.ion_type.to_string(),
                ion_charge: ion.charge,
                formula: ion.formula.to_string(),
                mono_weight: ion.monoisotopic_weight,
                mz: ion.mono_mz(),
                search_tolerance: self.matcher.tolerance_at(ion.mono_mz()),
                found,
            };
            let comparisons = if found {
                self.compare_ion(&ion, &precursor, &capture, spectrum.peaks, &mut outcome.counters)?
            } else {
                Vec::new()
            };
            outcome.ions.push(IonOutcome {
                ion: record,
                comparisons,
            });
        }
        Ok(())
    }

    fn compare_ion<P: PeakLookup + ?Sized>(
        &self,
        ion: &Ion,
        precursor: &Ion,
        capture: &CaptureSet,
        peaks: &P,
        counters: &mut RunCounters,
    ) -> Result<Vec<ComparisonRecord>, ProcessingError> {
        let request = EnvelopeRequest::new(ion, precursor, capture);
        let reference = self
            .engine
            .estimate(EstimationStrategy::ExactConditional, &request)?;
        let observed = self.matcher.match_distribution(&reference, peaks);
        counters.record_observed(&observed.values());

        let complete_at_depth = observed.leading_nonzero();
        let complete = complete_at_depth == observed.len();
        let scaled_observed = normalized(&observed, NormalizationMode::Probability).ok();
        let valid = scaled_observed
            .as_ref()
            .is_some_and(|dist| self.params.validity_policy.is_valid(dist));

        trace!(
            "{} observed {complete_at_depth} of {} isotopes",
            ion.name(),
            observed.len()
        );

        let mut records = Vec::with_capacity(self.params.strategies.len());
        for strategy in self.params.strategies.iter().copied() {
            let estimate = if strategy == EstimationStrategy::ExactConditional {
                reference.clone()
            } else {
                self.aligned_estimate(strategy, &request, reference.len())?
            };
            let vs_observed = scaled_observed
                .as_ref()
                .map(|dist| ScoreSet::compare(dist, &estimate))
                .unwrap_or_else(ScoreSet::failed);
            let vs_reference = ScoreSet::compare(&estimate, &reference);
            records.push(ComparisonRecord {
                ion_id: 0,
                method: strategy,
                valid,
                mono_weight: ion.monoisotopic_weight,
                ion_charge: ion.charge,
                search_depth: reference.len(),
                capture: capture.to_string(),
                capture_start: capture.smallest().unwrap_or_default(),
                capture_end: capture.largest().unwrap_or_default(),
                correlation_observed: vs_observed.correlation,
                chi_squared_observed: vs_observed.chi_squared,
                total_variation_observed: vs_observed.total_variation,
                correlation_reference: vs_reference.correlation,
                chi_squared_reference: vs_reference.chi_squared,
                total_variation_reference: vs_reference.total_variation,
                complete,
                complete_at_depth,
            });
        }
        Ok(records)
    }

    fn aligned_estimate(
        &self,
        strategy: EstimationStrategy,
        request: &EnvelopeRequest,
        length: usize,
    ) -> Result<IsotopeDistribution, ProcessingError> {
        let estimate = self.engine.estimate(strategy, request)?;
        if self.params.align_to_reference && estimate.len() != length {
            Ok(estimate.realigned(length))
        } else {
            Ok(estimate)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mzpeaks::{CentroidPeak, MZPeakSetType};

    fn psm(sequence: &str, charge: i32, score: f64) -> PeptideSpectrumMatch {
        PeptideSpectrumMatch {
            spectrum_index: 0,
            psm_index: 0,
            hit_index: 0,
            sequence: sequence.to_string(),
            charge,
            score,
        }
    }

    fn orchestrator() -> BatchOrchestrator {
        BatchOrchestrator::new(EngineParams {
            strategies: vec![
                EstimationStrategy::ExactConditional,
                EstimationStrategy::ExactPrecursor,
                EstimationStrategy::ApproxFragment,
                EstimationStrategy::ApproxFragmentSulfur,
            ],
            ..Default::default()
        })
    }

    /// Put the first two reference isotopes of every singly charged fragment of
    /// `sequence` into a centroid spectrum
    fn synthetic_spectrum(
        orchestrator: &BatchOrchestrator,
        sequence: &str,
        charge: i32,
    ) -> MZPeakSetType<CentroidPeak> {
        let table = &orchestrator.engine.table;
        let precursor =
            Ion::precursor(PeptideSequence::new(sequence).unwrap(), charge, table).unwrap();
        let capture = CaptureSet::new(0, 1);
        let mut peaks = Vec::new();
        for ion in fragment_ions(&precursor, table)
            .into_iter()
            .filter(|ion| ion.charge == 1)
        {
            let request = EnvelopeRequest::new(&ion, &precursor, &capture);
            let reference = orchestrator
                .engine
                .estimate(EstimationStrategy::ExactConditional, &request)
                .unwrap();
            for peak in reference.iter().take(2) {
                peaks.push(CentroidPeak::new(peak.mz, (peak.value * 1e4) as f32, 0));
            }
        }
        MZPeakSetType::new(peaks)
    }

    #[test_log::test]
    fn test_process_spectrum() {
        let orchestrator = orchestrator();
        let sequence = "PEPTMIDECK";
        let peaks = synthetic_spectrum(&orchestrator, sequence, 2);
        let precursor = Ion::precursor(
            PeptideSequence::new(sequence).unwrap(),
            2,
            &orchestrator.engine.table,
        )
        .unwrap();
        let spectrum = SpectrumContext {
            index: 3,
            native_id: "scan=4",
            peaks: &peaks,
            precursor_mz: Some(precursor.mono_mz()),
            isolation: Some(CaptureWindow::symmetric(precursor.mono_mz(), 0.8)),
        };
        let psms = vec![psm(sequence, 2, 0.001), psm(sequence, 2, 0.5), psm(sequence, 1, 0.001)];
        let mut outcome = orchestrator.process_spectrum(&spectrum, &psms).unwrap();

        let counters = &outcome.counters;
        assert_eq!(counters.peptide_hits, 3);
        assert_eq!(counters.peptide_hits_passing, 2);
        assert_eq!(counters.precursor_charges[&2], 1);
        assert_eq!(counters.precursor_charges[&1], 1);
        // 9 cleavages, b and y, charge 1 only
        assert_eq!(counters.ions_searched, 18);
        assert_eq!(outcome.ions.len(), 18);
        assert_eq!(counters.ions_matched, 18);
        assert!(outcome.ions.iter().all(|o| o.ion.found));

        let next_id = outcome.number_ions(10);
        assert_eq!(next_id, 28);
        let first = &outcome.ions[0];
        assert_eq!(first.ion.ion_id, 10);
        assert_eq!(first.ion.ion_sequence, "P");
        assert_eq!(first.comparisons.len(), 4);
        assert!(first.comparisons.iter().all(|c| c.ion_id == 10));

        for outcome in outcome.ions.iter() {
            let reference = &outcome.comparisons[0];
            assert_eq!(reference.method, EstimationStrategy::ExactConditional);
            assert_eq!(reference.capture, "0-1");
            assert!((reference.correlation_reference - 1.0).abs() < 1e-9);
            assert_eq!(reference.total_variation_reference, 0.0);
            assert!(reference.total_variation_observed < 1e-3);
            for comparison in outcome.comparisons.iter() {
                assert!(comparison.total_variation_reference >= 0.0);
                assert!(comparison.complete_at_depth >= 1);
            }
        }
    }

    #[test]
    fn test_missing_fragments() {
        let orchestrator = orchestrator();
        let peaks: MZPeakSetType<CentroidPeak> = MZPeakSetType::new(vec![]);
        let spectrum = SpectrumContext {
            index: 0,
            native_id: "scan=1",
            peaks: &peaks,
            precursor_mz: None,
            isolation: None,
        };
        let outcome = orchestrator
            .process_spectrum(&spectrum, &[psm("PEPTIDEK", 2, 0.0)])
            .unwrap();
        assert_eq!(outcome.counters.ions_searched, 14);
        assert_eq!(outcome.counters.ions_matched, 0);
        assert!(outcome.counters.searched_at_depth.is_empty());
        assert!(outcome.ions.iter().all(|o| !o.ion.found && o.comparisons.is_empty()));
    }

    #[test]
    fn test_empty_capture() {
        let orchestrator = orchestrator();
        let peaks: MZPeakSetType<CentroidPeak> = MZPeakSetType::new(vec![]);
        let spectrum = SpectrumContext {
            index: 0,
            native_id: "scan=1",
            peaks: &peaks,
            precursor_mz: Some(100.0),
            isolation: Some(CaptureWindow::symmetric(100.0, 0.8)),
        };
        let outcome = orchestrator
            .process_spectrum(&spectrum, &[psm("PEPTIDEK", 2, 0.0)])
            .unwrap();
        assert_eq!(outcome.counters.empty_captures, 1);
        assert!(outcome.ions.is_empty());
    }

    #[test_log::test]
    fn test_bad_sequence() {
        let orchestrator = orchestrator();
        let sequence = "PEPTMIDECK";
        let peaks = synthetic_spectrum(&orchestrator, sequence, 2);
        let precursor = Ion::precursor(
            PeptideSequence::new(sequence).unwrap(),
            2,
            &orchestrator.engine.table,
        )
        .unwrap();
        let spectrum = SpectrumContext {
            index: 7,
            native_id: "scan=8",
            peaks: &peaks,
            precursor_mz: Some(precursor.mono_mz()),
            isolation: Some(CaptureWindow::symmetric(precursor.mono_mz(), 0.8)),
        };
        let psms = vec![psm(sequence, 2, 0.001), psm("PEPXIDEK", 2, 0.001)];
        let outcome = orchestrator.process_spectrum(&spectrum, &psms).unwrap();

        // The unparseable sequence is dropped on its own
        assert_eq!(outcome.ions.len(), 18);
        assert_eq!(outcome.counters.peptide_hits, 2);
        assert_eq!(outcome.counters.peptide_hits_passing, 2);
        assert_eq!(outcome.counters.invalid_peptides, 1);
        assert_eq!(outcome.counters.ions_searched, 18);

        let reversed = vec![psm("PEPXIDEK", 2, 0.001), psm(sequence, 2, 0.001)];
        let again = orchestrator.process_spectrum(&spectrum, &reversed).unwrap();
        assert_eq!(again.ions.len(), 18);
        assert_eq!(again.counters, outcome.counters);
    }
}
