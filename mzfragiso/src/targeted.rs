//! Following the fragments of one known precursor across spectra, keeping the raw
//! signal around each found fragment next to its modeled envelopes
use tracing::debug;

use crate::batch::SpectrumContext;
use crate::capture::{CaptureSet, PrecursorCaptureResolver};
use crate::envelope::{EnvelopeRequest, EstimationStrategy, IsotopeEnvelopeEngine};
use crate::error::ProcessingError;
use crate::matching::{PeakLookup, SpectralMatcher};
use crate::normalize::{normalize, NormalizationMode};
use crate::params::EngineParams;
use crate::peptide::{fragment_ions, Ion};

/// The models drawn next to the observed signal
pub const TARGETED_STRATEGIES: [EstimationStrategy; 3] = [
    EstimationStrategy::ExactConditional,
    EstimationStrategy::ApproxFragment,
    EstimationStrategy::ApproxFragmentSulfur,
];

/// Profile signal arrays of a spectrum
#[derive(Debug, Clone, Copy)]
pub struct ProfileSignal<'a> {
    pub mzs: &'a [f64],
    pub intensities: &'a [f32],
}

/// One point of the observed signal trace of a fragment
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TraceRecord {
    #[cfg_attr(feature = "serde", serde(rename = "isotope.range"))]
    pub isotope_range: String,
    #[cfg_attr(feature = "serde", serde(rename = "ion.index"))]
    pub ion_index: usize,
    #[cfg_attr(feature = "serde", serde(rename = "ion.name"))]
    pub ion_name: String,
    pub mz: f64,
    #[cfg_attr(feature = "serde", serde(rename = "int"))]
    pub intensity: f64,
}

/// One isotope of a modeled envelope of a fragment
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ModelRecord {
    #[cfg_attr(feature = "serde", serde(rename = "isotope.range"))]
    pub isotope_range: String,
    #[cfg_attr(feature = "serde", serde(rename = "ion.index"))]
    pub ion_index: usize,
    #[cfg_attr(feature = "serde", serde(rename = "ion.name"))]
    pub ion_name: String,
    pub mz: f64,
    #[cfg_attr(feature = "serde", serde(rename = "int"))]
    pub intensity: f64,
    pub method: EstimationStrategy,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TargetedOutcome {
    pub trace: Vec<TraceRecord>,
    pub models: Vec<ModelRecord>,
    pub ions_found: usize,
}

#[derive(Debug, Clone)]
pub struct TargetedComparison {
    pub engine: IsotopeEnvelopeEngine,
    pub matcher: SpectralMatcher,
    pub resolver: PrecursorCaptureResolver,
    pub precursor: Ion,
    pub fragments: Vec<Ion>,
}

impl TargetedComparison {
    pub fn new(params: &EngineParams, precursor: Ion) -> Self {
        let engine = params.build_engine();
        let fragments = fragment_ions(&precursor, &engine.table);
        Self {
            engine,
            matcher: params.matcher(),
            resolver: params.capture_resolver(),
            precursor,
            fragments,
        }
    }

    /// Collect the profile points between `lower` and `upper` inclusive, scaled to the
    /// tallest of them, bracketed by zero-intensity points at `start` and `end`
    fn trace_between(
        profile: &ProfileSignal<'_>,
        lower: f64,
        upper: f64,
        start: f64,
        end: f64,
    ) -> Vec<(f64, f64)> {
        let window: Vec<(f64, f64)> = profile
            .mzs
            .iter()
            .zip(profile.intensities)
            .filter(|(mz, _)| **mz >= lower && **mz <= upper)
            .map(|(mz, int)| (*mz, *int as f64))
            .collect();
        let max_intensity = window.iter().map(|(_, i)| *i).fold(0.0, f64::max);
        let mut points = Vec::with_capacity(window.len() + 2);
        points.push((start, 0.0));
        points.extend(window.into_iter().map(|(mz, i)| {
            let scaled = if max_intensity > 0.0 { i / max_intensity } else { 0.0 };
            (mz, scaled)
        }));
        points.push((end, 0.0));
        points
    }

    /// Find every fragment of the target precursor whose monoisotopic peak, or any isotope
    /// up to the largest captured one, appears in `spectrum`.
    ///
    /// Found fragments contribute their max-normalized profile trace and their modeled
    /// envelopes, max-normalized as well.
    pub fn process_spectrum<P: PeakLookup + ?Sized>(
        &self,
        spectrum: &SpectrumContext<'_, P>,
        profile: Option<ProfileSignal<'_>>,
    ) -> Result<TargetedOutcome, ProcessingError> {
        let mut outcome = TargetedOutcome::default();
        let window = self.resolver.window_for(
            spectrum.precursor_mz.unwrap_or_else(|| self.precursor.mono_mz()),
            spectrum.isolation,
        );
        let capture: CaptureSet =
            self.resolver
                .resolve(self.precursor.mono_mz(), self.precursor.charge, &window)?;
        let Some(last) = capture.largest() else {
            debug!("Spectrum {} did not isolate the target precursor", spectrum.index);
            return Ok(outcome);
        };
        let isotope_range = capture.to_string();

        for (ion_index, ion) in self.fragments.iter().enumerate() {
            if self
                .matcher
                .find_first((0..=last).map(|i| ion.isotope_mz(i)), spectrum.peaks)
                .is_none()
            {
                continue;
            }
            outcome.ions_found += 1;
            let ion_name = format!("{} {}", ion.name(), ion.sequence);
            let request = EnvelopeRequest::new(ion, &self.precursor, &capture);

            let mut models = Vec::with_capacity(TARGETED_STRATEGIES.len());
            for strategy in TARGETED_STRATEGIES {
                models.push((strategy, self.engine.estimate(strategy, &request)?));
            }
            let observed = self.matcher.match_distribution(&models[0].1, spectrum.peaks);

            if let (Some(profile), Some(first), Some(final_peak)) =
                (profile.as_ref(), observed.peaks.first(), observed.peaks.last())
            {
                let points = Self::trace_between(
                    profile,
                    first.mz - 0.5,
                    final_peak.mz + 1.0,
                    ion.mono_mz() - 0.5,
                    ion.mono_mz() + 3.3,
                );
                outcome
                    .trace
                    .extend(points.into_iter().map(|(mz, intensity)| TraceRecord {
                        isotope_range: isotope_range.clone(),
                        ion_index,
                        ion_name: ion_name.clone(),
                        mz,
                        intensity,
                    }));
            }

            for (strategy, mut dist) in models {
                normalize(&mut dist, NormalizationMode::Max)?;
                outcome.models.extend(dist.iter().map(|peak| ModelRecord {
                    isotope_range: isotope_range.clone(),
                    ion_index,
                    ion_name: ion_name.clone(),
                    mz: peak.mz,
                    intensity: peak.value,
                    method: strategy,
                }));
            }
        }
        debug!(
            "Spectrum {} ({}) matched {} of {} target fragments",
            spectrum.index,
            spectrum.native_id,
            outcome.ions_found,
            self.fragments.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::capture::CaptureWindow;
    use crate::peptide::PeptideSequence;
    use mzpeaks::{CentroidPeak, MZPeakSetType};

    fn comparison() -> TargetedComparison {
        let params = EngineParams::default();
        let precursor = Ion::precursor(
            PeptideSequence::new("ELYENKPRRPYIL").unwrap(),
            3,
            &crate::elements::ElementTable::default(),
        )
        .unwrap();
        TargetedComparison::new(&params, precursor)
    }

    #[test]
    fn test_targeted_spectrum() {
        let comparison = comparison();
        // 12 cleavages, b and y, charges 1 and 2
        assert_eq!(comparison.fragments.len(), 48);
        let target = comparison
            .fragments
            .iter()
            .position(|ion| ion.name() == "B5+")
            .unwrap();
        let ion = &comparison.fragments[target];
        // Only the +1 isotope is present, which still counts as found
        let peaks = MZPeakSetType::new(vec![CentroidPeak::new(ion.isotope_mz(1), 500.0, 0)]);
        let mzs: Vec<f64> = (0..400).map(|i| ion.mono_mz() - 1.0 + i as f64 * 0.01).collect();
        let intensities: Vec<f32> = mzs
            .iter()
            .map(|mz| if (mz - ion.isotope_mz(1)).abs() < 0.02 { 100.0 } else { 10.0 })
            .collect();
        let profile = ProfileSignal {
            mzs: &mzs,
            intensities: &intensities,
        };
        let mono = comparison.precursor.mono_mz();
        let spectrum = SpectrumContext {
            index: 0,
            native_id: "scan=1",
            peaks: &peaks,
            precursor_mz: Some(mono),
            isolation: Some(CaptureWindow::symmetric(mono + 0.2, 0.4)),
        };
        let outcome = comparison.process_spectrum(&spectrum, Some(profile)).unwrap();
        assert!(outcome.ions_found >= 1);
        let trace: Vec<_> = outcome
            .trace
            .iter()
            .filter(|r| r.ion_index == target)
            .collect();
        assert_eq!(trace.first().unwrap().intensity, 0.0);
        assert!((trace.first().unwrap().mz - (ion.mono_mz() - 0.5)).abs() < 1e-9);
        assert!((trace.last().unwrap().mz - (ion.mono_mz() + 3.3)).abs() < 1e-9);
        assert!(trace.iter().all(|r| r.intensity <= 1.0));
        assert!(trace.iter().any(|r| r.intensity == 1.0));
        assert_eq!(trace[0].ion_name, "B5+ ELYEN");
        assert_eq!(trace[0].isotope_range, "0-1");

        let models: Vec<_> = outcome
            .models
            .iter()
            .filter(|r| r.ion_index == target)
            .collect();
        for strategy in TARGETED_STRATEGIES {
            let values: Vec<f64> = models
                .iter()
                .filter(|r| r.method == strategy)
                .map(|r| r.intensity)
                .collect();
            assert!(!values.is_empty());
            assert_eq!(values.iter().copied().fold(0.0, f64::max), 1.0);
        }
    }

    #[test]
    fn test_not_isolated() {
        let comparison = comparison();
        let peaks: MZPeakSetType<CentroidPeak> = MZPeakSetType::new(vec![]);
        let mono = comparison.precursor.mono_mz();
        let spectrum = SpectrumContext {
            index: 0,
            native_id: "scan=1",
            peaks: &peaks,
            precursor_mz: Some(mono - 5.0),
            isolation: Some(CaptureWindow::symmetric(mono - 5.0, 0.5)),
        };
        let outcome = comparison.process_spectrum(&spectrum, None).unwrap();
        assert_eq!(outcome, TargetedOutcome::default());
    }
}
