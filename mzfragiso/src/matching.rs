//! Pairing theoretical isotope peaks with observed centroids
use mzpeaks::prelude::*;
use mzpeaks::{IndexedCoordinate, MZPeakSetType, Tolerance, MZ};
use tracing::trace;

use crate::distribution::{IsotopeDistribution, IsotopePeak};

/// A sorted collection of observed peaks that can be searched by m/z
pub trait PeakLookup {
    /// Find the peak nearest to `mz` within `error_tolerance`, returning its m/z and intensity
    fn nearest_peak(&self, mz: f64, error_tolerance: Tolerance) -> Option<IsotopePeak>;
}

impl<C: CentroidLike + IndexedCoordinate<MZ>> PeakLookup for MZPeakSetType<C> {
    fn nearest_peak(&self, mz: f64, error_tolerance: Tolerance) -> Option<IsotopePeak> {
        self.has_peak(mz, error_tolerance)
            .map(|p| IsotopePeak::new(p.mz(), p.intensity() as f64))
    }
}

/// Matches theoretical isotope positions against an observed spectrum within a
/// parts-per-million tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralMatcher {
    pub error_tolerance: Tolerance,
}

impl Default for SpectralMatcher {
    fn default() -> Self {
        Self::new(20.0)
    }
}

impl SpectralMatcher {
    pub fn new(ppm_tolerance: f64) -> Self {
        Self {
            error_tolerance: Tolerance::PPM(ppm_tolerance),
        }
    }

    /// The absolute m/z tolerance at `mz`
    pub fn tolerance_at(&self, mz: f64) -> f64 {
        match self.error_tolerance {
            Tolerance::PPM(ppm) => ppm * mz / 1e6,
            Tolerance::Da(da) => da,
        }
    }

    pub fn find_peak<P: PeakLookup + ?Sized>(&self, mz: f64, peaks: &P) -> Option<IsotopePeak> {
        peaks.nearest_peak(mz, self.error_tolerance)
    }

    /// Build the observed counterpart of `theoretical`.
    ///
    /// The result always has the same length and order as `theoretical`. Each position
    /// holds the m/z and intensity of the nearest matching peak, or the theoretical m/z
    /// with zero intensity when nothing matched.
    pub fn match_distribution<P: PeakLookup + ?Sized>(
        &self,
        theoretical: &IsotopeDistribution,
        peaks: &P,
    ) -> IsotopeDistribution {
        let observed: Vec<IsotopePeak> = theoretical
            .iter()
            .map(|tp| {
                self.find_peak(tp.mz, peaks)
                    .unwrap_or_else(|| IsotopePeak::new(tp.mz, 0.0))
            })
            .collect();
        trace!(
            "Matched {} of {} isotopic peaks",
            observed.iter().filter(|p| p.value > 0.0).count(),
            observed.len()
        );
        IsotopeDistribution::new(observed, theoretical.charge)
    }

    /// Find the first of the isotope positions `mzs` with a matching peak, returning its
    /// index and the peak
    pub fn find_first<P: PeakLookup + ?Sized>(
        &self,
        mzs: impl IntoIterator<Item = f64>,
        peaks: &P,
    ) -> Option<(usize, IsotopePeak)> {
        mzs.into_iter()
            .enumerate()
            .find_map(|(i, mz)| self.find_peak(mz, peaks).map(|p| (i, p)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mzpeaks::CentroidPeak;

    fn spectrum() -> MZPeakSetType<CentroidPeak> {
        MZPeakSetType::new(vec![
            CentroidPeak::new(500.0015, 1000.0, 0),
            CentroidPeak::new(501.0003, 400.0, 1),
            CentroidPeak::new(650.0, 50.0, 2),
        ])
    }

    #[test]
    fn test_positional_match() {
        let peaks = spectrum();
        let mut theoretical = IsotopeDistribution::from_probabilities(500.0, 2, &[0.6, 0.3, 0.1]);
        theoretical.peaks[1].mz = 500.5;
        theoretical.peaks[2].mz = 501.0;
        let matcher = SpectralMatcher::new(20.0);
        let observed = matcher.match_distribution(&theoretical, &peaks);
        assert_eq!(observed.len(), 3);
        assert!((observed[0].mz - 500.0015).abs() < 1e-9);
        assert_eq!(observed[0].value, 1000.0);
        assert_eq!(observed[1].mz, 500.5);
        assert_eq!(observed[1].value, 0.0);
        assert_eq!(observed[2].value, 400.0);
    }

    #[test]
    fn test_tolerance() {
        let peaks = spectrum();
        let matcher = SpectralMatcher::new(2.0);
        assert!(matcher.find_peak(500.0, &peaks).is_none());
        assert!((matcher.tolerance_at(500.0) - 0.001).abs() < 1e-12);
        let matcher = SpectralMatcher::new(20.0);
        assert!(matcher.find_peak(500.0, &peaks).is_some());
    }

    #[test]
    fn test_empty_spectrum() {
        let peaks: MZPeakSetType<CentroidPeak> = MZPeakSetType::new(Vec::new());
        let theoretical = IsotopeDistribution::from_probabilities(500.0, 1, &[0.5, 0.3, 0.2]);
        let observed = SpectralMatcher::default().match_distribution(&theoretical, &peaks);
        assert_eq!(observed.len(), 3);
        assert_eq!(observed.total(), 0.0);
    }

    #[test]
    fn test_find_first() {
        let peaks = spectrum();
        let matcher = SpectralMatcher::default();
        let hit = matcher.find_first([499.0, 500.0, 501.0], &peaks).unwrap();
        assert_eq!(hit.0, 1);
        assert!(matcher.find_first([499.0, 499.5], &peaks).is_none());
    }
}
