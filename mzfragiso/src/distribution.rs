//! Isotope distributions indexed by isotope number
use std::ops::Index;

use crate::elements::isotopic_shift;
use crate::normalize::renormalize_values;

/// A single isotopic peak: its m/z and either a probability or an observed intensity
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IsotopePeak {
    pub mz: f64,
    pub value: f64,
}

impl IsotopePeak {
    pub fn new(mz: f64, value: f64) -> Self {
        Self { mz, value }
    }
}

/// An ordered run of isotopic peaks starting at the monoisotopic peak.
///
/// The `i`-th peak is isotope `i`, and theoretical peaks sit at
/// `mono_mz + i * isotopic_shift(charge)`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IsotopeDistribution {
    pub peaks: Vec<IsotopePeak>,
    pub charge: i32,
}

impl IsotopeDistribution {
    pub fn new(peaks: Vec<IsotopePeak>, charge: i32) -> Self {
        Self { peaks, charge }
    }

    /// Lay `probabilities` out on the isotope ladder of an ion with monoisotopic m/z `mono_mz`
    pub fn from_probabilities(mono_mz: f64, charge: i32, probabilities: &[f64]) -> Self {
        let step = isotopic_shift(charge);
        let peaks = probabilities
            .iter()
            .enumerate()
            .map(|(i, p)| IsotopePeak::new(mono_mz + step * i as f64, *p))
            .collect();
        Self::new(peaks, charge)
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IsotopePeak> {
        self.peaks.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, IsotopePeak> {
        self.peaks.iter_mut()
    }

    pub fn values(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.value).collect()
    }

    pub fn total(&self) -> f64 {
        self.peaks.iter().map(|p| p.value).sum()
    }

    pub fn max_value(&self) -> f64 {
        self.peaks.iter().map(|p| p.value).fold(0.0, f64::max)
    }

    pub fn mono_mz(&self) -> Option<f64> {
        self.peaks.first().map(|p| p.mz)
    }

    /// Drop trailing peaks that are both smaller than `threshold` times the tallest
    /// peak and past `max_captured`. Peaks at or below `max_captured` are always kept.
    pub fn truncate_uncaptured(&mut self, threshold: f64, max_captured: Option<usize>) {
        let cutoff = self.max_value() * threshold;
        while let Some(last) = self.peaks.last() {
            let i = self.peaks.len() - 1;
            let protected = max_captured.map(|m| i <= m).unwrap_or(false);
            if !protected && last.value < cutoff {
                self.peaks.pop();
            } else {
                break;
            }
        }
    }

    /// Produce a copy with exactly `length` peaks, extending the isotope ladder with
    /// zero-valued peaks or cutting off the tail as needed
    pub fn aligned_to(&self, length: usize) -> Self {
        let mut dup = self.clone();
        if length <= dup.len() {
            dup.peaks.truncate(length);
            return dup;
        }
        let step = isotopic_shift(self.charge);
        let origin = self.mono_mz().unwrap_or_default();
        for i in dup.len()..length {
            dup.peaks.push(IsotopePeak::new(origin + step * i as f64, 0.0));
        }
        dup
    }

    /// As [`IsotopeDistribution::aligned_to`], then rescaled to sum to 1 unless all values
    /// are zero
    pub fn realigned(&self, length: usize) -> Self {
        let mut dup = self.aligned_to(length);
        dup.renormalize();
        dup
    }

    /// Rescale the values to sum to 1, leaving an all-zero distribution untouched
    pub(crate) fn renormalize(&mut self) {
        let mut values = self.values();
        renormalize_values(&mut values);
        for (peak, v) in self.peaks.iter_mut().zip(values) {
            peak.value = v;
        }
    }

    /// The number of leading peaks with non-zero value
    pub fn leading_nonzero(&self) -> usize {
        self.peaks.iter().take_while(|p| p.value != 0.0).count()
    }
}

impl Index<usize> for IsotopeDistribution {
    type Output = IsotopePeak;

    fn index(&self, index: usize) -> &Self::Output {
        &self.peaks[index]
    }
}

impl<'a> IntoIterator for &'a IsotopeDistribution {
    type Item = &'a IsotopePeak;
    type IntoIter = std::slice::Iter<'a, IsotopePeak>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::elements::NEUTRON_SHIFT;

    #[test]
    fn test_ladder() {
        let dist = IsotopeDistribution::from_probabilities(500.0, 2, &[0.5, 0.3, 0.2]);
        assert_eq!(dist.len(), 3);
        assert!((dist[2].mz - (500.0 + NEUTRON_SHIFT)).abs() < 1e-9);
        assert!((dist.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_truncate_uncaptured() {
        let mut dist =
            IsotopeDistribution::from_probabilities(500.0, 1, &[0.5, 0.3, 0.12, 0.04, 0.01]);
        dist.truncate_uncaptured(0.1, Some(0));
        assert_eq!(dist.len(), 3);

        let mut dist =
            IsotopeDistribution::from_probabilities(500.0, 1, &[0.5, 0.3, 0.12, 0.04, 0.01]);
        dist.truncate_uncaptured(0.1, Some(3));
        assert_eq!(dist.len(), 4);

        let mut dist = IsotopeDistribution::from_probabilities(500.0, 1, &[0.02, 0.5, 0.3]);
        dist.truncate_uncaptured(0.1, None);
        assert_eq!(dist.len(), 3);
    }

    #[test]
    fn test_aligned() {
        let dist = IsotopeDistribution::from_probabilities(500.0, 1, &[0.6, 0.4]);
        let longer = dist.aligned_to(4);
        assert_eq!(longer.values(), vec![0.6, 0.4, 0.0, 0.0]);
        assert!((longer[3].mz - (500.0 + 3.0 * NEUTRON_SHIFT)).abs() < 1e-9);
        let shorter = dist.aligned_to(1);
        assert_eq!(shorter.values(), vec![0.6]);
    }

    #[test]
    fn test_realigned() {
        let dist = IsotopeDistribution::from_probabilities(500.0, 1, &[0.5, 0.3, 0.2]);
        let cut = dist.realigned(2);
        assert!((cut[0].value - 0.625).abs() < 1e-12);
        assert!((cut.total() - 1.0).abs() < 1e-12);
        let padded = dist.realigned(5);
        assert_eq!(padded.len(), 5);
        assert!((padded.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_leading_nonzero() {
        let dist = IsotopeDistribution::from_probabilities(500.0, 1, &[5.0, 3.0, 0.0, 1.0]);
        assert_eq!(dist.leading_nonzero(), 2);
    }
}
