//! Agreement statistics between paired isotope distributions
use std::fmt::Display;

use crate::distribution::IsotopeDistribution;

pub type ScoreType = f64;

/// Whether larger or smaller values of a score indicate a better result
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ScoreInterpretation {
    HigherIsBetter,
    #[default]
    LowerIsBetter,
}

impl ScoreInterpretation {
    /// Whether `score` is strictly better than `threshold`
    pub fn passes(&self, score: ScoreType, threshold: ScoreType) -> bool {
        match self {
            Self::HigherIsBetter => score > threshold,
            Self::LowerIsBetter => score < threshold,
        }
    }
}

/// A statistic comparing an observed distribution against an expected one, paired by
/// position
pub trait DistributionScorer {
    /// Score equal-length inputs. Callers go through [`DistributionScorer::compare`],
    /// which handles length mismatches.
    fn score(&self, observed: &[f64], expected: &[f64]) -> ScoreType;

    /// The value reported when the inputs cannot be compared
    fn failure_value(&self) -> ScoreType;

    fn interpretation(&self) -> ScoreInterpretation {
        ScoreInterpretation::LowerIsBetter
    }

    fn compare(&self, observed: &[f64], expected: &[f64]) -> ScoreType {
        if observed.len() != expected.len() {
            self.failure_value()
        } else {
            self.score(observed, expected)
        }
    }
}

/// Pearson's correlation coefficient.
///
/// When either input has zero variance the coefficient is undefined. Identical inputs
/// then score 1, anything else scores 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct PearsonCorrelation;

impl DistributionScorer for PearsonCorrelation {
    fn score(&self, observed: &[f64], expected: &[f64]) -> ScoreType {
        let n = observed.len();
        if n == 0 {
            return self.failure_value();
        }
        let mean_o = observed.iter().sum::<f64>() / n as f64;
        let mean_e = expected.iter().sum::<f64>() / n as f64;
        let mut cov = 0.0;
        let mut var_o = 0.0;
        let mut var_e = 0.0;
        for (o, e) in observed.iter().zip(expected) {
            let d_o = o - mean_o;
            let d_e = e - mean_e;
            cov += d_o * d_e;
            var_o += d_o * d_o;
            var_e += d_e * d_e;
        }
        if var_o == 0.0 || var_e == 0.0 {
            return if observed == expected { 1.0 } else { 0.0 };
        }
        (cov / (var_o.sqrt() * var_e.sqrt())).clamp(-1.0, 1.0)
    }

    fn failure_value(&self) -> ScoreType {
        0.0
    }

    fn interpretation(&self) -> ScoreInterpretation {
        ScoreInterpretation::HigherIsBetter
    }
}

/// Pearson's chi-squared statistic
///
/// ```math
/// \chi^2 = \sum_i \frac{(o_i - e_i)^2}{e_i}
/// ```
///
/// Terms where $`e_i = 0`$ are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChiSquared;

impl DistributionScorer for ChiSquared {
    fn score(&self, observed: &[f64], expected: &[f64]) -> ScoreType {
        observed
            .iter()
            .zip(expected)
            .filter(|(_, e)| **e != 0.0)
            .map(|(o, e)| (o - e).powi(2) / e)
            .sum()
    }

    fn failure_value(&self) -> ScoreType {
        -1.0
    }
}

/// Total variation distance, half the L1 distance between the inputs
#[derive(Debug, Default, Clone, Copy)]
pub struct TotalVariationDistance;

impl DistributionScorer for TotalVariationDistance {
    fn score(&self, observed: &[f64], expected: &[f64]) -> ScoreType {
        0.5 * observed
            .iter()
            .zip(expected)
            .map(|(o, e)| (o - e).abs())
            .sum::<f64>()
    }

    fn failure_value(&self) -> ScoreType {
        -1.0
    }
}

/// The three agreement statistics for one comparison
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreSet {
    pub correlation: ScoreType,
    pub chi_squared: ScoreType,
    pub total_variation: ScoreType,
}

impl ScoreSet {
    /// The sentinel values reported when a comparison is impossible
    pub fn failed() -> Self {
        Self {
            correlation: PearsonCorrelation.failure_value(),
            chi_squared: ChiSquared.failure_value(),
            total_variation: TotalVariationDistance.failure_value(),
        }
    }

    pub fn compare_values(observed: &[f64], expected: &[f64]) -> Self {
        Self {
            correlation: PearsonCorrelation.compare(observed, expected),
            chi_squared: ChiSquared.compare(observed, expected),
            total_variation: TotalVariationDistance.compare(observed, expected),
        }
    }

    /// Score `observed` against `expected`, position by position
    pub fn compare(observed: &IsotopeDistribution, expected: &IsotopeDistribution) -> Self {
        Self::compare_values(&observed.values(), &expected.values())
    }
}

impl Display for ScoreSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "r={:.4} chi2={:.4} tvd={:.4}",
            self.correlation, self.chi_squared, self.total_variation
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! assert_is_close {
        ($t1:expr, $t2:expr, $tol:expr, $label:literal) => {
            assert!(
                ($t1 - $t2).abs() < $tol,
                "Observed {} {}, expected {}, difference {}",
                $label,
                $t1,
                $t2,
                $t1 - $t2,
            );
        };
    }

    #[test]
    fn test_identical() {
        let a = [0.4, 0.3, 0.15, 0.1, 0.05];
        let scores = ScoreSet::compare_values(&a, &a);
        assert_is_close!(scores.correlation, 1.0, 1e-12, "correlation");
        assert_eq!(scores.chi_squared, 0.0);
        assert_eq!(scores.total_variation, 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let scores = ScoreSet::compare_values(&[0.5, 0.5], &[0.5, 0.3, 0.2]);
        assert_eq!(scores, ScoreSet::failed());
        assert_eq!(scores.correlation, 0.0);
        assert_eq!(scores.chi_squared, -1.0);
        assert_eq!(scores.total_variation, -1.0);
    }

    #[test]
    fn test_known_values() {
        let observed = [0.5, 0.3, 0.2];
        let expected = [0.6, 0.3, 0.1];
        let scores = ScoreSet::compare_values(&observed, &expected);
        assert_is_close!(scores.total_variation, 0.1, 1e-12, "tvd");
        assert_is_close!(scores.chi_squared, 0.01 / 0.6 + 0.01 / 0.1, 1e-12, "chi2");
        assert!(scores.correlation > 0.9 && scores.correlation <= 1.0);

        let reversed = ScoreSet::compare_values(&[0.1, 0.4, 0.6], &expected);
        assert_is_close!(reversed.correlation, -1.0, 1e-12, "correlation");
    }

    #[test]
    fn test_zero_expected_skipped() {
        let chi = ChiSquared.compare(&[0.5, 0.5], &[1.0, 0.0]);
        assert_is_close!(chi, 0.25, 1e-12, "chi2");
        assert!(chi.is_finite());
    }

    #[test]
    fn test_degenerate_correlation() {
        assert_eq!(PearsonCorrelation.compare(&[1.0], &[1.0]), 1.0);
        assert_eq!(PearsonCorrelation.compare(&[0.0, 0.0], &[0.6, 0.4]), 0.0);
        assert_eq!(PearsonCorrelation.compare(&[], &[]), 0.0);
    }

    #[test]
    fn test_ranges() {
        let observed = [0.7, 0.0, 0.2, 0.1];
        let expected = [0.1, 0.6, 0.2, 0.1];
        let scores = ScoreSet::compare_values(&observed, &expected);
        assert!((-1.0..=1.0).contains(&scores.correlation));
        assert!((0.0..=1.0).contains(&scores.total_variation));
        assert!(scores.chi_squared >= 0.0);
    }

    #[test]
    fn test_threshold() {
        assert!(ScoreInterpretation::LowerIsBetter.passes(0.005, 0.01));
        assert!(!ScoreInterpretation::LowerIsBetter.passes(0.01, 0.01));
        assert!(ScoreInterpretation::HigherIsBetter.passes(30.0, 20.0));
    }
}
