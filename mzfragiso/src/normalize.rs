//! Rescaling the value column of an [`IsotopeDistribution`]
use std::fmt::Display;
use std::str::FromStr;

use crate::distribution::IsotopeDistribution;
use crate::error::NormalizationError;

/// How to rescale a distribution
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum NormalizationMode {
    /// Divide by the total so the values sum to 1
    #[default]
    Probability,
    /// Divide by the largest value so the tallest peak is 1
    Max,
}

impl Display for NormalizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizationMode::Probability => f.write_str("probability"),
            NormalizationMode::Max => f.write_str("max"),
        }
    }
}

impl FromStr for NormalizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "probability" | "sum" => Ok(Self::Probability),
            "max" => Ok(Self::Max),
            _ => Err(format!("Unknown normalization mode {s:?}")),
        }
    }
}

/// Rescale `dist` in place. The m/z column is left untouched.
///
/// An all-zero (or empty) distribution has no signal to rescale and is reported as an
/// error instead of being filled with NaN.
pub fn normalize(
    dist: &mut IsotopeDistribution,
    mode: NormalizationMode,
) -> Result<(), NormalizationError> {
    let denom = match mode {
        NormalizationMode::Probability => {
            let mut total = dist.total();
            if total.is_infinite() {
                // Finite values whose sum overflows are scaled by the largest first
                let max = dist.max_value();
                if max.is_finite() && max > 0.0 {
                    dist.iter_mut().for_each(|p| p.value /= max);
                    total = dist.total();
                }
            }
            if !(total > 0.0 && total.is_finite()) {
                return Err(NormalizationError::NonPositiveTotal(total));
            }
            total
        }
        NormalizationMode::Max => {
            let max = dist.max_value();
            if !(max > 0.0 && max.is_finite()) {
                return Err(NormalizationError::NonPositiveMaximum(max));
            }
            max
        }
    };
    dist.iter_mut().for_each(|p| p.value /= denom);
    Ok(())
}

/// Like [`normalize`], but returns a rescaled copy
pub fn normalized(
    dist: &IsotopeDistribution,
    mode: NormalizationMode,
) -> Result<IsotopeDistribution, NormalizationError> {
    let mut dup = dist.clone();
    normalize(&mut dup, mode)?;
    Ok(dup)
}

/// Renormalize a plain probability vector in place, leaving an all-zero vector as-is.
///
/// Returns the total before rescaling.
pub(crate) fn renormalize_values(values: &mut [f64]) -> f64 {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
    total
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_probability() {
        let mut dist = IsotopeDistribution::from_probabilities(500.0, 1, &[2.0, 1.0, 1.0]);
        let mzs: Vec<f64> = dist.iter().map(|p| p.mz).collect();
        normalize(&mut dist, NormalizationMode::Probability).unwrap();
        assert!((dist.total() - 1.0).abs() < 1e-9);
        assert_eq!(dist.values(), vec![0.5, 0.25, 0.25]);
        assert_eq!(dist.iter().map(|p| p.mz).collect::<Vec<_>>(), mzs);

        let again = normalized(&dist, NormalizationMode::Probability).unwrap();
        assert_eq!(again, dist);
    }

    #[test]
    fn test_max() {
        let dist = IsotopeDistribution::from_probabilities(500.0, 1, &[2.0, 4.0, 1.0]);
        let scaled = normalized(&dist, NormalizationMode::Max).unwrap();
        assert_eq!(scaled.values(), vec![0.5, 1.0, 0.25]);
        let again = normalized(&scaled, NormalizationMode::Max).unwrap();
        assert_eq!(again, scaled);
    }

    #[test]
    fn test_all_zero() {
        let mut dist = IsotopeDistribution::from_probabilities(500.0, 1, &[0.0, 0.0, 0.0]);
        assert_eq!(
            normalize(&mut dist, NormalizationMode::Probability),
            Err(NormalizationError::NonPositiveTotal(0.0))
        );
        assert!(dist.values().iter().all(|v| *v == 0.0));
        assert_eq!(
            normalize(&mut dist, NormalizationMode::Max),
            Err(NormalizationError::NonPositiveMaximum(0.0))
        );
    }

    #[test]
    fn test_overflowing_total() {
        let mut dist = IsotopeDistribution::from_probabilities(500.0, 1, &[1e308, 1e308]);
        normalize(&mut dist, NormalizationMode::Probability).unwrap();
        assert_eq!(dist.values(), vec![0.5, 0.5]);
        assert!((dist.total() - 1.0).abs() < 1e-12);

        let mut dist = IsotopeDistribution::from_probabilities(500.0, 1, &[f64::INFINITY, 1.0]);
        assert!(normalize(&mut dist, NormalizationMode::Probability).is_err());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("max".parse::<NormalizationMode>(), Ok(NormalizationMode::Max));
        assert!("median".parse::<NormalizationMode>().is_err());
    }
}
