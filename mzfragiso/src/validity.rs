//! Shape sanity checks for scaled isotope distributions
use std::fmt::Display;

use crate::distribution::IsotopeDistribution;

/// How to decide whether a scaled distribution has a plausible isotope envelope shape.
///
/// The result is recorded alongside each comparison and never used to reject data.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ValidityPolicy {
    /// From the third isotope onward, no value may exceed its predecessor. The first two
    /// isotopes may rise before the envelope decays.
    MonotonicTail,
    /// The values may rise to a single apex and must then fall, each rise or fall
    /// allowed to be violated by at most `tolerance`
    RiseThenFall { tolerance: f64 },
    /// Accept every distribution
    AlwaysValid,
}

impl Default for ValidityPolicy {
    fn default() -> Self {
        Self::MonotonicTail
    }
}

impl Display for ValidityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonotonicTail => f.write_str("monotonic-tail"),
            Self::RiseThenFall { tolerance } => write!(f, "rise-then-fall({tolerance})"),
            Self::AlwaysValid => f.write_str("always-valid"),
        }
    }
}

impl ValidityPolicy {
    pub fn is_valid_values(&self, values: &[f64]) -> bool {
        match self {
            Self::MonotonicTail => {
                if values.len() < 3 {
                    return true;
                }
                values.windows(2).skip(1).all(|w| w[1] <= w[0])
            }
            Self::RiseThenFall { tolerance } => {
                let mut falling = false;
                for w in values.windows(2) {
                    let (prev, cur) = (w[0], w[1]);
                    if falling {
                        if cur > prev + tolerance {
                            return false;
                        }
                    } else if cur < prev - tolerance {
                        falling = true;
                    }
                }
                true
            }
            Self::AlwaysValid => true,
        }
    }

    pub fn is_valid(&self, dist: &IsotopeDistribution) -> bool {
        self.is_valid_values(&dist.values())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_monotonic_tail() {
        let policy = ValidityPolicy::MonotonicTail;
        assert!(policy.is_valid_values(&[0.3, 0.4, 0.2, 0.1]));
        assert!(!policy.is_valid_values(&[0.5, 0.2, 0.3]));
        assert!(policy.is_valid_values(&[0.1, 0.9]));
        assert!(policy.is_valid_values(&[]));
        assert!(policy.is_valid_values(&[0.5, 0.25, 0.25]));
    }

    #[test]
    fn test_rise_then_fall() {
        let policy = ValidityPolicy::RiseThenFall { tolerance: 0.05 };
        assert!(policy.is_valid_values(&[0.1, 0.3, 0.4, 0.2]));
        assert!(policy.is_valid_values(&[0.5, 0.3, 0.32, 0.1]));
        assert!(!policy.is_valid_values(&[0.5, 0.2, 0.3]));
    }

    #[test]
    fn test_always_valid() {
        assert!(ValidityPolicy::AlwaysValid.is_valid_values(&[0.1, 0.0, 0.9]));
        assert_eq!(ValidityPolicy::default(), ValidityPolicy::MonotonicTail);
    }
}
