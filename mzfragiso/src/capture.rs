//! Tools for working out which precursor isotopologues an isolation window captured
use std::fmt::Display;

use mzdata::spectrum::IsolationWindow;
use tracing::trace;

use crate::elements::isotopic_shift;
use crate::error::EnvelopeError;

/// A contiguous, possibly empty, range of precursor isotope indices
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureSet {
    bounds: Option<(usize, usize)>,
}

impl CaptureSet {
    pub const fn empty() -> Self {
        Self { bounds: None }
    }

    /// The range `[smallest, largest]`, empty if `smallest > largest`
    pub fn new(smallest: usize, largest: usize) -> Self {
        if smallest > largest {
            Self::empty()
        } else {
            Self {
                bounds: Some((smallest, largest)),
            }
        }
    }

    /// The range `[0, largest]`
    pub fn up_to(largest: usize) -> Self {
        Self::new(0, largest)
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn len(&self) -> usize {
        self.bounds.map(|(a, b)| b - a + 1).unwrap_or_default()
    }

    pub fn smallest(&self) -> Option<usize> {
        self.bounds.map(|(a, _)| a)
    }

    pub fn largest(&self) -> Option<usize> {
        self.bounds.map(|(_, b)| b)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.bounds
            .map(|(a, b)| a <= index && index <= b)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let (a, b) = match self.bounds {
            Some((a, b)) => (a, b + 1),
            None => (0, 0),
        };
        a..b
    }
}

impl Display for CaptureSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.bounds {
            Some((a, b)) if a == b => write!(f, "{a}"),
            Some((a, b)) => write!(f, "{a}-{b}"),
            None => Ok(()),
        }
    }
}

/// An isolation window described by its center and the half-widths on either side.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureWindow {
    pub center_mz: f64,
    pub lower_offset: f64,
    pub upper_offset: f64,
}

impl CaptureWindow {
    pub fn new(center_mz: f64, lower_offset: f64, upper_offset: f64) -> Self {
        Self {
            center_mz,
            lower_offset,
            upper_offset,
        }
    }

    pub fn symmetric(center_mz: f64, half_width: f64) -> Self {
        Self::new(center_mz, half_width, half_width)
    }

    /// Read a window from an instrument-reported isolation window.
    ///
    /// Returns `None` when the window carries no bounds. When the target is missing,
    /// the midpoint of the bounds is used as the center.
    pub fn from_isolation_window(window: &IsolationWindow) -> Option<Self> {
        if window.lower_bound == 0.0 && window.upper_bound == 0.0 {
            return None;
        }
        let lower = window.lower_bound as f64;
        let upper = window.upper_bound as f64;
        if upper <= lower {
            return None;
        }
        let center = if window.target > 0.0 {
            window.target as f64
        } else {
            (lower + upper) / 2.0
        };
        Some(Self::new(center, center - lower, upper - center))
    }

    pub fn lower_bound(&self) -> f64 {
        self.center_mz - self.lower_offset
    }

    pub fn upper_bound(&self) -> f64 {
        self.center_mz + self.upper_offset
    }
}

/// Resolves which precursor isotopologues fall within an isolation window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrecursorCaptureResolver {
    /// A shift applied to both window edges, used when the stored isolation center
    /// differs from the one the instrument actually used
    pub offset: f64,
    /// The half-width assumed when a spectrum does not report its isolation window
    pub default_half_width: f64,
}

impl Default for PrecursorCaptureResolver {
    fn default() -> Self {
        Self {
            offset: 0.0,
            default_half_width: 0.8,
        }
    }
}

impl PrecursorCaptureResolver {
    pub fn new(offset: f64, default_half_width: f64) -> Self {
        Self {
            offset,
            default_half_width,
        }
    }

    /// Pick the window to resolve against, falling back to a symmetric window of
    /// [`PrecursorCaptureResolver::default_half_width`] around `precursor_mz`
    pub fn window_for(&self, precursor_mz: f64, reported: Option<CaptureWindow>) -> CaptureWindow {
        reported.unwrap_or_else(|| CaptureWindow::symmetric(precursor_mz, self.default_half_width))
    }

    /// Compute the capture set of a precursor with monoisotopic m/z `mono_mz` and `charge`.
    ///
    /// ```math
    /// \begin{split}
    ///     s &= \frac{\Delta_n}{z} \\
    ///     i_{min} &= \max\left(0, \left\lceil\frac{c - o_l + \delta - m}{s}\right\rceil\right) \\
    ///     i_{max} &= \left\lfloor\frac{c + o_u + \delta - m}{s}\right\rfloor
    /// \end{split}
    /// ```
    ///
    /// The result is empty when $`i_{max} < 0`$, i.e. the window lies entirely below
    /// the monoisotopic peak.
    pub fn resolve(
        &self,
        mono_mz: f64,
        charge: i32,
        window: &CaptureWindow,
    ) -> Result<CaptureSet, EnvelopeError> {
        if charge < 1 {
            return Err(EnvelopeError::InvalidCharge(charge));
        }
        let step = isotopic_shift(charge);
        let lower_cutoff = window.center_mz - window.lower_offset + self.offset;
        let upper_cutoff = window.center_mz + window.upper_offset + self.offset;

        let smallest = ((lower_cutoff - mono_mz) / step).ceil().max(0.0);
        let largest = ((upper_cutoff - mono_mz) / step).floor();
        trace!(
            "Capture window {lower_cutoff:0.4}-{upper_cutoff:0.4} around {mono_mz:0.4} ({charge}) spans isotopes {smallest}..={largest}"
        );
        if largest < 0.0 {
            return Ok(CaptureSet::empty());
        }
        Ok(CaptureSet::new(smallest as usize, largest as usize))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_symmetric_window() {
        let resolver = PrecursorCaptureResolver::default();
        let window = CaptureWindow::symmetric(500.0, 0.8);
        let capture = resolver.resolve(500.0, 2, &window).unwrap();
        assert_eq!(capture, CaptureSet::new(0, 1));
        assert_eq!(capture.iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(capture.to_string(), "0-1");
    }

    #[test]
    fn test_window_below_mono() {
        let resolver = PrecursorCaptureResolver::default();
        let window = CaptureWindow::symmetric(498.0, 0.8);
        let capture = resolver.resolve(500.0, 2, &window).unwrap();
        assert!(capture.is_empty());
        assert_eq!(capture.len(), 0);
        assert_eq!(capture.largest(), None);
    }

    #[test]
    fn test_offset_window() {
        let resolver = PrecursorCaptureResolver::new(1.0, 0.8);
        let window = CaptureWindow::new(500.0, 0.2, 0.4);
        // cutoffs 500.8 and 501.4 at step ~0.5017
        let capture = resolver.resolve(500.0, 2, &window).unwrap();
        assert_eq!(capture, CaptureSet::new(2, 2));
        assert_eq!(capture.to_string(), "2");
    }

    #[test]
    fn test_contiguous_for_any_window() {
        let resolver = PrecursorCaptureResolver::default();
        for charge in 1..5 {
            for i in 0..40 {
                let center = 499.0 + i as f64 * 0.1;
                let window = CaptureWindow::new(center, 0.7, 1.1);
                let capture = resolver.resolve(500.0, charge, &window).unwrap();
                if let (Some(a), Some(b)) = (capture.smallest(), capture.largest()) {
                    assert!(a <= b);
                    assert_eq!(capture.iter().count(), b - a + 1);
                }
            }
        }
    }

    #[test]
    fn test_from_isolation_window() {
        let mut iw = IsolationWindow::default();
        assert!(CaptureWindow::from_isolation_window(&iw).is_none());
        iw.target = 500.0;
        iw.lower_bound = 499.2;
        iw.upper_bound = 501.0;
        let window = CaptureWindow::from_isolation_window(&iw).unwrap();
        assert!((window.lower_offset - 0.8).abs() < 1e-4);
        assert!((window.upper_offset - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_charge() {
        let resolver = PrecursorCaptureResolver::default();
        let window = CaptureWindow::symmetric(500.0, 0.8);
        assert_eq!(
            resolver.resolve(500.0, 0, &window),
            Err(EnvelopeError::InvalidCharge(0))
        );
    }
}
