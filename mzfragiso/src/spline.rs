/*! Precomputed interpolation tables of averagine isotope probabilities.
 *
 * Evaluating the averagine model requires building a composition and convolving its
 * isotope vectors. For bulk work the probability of each isotope is instead sampled over
 * a regular average-mass grid once, and read back through a natural cubic spline.
 */
use tracing::debug;

use crate::averagine::AveragineModel;
use crate::capture::CaptureSet;
use crate::elements::ElementTable;
use crate::isotopes::conditional_distribution;

/// A natural cubic spline over a regular grid
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    start: f64,
    step: f64,
    values: Vec<f64>,
    /// Second derivatives at each knot
    curvature: Vec<f64>,
}

impl CubicSpline {
    /// Fit a spline through `values` sampled at `start + i * step`.
    ///
    /// The second derivative is zero at both ends.
    pub fn fit(start: f64, step: f64, values: Vec<f64>) -> Self {
        let n = values.len();
        let mut curvature = vec![0.0; n];
        if n > 2 {
            // Thomas algorithm for the uniform-grid system
            // m[i-1] + 4 m[i] + m[i+1] = 6 (y[i-1] - 2 y[i] + y[i+1]) / h^2
            let h2 = step * step;
            let mut diag = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            for i in 1..n - 1 {
                diag[i] = 4.0;
                rhs[i] = 6.0 * (values[i - 1] - 2.0 * values[i] + values[i + 1]) / h2;
            }
            for i in 2..n - 1 {
                let w = 1.0 / diag[i - 1];
                diag[i] -= w;
                rhs[i] -= w * rhs[i - 1];
            }
            for i in (1..n - 1).rev() {
                curvature[i] = (rhs[i] - curvature[i + 1]) / diag[i];
            }
        }
        Self {
            start,
            step,
            values,
            curvature,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.start + self.step * (self.values.len().saturating_sub(1)) as f64
    }

    pub fn contains(&self, x: f64) -> bool {
        !self.values.is_empty() && x >= self.start && x <= self.end()
    }

    /// Evaluate the spline at `x`, or `None` if `x` is outside of the fitted range
    pub fn evaluate(&self, x: f64) -> Option<f64> {
        if !self.contains(x) {
            return None;
        }
        let n = self.values.len();
        if n == 1 {
            return Some(self.values[0]);
        }
        let offset = (x - self.start) / self.step;
        let i = (offset.floor() as usize).min(n - 2);
        let t = offset - i as f64;
        let a = 1.0 - t;
        let h2 = self.step * self.step;
        let y = a * self.values[i]
            + t * self.values[i + 1]
            + ((a * a * a - a) * self.curvature[i] + (t * t * t - t) * self.curvature[i + 1]) * h2
                / 6.0;
        Some(y)
    }
}

/// The grid an [`IsotopeSplineTable`] is sampled over
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SplineParams {
    pub min_mass: f64,
    pub max_mass: f64,
    pub mass_step: f64,
    /// The number of isotopes tabulated per mass
    pub depth: usize,
    /// Sulfur counts `0..=max_sulfur` get their own table
    pub max_sulfur: i32,
}

impl Default for SplineParams {
    fn default() -> Self {
        Self {
            min_mass: 50.0,
            max_mass: 10000.0,
            mass_step: 50.0,
            depth: 11,
            max_sulfur: 5,
        }
    }
}

/// Interpolated averagine isotope probabilities by average mass, optionally by sulfur count
#[derive(Debug, Clone, PartialEq)]
pub struct IsotopeSplineTable {
    params: SplineParams,
    /// One spline per isotope index, sulfur count from the averagine model
    unconstrained: Vec<CubicSpline>,
    /// One set of per-isotope splines per pinned sulfur count
    by_sulfur: Vec<Vec<CubicSpline>>,
}

impl IsotopeSplineTable {
    fn fit_isotopes<F: Fn(f64) -> Vec<f64>>(params: &SplineParams, sample: F) -> Vec<CubicSpline> {
        let n_points = ((params.max_mass - params.min_mass) / params.mass_step).floor() as usize + 1;
        let samples: Vec<Vec<f64>> = (0..n_points)
            .map(|i| sample(params.min_mass + i as f64 * params.mass_step))
            .collect();
        (0..params.depth)
            .map(|isotope| {
                let column = samples
                    .iter()
                    .map(|s| s.get(isotope).copied().unwrap_or_default())
                    .collect();
                CubicSpline::fit(params.min_mass, params.mass_step, column)
            })
            .collect()
    }

    /// Sample `model` over the grid described by `params` and fit the splines
    pub fn build(model: &AveragineModel, table: &ElementTable, params: SplineParams) -> Self {
        let unconstrained =
            Self::fit_isotopes(&params, |mass| model.distribution(mass, params.depth, table));
        let by_sulfur = (0..=params.max_sulfur.max(0))
            .map(|s| {
                Self::fit_isotopes(&params, |mass| {
                    model.distribution_with_sulfur(mass, s, params.depth, table)
                })
            })
            .collect();
        debug!(
            "Built isotope spline table over {}-{} Da with {} sulfur tables",
            params.min_mass,
            params.max_mass,
            params.max_sulfur + 1
        );
        Self {
            params,
            unconstrained,
            by_sulfur,
        }
    }

    pub fn params(&self) -> &SplineParams {
        &self.params
    }

    fn read(splines: &[CubicSpline], weight: f64, depth: usize) -> Option<Vec<f64>> {
        if depth > splines.len() {
            return None;
        }
        splines[..depth]
            .iter()
            .map(|s| s.evaluate(weight).map(|v| v.max(0.0)))
            .collect()
    }

    /// Interpolated isotope probabilities for `weight`, `None` when the weight or depth
    /// falls outside the table
    pub fn lookup(&self, weight: f64, depth: usize) -> Option<Vec<f64>> {
        Self::read(&self.unconstrained, weight, depth)
    }

    /// As [`IsotopeSplineTable::lookup`] for a species with exactly `sulfurs` sulfur atoms
    pub fn lookup_with_sulfur(&self, weight: f64, sulfurs: i32, depth: usize) -> Option<Vec<f64>> {
        if sulfurs < 0 {
            return None;
        }
        self.by_sulfur
            .get(sulfurs as usize)
            .and_then(|splines| Self::read(splines, weight, depth))
    }

    /// The spline counterpart of [`AveragineModel::fragment_distribution`]. Components that
    /// fall outside the table are computed with `model` instead.
    pub fn fragment_distribution(
        &self,
        model: &AveragineModel,
        table: &ElementTable,
        precursor_weight: f64,
        fragment_weight: f64,
        capture: &CaptureSet,
    ) -> Vec<f64> {
        let depth = match capture.largest() {
            Some(largest) => largest + 1,
            None => return Vec::new(),
        };
        let complement_weight = precursor_weight - fragment_weight;
        let fragment = self
            .lookup(fragment_weight, depth)
            .unwrap_or_else(|| model.distribution(fragment_weight, depth, table));
        let complement = self
            .lookup(complement_weight, depth)
            .unwrap_or_else(|| model.distribution(complement_weight, depth, table));
        conditional_distribution(&fragment, &complement, capture)
    }

    /// The spline counterpart of [`AveragineModel::fragment_distribution_with_sulfur`]
    #[allow(clippy::too_many_arguments)]
    pub fn fragment_distribution_with_sulfur(
        &self,
        model: &AveragineModel,
        table: &ElementTable,
        precursor_weight: f64,
        precursor_sulfurs: i32,
        fragment_weight: f64,
        fragment_sulfurs: i32,
        capture: &CaptureSet,
    ) -> Vec<f64> {
        let depth = match capture.largest() {
            Some(largest) => largest + 1,
            None => return Vec::new(),
        };
        let complement_weight = precursor_weight - fragment_weight;
        let complement_sulfurs = precursor_sulfurs - fragment_sulfurs;
        let fragment = self
            .lookup_with_sulfur(fragment_weight, fragment_sulfurs, depth)
            .unwrap_or_else(|| {
                model.distribution_with_sulfur(fragment_weight, fragment_sulfurs, depth, table)
            });
        let complement = self
            .lookup_with_sulfur(complement_weight, complement_sulfurs, depth)
            .unwrap_or_else(|| {
                model.distribution_with_sulfur(complement_weight, complement_sulfurs, depth, table)
            });
        conditional_distribution(&fragment, &complement, capture)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_spline_reproduces_knots_and_lines() {
        let spline = CubicSpline::fit(0.0, 1.0, vec![1.0, 3.0, 5.0, 7.0]);
        assert!((spline.evaluate(1.0).unwrap() - 3.0).abs() < 1e-12);
        assert!((spline.evaluate(2.5).unwrap() - 6.0).abs() < 1e-12);
        assert!(spline.evaluate(3.5).is_none());
        assert!(spline.evaluate(-0.1).is_none());
    }

    #[test]
    fn test_spline_smooth_curve() {
        let xs: Vec<f64> = (0..21).map(|i| i as f64 * 0.1).collect();
        let spline = CubicSpline::fit(0.0, 0.1, xs.iter().map(|x| x.sin()).collect());
        let y = spline.evaluate(1.05).unwrap();
        assert!((y - 1.05f64.sin()).abs() < 1e-4);
    }

    #[test]
    fn test_table_close_to_model() {
        let table = ElementTable::default();
        let model = AveragineModel::default();
        let params = SplineParams {
            min_mass: 500.0,
            max_mass: 3000.0,
            mass_step: 50.0,
            depth: 5,
            max_sulfur: 2,
        };
        let splines = IsotopeSplineTable::build(&model, &table, params);
        let interpolated = splines.lookup(1234.0, 3).unwrap();
        let exact = model.distribution(1234.0, 3, &table);
        for (a, b) in interpolated.iter().zip(exact.iter()) {
            assert!((a - b).abs() < 0.02, "{a} vs {b}");
        }
        assert!(splines.lookup(1234.0, 6).is_none());
        assert!(splines.lookup(4000.0, 3).is_none());
        assert!(splines.lookup_with_sulfur(1234.0, 3, 3).is_none());
        assert!(splines.lookup_with_sulfur(1234.0, 2, 3).is_some());

        // falls back to the closed form outside the grid
        let capture = CaptureSet::new(0, 1);
        let outside = splines.fragment_distribution(&model, &table, 9000.0, 4000.0, &capture);
        let closed = model.fragment_distribution(9000.0, 4000.0, &capture, &table);
        assert_eq!(outside, closed);
    }
}
