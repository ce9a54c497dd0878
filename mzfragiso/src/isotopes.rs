//! Exact isotope distributions of elemental compositions, and the fragment distribution
//! conditioned on which precursor isotopologues were isolated.
use crate::capture::CaptureSet;
use crate::composition::ElementalComposition;
use crate::elements::ElementTable;
use crate::normalize::renormalize_values;

/// Convolve two isotope probability vectors, keeping at most `depth` terms
pub(crate) fn convolve(a: &[f64], b: &[f64], depth: usize) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let n = (a.len() + b.len() - 1).min(depth);
    let mut out = vec![0.0; n];
    for (i, x) in a.iter().enumerate().take(n) {
        if *x == 0.0 {
            continue;
        }
        for (j, y) in b.iter().enumerate().take(n - i) {
            out[i + j] += x * y;
        }
    }
    out
}

/// Raise an isotope vector to the `count`-th convolution power by repeated squaring
pub(crate) fn convolve_power(base: &[f64], count: u32, depth: usize) -> Vec<f64> {
    let mut result = vec![1.0];
    let mut base = base.to_vec();
    base.truncate(depth);
    let mut count = count;
    while count > 0 {
        if count & 1 == 1 {
            result = convolve(&result, &base, depth);
        }
        count >>= 1;
        if count > 0 {
            base = convolve(&base, &base, depth);
        }
    }
    result
}

impl ElementTable {
    /// The exact isotope distribution of `composition`, indexed by nominal mass offset
    /// from the monoisotopic peak and truncated to `depth` entries.
    ///
    /// Elements with non-positive counts contribute nothing. The result sums to at most 1,
    /// the remainder being the probability mass beyond `depth`.
    pub fn isotope_distribution(&self, composition: &ElementalComposition, depth: usize) -> Vec<f64> {
        if depth == 0 {
            return Vec::new();
        }
        let mut acc = vec![1.0];
        for (element, count) in composition.iter() {
            if count <= 0 {
                continue;
            }
            let part = convolve_power(self.abundances(element), count as u32, depth);
            acc = convolve(&acc, &part, depth);
        }
        acc.resize(depth, 0.0);
        acc
    }

    /// The isotope distribution of `fragment` given that the precursor isotopologues in
    /// `capture` were isolated, with `complement` the rest of the precursor.
    ///
    /// See [`conditional_distribution`].
    pub fn conditional_fragment_distribution(
        &self,
        fragment: &ElementalComposition,
        complement: &ElementalComposition,
        capture: &CaptureSet,
    ) -> Vec<f64> {
        let depth = match capture.largest() {
            Some(largest) => largest + 1,
            None => return Vec::new(),
        };
        let fragment_dist = self.isotope_distribution(fragment, depth);
        let complement_dist = self.isotope_distribution(complement, depth);
        conditional_distribution(&fragment_dist, &complement_dist, capture)
    }
}

/// Combine a fragment distribution `F` and its complement's distribution `C` into the
/// fragment distribution conditioned on the captured precursor isotopes `S`:
///
/// ```math
/// P(i) \propto \sum_{s \in S, s \ge i} F_i C_{s - i}
/// ```
///
/// over `i` in `0..=max(S)`, renormalized to sum to 1. Missing terms of either input are
/// treated as zero. Empty when `S` is empty.
pub fn conditional_distribution(fragment: &[f64], complement: &[f64], capture: &CaptureSet) -> Vec<f64> {
    let depth = match capture.largest() {
        Some(largest) => largest + 1,
        None => return Vec::new(),
    };
    let at = |v: &[f64], i: usize| v.get(i).copied().unwrap_or_default();
    let mut result: Vec<f64> = (0..depth)
        .map(|i| {
            capture
                .iter()
                .filter(|s| *s >= i)
                .map(|s| at(fragment, i) * at(complement, s - i))
                .sum()
        })
        .collect();
    renormalize_values(&mut result);
    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_convolve() {
        let a = [0.9, 0.1];
        let out = convolve(&a, &a, 10);
        assert_eq!(out.len(), 3);
        assert!((out[0] - 0.81).abs() < 1e-12);
        assert!((out[1] - 0.18).abs() < 1e-12);
        assert!((out[2] - 0.01).abs() < 1e-12);

        let short = convolve(&a, &a, 2);
        assert_eq!(short.len(), 2);

        let pow = convolve_power(&a, 3, 10);
        assert!((pow[3] - 0.001).abs() < 1e-12);
        assert!((pow.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_carbon_binomial() {
        let table = ElementTable::default();
        let comp = ElementalComposition::from_chnops(100, 0, 0, 0, 0, 0);
        let dist = table.isotope_distribution(&comp, 4);
        let p = 0.0107f64;
        let q = 1.0 - p;
        assert!((dist[0] - q.powi(100)).abs() < 1e-12);
        assert!((dist[1] - 100.0 * p * q.powi(99)).abs() < 1e-12);
        assert!((dist[2] - 4950.0 * p.powi(2) * q.powi(98)).abs() < 1e-12);
    }

    #[test]
    fn test_peptide_distribution() {
        let table = ElementTable::default();
        let comp: ElementalComposition = "C34H53N7O15".parse().unwrap();
        let dist = table.isotope_distribution(&comp, 7);
        assert_eq!(dist.len(), 7);
        let total: f64 = dist.iter().sum();
        assert!(total <= 1.0 + 1e-12 && total > 0.999);
        assert!(dist[0] > dist[1] && dist[1] > dist[2]);
        assert!((dist[0] - 0.648).abs() < 1e-3, "{}", dist[0]);
    }

    #[test]
    fn test_negative_counts_ignored() {
        let table = ElementTable::default();
        let comp = ElementalComposition::from_chnops(10, -4, 0, 0, 0, 0);
        let carbon = ElementalComposition::from_chnops(10, 0, 0, 0, 0, 0);
        assert_eq!(
            table.isotope_distribution(&comp, 5),
            table.isotope_distribution(&carbon, 5)
        );
        let empty = table.isotope_distribution(&ElementalComposition::new(), 3);
        assert_eq!(empty, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_conditional_mono_only() {
        let table = ElementTable::default();
        let fragment = ElementalComposition::from_chnops(20, 30, 5, 6, 0, 0);
        let complement = ElementalComposition::from_chnops(25, 40, 6, 8, 0, 1);
        let dist = table.conditional_fragment_distribution(
            &fragment,
            &complement,
            &CaptureSet::new(0, 0),
        );
        assert_eq!(dist, vec![1.0]);
    }

    #[test]
    fn test_conditional_two_isotopes() {
        let f = [0.8, 0.2];
        let c = [0.7, 0.3];
        let dist = conditional_distribution(&f, &c, &CaptureSet::new(0, 1));
        // P0 ~ F0*C0 + F0*C1, P1 ~ F1*C0
        let p0 = 0.8 * 0.7 + 0.8 * 0.3;
        let p1 = 0.2 * 0.7;
        let z = p0 + p1;
        assert!((dist[0] - p0 / z).abs() < 1e-12);
        assert!((dist[1] - p1 / z).abs() < 1e-12);

        let upper_only = conditional_distribution(&f, &c, &CaptureSet::new(1, 1));
        let z = 0.8 * 0.3 + 0.2 * 0.7;
        assert!((upper_only[0] - 0.8 * 0.3 / z).abs() < 1e-12);
        assert!(conditional_distribution(&f, &c, &CaptureSet::empty()).is_empty());
    }
}
