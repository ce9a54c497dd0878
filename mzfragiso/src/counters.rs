//! Run-scoped tallies of what was searched and found
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

/// Aggregate counts for one run, or one slice of a run.
///
/// Each unit of work returns its own record and records are summed afterwards, so
/// workers never share mutable state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunCounters {
    pub spectra_processed: usize,
    /// Spectra skipped because their peaks were not centroided
    pub spectra_skipped: usize,
    pub peptide_hits: usize,
    pub peptide_hits_passing: usize,
    /// PSMs passing the threshold whose isolation window missed the monoisotopic peak
    pub empty_captures: usize,
    /// Passing PSMs skipped because their sequence could not be parsed
    pub invalid_peptides: usize,
    /// Passing PSMs by precursor charge
    pub precursor_charges: BTreeMap<i32, usize>,
    pub ions_searched: usize,
    pub ions_matched: usize,
    /// `matched_at_depth[i]` counts found ions with a non-zero observed isotope `i`
    pub matched_at_depth: Vec<usize>,
    /// `searched_at_depth[n]` counts found ions whose distribution had `n` isotopes
    pub searched_at_depth: Vec<usize>,
    /// `complete_at_depth[n]` counts found ions with all `n` isotopes observed
    pub complete_at_depth: Vec<usize>,
}

fn bump(counts: &mut Vec<usize>, index: usize) {
    if counts.len() <= index {
        counts.resize(index + 1, 0);
    }
    counts[index] += 1;
}

fn merge(counts: &mut Vec<usize>, other: &[usize]) {
    if counts.len() < other.len() {
        counts.resize(other.len(), 0);
    }
    for (a, b) in counts.iter_mut().zip(other) {
        *a += b;
    }
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sum(self, other: Self) -> Self {
        self + other
    }

    pub fn record_charge(&mut self, charge: i32) {
        *self.precursor_charges.entry(charge).or_default() += 1;
    }

    /// Tally an observed distribution (raw intensities) of a found ion
    pub fn record_observed(&mut self, observed: &[f64]) {
        self.ions_matched += 1;
        for (i, v) in observed.iter().enumerate() {
            if *v > 0.0 {
                bump(&mut self.matched_at_depth, i);
            }
        }
        bump(&mut self.searched_at_depth, observed.len());
        if !observed.is_empty() && observed.iter().all(|v| *v > 0.0) {
            bump(&mut self.complete_at_depth, observed.len());
        }
    }

    /// The fraction of found ions at depth `n` whose distribution was complete
    pub fn completion_rate(&self, depth: usize) -> Option<f64> {
        let searched = self.searched_at_depth.get(depth).copied().unwrap_or_default();
        if searched == 0 {
            return None;
        }
        let complete = self.complete_at_depth.get(depth).copied().unwrap_or_default();
        Some(complete as f64 / searched as f64)
    }
}

impl Add for RunCounters {
    type Output = RunCounters;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self.clone();
        dup += rhs;
        dup
    }
}

impl AddAssign for RunCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.spectra_processed += rhs.spectra_processed;
        self.spectra_skipped += rhs.spectra_skipped;
        self.peptide_hits += rhs.peptide_hits;
        self.peptide_hits_passing += rhs.peptide_hits_passing;
        self.empty_captures += rhs.empty_captures;
        self.invalid_peptides += rhs.invalid_peptides;
        for (z, n) in rhs.precursor_charges {
            *self.precursor_charges.entry(z).or_default() += n;
        }
        self.ions_searched += rhs.ions_searched;
        self.ions_matched += rhs.ions_matched;
        merge(&mut self.matched_at_depth, &rhs.matched_at_depth);
        merge(&mut self.searched_at_depth, &rhs.searched_at_depth);
        merge(&mut self.complete_at_depth, &rhs.complete_at_depth);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_record_observed() {
        let mut counters = RunCounters::new();
        counters.record_observed(&[100.0, 50.0, 0.0]);
        counters.record_observed(&[100.0, 50.0, 10.0]);
        assert_eq!(counters.ions_matched, 2);
        assert_eq!(counters.matched_at_depth, vec![2, 2, 1]);
        assert_eq!(counters.searched_at_depth, vec![0, 0, 0, 2]);
        assert_eq!(counters.complete_at_depth, vec![0, 0, 0, 1]);
        assert_eq!(counters.completion_rate(3), Some(0.5));
        assert_eq!(counters.completion_rate(2), None);
    }

    #[test]
    fn test_merge() {
        let mut a = RunCounters::new();
        a.record_charge(2);
        a.record_observed(&[1.0]);
        let mut b = RunCounters::new();
        b.record_charge(2);
        b.record_charge(3);
        b.record_observed(&[1.0, 1.0, 1.0]);
        b.ions_searched = 4;
        b.invalid_peptides = 1;

        let total = [a.clone(), b.clone()]
            .into_iter()
            .fold(RunCounters::default(), RunCounters::sum);
        assert_eq!(total.precursor_charges[&2], 2);
        assert_eq!(total.precursor_charges[&3], 1);
        assert_eq!(total.ions_searched, 4);
        assert_eq!(total.invalid_peptides, 1);
        assert_eq!(total.matched_at_depth, vec![2, 1, 1]);
        assert_eq!(total.complete_at_depth, vec![0, 1, 0, 1]);
        assert_eq!(total, b + a);
    }
}
