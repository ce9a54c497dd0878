//! Sampling random peptides to build isotope training tables
use std::collections::BTreeMap;

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::elements::ElementTable;
use crate::peptide::PeptideSequence;

const RESIDUES: &[u8] = b"ADEFGHIKLNPQRSTVWY";
const SULFUR_RESIDUES: &[u8] = b"CM";

/// One row of a `Precursor{i}.tab` training table
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainingRecord {
    pub probability: f64,
    #[cfg_attr(feature = "serde", serde(rename = "precursor.mass"))]
    pub precursor_mass: f64,
}

/// A sampled peptide's monoisotopic mass and the probabilities of its first isotopes
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub sequence: PeptideSequence,
    pub precursor_mass: f64,
    pub probabilities: Vec<f64>,
}

impl TrainingSample {
    pub fn record(&self, isotope: usize) -> Option<TrainingRecord> {
        self.probabilities.get(isotope).map(|p| TrainingRecord {
            probability: *p,
            precursor_mass: self.precursor_mass,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainingParams {
    /// Sampled peptides heavier than this are discarded. Also sets the longest
    /// sampled length to `max_mass / 100` residues.
    pub max_mass: f64,
    /// Samples drawn per peptide length
    pub num_samples: usize,
    /// The number of sulfur-bearing residues every sampled peptide carries
    pub num_sulfurs: usize,
    /// Tables are produced for isotopes `0..=max_isotope`
    pub max_isotope: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            max_mass: 8500.0,
            num_samples: 100,
            num_sulfurs: 0,
            max_isotope: 5,
        }
    }
}

/// Draws random peptides from an explicitly seeded generator, so a run is reproducible
/// from its seed
#[derive(Debug, Clone)]
pub struct TrainingSampler {
    table: ElementTable,
    rng: StdRng,
}

impl TrainingSampler {
    pub fn new(table: ElementTable, seed: u64) -> Self {
        Self {
            table,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `num_sulfurs` residues from `CM` followed by `length` residues of the rest of the
    /// alphabet, or `None` if that is no residues at all
    pub fn random_peptide(&mut self, length: usize, num_sulfurs: usize) -> Option<PeptideSequence> {
        let sulfur_dist = Uniform::from(0..SULFUR_RESIDUES.len());
        let residue_dist = Uniform::from(0..RESIDUES.len());
        let mut sequence = String::with_capacity(length + num_sulfurs);
        for _ in 0..num_sulfurs {
            sequence.push(SULFUR_RESIDUES[sulfur_dist.sample(&mut self.rng)] as char);
        }
        for _ in 0..length {
            sequence.push(RESIDUES[residue_dist.sample(&mut self.rng)] as char);
        }
        PeptideSequence::new(&sequence).ok()
    }

    /// Sample `num_samples` peptides of every length up to `max_mass / 100`, keeping those
    /// no heavier than `max_mass`
    pub fn sample(&mut self, params: &TrainingParams) -> Vec<TrainingSample> {
        let max_length = (params.max_mass / 100.0).max(0.0) as usize;
        let depth = params.max_isotope + 1;
        let mut samples = Vec::new();
        for length in 0..=max_length {
            for _ in 0..params.num_samples {
                let Some(sequence) = self.random_peptide(length, params.num_sulfurs) else {
                    continue;
                };
                let formula = sequence.formula();
                let precursor_mass = formula.monoisotopic_mass(&self.table);
                if precursor_mass > params.max_mass {
                    continue;
                }
                let probabilities = self.table.isotope_distribution(&formula, depth);
                samples.push(TrainingSample {
                    sequence,
                    precursor_mass,
                    probabilities,
                });
            }
        }
        debug!(
            "Sampled {} peptides with {} sulfur residues",
            samples.len(),
            params.num_sulfurs
        );
        samples
    }
}

/// How many samples per peptide length to draw for each sulfur count, in proportion to
/// its frequency relative to the most common count.
///
/// Sulfur counts less frequent than `min_fraction` of the most common one are dropped;
/// the rest get `floor(fraction / min_fraction)` samples.
pub fn sulfur_weighted_plan(
    counts: &BTreeMap<usize, usize>,
    min_fraction: f64,
) -> Vec<(usize, usize)> {
    let max_count = counts.values().copied().max().unwrap_or_default();
    if max_count == 0 || !(min_fraction > 0.0) {
        return Vec::new();
    }
    counts
        .iter()
        .filter_map(|(sulfurs, count)| {
            let fraction = *count as f64 / max_count as f64;
            (fraction >= min_fraction).then(|| (*sulfurs, (fraction / min_fraction).floor() as usize))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_random_peptide() {
        let mut sampler = TrainingSampler::new(ElementTable::default(), 42);
        let peptide = sampler.random_peptide(8, 2).unwrap();
        assert_eq!(peptide.len(), 10);
        assert!(peptide.as_str()[..2].chars().all(|c| c == 'C' || c == 'M'));
        assert!(peptide.as_str()[2..].chars().all(|c| c != 'C' && c != 'M'));
        assert!(sampler.random_peptide(0, 0).is_none());
    }

    #[test]
    fn test_sample_reproducible() {
        let params = TrainingParams {
            max_mass: 1000.0,
            num_samples: 5,
            num_sulfurs: 1,
            max_isotope: 3,
        };
        let a = TrainingSampler::new(ElementTable::default(), 7).sample(&params);
        let b = TrainingSampler::new(ElementTable::default(), 7).sample(&params);
        assert_eq!(a, b);
        assert!(!a.is_empty());
        for sample in a.iter() {
            assert!(sample.precursor_mass <= 1000.0);
            assert_eq!(sample.probabilities.len(), 4);
            assert!(sample.probabilities.iter().sum::<f64>() <= 1.0 + 1e-9);
        }
        let record = a[0].record(0).unwrap();
        assert_eq!(record.precursor_mass, a[0].precursor_mass);
        assert!(a[0].record(4).is_none());
    }

    #[test]
    fn test_sulfur_plan() {
        let counts = BTreeMap::from([(0, 1000), (1, 500), (2, 90), (3, 5)]);
        let plan = sulfur_weighted_plan(&counts, 0.1);
        assert_eq!(plan, vec![(0, 10), (1, 5)]);
        let plan = sulfur_weighted_plan(&counts, 0.05);
        assert_eq!(plan, vec![(0, 20), (1, 10), (2, 1)]);
    }
}
