use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Args, ValueEnum};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use mzfragiso::digest::Digestion;
use mzfragiso::training::TrainingParams;
use mzfragiso::{
    EngineParams, EstimationStrategy, JobShard, MonoisotopicSearch, ScoreInterpretation,
    ValidityPolicy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgStrategy {
    ExactPrecursor,
    ExactConditional,
    ApproxPrecursor,
    ApproxFragment,
    ApproxFragmentS,
    SplineFragment,
    SplineFragmentS,
}

impl From<ArgStrategy> for EstimationStrategy {
    fn from(value: ArgStrategy) -> Self {
        match value {
            ArgStrategy::ExactPrecursor => EstimationStrategy::ExactPrecursor,
            ArgStrategy::ExactConditional => EstimationStrategy::ExactConditional,
            ArgStrategy::ApproxPrecursor => EstimationStrategy::ApproxPrecursor,
            ArgStrategy::ApproxFragment => EstimationStrategy::ApproxFragment,
            ArgStrategy::ApproxFragmentS => EstimationStrategy::ApproxFragmentSulfur,
            ArgStrategy::SplineFragment => EstimationStrategy::SplineFragment,
            ArgStrategy::SplineFragmentS => EstimationStrategy::SplineFragmentSulfur,
        }
    }
}

impl Display for ArgStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", EstimationStrategy::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgValidityPolicy {
    /// No isotope after the second may exceed its predecessor
    MonotonicTail,
    /// A single apex, allowing 5% of noise on either side
    RiseThenFall,
    /// Never flag a distribution
    AlwaysValid,
}

impl From<ArgValidityPolicy> for ValidityPolicy {
    fn from(value: ArgValidityPolicy) -> Self {
        match value {
            ArgValidityPolicy::MonotonicTail => ValidityPolicy::MonotonicTail,
            ArgValidityPolicy::RiseThenFall => ValidityPolicy::RiseThenFall { tolerance: 0.05 },
            ArgValidityPolicy::AlwaysValid => ValidityPolicy::AlwaysValid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgMonoSearch {
    /// Require the monoisotopic peak
    Monoisotopic,
    /// Accept any isotope up to the largest captured precursor isotope
    AnyCaptured,
}

impl From<ArgMonoSearch> for MonoisotopicSearch {
    fn from(value: ArgMonoSearch) -> Self {
        match value {
            ArgMonoSearch::Monoisotopic => MonoisotopicSearch::Monoisotopic,
            ArgMonoSearch::AnyCaptured => MonoisotopicSearch::AnyCaptured,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgScoreInterpretation {
    HigherIsBetter,
    LowerIsBetter,
}

impl From<ArgScoreInterpretation> for ScoreInterpretation {
    fn from(value: ArgScoreInterpretation) -> Self {
        match value {
            ArgScoreInterpretation::HigherIsBetter => ScoreInterpretation::HigherIsBetter,
            ArgScoreInterpretation::LowerIsBetter => ScoreInterpretation::LowerIsBetter,
        }
    }
}

/// Engine parameters that may be given on the command line. Anything left unset falls
/// back to the configuration files, the environment and finally the built-in defaults.
#[derive(Args, Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineArgs {
    /// The peak matching tolerance in parts-per-million
    #[arg(short = 'p', long = "ppm-tolerance")]
    pub ppm_tolerance: Option<f64>,

    /// Trailing isotopes below this fraction of the tallest peak are dropped unless captured
    #[arg(long = "truncation-threshold")]
    pub truncation_threshold: Option<f64>,

    /// The number of isotopes to compute for strategies that ignore the capture set
    #[arg(long = "lookahead")]
    pub lookahead: Option<usize>,

    /// Identifications must score better than this to be compared
    #[arg(short = 's', long = "score-threshold")]
    pub score_threshold: Option<f64>,

    /// Whether identification scores are better when higher or lower
    #[arg(long = "score-interpretation")]
    pub score_interpretation: Option<ArgScoreInterpretation>,

    /// Skip identifications with a lower precursor charge
    #[arg(short = 'z', long = "min-precursor-charge")]
    pub min_precursor_charge: Option<i32>,

    /// How to flag implausible observed envelopes
    #[arg(long = "validity-policy")]
    pub validity_policy: Option<ArgValidityPolicy>,

    /// Which isotopes may establish that a fragment was observed
    #[arg(long = "mono-search")]
    pub mono_search: Option<ArgMonoSearch>,

    /// Score estimates of a different length than the reference as failures instead of
    /// padding or cutting them
    #[arg(long = "no-align")]
    pub no_align: bool,

    /// The isolation half-width to assume when a spectrum does not report one
    #[arg(long = "isolation-half-width")]
    pub default_isolation_half_width: Option<f64>,

    /// Shift the isolation window by this much m/z before resolving captured isotopes
    #[arg(long = "isolation-offset", allow_negative_numbers = true)]
    pub isolation_offset: Option<f64>,

    /// The strategies to compare. May be given multiple times.
    #[arg(short = 'm', long = "strategy")]
    pub strategies: Vec<ArgStrategy>,
}

impl EngineArgs {
    /// Overwrite the fields of `params` that were given explicitly
    pub fn apply(&self, params: &mut EngineParams) {
        if let Some(value) = self.ppm_tolerance {
            params.ppm_tolerance = value;
        }
        if let Some(value) = self.truncation_threshold {
            params.truncation_threshold = value;
        }
        if let Some(value) = self.lookahead {
            params.lookahead = value;
        }
        if let Some(value) = self.score_threshold {
            params.score_threshold = value;
        }
        if let Some(value) = self.score_interpretation {
            params.score_interpretation = value.into();
        }
        if let Some(value) = self.min_precursor_charge {
            params.min_precursor_charge = value;
        }
        if let Some(value) = self.validity_policy {
            params.validity_policy = value.into();
        }
        if let Some(value) = self.mono_search {
            params.mono_search = value.into();
        }
        if self.no_align {
            params.align_to_reference = false;
        }
        if let Some(value) = self.default_isolation_half_width {
            params.default_isolation_half_width = value;
        }
        if let Some(value) = self.isolation_offset {
            params.isolation_offset = value;
        }
        if !self.strategies.is_empty() {
            params.strategies = self.strategies.iter().copied().map(Into::into).collect();
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineParams,
}

/// Layer the engine parameters: built-in defaults, `mzfragiso.toml` in the working
/// directory, `config_file`, `MZFRAGISO_`-prefixed environment variables and finally
/// the explicit command line flags.
pub fn resolve_engine_params(
    config_file: Option<&Path>,
    overrides: &EngineArgs,
) -> Result<EngineParams, figment::Error> {
    let mut config = Figment::from(Serialized::defaults(ConfigFile::default()))
        .merge(Toml::file("mzfragiso.toml"));
    if let Some(path) = config_file {
        config = config.merge(Toml::file_exact(path));
    }
    config = config.merge(
        Env::prefixed("MZFRAGISO_").map(|key| format!("engine.{key}").into()),
    );
    let ConfigFile { mut engine } = config.extract()?;
    overrides.apply(&mut engine);
    Ok(engine)
}

/// Compare strategy estimates against the fragments of identified spectra
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct CompareArgs {
    /// The mzML or MGF file to read spectra from
    #[arg()]
    pub spectra_file: PathBuf,

    /// A tab separated table of identifications with the columns `spectrum_index`,
    /// `psm_index`, `hit_index`, `sequence`, `charge` and `score`
    #[arg()]
    pub psm_file: PathBuf,

    /// The directory to write `ions.tsv` and `scores.tsv` into
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Write the run's counters to this path as JSON
    #[arg(long = "summary-file")]
    pub summary_file: Option<PathBuf>,

    #[command(flatten)]
    #[serde(default)]
    pub engine: EngineArgs,
}

/// Compare strategy estimates against exact conditional distributions of digested proteins
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct TheoreticalArgs {
    /// The FASTA file of protein sequences to digest
    #[arg()]
    pub fasta_file: PathBuf,

    /// The path to write the comparison table to, or if '-' is passed, write to STDOUT
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// This job's share of the proteins, denoted JOB/JOBS
    #[arg(
        short = 'j',
        long = "job",
        value_parser = JobShard::from_str,
        value_name = "JOB/JOBS",
        default_value = "1/1"
    )]
    #[serde(default)]
    pub job: JobShard,

    /// The number of missed cleavages to allow
    #[arg(long = "missed-cleavages", default_value_t = 0)]
    #[serde(default)]
    pub missed_cleavages: usize,

    /// The shortest peptide to compare
    #[arg(long = "min-length", default_value_t = 5)]
    pub min_length: usize,

    /// The longest peptide to compare
    #[arg(long = "max-length", default_value_t = 80)]
    pub max_length: usize,

    #[command(flatten)]
    #[serde(default)]
    pub engine: EngineArgs,
}

impl TheoreticalArgs {
    pub fn digestion(&self) -> Digestion {
        Digestion {
            missed_cleavages: self.missed_cleavages,
            min_len: self.min_length,
            max_len: self.max_length,
            ..Default::default()
        }
    }
}

/// Sample random peptides and write their isotope probabilities as training tables
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct TrainingArgs {
    /// The directory to write `Precursor{i}.tab` files into
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Sampled peptides heavier than this are discarded
    #[arg(long = "max-mass", default_value_t = 8500.0)]
    pub max_mass: f64,

    /// The number of peptides to sample per length
    #[arg(short = 'n', long = "num-samples", default_value_t = 100)]
    pub num_samples: usize,

    /// The number of sulfur-bearing residues in every sampled peptide
    #[arg(long = "sulfurs", default_value_t = 0)]
    #[serde(default)]
    pub num_sulfurs: usize,

    /// Write tables for isotopes 0 through this one
    #[arg(long = "max-isotope", default_value_t = 5)]
    pub max_isotope: usize,

    /// The random seed
    #[arg(long = "seed", default_value_t = 1)]
    pub seed: u64,

    /// A table of sulfur counts and how often each was observed. When given, the number
    /// of samples per sulfur count follows its frequency and `--sulfurs` is ignored.
    #[arg(long = "sulfur-distribution")]
    pub sulfur_distribution: Option<PathBuf>,

    /// Sulfur counts observed less often than this fraction of the most common one are
    /// not sampled
    #[arg(long = "min-fraction", default_value_t = 0.01)]
    pub min_fraction: f64,
}

impl TrainingArgs {
    pub fn params(&self) -> TrainingParams {
        TrainingParams {
            max_mass: self.max_mass,
            num_samples: self.num_samples,
            num_sulfurs: self.num_sulfurs,
            max_isotope: self.max_isotope,
        }
    }
}

/// Follow the fragments of one precursor across spectra
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct TargetedArgs {
    /// The mzML or MGF file of centroided spectra to search
    #[arg()]
    pub spectra_file: PathBuf,

    /// The precursor's peptide sequence
    #[arg(short = 'q', long = "sequence")]
    pub sequence: String,

    /// The precursor's charge
    #[arg(short = 'c', long = "charge")]
    pub charge: i32,

    /// A file holding the profile mode versions of the same spectra, matched by native
    /// ID, to draw the signal traces from
    #[arg(long = "profile-file")]
    pub profile_file: Option<PathBuf>,

    /// Stop after this many MSn spectra
    #[arg(short = 'n', long = "max-spectra")]
    pub max_spectra: Option<usize>,

    /// The path to write the signal traces to
    #[arg(long = "trace-file", default_value = "trace.tsv")]
    pub trace_file: PathBuf,

    /// The path to write the modeled envelopes to
    #[arg(long = "models-file", default_value = "models.tsv")]
    pub models_file: PathBuf,

    #[command(flatten)]
    #[serde(default)]
    pub engine: EngineArgs,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_apply() {
        let args = EngineArgs {
            ppm_tolerance: Some(10.0),
            no_align: true,
            strategies: vec![ArgStrategy::ApproxFragmentS],
            ..Default::default()
        };
        let mut params = EngineParams::default();
        args.apply(&mut params);
        assert_eq!(params.ppm_tolerance, 10.0);
        assert!(!params.align_to_reference);
        assert_eq!(params.strategies, vec![EstimationStrategy::ApproxFragmentSulfur]);
        assert_eq!(params.lookahead, 7);
        assert_eq!(ArgStrategy::ApproxFragmentS.to_string(), "approx_fragment_S");
    }
}
