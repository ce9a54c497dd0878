use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use mzdata::io::MassSpectrometryFormat;
use mzdata::prelude::*;
use mzdata::spectrum::SignalContinuity;

use mzfragiso::targeted::{ProfileSignal, TargetedComparison};
use mzfragiso::theoretical::TheoreticalComparison;
use mzfragiso::training::{sulfur_weighted_plan, TrainingParams, TrainingSampler};
use mzfragiso::{
    BatchOrchestrator, CaptureWindow, ElementTable, EngineParams, EnvelopeError, FormulaError, Ion,
    PeptideSequence, ProcessingError, RunCounters, ShardError, SpectrumContext, SpectrumOutcome,
};

use crate::args::{
    resolve_engine_params, CompareArgs, EngineArgs, TargetedArgs, TheoreticalArgs, TrainingArgs,
};
use crate::read::{open_spectra, read_fasta_file, read_psms, read_sulfur_counts};
use crate::write::{open_output, tsv_writer, write_table};

#[derive(Debug, Error)]
pub enum MZFragIsoError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("A table could not be read or written: {0}")]
    CSVError(
        #[source]
        #[from]
        csv::Error,
    ),
    #[error("The configuration could not be loaded: {0}")]
    ConfigurationError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error("The run summary could not be written: {0}")]
    SerializationError(
        #[source]
        #[from]
        serde_json::Error,
    ),
    #[error(transparent)]
    FormulaError(#[from] FormulaError),
    #[error(transparent)]
    ShardError(#[from] ShardError),
    #[error(transparent)]
    ProcessingError(#[from] ProcessingError),
    #[error(transparent)]
    EnvelopeError(#[from] EnvelopeError),
    #[error("The thread pool could not be started: {0}")]
    ThreadPoolError(
        #[source]
        #[from]
        rayon::ThreadPoolBuildError,
    ),
    #[error("The input file format for {0} was either unknown or not supported ({1:?})")]
    FormatUnknownOrNotSupportedError(String, MassSpectrometryFormat),
    #[error("Logging could not be configured: {0}")]
    LoggingError(String),
}

#[derive(Subcommand, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    Compare(CompareArgs),
    Theoretical(TheoreticalArgs),
    Training(TrainingArgs),
    Targeted(TargetedArgs),
}

/// Fragment ion isotope envelope estimation and comparison.
///
/// Estimate the isotope envelopes of peptide fragment ions given which precursor
/// isotopes were isolated, and measure how well each estimate agrees with exact
/// distributions and with observed spectra.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version)]
pub struct MZFragIso {
    #[command(subcommand)]
    pub command: Command,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read engine parameters from, under an `[engine]` table.
    ///
    /// Configurations are also read from `mzfragiso.toml` in the working directory.
    /// Environment variables prefixed with `MZFRAGISO_` will be read too.
    #[arg(long = "config-file", global = true)]
    pub config_file: Option<PathBuf>,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(short = 't', long = "threads", default_value_t = -1, global = true)]
    #[serde(default)]
    pub threads: i32,
}

impl MZFragIso {
    fn create_threadpool(&self) -> Result<rayon::ThreadPool, MZFragIsoError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism().map(usize::from).unwrap_or(1)
        };
        debug!("Using {} cores", num_threads);
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?)
    }

    fn engine_params(&self, overrides: &EngineArgs) -> Result<EngineParams, MZFragIsoError> {
        let params = resolve_engine_params(self.config_file.as_deref(), overrides)?;
        debug!("Engine parameters: {params:?}");
        Ok(params)
    }

    pub fn main(&self) -> Result<(), MZFragIsoError> {
        info!(
            "mzfragiso v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        let start = Instant::now();
        let pool = self.create_threadpool()?;
        pool.install(|| match &self.command {
            Command::Compare(args) => self.run_compare(args),
            Command::Theoretical(args) => self.run_theoretical(args),
            Command::Training(args) => self.run_training(args),
            Command::Targeted(args) => self.run_targeted(args),
        })?;
        info!("Elapsed Time: {:0.3?}", start.elapsed());
        Ok(())
    }

    fn run_compare(&self, args: &CompareArgs) -> Result<(), MZFragIsoError> {
        let params = self.engine_params(&args.engine)?;
        info!("Input: {}", args.spectra_file.display());
        let psms = read_psms(&args.psm_file)?;
        info!(
            "Read {} identifications for {} spectra",
            psms.values().map(Vec::len).sum::<usize>(),
            psms.len()
        );

        let reader = open_spectra(&args.spectra_file)?;
        let orchestrator = BatchOrchestrator::new(params);

        let mut outcomes: Vec<(usize, SpectrumOutcome)> = reader
            .filter(|scan| psms.contains_key(&scan.index()))
            .par_bridge()
            .map(|mut scan| {
                let index = scan.index();
                let skipped = SpectrumOutcome {
                    counters: RunCounters {
                        spectra_skipped: 1,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                let Some(hits) = psms.get(&index) else {
                    return Ok((index, SpectrumOutcome::default()));
                };
                if scan.signal_continuity() == SignalContinuity::Profile {
                    warn!("Skipping {}, its peaks are not centroided", scan.id());
                    return Ok((index, skipped));
                }
                let native_id = scan.id().to_string();
                let (precursor_mz, isolation) = match scan.precursor() {
                    Some(prec) => (
                        prec.ion().map(|ion| ion.mz),
                        CaptureWindow::from_isolation_window(&prec.isolation_window),
                    ),
                    None => (None, None),
                };
                let peaks = match scan.try_build_centroids() {
                    Ok(peaks) => peaks,
                    Err(e) => {
                        warn!("Skipping {native_id}, its peaks could not be read: {e}");
                        return Ok((index, skipped));
                    }
                };
                let context = SpectrumContext {
                    index,
                    native_id: &native_id,
                    peaks,
                    precursor_mz,
                    isolation,
                };
                let outcome = orchestrator.process_spectrum(&context, hits)?;
                Ok((index, outcome))
            })
            .collect::<Result<_, MZFragIsoError>>()?;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut next_id = 0;
        for (_, outcome) in outcomes.iter_mut() {
            next_id = outcome.number_ions(next_id);
        }

        fs::create_dir_all(&args.output_dir)?;
        let n_ions = write_table(
            &args.output_dir.join("ions.tsv"),
            outcomes
                .iter()
                .flat_map(|(_, outcome)| outcome.ions.iter().map(|ion| &ion.ion)),
        )?;
        let n_scores = write_table(
            &args.output_dir.join("scores.tsv"),
            outcomes.iter().flat_map(|(_, outcome)| {
                outcome.ions.iter().flat_map(|ion| ion.comparisons.iter())
            }),
        )?;
        debug!("Wrote {n_ions} ions and {n_scores} comparisons");

        let counters = outcomes
            .into_iter()
            .map(|(_, outcome)| outcome.counters)
            .fold(RunCounters::default(), RunCounters::sum);
        log_summary(&counters);
        if let Some(path) = args.summary_file.as_ref() {
            serde_json::to_writer_pretty(io::BufWriter::new(fs::File::create(path)?), &counters)?;
        }
        Ok(())
    }

    fn run_theoretical(&self, args: &TheoreticalArgs) -> Result<(), MZFragIsoError> {
        let params = self.engine_params(&args.engine)?;
        let proteins = read_fasta_file(&args.fasta_file)?;
        info!(
            "Read {} proteins, running job {}",
            proteins.len(),
            args.job
        );
        let comparison = TheoreticalComparison::new(
            params.build_engine(),
            args.digestion(),
            &params.strategies,
        );
        let selected: Vec<_> = args.job.select(proteins.iter()).collect();
        let records: Vec<_> = selected
            .par_iter()
            .map(|protein| comparison.compare_protein(protein))
            .collect::<Result<Vec<_>, _>>()?;
        let n = write_table(&args.output_file, records.iter().flatten())?;
        info!("Compared {n} fragment estimates from {} proteins", selected.len());
        Ok(())
    }

    fn run_training(&self, args: &TrainingArgs) -> Result<(), MZFragIsoError> {
        let params = args.params();
        let mut plan = vec![(params.num_sulfurs, params.num_samples)];
        if let Some(path) = args.sulfur_distribution.as_ref() {
            let counts = read_sulfur_counts(path)?;
            plan = sulfur_weighted_plan(&counts, args.min_fraction);
            info!("Sampling {} sulfur counts: {plan:?}", plan.len());
        }

        fs::create_dir_all(&args.output_dir)?;
        let mut writers = (0..=params.max_isotope)
            .map(|i| {
                let path = args.output_dir.join(format!("Precursor{i}.tab"));
                Ok(tsv_writer(open_output(&path)?))
            })
            .collect::<Result<Vec<_>, io::Error>>()?;

        let mut sampler = TrainingSampler::new(ElementTable::default(), args.seed);
        let mut n_samples = 0;
        for (num_sulfurs, num_samples) in plan {
            let samples = sampler.sample(&TrainingParams {
                num_sulfurs,
                num_samples,
                ..params
            });
            for sample in samples.iter() {
                for (isotope, writer) in writers.iter_mut().enumerate() {
                    if let Some(record) = sample.record(isotope) {
                        writer.serialize(record)?;
                    }
                }
            }
            n_samples += samples.len();
        }
        for writer in writers.iter_mut() {
            writer.flush()?;
        }
        info!(
            "Wrote {} isotope tables from {n_samples} peptides",
            writers.len()
        );
        Ok(())
    }

    fn run_targeted(&self, args: &TargetedArgs) -> Result<(), MZFragIsoError> {
        let params = self.engine_params(&args.engine)?;
        let table = ElementTable::default();
        let sequence = PeptideSequence::new(&args.sequence)?;
        let precursor = Ion::precursor(sequence, args.charge, &table)?;
        info!(
            "Following the fragments of {} ({}+) at {:0.4} m/z",
            precursor.sequence,
            precursor.charge,
            precursor.mono_mz()
        );
        let comparison = TargetedComparison::new(&params, precursor);

        let reader = open_spectra(&args.spectra_file)?;
        let mut profile_reader = args
            .profile_file
            .as_deref()
            .map(open_spectra)
            .transpose()?;

        let mut trace_writer = tsv_writer(open_output(&args.trace_file)?);
        let mut models_writer = tsv_writer(open_output(&args.models_file)?);
        let mut n_spectra = 0;
        let mut ions_found = 0;

        let msn_spectra = reader
            .filter(|scan| scan.ms_level() > 1)
            .take(args.max_spectra.unwrap_or(usize::MAX));
        for mut scan in msn_spectra {
            if scan.signal_continuity() == SignalContinuity::Profile {
                warn!("Skipping {}, its peaks are not centroided", scan.id());
                continue;
            }
            let native_id = scan.id().to_string();
            let profile_scan = profile_reader
                .as_mut()
                .and_then(|reader| reader.get_spectrum_by_id(&native_id));
            let profile_arrays = profile_scan
                .as_ref()
                .and_then(|s| s.raw_arrays())
                .and_then(|arrays| match (arrays.mzs(), arrays.intensities()) {
                    (Ok(mzs), Ok(intensities)) => Some((mzs, intensities)),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Failed to read the profile signal of {native_id}: {e}");
                        None
                    }
                });
            let profile = profile_arrays
                .as_ref()
                .map(|(mzs, intensities)| ProfileSignal {
                    mzs,
                    intensities,
                });

            let (precursor_mz, isolation) = match scan.precursor() {
                Some(prec) => (
                    prec.ion().map(|ion| ion.mz),
                    CaptureWindow::from_isolation_window(&prec.isolation_window),
                ),
                None => (None, None),
            };
            let index = scan.index();
            let peaks = match scan.try_build_centroids() {
                Ok(peaks) => peaks,
                Err(e) => {
                    warn!("Skipping {native_id}, its peaks could not be read: {e}");
                    continue;
                }
            };
            let context = SpectrumContext {
                index,
                native_id: &native_id,
                peaks,
                precursor_mz,
                isolation,
            };
            let outcome = comparison.process_spectrum(&context, profile)?;
            for row in outcome.trace.iter() {
                trace_writer.serialize(row)?;
            }
            for row in outcome.models.iter() {
                models_writer.serialize(row)?;
            }
            ions_found += outcome.ions_found;
            n_spectra += 1;
        }
        trace_writer.flush()?;
        models_writer.flush()?;
        info!("Found {ions_found} fragments across {n_spectra} spectra");
        Ok(())
    }
}

fn log_summary(counters: &RunCounters) {
    info!(
        "Spectra: {} | Skipped: {}",
        counters.spectra_processed, counters.spectra_skipped
    );
    info!(
        "Peptide Hits: {} | Passing: {} | Empty Captures: {} | Invalid: {}",
        counters.peptide_hits,
        counters.peptide_hits_passing,
        counters.empty_captures,
        counters.invalid_peptides
    );
    for (charge, count) in counters.precursor_charges.iter() {
        info!("Precursor Charge {charge}: {count}");
    }
    info!(
        "Ions Searched: {} | Matched: {}",
        counters.ions_searched, counters.ions_matched
    );
    for (depth, searched) in counters.searched_at_depth.iter().enumerate() {
        if *searched == 0 {
            continue;
        }
        let complete = counters
            .complete_at_depth
            .get(depth)
            .copied()
            .unwrap_or_default();
        info!("Depth {depth}: {searched} searched, {complete} complete");
    }
    for (isotope, matched) in counters.matched_at_depth.iter().enumerate() {
        info!("Isotope {isotope} Matched: {matched}");
    }
}
