use std::fs;
use std::io;
use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoLocal},
    prelude::*,
    EnvFilter,
};

use mzfragiso_cli::{MZFragIso, MZFragIsoError};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn make_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy()
}

/// Log to STDERR and, if given, to `log_file`. The returned guard must outlive all logging.
fn configure_log(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, MZFragIsoError> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(fs::File::create(path)?);
            let layer = fmt::layer()
                .compact()
                .with_ansi(false)
                .with_timer(ChronoLocal::rfc_3339())
                .with_writer(writer)
                .with_filter(make_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_timer(ChronoLocal::rfc_3339())
                .with_writer(io::stderr)
                .with_filter(make_filter()),
        )
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| MZFragIsoError::LoggingError(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| MZFragIsoError::LoggingError(e.to_string()))?;
    Ok(guard)
}

fn main() -> Result<(), MZFragIsoError> {
    let args = MZFragIso::parse();
    let _guard = configure_log(args.log_file.as_deref())?;
    args.main()?;
    Ok(())
}
