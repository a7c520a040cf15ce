mod bench;
mod config;
mod database;
mod report;


use config::{BenchConfig, ConfigError};
use database::{populate, schema, stats, Database, DatabaseError};
use report::{ReportError, RunMetadata, RunReport};
use std::{error::Error, process::ExitCode, time::Instant};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting PostgreSQL key benchmark: serial id vs UUID");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log_error_chain(&error);

            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), RunError> {
    let config = BenchConfig::from_env()?;
    let started = Instant::now();

    let mut db = Database::connect(&config.database)?;

    // the connection is closed whether or not the benchmark succeeded
    let outcome = run_benchmark(&mut db, &config);
    if let Err(close_error) = db.close() {
        error!(error = ?close_error, "Failed to close connection");
    }
    outcome?;

    let minutes = started.elapsed().as_secs_f64() / 60.0;
    info!("Benchmark finished, total duration {minutes:.2} minutes");

    Ok(())
}

fn run_benchmark(db: &mut Database, config: &BenchConfig) -> Result<(), RunError> {
    let metadata = RunMetadata {
        timestamp: report::metadata_timestamp(),
        total_records: config.total_records,
        iterations: config.iterations,
    };

    schema::reset(db)?;
    populate::populate(
        db,
        config.total_records,
        config.batch_size,
        &mut rand::thread_rng(),
    )?;

    stats::vacuum_analyze(db)?;
    let table_stats = stats::collect_table_stats(db)?;
    let index_stats = stats::collect_index_stats(db)?;

    let test_results = bench::run(db, config.iterations)?;
    let comparative_results = report::compare(&test_results);
    report::log_comparative_results(&comparative_results);

    let report = RunReport {
        metadata,
        db_version: db.version().to_owned(),
        uuid_v7_available: db.generator().is_time_ordered(),
        table_stats,
        index_stats,
        test_results,
        comparative_results,
    };
    report::save(&report, &config.results_dir, &report::file_stamp())?;

    Ok(())
}

fn log_error_chain(error: &RunError) {
    error!("Run aborted: {error}");

    let mut source = error.source();
    while let Some(cause) = source {
        error!("  caused by: {cause}");
        source = cause.source();
    }
}
