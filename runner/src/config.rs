use std::{env, num::ParseIntError, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not a valid number")]
    InvalidNumber {
        var: &'static str,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub database: DatabaseConfig,
    // rows per parent table; children follow at 1-3 per parent
    pub total_records: usize,
    pub iterations: u32,
    // rows per INSERT statement, bounds statement size and memory
    pub batch_size: usize,
    pub results_dir: PathBuf,
}

impl BenchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the config from a lookup function over variable names.
    /// `from_env` feeds the process environment through this; tests can pass
    /// a closure over a map instead of mutating global state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database: DatabaseConfig {
                host: string_var(&lookup, "DB_HOST", "postgres"),
                port: numeric_var(&lookup, "DB_PORT", 5432)?,
                user: string_var(&lookup, "DB_USER", "postgres"),
                password: string_var(&lookup, "DB_PASSWORD", "postgres"),
                dbname: string_var(&lookup, "DB_NAME", "performance_test"),
            },
            total_records: numeric_var(&lookup, "TOTAL_RECORDS", 1_000_000)?,
            iterations: numeric_var(&lookup, "TEST_ITERATIONS", 5)?,
            batch_size: numeric_var(&lookup, "BATCH_SIZE", 10_000)?,
            results_dir: string_var(&lookup, "RESULTS_DIR", "results").into(),
        })
    }
}

fn string_var<F>(lookup: &F, var: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).unwrap_or_else(|| default.to_owned())
}

fn numeric_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr<Err = ParseIntError>,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidNumber { var, source }),
        None => Ok(default),
    }
}
