pub mod populate;
pub mod schema;
pub mod stats;

use crate::config::DatabaseConfig;
use postgres::{error::SqlState, types::ToSql, Client, NoTls, Row};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("database operation failed")]
    Postgres(#[from] postgres::Error),
}

/// Which surrogate-key strategy a table pair or query belongs to.
/// The two variants are kept structurally identical and only differ in key
/// type, so everything downstream is parameterized over this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Serial,
    Uuid,
}

impl KeyKind {
    pub const ALL: [KeyKind; 2] = [KeyKind::Serial, KeyKind::Uuid];

    /// table name suffix, e.g. `parent_serial` / `parent_uuid`
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Uuid => "uuid",
        }
    }

    /// tag used in query names, e.g. `Simple Join - UUID`
    pub fn label(self) -> &'static str {
        match self {
            Self::Serial => "Serial",
            Self::Uuid => "UUID",
        }
    }
}

/// UUID generation function available on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UuidGenerator {
    /// time ordered (PostgreSQL 17 `uuid_generate_v7`)
    V7,
    /// random fallback (uuid-ossp `uuid_generate_v4`)
    V4,
}

impl UuidGenerator {
    pub fn sql(self) -> &'static str {
        match self {
            Self::V7 => "uuid_generate_v7()",
            Self::V4 => "uuid_generate_v4()",
        }
    }

    pub fn is_time_ordered(self) -> bool {
        matches!(self, Self::V7)
    }
}

/// The single blocking connection used for the whole run. The benchmark
/// measures serialized query latency, so no pooling or parallelism exists
/// on purpose.
pub struct Database {
    client: Client,
    version: String,
    generator: UuidGenerator,
}

impl Database {
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut client = postgres::Config::new()
            .host(&config.host)
            .port(config.port)
            .user(&config.user)
            .password(&config.password)
            .dbname(&config.dbname)
            .connect(NoTls)?;

        let version: String = client.query_one("SELECT version()", &[])?.get(0);
        info!(version = %version, "Connected to PostgreSQL");

        if !version.contains("PostgreSQL 17") {
            warn!("Server is not PostgreSQL 17, UUID v7 may not be available");
        }

        let generator = probe_generator(&mut client)?;

        Ok(Self {
            client,
            version,
            generator,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn generator(&self) -> UuidGenerator {
        self.generator
    }

    /// Run statements over the simple query protocol. VACUUM and DISCARD
    /// refuse to run inside an implicit transaction, so they go through here
    /// along with all DDL and batched inserts.
    pub fn batch_execute(&mut self, sql: &str) -> Result<(), DatabaseError> {
        Ok(self.client.batch_execute(sql)?)
    }

    pub fn query(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DatabaseError> {
        Ok(self.client.query(sql, params)?)
    }

    pub fn query_one(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Row, DatabaseError> {
        Ok(self.client.query_one(sql, params)?)
    }

    pub fn close(self) -> Result<(), DatabaseError> {
        self.client.close()?;
        info!("Closed PostgreSQL connection");

        Ok(())
    }
}

/// Probe for `uuid_generate_v7`. An `undefined_function` error means the
/// server cannot provide time ordered UUIDs and we fall back to v4; the run
/// continues either way. Any other error is fatal.
fn probe_generator(client: &mut Client) -> Result<UuidGenerator, DatabaseError> {
    match client.query_one("SELECT uuid_generate_v7()", &[]) {
        Ok(_) => {
            info!("UUID v7 is available");

            Ok(UuidGenerator::V7)
        }
        Err(error) if error.code() == Some(&SqlState::UNDEFINED_FUNCTION) => {
            warn!("UUID v7 is not available, falling back to UUID v4");

            Ok(UuidGenerator::V4)
        }
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_kinds_cover_both_variants_in_order() {
        assert_eq!(KeyKind::ALL, [KeyKind::Serial, KeyKind::Uuid]);
        assert_eq!(KeyKind::Serial.suffix(), "serial");
        assert_eq!(KeyKind::Uuid.suffix(), "uuid");
        assert_eq!(KeyKind::Uuid.label(), "UUID");
    }

    #[test]
    fn generator_sql_matches_variant() {
        assert_eq!(UuidGenerator::V7.sql(), "uuid_generate_v7()");
        assert_eq!(UuidGenerator::V4.sql(), "uuid_generate_v4()");
        assert!(UuidGenerator::V7.is_time_ordered());
        assert!(!UuidGenerator::V4.is_time_ordered());
    }
}
