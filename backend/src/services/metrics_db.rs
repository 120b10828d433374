//! Metrics store connection pool
//!
//! PostgreSQL in production, SQLite for local runs and tests. Every scalar query
//! runs in its own transaction that is rolled back afterwards; on PostgreSQL the
//! transaction is also declared `READ ONLY`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};

use crate::config::DatabaseConfig;
use crate::services::metric_store::{MetricStore, ScalarValue};
use crate::services::sql_sanitizer::SanitizedQuery;
use crate::utils::ExecutionError;

pub static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Clone, Debug)]
pub enum MetricsDb {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl MetricsDb {
    /// Open a pool for the configured DSN.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let dsn = config.dsn();

        if dsn.starts_with("sqlite:") {
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .connect(&dsn)
                .await?;
            tracing::info!("Connected to SQLite metrics store");
            return Ok(Self::Sqlite(pool));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&dsn)
            .await?;
        tracing::info!(
            "Connected to PostgreSQL metrics store at {}:{}/{} (pool max {})",
            config.host,
            config.port,
            config.name,
            config.max_connections
        );
        Ok(Self::Postgres(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        match self {
            Self::Postgres(pool) => MIGRATOR.run(pool).await,
            Self::Sqlite(pool) => MIGRATOR.run(pool).await,
        }
    }

    /// Liveness probe used by the health endpoint.
    pub async fn ping(&self) -> bool {
        let result = match self {
            Self::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            Self::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        };
        if let Err(e) = &result {
            tracing::warn!("Metrics store ping failed: {}", e);
        }
        result.is_ok()
    }

    pub async fn close(&self) {
        match self {
            Self::Postgres(pool) => pool.close().await,
            Self::Sqlite(pool) => pool.close().await,
        }
    }
}

#[async_trait]
impl MetricStore for MetricsDb {
    async fn fetch_scalar(&self, query: &SanitizedQuery) -> Result<ScalarValue, ExecutionError> {
        match self {
            Self::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                sqlx::query("SET TRANSACTION READ ONLY").execute(&mut *tx).await?;
                let row = sqlx::query(query.as_str()).fetch_optional(&mut *tx).await?;
                let value = row.as_ref().map(decode_pg).transpose()?;
                tx.rollback().await?;
                Ok(value.unwrap_or(ScalarValue::Null))
            },
            Self::Sqlite(pool) => {
                let mut tx = pool.begin().await?;
                let row = sqlx::query(query.as_str()).fetch_optional(&mut *tx).await?;
                let value = row.as_ref().map(decode_sqlite).transpose()?;
                tx.rollback().await?;
                Ok(value.unwrap_or(ScalarValue::Null))
            },
        }
    }
}

fn decode_pg(row: &PgRow) -> Result<ScalarValue, ExecutionError> {
    if row.is_empty() {
        return Ok(ScalarValue::Null);
    }
    let raw = row.try_get_raw(0)?;
    if raw.is_null() {
        return Ok(ScalarValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "INT2" => ScalarValue::Int(row.try_get::<i16, _>(0)?.into()),
        "INT4" => ScalarValue::Int(row.try_get::<i32, _>(0)?.into()),
        "INT8" => ScalarValue::Int(row.try_get::<i64, _>(0)?),
        "NUMERIC" => ScalarValue::Decimal(row.try_get::<Decimal, _>(0)?),
        "FLOAT4" => ScalarValue::Float(row.try_get::<f32, _>(0)?.into()),
        "FLOAT8" => ScalarValue::Float(row.try_get::<f64, _>(0)?),
        "BOOL" => ScalarValue::Bool(row.try_get::<bool, _>(0)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => ScalarValue::Text(row.try_get::<String, _>(0)?),
        other => {
            return Err(ExecutionError::NotCoercible(format!("unsupported column type {}", other)));
        },
    };
    Ok(value)
}

fn decode_sqlite(row: &SqliteRow) -> Result<ScalarValue, ExecutionError> {
    if row.is_empty() {
        return Ok(ScalarValue::Null);
    }
    let raw = row.try_get_raw(0)?;
    if raw.is_null() {
        return Ok(ScalarValue::Null);
    }
    // SQLite is dynamically typed: look at the stored value, not the column
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "INTEGER" => ScalarValue::Int(row.try_get::<i64, _>(0)?),
        "REAL" => ScalarValue::Float(row.try_get::<f64, _>(0)?),
        "TEXT" => ScalarValue::Text(row.try_get::<String, _>(0)?),
        other => {
            return Err(ExecutionError::NotCoercible(format!("unsupported column type {}", other)));
        },
    };
    Ok(value)
}
