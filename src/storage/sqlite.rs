use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use super::{SpanFilter, SummaryAttributes, SummaryFilter, SummaryRow, TelemetryStore};
use crate::config::DatabaseConfig;
use crate::consolidation::period::{parse_utc_strict, ConsolidationLevel};
use crate::consolidation::span::SpanRecord;
use crate::consolidation::trace::TraceSummary;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed implementation of [`TelemetryStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store backed by the configured database file.
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory store, used in tests.
    ///
    /// The pool is capped at one connection: each in-memory connection would
    /// otherwise see its own empty database.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
                StorageError::Connection {
                    message: format!("Invalid database URL: {}", e),
                }
            })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ingest raw spans, replacing rows with the same span id.
    ///
    /// Spans are produced by the tracing layer; this is its write path into
    /// the store.
    pub async fn insert_spans(&self, spans: &[SpanRecord]) -> StorageResult<()> {
        for span in spans {
            let tags = serde_json::to_string(&span.tags).unwrap_or_default();

            sqlx::query(
                r#"
                INSERT OR REPLACE INTO trace_spans
                    (span_id, trace_id, task_id, thought_id, component_type,
                     tags, timestamp, duration_ms, latency_ms, error)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&span.span_id)
            .bind(&span.trace_id)
            .bind(&span.task_id)
            .bind(&span.thought_id)
            .bind(&span.component_type)
            .bind(&tags)
            .bind(span.timestamp.to_rfc3339())
            .bind(span.duration_ms)
            .bind(span.latency_ms)
            .bind(span.error)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for SqliteStore {
    async fn write_summary(
        &self,
        summary: &TraceSummary,
        level: ConsolidationLevel,
    ) -> StorageResult<()> {
        let attrs = SummaryAttributes::from_summary(summary, level);
        let body = serde_json::to_string(&attrs.body).unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO trace_summaries
                (id, consolidation_level, period_start, period_end,
                 compressed, compression_date, compression_ratio, attributes, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                consolidation_level = excluded.consolidation_level,
                period_start = excluded.period_start,
                period_end = excluded.period_end,
                compressed = excluded.compressed,
                compression_date = excluded.compression_date,
                compression_ratio = excluded.compression_ratio,
                attributes = excluded.attributes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&summary.id)
        .bind(level.to_string())
        .bind(attrs.period_start.to_rfc3339())
        .bind(attrs.period_end.to_rfc3339())
        .bind(attrs.compressed)
        .bind(None::<String>)
        .bind(None::<f64>)
        .bind(&body)
        .bind(attrs.period_end.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query_spans(&self, filter: &SpanFilter) -> StorageResult<Vec<SpanRecord>> {
        let start = filter.start.map(|t| t.to_rfc3339());
        let end = filter.end.map(|t| t.to_rfc3339());
        let older_than = filter.older_than.map(|t| t.to_rfc3339());

        let rows: Vec<SpanRow> = sqlx::query_as(
            r#"
            SELECT span_id, trace_id, task_id, thought_id, component_type,
                   tags, timestamp, duration_ms, latency_ms, error
            FROM trace_spans
            WHERE (? IS NULL OR timestamp >= ?)
              AND (? IS NULL OR timestamp <= ?)
              AND (? IS NULL OR timestamp < ?)
            ORDER BY timestamp ASC, span_id ASC
            "#,
        )
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .bind(&older_than)
        .bind(&older_than)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SpanRow::into_record).collect()
    }

    async fn query_summaries(&self, filter: &SummaryFilter) -> StorageResult<Vec<SummaryRow>> {
        let level = filter.level.map(|l| l.to_string());
        let start = filter.start.map(|t| t.to_rfc3339());
        let end = filter.end.map(|t| t.to_rfc3339());
        let older_than = filter.older_than.map(|t| t.to_rfc3339());

        let rows: Vec<SummaryRowDb> = sqlx::query_as(
            r#"
            SELECT id, consolidation_level, period_start, period_end,
                   compressed, compression_date, compression_ratio, attributes
            FROM trace_summaries
            WHERE (? IS NULL OR id = ?)
              AND (? IS NULL OR consolidation_level = ?)
              AND (? IS NULL OR period_start >= ?)
              AND (? IS NULL OR period_start <= ?)
              AND (? IS NULL OR period_end < ?)
            ORDER BY period_start ASC, id ASC
            "#,
        )
        .bind(&filter.id)
        .bind(&filter.id)
        .bind(&level)
        .bind(&level)
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .bind(&older_than)
        .bind(&older_than)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SummaryRowDb::into_row).collect()
    }

    async fn update_summary(
        &self,
        id: &str,
        attributes: &SummaryAttributes,
    ) -> StorageResult<u64> {
        let body = serde_json::to_string(&attributes.body).unwrap_or_default();
        let updated_at = attributes
            .compression_date
            .unwrap_or(attributes.period_end)
            .to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE trace_summaries
            SET consolidation_level = ?, period_start = ?, period_end = ?,
                compressed = ?, compression_date = ?, compression_ratio = ?,
                attributes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(attributes.consolidation_level.to_string())
        .bind(attributes.period_start.to_rfc3339())
        .bind(attributes.period_end.to_rfc3339())
        .bind(attributes.compressed)
        .bind(attributes.compression_date.map(|t| t.to_rfc3339()))
        .bind(attributes.compression_ratio)
        .bind(&body)
        .bind(&updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_spans(&self, filter: &SpanFilter) -> StorageResult<u64> {
        let start = filter.start.map(|t| t.to_rfc3339());
        let end = filter.end.map(|t| t.to_rfc3339());
        let older_than = filter.older_than.map(|t| t.to_rfc3339());

        let result = sqlx::query(
            r#"
            DELETE FROM trace_spans
            WHERE (? IS NULL OR timestamp >= ?)
              AND (? IS NULL OR timestamp <= ?)
              AND (? IS NULL OR timestamp < ?)
            "#,
        )
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .bind(&older_than)
        .bind(&older_than)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_summaries(&self, filter: &SummaryFilter) -> StorageResult<u64> {
        let level = filter.level.map(|l| l.to_string());
        let start = filter.start.map(|t| t.to_rfc3339());
        let end = filter.end.map(|t| t.to_rfc3339());
        let older_than = filter.older_than.map(|t| t.to_rfc3339());

        let result = sqlx::query(
            r#"
            DELETE FROM trace_summaries
            WHERE (? IS NULL OR id = ?)
              AND (? IS NULL OR consolidation_level = ?)
              AND (? IS NULL OR period_start >= ?)
              AND (? IS NULL OR period_start <= ?)
              AND (? IS NULL OR period_end < ?)
            "#,
        )
        .bind(&filter.id)
        .bind(&filter.id)
        .bind(&level)
        .bind(&level)
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .bind(&older_than)
        .bind(&older_than)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn parse_row_timestamp(row_id: &str, value: &str) -> StorageResult<DateTime<Utc>> {
    parse_utc_strict(value).map_err(|e| StorageError::CorruptRow {
        row_id: row_id.to_string(),
        message: e.to_string(),
    })
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct SpanRow {
    span_id: String,
    trace_id: String,
    task_id: Option<String>,
    thought_id: Option<String>,
    component_type: String,
    tags: String,
    timestamp: String,
    duration_ms: f64,
    latency_ms: Option<f64>,
    error: bool,
}

impl SpanRow {
    fn into_record(self) -> StorageResult<SpanRecord> {
        let timestamp = parse_row_timestamp(&self.span_id, &self.timestamp)?;
        let tags = serde_json::from_str(&self.tags).map_err(|e| StorageError::CorruptRow {
            row_id: self.span_id.clone(),
            message: format!("bad tags JSON: {}", e),
        })?;

        Ok(SpanRecord {
            trace_id: self.trace_id,
            span_id: self.span_id,
            task_id: self.task_id,
            thought_id: self.thought_id,
            component_type: self.component_type,
            tags,
            timestamp,
            duration_ms: self.duration_ms,
            latency_ms: self.latency_ms,
            error: self.error,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRowDb {
    id: String,
    consolidation_level: String,
    period_start: String,
    period_end: String,
    compressed: bool,
    compression_date: Option<String>,
    compression_ratio: Option<f64>,
    attributes: String,
}

impl SummaryRowDb {
    fn into_row(self) -> StorageResult<SummaryRow> {
        let consolidation_level =
            ConsolidationLevel::from_str(&self.consolidation_level).map_err(|e| {
                StorageError::CorruptRow {
                    row_id: self.id.clone(),
                    message: e,
                }
            })?;
        let period_start = parse_row_timestamp(&self.id, &self.period_start)?;
        let period_end = parse_row_timestamp(&self.id, &self.period_end)?;
        let compression_date = match &self.compression_date {
            Some(value) => Some(parse_row_timestamp(&self.id, value)?),
            None => None,
        };
        let body = serde_json::from_str(&self.attributes).map_err(|e| {
            StorageError::CorruptRow {
                row_id: self.id.clone(),
                message: format!("bad attributes JSON: {}", e),
            }
        })?;

        Ok(SummaryRow {
            id: self.id,
            attributes: SummaryAttributes {
                period_start,
                period_end,
                consolidation_level,
                compressed: self.compressed,
                compression_date,
                compression_ratio: self.compression_ratio,
                body,
            },
        })
    }
}
