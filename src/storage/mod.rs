//! Storage boundary for raw spans and consolidated summaries.
//!
//! The consolidation engine depends only on the [`TelemetryStore`] trait;
//! [`SqliteStore`] is the bundled implementation. Everything beyond these
//! operations - wire formats, replication, the graph engine itself - belongs
//! to the excluded layers.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consolidation::period::ConsolidationLevel;
use crate::consolidation::span::SpanRecord;
use crate::consolidation::trace::TraceSummary;
use crate::error::StorageResult;

/// Tier metadata stored with each summary row.
///
/// Compression fields are stamped only by the compression step, and only
/// after the corresponding storage update succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryAttributes {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub consolidation_level: ConsolidationLevel,
    /// Whether a higher tier has compressed this row in place.
    pub compressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_date: Option<DateTime<Utc>>,
    /// Fraction of serialized size removed by compression, in [0, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    /// Full summary payload.
    pub body: serde_json::Value,
}

impl SummaryAttributes {
    /// Attributes for a freshly consolidated, uncompressed summary.
    pub fn from_summary(summary: &TraceSummary, level: ConsolidationLevel) -> Self {
        Self {
            period_start: summary.period_start,
            period_end: summary.period_end,
            consolidation_level: level,
            compressed: false,
            compression_date: None,
            compression_ratio: None,
            body: serde_json::to_value(summary).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Serialized size of the payload, used for storage estimation.
    pub fn body_size_bytes(&self) -> usize {
        serde_json::to_string(&self.body).map(|s| s.len()).unwrap_or(0)
    }
}

/// One summary as returned by storage queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub id: String,
    pub attributes: SummaryAttributes,
}

/// Span selection for queries and deletes. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanFilter {
    /// Inclusive lower bound on the span timestamp.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the span timestamp.
    pub end: Option<DateTime<Utc>>,
    /// Strict upper bound: spans older than this cutoff.
    pub older_than: Option<DateTime<Utc>>,
}

impl SpanFilter {
    /// Spans with timestamps in `[start, end]`.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            older_than: None,
        }
    }

    /// Spans strictly older than `cutoff`.
    pub fn older_than(cutoff: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: None,
            older_than: Some(cutoff),
        }
    }
}

/// Summary selection for queries and deletes. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryFilter {
    pub id: Option<String>,
    pub level: Option<ConsolidationLevel>,
    /// Inclusive lower bound on the period start.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the period start.
    pub end: Option<DateTime<Utc>>,
    /// Strict upper bound: rows whose period ended before this cutoff.
    pub older_than: Option<DateTime<Utc>>,
}

impl SummaryFilter {
    /// The single summary with this id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Every summary at one consolidation level.
    pub fn by_level(level: ConsolidationLevel) -> Self {
        Self {
            level: Some(level),
            ..Self::default()
        }
    }

    /// Restrict to periods starting within `[start, end]`.
    pub fn within(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Restrict to rows whose period ended strictly before `cutoff`.
    pub fn ended_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.older_than = Some(cutoff);
        self
    }
}

/// Persistence operations the consolidation engine relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Upsert one summary. Re-running a period overwrites its row, keyed by
    /// the summary's deterministic id.
    async fn write_summary(
        &self,
        summary: &TraceSummary,
        level: ConsolidationLevel,
    ) -> StorageResult<()>;

    /// Raw spans matching the filter, oldest first.
    async fn query_spans(&self, filter: &SpanFilter) -> StorageResult<Vec<SpanRecord>>;

    /// Summary rows matching the filter, oldest period first.
    async fn query_summaries(&self, filter: &SummaryFilter) -> StorageResult<Vec<SummaryRow>>;

    /// Replace a summary's attributes, returning the affected row count.
    ///
    /// Zero means the row no longer exists; callers treat that as a failed
    /// update, not a success.
    async fn update_summary(
        &self,
        id: &str,
        attributes: &SummaryAttributes,
    ) -> StorageResult<u64>;

    /// Delete spans matching the filter, returning the affected count.
    async fn delete_spans(&self, filter: &SpanFilter) -> StorageResult<u64>;

    /// Delete summary rows matching the filter, returning the affected count.
    async fn delete_summaries(&self, filter: &SummaryFilter) -> StorageResult<u64>;
}
