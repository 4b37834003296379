//! Snapshot data model for telemetry collection.
//!
//! A [`ServiceSnapshot`] is the point-in-time health/metrics view of one
//! service instance; an [`AggregatedSnapshot`] is the hierarchical view of
//! the whole runtime produced by one collection cycle. Snapshots are built
//! fresh every cycle and never mutated after construction - a new cycle
//! supersedes the previous snapshot instead of updating it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scalar metric value.
///
/// Custom metrics carry whatever a service reports; only plain scalars are
/// accepted so snapshots stay serializable and comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Integer counter or gauge.
    Int(i64),
    /// Floating-point gauge.
    Float(f64),
    /// Free-form text value (identifiers, states).
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Text(_) => None,
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

/// Ordered map of custom metric names to scalar values.
pub type CustomMetrics = BTreeMap<String, MetricValue>;

/// Point-in-time health and metrics for one service instance.
///
/// Invariant: a snapshot is never fabricated as healthy for a service that
/// could not actually be reached - [`ServiceSnapshot::unreachable`] is the
/// only value produced for absent or failing services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    /// Whether the service reported itself reachable and working.
    pub healthy: bool,
    /// Seconds since the service started, 0 when unknown.
    pub uptime_seconds: f64,
    /// Errors observed by the service.
    pub error_count: u64,
    /// Requests the service has handled.
    pub requests_handled: u64,
    /// Error rate in [0, 1].
    pub error_rate: f64,
    /// Resident memory, when the service reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
    /// Service-specific metrics, ordered by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_metrics: CustomMetrics,
}

impl ServiceSnapshot {
    /// The unhealthy sentinel: real absence of data, never fake success.
    pub fn unreachable() -> Self {
        Self {
            healthy: false,
            uptime_seconds: 0.0,
            error_count: 0,
            requests_handled: 0,
            error_rate: 0.0,
            memory_mb: None,
            custom_metrics: BTreeMap::new(),
        }
    }

    /// A healthy snapshot carrying only computed custom metrics.
    ///
    /// Used for the synthetic covenant category, which is derived rather
    /// than collected.
    pub fn computed(custom_metrics: CustomMetrics) -> Self {
        Self {
            healthy: true,
            uptime_seconds: 0.0,
            error_count: 0,
            requests_handled: 0,
            error_rate: 0.0,
            memory_mb: None,
            custom_metrics,
        }
    }
}

/// System-wide aggregates computed over every collected category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemAggregates {
    /// True when at least 90% of services are online (vacuously true at 0/0).
    pub system_healthy: bool,
    /// Services reporting healthy.
    pub services_online: u64,
    /// Services collected.
    pub services_total: u64,
    /// Mean of the strictly positive per-service error rates, 0 if none.
    pub overall_error_rate: f64,
    /// Minimum of the strictly positive uptimes, 0 if none.
    pub overall_uptime_seconds: u64,
    /// Sum of per-service error counts.
    pub total_errors: u64,
    /// Sum of per-service request counts.
    pub total_requests: u64,
    /// When the aggregates were computed.
    pub timestamp: DateTime<Utc>,
}

/// Metadata describing how a snapshot was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Collection strategy, e.g. "parallel".
    pub collection_method: String,
    /// TTL the snapshot was cached with.
    pub cache_ttl_seconds: u64,
    /// Whether this value was served from the cache.
    pub cache_hit: bool,
}

/// Hierarchical snapshot of the whole runtime: category -> service -> data.
///
/// Constructed once per collection cycle, cached with its timestamp, and
/// superseded (not mutated) by the next cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSnapshot {
    /// Category name -> service name -> snapshot.
    pub categories: BTreeMap<String, BTreeMap<String, ServiceSnapshot>>,
    /// System-wide rollups.
    pub aggregates: SystemAggregates,
    /// Collection metadata.
    pub meta: SnapshotMeta,
}

impl AggregatedSnapshot {
    /// Look up one service's snapshot.
    pub fn service(&self, category: &str, name: &str) -> Option<&ServiceSnapshot> {
        self.categories.get(category).and_then(|c| c.get(name))
    }
}
