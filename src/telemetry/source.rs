//! Ranked metrics-source capability.
//!
//! Services expose metrics through up to three accessors of decreasing
//! fidelity. The collector tries them in fixed priority order and takes the
//! first success; a failure in one accessor falls through to the next. This
//! is the explicit strategy-chain rendering of the duck-typed collection
//! contract - no runtime reflection.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{CollectionError, CollectionResult};
use crate::telemetry::snapshot::{CustomMetrics, MetricValue, ServiceSnapshot};

/// What a metrics accessor may return: a fully structured snapshot or a
/// generic scalar map that still needs conversion.
#[derive(Debug, Clone)]
pub enum MetricsPayload {
    /// Structured, ready-to-use snapshot.
    Snapshot(ServiceSnapshot),
    /// Generic map of metric names to scalars.
    Map(CustomMetrics),
}

/// The three-step collection contract, tried in declaration order.
///
/// Every method defaults to [`CollectionError::Unsupported`], so a service
/// implements only the accessors it actually has.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Highest-fidelity accessor. May suspend into arbitrary service code.
    async fn metrics(&self) -> CollectionResult<MetricsPayload> {
        Err(CollectionError::Unsupported)
    }

    /// Lower-fidelity internal counters, synchronous.
    fn internal_metrics(&self) -> CollectionResult<MetricsPayload> {
        Err(CollectionError::Unsupported)
    }

    /// Coarse reachability probe, the last resort.
    async fn health(&self) -> CollectionResult<bool> {
        Err(CollectionError::Unsupported)
    }
}

/// Uptime field aliases found in generic metric maps, scanned in order.
/// First strictly positive value wins.
pub const UPTIME_ALIASES: &[&str] = &[
    "uptime_seconds",
    "incident_uptime_seconds",
    "tsdb_uptime_seconds",
    "auth_uptime_seconds",
    "scheduler_uptime_seconds",
];

fn map_f64(map: &CustomMetrics, key: &str) -> Option<f64> {
    map.get(key).and_then(MetricValue::as_f64)
}

fn map_u64(map: &CustomMetrics, key: &str) -> Option<u64> {
    map_f64(map, key).map(|v| if v < 0.0 { 0 } else { v as u64 })
}

fn map_bool(map: &CustomMetrics, key: &str) -> Option<bool> {
    match map.get(key)? {
        MetricValue::Int(v) => Some(*v != 0),
        MetricValue::Float(v) => Some(*v != 0.0),
        MetricValue::Text(s) => match s.to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
    }
}

/// Scan the uptime alias list; first non-zero value wins, else 0.
pub fn uptime_from_map(map: &CustomMetrics) -> f64 {
    for alias in UPTIME_ALIASES {
        if let Some(v) = map_f64(map, alias) {
            if v > 0.0 {
                return v;
            }
        }
    }
    0.0
}

/// Convert a generic metric map into a snapshot.
///
/// `healthy` defaults to "uptime > 0" unless the map states it explicitly.
/// The full map is preserved as custom metrics.
pub fn snapshot_from_map(map: &CustomMetrics) -> ServiceSnapshot {
    let uptime = uptime_from_map(map);
    let healthy = map_bool(map, "healthy").unwrap_or(uptime > 0.0);

    ServiceSnapshot {
        healthy,
        uptime_seconds: uptime,
        error_count: map_u64(map, "error_count").unwrap_or(0),
        requests_handled: map_u64(map, "request_count")
            .or_else(|| map_u64(map, "requests_handled"))
            .unwrap_or(0),
        error_rate: map_f64(map, "error_rate").unwrap_or(0.0),
        memory_mb: map_f64(map, "memory_mb"),
        custom_metrics: map.clone(),
    }
}

/// Conversion for the lower-fidelity internal accessor: no uptime-implied
/// health, a service must say so itself.
pub fn snapshot_from_internal_map(map: &CustomMetrics) -> ServiceSnapshot {
    let mut snapshot = snapshot_from_map(map);
    snapshot.healthy = map_bool(map, "healthy").unwrap_or(false);
    snapshot
}

/// Resolve a payload into a snapshot using the given map conversion.
pub fn resolve_payload(
    payload: MetricsPayload,
    convert: fn(&CustomMetrics) -> ServiceSnapshot,
) -> ServiceSnapshot {
    match payload {
        MetricsPayload::Snapshot(snapshot) => snapshot,
        MetricsPayload::Map(map) => convert(&map),
    }
}

/// Build a metric map literal for tests and simple sources.
pub fn metric_map<const N: usize>(entries: [(&str, MetricValue); N]) -> CustomMetrics {
    let mut map = BTreeMap::new();
    for (k, v) in entries {
        map.insert(k.to_string(), v);
    }
    map
}
