//! Snapshot aggregation across the whole runtime.
//!
//! One collection cycle fans out one task per (category, service) pair plus
//! one per discovered registry provider, joins them under a single shared
//! deadline, and assembles the hierarchical snapshot with system-wide
//! aggregates and the derived covenant metrics. The finished snapshot is
//! cached under a fixed key for a short TTL.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::CollectionConfig;
use crate::telemetry::collector::{CollectedValue, ServiceCollector};
use crate::telemetry::lookup::{RuntimeView, CATEGORIES, COVENANT_CATEGORY, REGISTRY_CATEGORY};
use crate::telemetry::snapshot::{
    AggregatedSnapshot, CustomMetrics, MetricValue, ServiceSnapshot, SnapshotMeta,
    SystemAggregates,
};

/// Fixed cache key for the aggregated snapshot.
const CACHE_KEY: &str = "aggregated_snapshot";

/// Collection strategy recorded in snapshot metadata.
const COLLECTION_METHOD: &str = "parallel";

/// Service name the computed covenant metrics are filed under.
const COVENANT_SERVICE_NAME: &str = "covenant_metrics";

/// Covenant metric -> (governance service, source metric) extraction table.
const COVENANT_SOURCES: &[(&str, &str, &str)] = &[
    ("wise_authority_deferrals", "wise_authority", "deferral_count"),
    ("thoughts_processed", "wise_authority", "guidance_requests"),
    ("filter_matches", "adaptive_filter", "filter_actions"),
    ("self_observation_insights", "self_observation", "insights_generated"),
];

type CategoryMap = BTreeMap<String, BTreeMap<String, ServiceSnapshot>>;

/// Aggregates telemetry from every service, bus, and adapter instance into
/// one snapshot per collection cycle.
///
/// `collect()` is idempotent and side-effect-free apart from its own cache
/// entry. A collection error in one service never affects any other
/// service's slot.
pub struct TelemetryAggregator {
    collector: Arc<ServiceCollector>,
    clock: Arc<dyn Clock>,
    config: CollectionConfig,
    cache: RwLock<HashMap<&'static str, (DateTime<Utc>, AggregatedSnapshot)>>,
}

impl TelemetryAggregator {
    /// Create an aggregator over the given runtime view.
    pub fn new(runtime: Arc<RuntimeView>, clock: Arc<dyn Clock>, config: CollectionConfig) -> Self {
        Self {
            collector: Arc::new(ServiceCollector::new(runtime, Arc::clone(&clock))),
            clock,
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Produce the aggregated snapshot, serving from cache within the TTL.
    ///
    /// Concurrent cache misses may both recompute; collection is read-only,
    /// so the duplicate work is harmless and the last writer wins.
    pub async fn collect(&self) -> AggregatedSnapshot {
        let now = self.clock.now();

        if let Some((stored_at, snapshot)) = self.cache.read().await.get(CACHE_KEY) {
            let age = now.signed_duration_since(*stored_at);
            if age.num_seconds() >= 0 && (age.num_seconds() as u64) < self.config.cache_ttl_seconds
            {
                debug!(age_seconds = age.num_seconds(), "serving cached snapshot");
                let mut cached = snapshot.clone();
                cached.meta.cache_hit = true;
                return cached;
            }
        }

        let categories = self.collect_all().await;
        let aggregates = calculate_aggregates(&categories, now);
        info!(
            services_total = aggregates.services_total,
            services_online = aggregates.services_online,
            system_healthy = aggregates.system_healthy,
            "collection cycle complete"
        );

        let snapshot = AggregatedSnapshot {
            categories,
            aggregates,
            meta: SnapshotMeta {
                collection_method: COLLECTION_METHOD.to_string(),
                cache_ttl_seconds: self.config.cache_ttl_seconds,
                cache_hit: false,
            },
        };

        self.cache
            .write()
            .await
            .insert(CACHE_KEY, (now, snapshot.clone()));

        snapshot
    }

    /// Drop the cached snapshot so the next call recomputes.
    pub async fn invalidate_cache(&self) {
        self.cache.write().await.remove(CACHE_KEY);
    }

    /// Run the concurrent fan-out and assemble the category hierarchy.
    async fn collect_all(&self) -> CategoryMap {
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.config.timeout_ms);

        let mut tasks: JoinSet<(String, String, CollectedValue)> = JoinSet::new();
        let mut expected: Vec<(String, String)> = Vec::new();

        for (category, services) in CATEGORIES {
            for service_name in *services {
                let collector = Arc::clone(&self.collector);
                let category = category.to_string();
                let name = service_name.to_string();
                expected.push((category.clone(), name.clone()));
                tasks.spawn(async move {
                    let value = collector.collect_service(&name).await;
                    (category, name, value)
                });
            }
        }

        for (semantic_name, descriptor) in self.collector.discover_providers() {
            let collector = Arc::clone(&self.collector);
            expected.push((REGISTRY_CATEGORY.to_string(), semantic_name.clone()));
            tasks.spawn(async move {
                let snapshot = collector.collect_provider(&descriptor).await;
                (
                    REGISTRY_CATEGORY.to_string(),
                    semantic_name,
                    CollectedValue::Single(snapshot),
                )
            });
        }

        let mut completed: HashMap<(String, String), CollectedValue> = HashMap::new();
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((category, name, value)))) => {
                    completed.insert((category, name), value);
                }
                Ok(Some(Err(err))) => {
                    // A panicked task loses only its own slot.
                    warn!(error = %err, "collection task failed to join");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        timeout_ms = self.config.timeout_ms,
                        outstanding = tasks.len(),
                        "collection deadline elapsed, cancelling stragglers"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        let mut categories: CategoryMap = CATEGORIES
            .iter()
            .map(|(name, _)| (name.to_string(), BTreeMap::new()))
            .collect();
        categories.insert(REGISTRY_CATEGORY.to_string(), BTreeMap::new());

        for key in expected {
            let slot = categories.entry(key.0.clone()).or_default();
            match completed.remove(&key) {
                Some(CollectedValue::Single(snapshot)) => {
                    slot.insert(key.1, snapshot);
                }
                Some(CollectedValue::Instances(instances)) => {
                    for (instance_id, snapshot) in instances {
                        slot.insert(instance_id, snapshot);
                    }
                }
                // Timed out or panicked: the slot reports real absence.
                None => {
                    slot.insert(key.1, ServiceSnapshot::unreachable());
                }
            }
        }

        let covenant = compute_covenant_metrics(&categories);
        categories
            .entry(COVENANT_CATEGORY.to_string())
            .or_default()
            .insert(
                COVENANT_SERVICE_NAME.to_string(),
                ServiceSnapshot::computed(covenant),
            );

        categories
    }
}

/// Re-read governance metrics through the fixed extraction table.
///
/// Covenant metrics are derived, not collected: they default to zero and
/// take whatever the governance snapshots actually reported.
fn compute_covenant_metrics(categories: &CategoryMap) -> CustomMetrics {
    let mut covenant = CustomMetrics::new();
    for (covenant_key, _, _) in COVENANT_SOURCES {
        covenant.insert(covenant_key.to_string(), MetricValue::Int(0));
    }

    let Some(governance) = categories.get("governance") else {
        return covenant;
    };

    for (covenant_key, service_name, source_key) in COVENANT_SOURCES {
        if let Some(snapshot) = governance.get(*service_name) {
            if let Some(value) = snapshot.custom_metrics.get(*source_key) {
                covenant.insert(covenant_key.to_string(), value.clone());
            }
        }
    }

    covenant
}

/// Compute system-wide aggregates over every category except covenant.
fn calculate_aggregates(categories: &CategoryMap, now: DateTime<Utc>) -> SystemAggregates {
    let mut services_total = 0u64;
    let mut services_online = 0u64;
    let mut total_errors = 0u64;
    let mut total_requests = 0u64;
    let mut min_uptime = f64::INFINITY;
    let mut error_rates: Vec<f64> = Vec::new();

    for (category, services) in categories {
        // Covenant holds computed metrics, not service data.
        if category == COVENANT_CATEGORY {
            continue;
        }

        for snapshot in services.values() {
            services_total += 1;
            if snapshot.healthy {
                services_online += 1;
            }
            total_errors += snapshot.error_count;
            total_requests += snapshot.requests_handled;

            if snapshot.error_rate > 0.0 {
                error_rates.push(snapshot.error_rate);
            }
            if snapshot.uptime_seconds > 0.0 && snapshot.uptime_seconds < min_uptime {
                min_uptime = snapshot.uptime_seconds;
            }
        }
    }

    let overall_error_rate = if error_rates.is_empty() {
        0.0
    } else {
        let mean = error_rates.iter().sum::<f64>() / error_rates.len() as f64;
        (mean * 10_000.0).round() / 10_000.0
    };

    SystemAggregates {
        system_healthy: services_online as f64 >= services_total as f64 * 0.9,
        services_online,
        services_total,
        overall_error_rate,
        overall_uptime_seconds: if min_uptime.is_finite() { min_uptime as u64 } else { 0 },
        total_errors,
        total_requests,
        timestamp: now,
    }
}
