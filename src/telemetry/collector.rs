//! Per-service collection.
//!
//! One collection call resolves a logical service name to a live handle and
//! applies the ranked accessor chain to it. Buses and adapters need their
//! own strategies: buses derive health from attached providers, adapters
//! are enumerated per instance, and registry providers are discovered
//! dynamically and given synthesized, human-legible names.
//!
//! Nothing in this module propagates a failure: an unreachable or throwing
//! service becomes the unhealthy sentinel for its own slot only.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::CollectionError;
use crate::telemetry::lookup::{
    bus_uptime_key, category_services, AdapterHandle, ProviderDescriptor, RuntimeView, CATEGORIES,
    CORE_PROVIDER_CLASSES,
};
use crate::telemetry::snapshot::{MetricValue, ServiceSnapshot};
use crate::telemetry::source::{
    resolve_payload, snapshot_from_internal_map, snapshot_from_map, MetricsPayload, MetricsSource,
};

/// Known provider-name fragments with fixed semantic suffixes.
const SIMPLE_NAME_PATTERNS: &[(&str, &str)] = &[
    ("APITool", "api_tool"),
    ("APIRuntime", "api_runtime"),
    ("SecretsToolService", "secrets"),
    ("MockLLM", "mock"),
    ("LocalGraphMemory", "local_graph"),
    ("GraphConfig", "graph"),
    ("TimeService", "time"),
    ("WiseAuthority", "wise_authority"),
];

/// Result of collecting one logical service name: a single snapshot, or one
/// snapshot per running instance for multi-instance adapters.
#[derive(Debug, Clone)]
pub enum CollectedValue {
    /// One service, one snapshot.
    Single(ServiceSnapshot),
    /// Instance id -> snapshot. Instances are never collapsed.
    Instances(BTreeMap<String, ServiceSnapshot>),
}

/// Apply the ranked accessor chain to one handle.
///
/// Accessor failures fall through to the next accessor; when every accessor
/// fails or is unsupported the caller substitutes the sentinel.
pub async fn collect_via_chain<S>(source: &S) -> Option<ServiceSnapshot>
where
    S: MetricsSource + ?Sized,
{
    match source.metrics().await {
        Ok(payload) => return Some(resolve_payload(payload, snapshot_from_map)),
        Err(CollectionError::Unsupported) => {}
        Err(err) => debug!(error = %err, "structured metrics accessor failed"),
    }

    match source.internal_metrics() {
        Ok(payload) => return Some(resolve_payload(payload, snapshot_from_internal_map)),
        Err(CollectionError::Unsupported) => {}
        Err(err) => debug!(error = %err, "internal metrics accessor failed"),
    }

    match source.health().await {
        Ok(healthy) => {
            // Coarse probe carries no counters - health status only.
            let mut snapshot = ServiceSnapshot::unreachable();
            snapshot.healthy = healthy;
            Some(snapshot)
        }
        Err(CollectionError::Unsupported) => None,
        Err(err) => {
            debug!(error = %err, "health accessor failed");
            None
        }
    }
}

/// Collects snapshots for individual services, buses, adapter instances,
/// and dynamically discovered registry providers.
pub struct ServiceCollector {
    runtime: Arc<RuntimeView>,
    clock: Arc<dyn Clock>,
}

impl ServiceCollector {
    /// Create a collector over the given runtime view.
    pub fn new(runtime: Arc<RuntimeView>, clock: Arc<dyn Clock>) -> Self {
        Self { runtime, clock }
    }

    /// Collect one logical service name from the static category table.
    pub async fn collect_service(&self, service_name: &str) -> CollectedValue {
        if service_name.ends_with("_bus") {
            return CollectedValue::Single(self.collect_from_bus(service_name).await);
        }

        if category_services("adapters").contains(&service_name) {
            return CollectedValue::Instances(
                self.collect_adapter_instances(service_name).await,
            );
        }

        let snapshot = match self.runtime.resolve(service_name) {
            Some(handle) => collect_via_chain(handle.as_ref()).await.unwrap_or_else(|| {
                debug!(service = service_name, "no accessor produced metrics");
                ServiceSnapshot::unreachable()
            }),
            None => {
                debug!(service = service_name, "service not resolvable");
                ServiceSnapshot::unreachable()
            }
        };

        CollectedValue::Single(snapshot)
    }

    /// Collect from a message bus.
    ///
    /// A bus is healthy exactly when it has at least one attached provider,
    /// independent of its error counters. A structured payload is taken as
    /// is apart from that health rule; a generic map goes through the
    /// per-bus uptime key.
    async fn collect_from_bus(&self, bus_name: &str) -> ServiceSnapshot {
        let Some(bus) = self.runtime.bus(bus_name) else {
            debug!(bus = bus_name, "bus not registered");
            return ServiceSnapshot::unreachable();
        };

        let healthy = bus.provider_count() > 0;
        let metrics = match bus.metrics() {
            MetricsPayload::Snapshot(mut snapshot) => {
                snapshot.healthy = healthy;
                return snapshot;
            }
            MetricsPayload::Map(metrics) => metrics,
        };

        let uptime = metrics
            .get(bus_uptime_key(bus_name))
            .or_else(|| metrics.get("uptime_seconds"))
            .and_then(MetricValue::as_f64)
            .unwrap_or(0.0);

        let error_count = metrics
            .get("error_count")
            .or_else(|| metrics.get("errors_last_hour"))
            .and_then(MetricValue::as_f64)
            .map(|v| v.max(0.0) as u64)
            .unwrap_or(0);

        let requests_handled = metrics
            .get("request_count")
            .or_else(|| metrics.get("requests_handled"))
            .or_else(|| metrics.get("messages_sent"))
            .and_then(MetricValue::as_f64)
            .map(|v| v.max(0.0) as u64)
            .unwrap_or(0);

        let error_rate = metrics
            .get("error_rate")
            .and_then(MetricValue::as_f64)
            .unwrap_or(0.0);

        let memory_mb = metrics.get("memory_mb").and_then(MetricValue::as_f64);

        ServiceSnapshot {
            healthy,
            uptime_seconds: uptime,
            error_count,
            requests_handled,
            error_rate,
            memory_mb,
            custom_metrics: metrics,
        }
    }

    /// Collect from every running instance of one adapter type.
    ///
    /// The control-plane listing is authoritative when it answers; the
    /// bootstrap references are only walked when it is absent or fails.
    async fn collect_adapter_instances(
        &self,
        adapter_kind: &str,
    ) -> BTreeMap<String, ServiceSnapshot> {
        if let Some(control_plane) = self.runtime.control_plane() {
            match control_plane.list_adapters().await {
                Ok(adapters) => {
                    let mut instances = BTreeMap::new();
                    for adapter in adapters {
                        if adapter.adapter_kind() != adapter_kind || !adapter.is_running() {
                            continue;
                        }
                        instances.insert(
                            adapter.adapter_id(),
                            self.collect_adapter(adapter.as_ref()).await,
                        );
                    }
                    return instances;
                }
                Err(err) => {
                    warn!(adapter = adapter_kind, error = %err, "control-plane adapter listing failed");
                }
            }
        }

        let mut instances = BTreeMap::new();
        for adapter in self.runtime.adapters() {
            if adapter.adapter_kind() != adapter_kind {
                continue;
            }
            instances.insert(
                adapter.adapter_id(),
                self.collect_adapter(adapter.as_ref()).await,
            );
        }
        instances
    }

    /// Collect one adapter instance, tagging the snapshot with its identity.
    async fn collect_adapter(&self, adapter: &dyn AdapterHandle) -> ServiceSnapshot {
        let mut snapshot = match collect_via_chain(adapter).await {
            Some(snapshot) => snapshot,
            None => match adapter.started_at() {
                // The control plane observed the instance running; report
                // that with its real uptime and nothing more.
                Some(started_at) => {
                    let uptime = (self.clock.now() - started_at).num_milliseconds() as f64 / 1000.0;
                    let mut snapshot = ServiceSnapshot::unreachable();
                    snapshot.healthy = true;
                    snapshot.uptime_seconds = uptime.max(0.0);
                    snapshot
                }
                None => ServiceSnapshot::unreachable(),
            },
        };

        snapshot.custom_metrics.insert(
            "adapter_id".to_string(),
            MetricValue::Text(adapter.adapter_id()),
        );
        snapshot.custom_metrics.insert(
            "adapter_type".to_string(),
            MetricValue::Text(adapter.adapter_kind()),
        );
        if let Some(started_at) = adapter.started_at() {
            snapshot.custom_metrics.insert(
                "start_time".to_string(),
                MetricValue::Text(started_at.to_rfc3339()),
            );
        }
        snapshot
    }

    /// Discover dynamic registry providers not covered by the static tables.
    ///
    /// Returns `(semantic_name, descriptor)` pairs. A discovery failure is
    /// an empty set for this cycle, never an error.
    pub fn discover_providers(&self) -> Vec<(String, ProviderDescriptor)> {
        let Some(directory) = self.runtime.directory() else {
            return Vec::new();
        };

        let catalog = match directory.provider_info() {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(error = %err, "registry provider discovery failed");
                return Vec::new();
            }
        };

        let mut discovered = Vec::new();
        for (service_type, providers) in catalog {
            for descriptor in providers {
                if self.already_collected(descriptor.class_name()) {
                    debug!(
                        provider = %descriptor.name,
                        "skipping provider already covered by static tables"
                    );
                    continue;
                }
                let semantic_name = semantic_service_name(&service_type, &descriptor);
                discovered.push((semantic_name, descriptor));
            }
        }
        discovered
    }

    /// Collect one discovered provider.
    pub async fn collect_provider(&self, descriptor: &ProviderDescriptor) -> ServiceSnapshot {
        collect_via_chain(descriptor.handle.as_ref())
            .await
            .unwrap_or_else(ServiceSnapshot::unreachable)
    }

    /// Whether a provider class is already represented in the static tables.
    fn already_collected(&self, class_name: &str) -> bool {
        if CORE_PROVIDER_CLASSES
            .iter()
            .any(|(class, _)| *class == class_name)
        {
            return true;
        }

        let lowered = class_name.to_lowercase();
        CATEGORIES
            .iter()
            .flat_map(|(_, services)| services.iter())
            .any(|service| *service == lowered)
    }
}

/// Stable short hash of a provider identity, for synthesized names.
fn short_hash(identity: &str) -> String {
    let mut hasher = DefaultHasher::new();
    identity.hash(&mut hasher);
    format!("{:06x}", hasher.finish() & 0xff_ffff)
}

/// Suffix from a transport-specific adapter identifier: the last
/// separator-delimited segment, truncated to 8 characters.
fn adapter_suffix(adapter_id: &str, separator: char, fallback: &str) -> String {
    if !adapter_id.is_empty() && adapter_id.contains(separator) {
        let segment = adapter_id.rsplit(separator).next().unwrap_or(adapter_id);
        segment.chars().take(8).collect()
    } else {
        short_hash(fallback)
    }
}

/// Synthesize a human-legible name for a dynamic provider.
///
/// Adapter-style providers get `{service_type}_{transport}_{short_id}`;
/// known simple patterns map to fixed suffixes; LLM-style providers are
/// named by vendor keyword; anything else falls back to the lowercased
/// class name with a stable short id.
pub fn semantic_service_name(service_type: &str, descriptor: &ProviderDescriptor) -> String {
    let name = descriptor.name.as_str();
    let adapter_id = descriptor
        .metadata
        .get("adapter_id")
        .map(String::as_str)
        .unwrap_or("");

    if name.contains("APICommunication") {
        let suffix = adapter_suffix(adapter_id, '_', name);
        return format!("{service_type}_api_{suffix}");
    }

    if name.contains("CLIAdapter") {
        let suffix = if adapter_id.contains('@') {
            adapter_suffix(adapter_id, '@', name)
        } else {
            short_hash(name)
        };
        return format!("{service_type}_cli_{suffix}");
    }

    if name.contains("Discord") {
        let suffix = adapter_suffix(adapter_id, '_', name);
        return format!("{service_type}_discord_{suffix}");
    }

    for (pattern, suffix) in SIMPLE_NAME_PATTERNS {
        if name.contains(pattern) {
            return format!("{service_type}_{suffix}");
        }
    }

    if name.contains("OpenAI") || name.contains("Anthropic") {
        let vendor = if name.contains("OpenAI") { "openai" } else { "anthropic" };
        return format!("{service_type}_{vendor}_{}", short_hash(name));
    }

    let cleaned = name.replace("Service", "").replace("Adapter", "");
    format!(
        "{service_type}_{}_{}",
        cleaned.to_lowercase(),
        short_hash(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use crate::clock::FixedClock;
    use crate::error::{CollectionError, CollectionResult};
    use crate::telemetry::lookup::{BusHandle, ControlPlane, ProviderCatalog, ServiceDirectory};
    use crate::telemetry::snapshot::CustomMetrics;
    use crate::telemetry::source::{metric_map, MetricsPayload};

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2023, 10, 10, 12, 0, 0).unwrap(),
        ))
    }

    struct StructuredSource(ServiceSnapshot);

    #[async_trait]
    impl MetricsSource for StructuredSource {
        async fn metrics(&self) -> CollectionResult<MetricsPayload> {
            Ok(MetricsPayload::Snapshot(self.0.clone()))
        }
    }

    struct FailingThenInternal;

    #[async_trait]
    impl MetricsSource for FailingThenInternal {
        async fn metrics(&self) -> CollectionResult<MetricsPayload> {
            Err(CollectionError::ServiceUnreachable {
                service: "primary accessor".to_string(),
            })
        }

        fn internal_metrics(&self) -> CollectionResult<MetricsPayload> {
            Ok(MetricsPayload::Map(metric_map([
                ("uptime_seconds", MetricValue::Float(12.0)),
                ("healthy", MetricValue::Int(1)),
            ])))
        }
    }

    struct HealthOnly(bool);

    #[async_trait]
    impl MetricsSource for HealthOnly {
        async fn health(&self) -> CollectionResult<bool> {
            Ok(self.0)
        }
    }

    struct NoAccessors;

    impl MetricsSource for NoAccessors {}

    struct StubBus {
        metrics: CustomMetrics,
        providers: usize,
    }

    impl BusHandle for StubBus {
        fn metrics(&self) -> MetricsPayload {
            MetricsPayload::Map(self.metrics.clone())
        }

        fn provider_count(&self) -> usize {
            self.providers
        }
    }

    struct StructuredBus {
        snapshot: ServiceSnapshot,
        providers: usize,
    }

    impl BusHandle for StructuredBus {
        fn metrics(&self) -> MetricsPayload {
            MetricsPayload::Snapshot(self.snapshot.clone())
        }

        fn provider_count(&self) -> usize {
            self.providers
        }
    }

    struct StubAdapter {
        id: String,
        kind: String,
        running: bool,
        snapshot: Option<ServiceSnapshot>,
    }

    #[async_trait]
    impl MetricsSource for StubAdapter {
        async fn metrics(&self) -> CollectionResult<MetricsPayload> {
            match &self.snapshot {
                Some(snapshot) => Ok(MetricsPayload::Snapshot(snapshot.clone())),
                None => Err(CollectionError::Unsupported),
            }
        }
    }

    impl AdapterHandle for StubAdapter {
        fn adapter_id(&self) -> String {
            self.id.clone()
        }

        fn adapter_kind(&self) -> String {
            self.kind.clone()
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    struct StubControlPlane {
        adapters: Vec<Arc<dyn AdapterHandle>>,
    }

    #[async_trait]
    impl ControlPlane for StubControlPlane {
        async fn list_adapters(&self) -> CollectionResult<Vec<Arc<dyn AdapterHandle>>> {
            Ok(self.adapters.clone())
        }
    }

    fn healthy_snapshot(uptime: f64) -> ServiceSnapshot {
        let mut snapshot = ServiceSnapshot::unreachable();
        snapshot.healthy = true;
        snapshot.uptime_seconds = uptime;
        snapshot
    }

    #[tokio::test]
    async fn test_chain_prefers_structured_metrics() {
        let source = StructuredSource(healthy_snapshot(99.0));
        let collected = collect_via_chain(&source).await.unwrap();
        assert!(collected.healthy);
        assert_eq!(collected.uptime_seconds, 99.0);
    }

    #[tokio::test]
    async fn test_chain_falls_through_on_accessor_failure() {
        let collected = collect_via_chain(&FailingThenInternal).await.unwrap();
        assert!(collected.healthy);
        assert_eq!(collected.uptime_seconds, 12.0);
    }

    #[tokio::test]
    async fn test_chain_health_probe_is_last_resort() {
        let collected = collect_via_chain(&HealthOnly(true)).await.unwrap();
        assert!(collected.healthy);
        assert_eq!(collected.uptime_seconds, 0.0);
        assert_eq!(collected.requests_handled, 0);

        let collected = collect_via_chain(&HealthOnly(false)).await.unwrap();
        assert!(!collected.healthy);
    }

    #[tokio::test]
    async fn test_chain_with_no_accessors_yields_none() {
        assert!(collect_via_chain(&NoAccessors).await.is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_service_becomes_sentinel() {
        let collector = ServiceCollector::new(Arc::new(RuntimeView::new()), fixed_clock());
        match collector.collect_service("memory").await {
            CollectedValue::Single(snapshot) => {
                assert_eq!(snapshot, ServiceSnapshot::unreachable());
            }
            CollectedValue::Instances(_) => panic!("expected single snapshot"),
        }
    }

    #[tokio::test]
    async fn test_bus_health_from_provider_count_not_errors() {
        let mut view = RuntimeView::new();
        view.register_bus(
            "llm_bus",
            Arc::new(StubBus {
                metrics: metric_map([
                    ("llm_uptime_seconds", MetricValue::Float(300.0)),
                    ("error_count", MetricValue::Int(17)),
                ]),
                providers: 2,
            }),
        );
        let collector = ServiceCollector::new(Arc::new(view), fixed_clock());

        match collector.collect_service("llm_bus").await {
            CollectedValue::Single(snapshot) => {
                assert!(snapshot.healthy, "providers attached means healthy");
                assert_eq!(snapshot.uptime_seconds, 300.0);
                assert_eq!(snapshot.error_count, 17);
            }
            CollectedValue::Instances(_) => panic!("expected single snapshot"),
        }
    }

    #[tokio::test]
    async fn test_structured_bus_payload_keeps_counters_health_from_providers() {
        let mut snapshot = healthy_snapshot(42.0);
        snapshot.error_count = 9;
        let mut view = RuntimeView::new();
        view.register_bus(
            "memory_bus",
            Arc::new(StructuredBus {
                snapshot,
                providers: 0,
            }),
        );
        let collector = ServiceCollector::new(Arc::new(view), fixed_clock());

        match collector.collect_service("memory_bus").await {
            CollectedValue::Single(snapshot) => {
                assert!(!snapshot.healthy, "no providers overrides the payload");
                assert_eq!(snapshot.uptime_seconds, 42.0);
                assert_eq!(snapshot.error_count, 9);
            }
            CollectedValue::Instances(_) => panic!("expected single snapshot"),
        }
    }

    #[tokio::test]
    async fn test_bus_without_providers_is_unhealthy() {
        let mut view = RuntimeView::new();
        view.register_bus(
            "tool_bus",
            Arc::new(StubBus {
                metrics: metric_map([("tool_uptime_seconds", MetricValue::Float(88.0))]),
                providers: 0,
            }),
        );
        let collector = ServiceCollector::new(Arc::new(view), fixed_clock());

        match collector.collect_service("tool_bus").await {
            CollectedValue::Single(snapshot) => {
                assert!(!snapshot.healthy);
                assert_eq!(snapshot.uptime_seconds, 88.0);
            }
            CollectedValue::Instances(_) => panic!("expected single snapshot"),
        }
    }

    #[tokio::test]
    async fn test_adapter_instances_are_never_collapsed() {
        let mut view = RuntimeView::new();
        view.set_control_plane(Arc::new(StubControlPlane {
            adapters: vec![
                Arc::new(StubAdapter {
                    id: "api_8080".to_string(),
                    kind: "api".to_string(),
                    running: true,
                    snapshot: Some(healthy_snapshot(10.0)),
                }),
                Arc::new(StubAdapter {
                    id: "api_8081".to_string(),
                    kind: "api".to_string(),
                    running: true,
                    snapshot: Some(healthy_snapshot(20.0)),
                }),
                Arc::new(StubAdapter {
                    id: "cli_1".to_string(),
                    kind: "cli".to_string(),
                    running: true,
                    snapshot: None,
                }),
            ],
        }));
        let collector = ServiceCollector::new(Arc::new(view), fixed_clock());

        match collector.collect_service("api").await {
            CollectedValue::Instances(instances) => {
                assert_eq!(instances.len(), 2);
                assert!(instances.contains_key("api_8080"));
                assert!(instances.contains_key("api_8081"));
                assert_eq!(
                    instances["api_8080"].custom_metrics["adapter_id"],
                    MetricValue::Text("api_8080".to_string())
                );
            }
            CollectedValue::Single(_) => panic!("expected instances"),
        }
    }

    #[tokio::test]
    async fn test_stopped_adapter_instances_are_excluded() {
        let mut view = RuntimeView::new();
        view.set_control_plane(Arc::new(StubControlPlane {
            adapters: vec![Arc::new(StubAdapter {
                id: "discord_main".to_string(),
                kind: "discord".to_string(),
                running: false,
                snapshot: Some(healthy_snapshot(5.0)),
            })],
        }));
        let collector = ServiceCollector::new(Arc::new(view), fixed_clock());

        match collector.collect_service("discord").await {
            CollectedValue::Instances(instances) => assert!(instances.is_empty()),
            CollectedValue::Single(_) => panic!("expected instances"),
        }
    }

    #[tokio::test]
    async fn test_adapter_bootstrap_fallback_without_control_plane() {
        let mut view = RuntimeView::new();
        view.register_adapter(Arc::new(StubAdapter {
            id: "cli_tty0".to_string(),
            kind: "cli".to_string(),
            running: true,
            snapshot: Some(healthy_snapshot(7.0)),
        }));
        let collector = ServiceCollector::new(Arc::new(view), fixed_clock());

        match collector.collect_service("cli").await {
            CollectedValue::Instances(instances) => {
                assert_eq!(instances.len(), 1);
                assert!(instances["cli_tty0"].healthy);
            }
            CollectedValue::Single(_) => panic!("expected instances"),
        }
    }

    struct FailingDirectory;

    impl ServiceDirectory for FailingDirectory {
        fn resolve_by_name(&self, _name: &str) -> Option<Arc<dyn MetricsSource>> {
            None
        }

        fn list_by_type(&self, _service_type: &str) -> Vec<Arc<dyn MetricsSource>> {
            Vec::new()
        }

        fn list_all(&self) -> Vec<(String, Arc<dyn MetricsSource>)> {
            Vec::new()
        }

        fn provider_info(&self) -> CollectionResult<ProviderCatalog> {
            Err(CollectionError::RegistryDiscovery {
                message: "registry offline".to_string(),
            })
        }
    }

    struct CatalogDirectory {
        catalog: ProviderCatalog,
    }

    impl ServiceDirectory for CatalogDirectory {
        fn resolve_by_name(&self, _name: &str) -> Option<Arc<dyn MetricsSource>> {
            None
        }

        fn list_by_type(&self, _service_type: &str) -> Vec<Arc<dyn MetricsSource>> {
            Vec::new()
        }

        fn list_all(&self) -> Vec<(String, Arc<dyn MetricsSource>)> {
            Vec::new()
        }

        fn provider_info(&self) -> CollectionResult<ProviderCatalog> {
            Ok(self.catalog.clone())
        }
    }

    fn descriptor(name: &str, adapter_id: Option<&str>) -> ProviderDescriptor {
        let mut metadata = BTreeMap::new();
        if let Some(id) = adapter_id {
            metadata.insert("adapter_id".to_string(), id.to_string());
        }
        ProviderDescriptor {
            name: name.to_string(),
            metadata,
            handle: Arc::new(NoAccessors),
        }
    }

    #[test]
    fn test_discovery_failure_is_empty_set() {
        let mut view = RuntimeView::new();
        view.set_directory(Arc::new(FailingDirectory));
        let collector = ServiceCollector::new(Arc::new(view), fixed_clock());
        assert!(collector.discover_providers().is_empty());
    }

    #[test]
    fn test_discovery_skips_statically_collected_providers() {
        let mut catalog = ProviderCatalog::new();
        catalog.insert(
            "memory".to_string(),
            vec![
                descriptor("LocalGraphMemoryService_42", None),
                descriptor("ExperimentalVectorStore_7", None),
            ],
        );
        let mut view = RuntimeView::new();
        view.set_directory(Arc::new(CatalogDirectory { catalog }));
        let collector = ServiceCollector::new(Arc::new(view), fixed_clock());

        let discovered = collector.discover_providers();
        assert_eq!(discovered.len(), 1);
        assert!(discovered[0].0.starts_with("memory_experimentalvectorstore_"));
    }

    #[test]
    fn test_semantic_name_api_adapter_uses_adapter_id_suffix() {
        let d = descriptor("APICommunicationService_9912", Some("api_host_8080"));
        assert_eq!(semantic_service_name("communication", &d), "communication_api_8080");
    }

    #[test]
    fn test_semantic_name_cli_adapter_uses_at_separator() {
        let d = descriptor("CLIAdapter_17", Some("cli@tty0"));
        assert_eq!(semantic_service_name("communication", &d), "communication_cli_tty0");
    }

    #[test]
    fn test_semantic_name_discord_adapter() {
        let d = descriptor("DiscordAdapter_3", Some("discord_guild_1234567890"));
        assert_eq!(
            semantic_service_name("communication", &d),
            "communication_discord_12345678"
        );
    }

    #[test]
    fn test_semantic_name_simple_pattern() {
        let d = descriptor("APIToolService_5", None);
        assert_eq!(semantic_service_name("tool", &d), "tool_api_tool");
    }

    #[test]
    fn test_semantic_name_llm_vendor_keyword() {
        let d = descriptor("OpenAICompatibleClient_1", None);
        let name = semantic_service_name("llm", &d);
        assert!(name.starts_with("llm_openai_"), "got {name}");

        let d = descriptor("AnthropicClient_2", None);
        let name = semantic_service_name("llm", &d);
        assert!(name.starts_with("llm_anthropic_"), "got {name}");
    }

    #[test]
    fn test_semantic_name_fallback_cleans_class_name() {
        let d = descriptor("ExperimentalVectorStoreService_8", None);
        let name = semantic_service_name("memory", &d);
        assert!(
            name.starts_with("memory_experimentalvectorstore_"),
            "got {name}"
        );
    }

    #[test]
    fn test_semantic_name_is_stable() {
        let d = descriptor("ExperimentalVectorStoreService_8", None);
        assert_eq!(
            semantic_service_name("memory", &d),
            semantic_service_name("memory", &d)
        );
    }
}
