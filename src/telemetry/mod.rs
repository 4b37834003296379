//! On-demand telemetry snapshots across the runtime.
//!
//! Collection fans out one task per service under a shared deadline,
//! tolerates partial failure, and assembles a hierarchical snapshot with
//! system-wide aggregates. Unreachable services are reported as exactly
//! that - data is never fabricated.

mod aggregator;
mod collector;
mod lookup;
mod snapshot;
mod source;

pub use aggregator::TelemetryAggregator;
pub use collector::{collect_via_chain, semantic_service_name, CollectedValue, ServiceCollector};
pub use lookup::{
    bus_uptime_key, category_services, AdapterHandle, BusHandle, ControlPlane, ProviderCatalog,
    ProviderDescriptor, RuntimeView, ServiceDirectory, BUS_UPTIME_KEYS, CATEGORIES,
    CORE_PROVIDER_CLASSES, COVENANT_CATEGORY, REGISTRY_ALIASES, REGISTRY_CATEGORY,
};
pub use snapshot::{
    AggregatedSnapshot, CustomMetrics, MetricValue, ServiceSnapshot, SnapshotMeta,
    SystemAggregates,
};
pub use source::{
    metric_map, resolve_payload, snapshot_from_internal_map, snapshot_from_map, uptime_from_map,
    MetricsPayload, MetricsSource, UPTIME_ALIASES,
};
