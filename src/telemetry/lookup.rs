//! Service lookup: static category tables and handle resolution.
//!
//! The category table and alias tables are immutable configuration data,
//! compiled in and never mutated. A logical service name resolves first
//! through the runtime's direct accessor table; only at the registry
//! boundary does class-name matching against the alias table apply, for
//! handles registered outside this system's control.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CollectionResult;
use crate::telemetry::source::{MetricsPayload, MetricsSource};

/// Category of the synthetic, computed covenant metrics.
pub const COVENANT_CATEGORY: &str = "covenant";

/// Category holding dynamically discovered registry providers.
pub const REGISTRY_CATEGORY: &str = "registry";

/// Static category table: category name -> logical service names.
///
/// The covenant category is intentionally empty; its metrics are computed
/// from governance data after collection, never collected directly.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "buses",
        &[
            "llm_bus",
            "memory_bus",
            "communication_bus",
            "wise_bus",
            "tool_bus",
            "runtime_control_bus",
        ],
    ),
    (
        "graph",
        &[
            "memory",
            "config",
            "telemetry",
            "audit",
            "incident_management",
            "tsdb_consolidation",
        ],
    ),
    (
        "infrastructure",
        &[
            "time",
            "shutdown",
            "initialization",
            "authentication",
            "resource_monitor",
            "database_maintenance",
            "secrets",
        ],
    ),
    (
        "governance",
        &[
            "wise_authority",
            "adaptive_filter",
            "visibility",
            "self_observation",
            "consent",
        ],
    ),
    ("runtime", &["llm", "runtime_control", "task_scheduler"]),
    ("tools", &["secrets_tool"]),
    ("adapters", &["api", "discord", "cli"]),
    ("components", &["service_registry", "agent_processor"]),
    (COVENANT_CATEGORY, &[]),
];

/// Logical service name -> accepted registered class names (lowercased).
///
/// Applied only when a handle was not found in the runtime's direct table.
pub const REGISTRY_ALIASES: &[(&str, &[&str])] = &[
    ("memory", &["memoryservice", "localgraphmemoryservice"]),
    ("config", &["configservice", "graphconfigservice"]),
    ("telemetry", &["telemetryservice", "graphtelemetryservice"]),
    ("audit", &["auditservice"]),
    ("incident_management", &["incidentmanagementservice"]),
    ("tsdb_consolidation", &["tsdbconsolidationservice"]),
    ("time", &["timeservice"]),
    ("shutdown", &["shutdownservice"]),
    ("initialization", &["initializationservice"]),
    ("authentication", &["authenticationservice"]),
    ("resource_monitor", &["resourcemonitorservice"]),
    ("database_maintenance", &["databasemaintenanceservice"]),
    ("secrets", &["secretsservice"]),
    ("wise_authority", &["wiseauthorityservice"]),
    ("adaptive_filter", &["adaptivefilterservice"]),
    ("visibility", &["visibilityservice"]),
    ("self_observation", &["selfobservationservice"]),
    ("consent", &["consentservice"]),
    ("llm", &["llmservice", "mockllmservice"]),
    ("runtime_control", &["runtimecontrolservice", "apiruntimecontrolservice"]),
    ("task_scheduler", &["taskschedulerservice"]),
    ("secrets_tool", &["secretstoolservice"]),
];

/// Bus name -> the uptime field that bus reports in its metric map.
pub const BUS_UPTIME_KEYS: &[(&str, &str)] = &[
    ("llm_bus", "llm_uptime_seconds"),
    ("memory_bus", "memory_uptime_seconds"),
    ("communication_bus", "communication_uptime_seconds"),
    ("wise_bus", "wise_uptime_seconds"),
    ("tool_bus", "tool_uptime_seconds"),
    ("runtime_control_bus", "runtime_control_uptime_seconds"),
];

/// Registered class names whose providers are already collected through the
/// static category table and must be skipped during registry discovery.
pub const CORE_PROVIDER_CLASSES: &[(&str, &str)] = &[
    ("LocalGraphMemoryService", "memory"),
    ("GraphConfigService", "config"),
    ("TimeService", "time"),
    ("WiseAuthorityService", "wise_authority"),
    ("ConfigService", "config"),
    ("MemoryService", "memory"),
    ("TSDBConsolidationService", "tsdb_consolidation"),
    ("MockLLMService", "llm"),
    ("SecretsToolService", "secrets_tool"),
];

/// Look up a category's service list.
pub fn category_services(category: &str) -> &'static [&'static str] {
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, services)| *services)
        .unwrap_or(&[])
}

/// The uptime field name a given bus uses, with the generic default.
pub fn bus_uptime_key(bus_name: &str) -> &'static str {
    BUS_UPTIME_KEYS
        .iter()
        .find(|(name, _)| *name == bus_name)
        .map(|(_, key)| *key)
        .unwrap_or("uptime_seconds")
}

/// A dynamically registered provider as reported by the directory.
#[derive(Clone)]
pub struct ProviderDescriptor {
    /// Registered name, class-style with an instance suffix
    /// (e.g. `GraphConfigService_123456`).
    pub name: String,
    /// Provider metadata, e.g. an `adapter_id` for transport adapters.
    pub metadata: BTreeMap<String, String>,
    /// Live handle for collection.
    pub handle: Arc<dyn MetricsSource>,
}

impl ProviderDescriptor {
    /// Class name with any `_<instance>` suffix stripped.
    pub fn class_name(&self) -> &str {
        match self.name.split_once('_') {
            Some((class, _)) => class,
            None => &self.name,
        }
    }
}

/// Provider listing keyed by abstract service type (e.g. "communication").
pub type ProviderCatalog = BTreeMap<String, Vec<ProviderDescriptor>>;

/// The service registry boundary.
///
/// Handles registered here may come from outside this system, so they are
/// identified by registered class name rather than an explicit tag.
pub trait ServiceDirectory: Send + Sync {
    /// Resolve a logical service name the registry knows natively.
    fn resolve_by_name(&self, name: &str) -> Option<Arc<dyn MetricsSource>>;

    /// All live handles for one abstract service type.
    fn list_by_type(&self, service_type: &str) -> Vec<Arc<dyn MetricsSource>>;

    /// Every registered handle with its registered class name.
    fn list_all(&self) -> Vec<(String, Arc<dyn MetricsSource>)>;

    /// Dynamic provider listing keyed by abstract service type.
    ///
    /// A failure here is a discovery failure for the cycle, not a fatal
    /// error - the caller treats it as an empty catalog.
    fn provider_info(&self) -> CollectionResult<ProviderCatalog>;
}

/// One message bus. Health is derived from attached providers, never from
/// error counters.
pub trait BusHandle: Send + Sync {
    /// Bus metrics: a structured snapshot or a generic map whose uptime
    /// field name is bus-specific.
    fn metrics(&self) -> MetricsPayload;

    /// Number of providers currently attached.
    fn provider_count(&self) -> usize;
}

/// One running adapter instance. A logical adapter type may have many of
/// these at once; each is keyed by its own instance id.
pub trait AdapterHandle: MetricsSource {
    /// Unique instance id, e.g. `api_8080`.
    fn adapter_id(&self) -> String;

    /// Adapter type this instance belongs to ("api", "discord", "cli").
    fn adapter_kind(&self) -> String;

    /// Whether the instance is currently running.
    fn is_running(&self) -> bool {
        true
    }

    /// When the instance started, if known.
    fn started_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Control-plane view used to enumerate adapter instances. Preferred over
/// walking bootstrap references directly.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// List every adapter instance the control plane knows about.
    async fn list_adapters(&self) -> CollectionResult<Vec<Arc<dyn AdapterHandle>>>;
}

/// Direct references into the running system: the static name -> accessor
/// table plus buses, bootstrap adapters, and the optional control plane and
/// registry.
#[derive(Default)]
pub struct RuntimeView {
    services: BTreeMap<String, Arc<dyn MetricsSource>>,
    buses: BTreeMap<String, Arc<dyn BusHandle>>,
    adapters: Vec<Arc<dyn AdapterHandle>>,
    control_plane: Option<Arc<dyn ControlPlane>>,
    directory: Option<Arc<dyn ServiceDirectory>>,
}

impl RuntimeView {
    /// Empty view with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under its logical name in the direct table.
    pub fn register_service(&mut self, name: impl Into<String>, handle: Arc<dyn MetricsSource>) {
        self.services.insert(name.into(), handle);
    }

    /// Register a bus under its logical name.
    pub fn register_bus(&mut self, name: impl Into<String>, bus: Arc<dyn BusHandle>) {
        self.buses.insert(name.into(), bus);
    }

    /// Register a bootstrap-time adapter instance.
    pub fn register_adapter(&mut self, adapter: Arc<dyn AdapterHandle>) {
        self.adapters.push(adapter);
    }

    /// Attach the control plane.
    pub fn set_control_plane(&mut self, control_plane: Arc<dyn ControlPlane>) {
        self.control_plane = Some(control_plane);
    }

    /// Attach the service registry.
    pub fn set_directory(&mut self, directory: Arc<dyn ServiceDirectory>) {
        self.directory = Some(directory);
    }

    /// Resolve a logical service name to a live handle.
    ///
    /// Direct runtime table first; then the registry's native lookup; then
    /// a class-name scan against the alias table.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn MetricsSource>> {
        if let Some(handle) = self.services.get(name) {
            return Some(Arc::clone(handle));
        }

        let directory = self.directory.as_ref()?;
        if let Some(handle) = directory.resolve_by_name(name) {
            return Some(handle);
        }

        let aliases = REGISTRY_ALIASES
            .iter()
            .find(|(logical, _)| *logical == name)
            .map(|(_, aliases)| *aliases)?;

        directory
            .list_all()
            .into_iter()
            .find(|(class_name, _)| {
                let lowered = class_name.to_lowercase();
                aliases.iter().any(|alias| *alias == lowered)
            })
            .map(|(_, handle)| handle)
    }

    /// The bus registered under `name`, if any.
    pub fn bus(&self, name: &str) -> Option<Arc<dyn BusHandle>> {
        self.buses.get(name).map(Arc::clone)
    }

    /// Bootstrap adapter references, in registration order.
    pub fn adapters(&self) -> &[Arc<dyn AdapterHandle>] {
        &self.adapters
    }

    /// The control plane, if attached.
    pub fn control_plane(&self) -> Option<Arc<dyn ControlPlane>> {
        self.control_plane.as_ref().map(Arc::clone)
    }

    /// The service registry, if attached.
    pub fn directory(&self) -> Option<Arc<dyn ServiceDirectory>> {
        self.directory.as_ref().map(Arc::clone)
    }
}
