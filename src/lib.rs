//! # Agent Telemetry
//!
//! Observability backbone for an agent runtime: on-demand health and
//! metrics snapshots across every service, bus, and adapter instance, plus
//! tiered consolidation of raw trace spans into bounded, queryable
//! summaries.
//!
//! ## Subsystems
//!
//! - **Telemetry aggregation** ([`telemetry`]): fans out one collection
//!   task per service under a shared deadline, tolerates partial failure,
//!   and assembles a hierarchical snapshot with system-wide aggregates and
//!   derived covenant metrics. Unreachable services are reported as exactly
//!   that - data is never fabricated.
//! - **Trace consolidation** ([`consolidation`]): compacts raw spans into
//!   per-period summaries with latency percentiles and task/thought graphs,
//!   then compresses them through the extensive and profound tiers to bound
//!   long-term storage growth.
//! - **Storage** ([`storage`]): the persistence boundary as a trait, with a
//!   bundled SQLite implementation.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use agent_telemetry::clock::SystemClock;
//! use agent_telemetry::config::Config;
//! use agent_telemetry::consolidation::{AttributeCompressor, ConsolidationDriver};
//! use agent_telemetry::storage::SqliteStore;
//! use agent_telemetry::telemetry::{RuntimeView, TelemetryAggregator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     agent_telemetry::config::init_logging(&config.logging);
//!
//!     let clock = Arc::new(SystemClock);
//!     let runtime = Arc::new(RuntimeView::new());
//!     let aggregator =
//!         TelemetryAggregator::new(runtime, clock.clone(), config.collection.clone());
//!     let snapshot = aggregator.collect().await;
//!     println!("{} services online", snapshot.aggregates.services_online);
//!
//!     let store = Arc::new(SqliteStore::new(&config.database).await?);
//!     let driver = ConsolidationDriver::new(
//!         store,
//!         Arc::new(AttributeCompressor::default()),
//!         clock,
//!         config.consolidation.clone(),
//!     );
//!     driver.run_all().await?;
//!     Ok(())
//! }
//! ```

/// Time source abstraction for caching and period calculation.
pub mod clock;
/// Configuration loaded from environment variables.
pub mod config;
/// Tiered consolidation of trace spans into summaries.
pub mod consolidation;
/// Error types and result aliases.
pub mod error;
/// Persistence boundary for spans and summaries.
pub mod storage;
/// On-demand telemetry snapshots across the runtime.
pub mod telemetry;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use consolidation::{ConsolidationDriver, TraceConsolidator};
pub use error::{AppError, AppResult};
pub use storage::{SqliteStore, TelemetryStore};
pub use telemetry::TelemetryAggregator;
