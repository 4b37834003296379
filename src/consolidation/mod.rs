//! Tiered consolidation of raw trace spans into queryable summaries.
//!
//! Compaction runs in strict dependency order: the basic tier summarizes
//! the most recently completed raw window, the extensive tier compacts the
//! previous month's basic summaries, and the profound tier compresses
//! extensive output against a daily storage budget. Period math is pure and
//! strictly UTC.

/// Pluggable summary compression and storage estimation.
pub mod compressor;
/// The sequential basic/extensive/profound tier driver.
pub mod driver;
/// Period boundary calculation and consolidation levels.
pub mod period;
/// Raw span records and tag access.
pub mod span;
/// Span consolidation into summaries and edge proposals.
pub mod trace;

pub use compressor::{AttributeCompressor, CompressionOutcome, SummaryCompressor};
pub use driver::{ConsolidationDriver, TierReport};
pub use period::{ConsolidationLevel, ConsolidationPeriod};
pub use span::SpanRecord;
pub use trace::{
    propose_edges, summarize, summary_id, EdgeRelation, LatencyStats, SummaryEdge, TaskSummary,
    ThoughtEntry, TraceConsolidator, TraceSummary,
};
