//! Span consolidation into period summaries.
//!
//! One pass over a period's raw spans accumulates per-task records, thought
//! and component counters, and latency samples, then finalizes them into a
//! [`TraceSummary`] with percentile statistics and graph-edge proposals.
//! The summary id is derived from the period start, so re-running a period
//! overwrites its summary instead of duplicating it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::consolidation::period::ConsolidationPeriod;
use crate::consolidation::span::{
    SpanRecord, TAG_ACTION_TYPE, TAG_DMA_TYPE, TAG_GUARDRAIL_TYPE, TAG_TASK_STATUS,
    TAG_THOUGHT_TYPE, TAG_VIOLATION,
};
use crate::error::{ConsolidationError, ConsolidationResult};
use crate::storage::TelemetryStore;

/// Component type whose spans carry handler action selections.
pub const COMPONENT_HANDLER: &str = "handler";

/// Component type whose spans may mark guardrail violations.
pub const COMPONENT_GUARDRAIL: &str = "guardrail";

/// Component type whose spans carry decision-making outcomes.
pub const COMPONENT_DMA: &str = "dma";

/// Status a task record starts in before any explicit marker is seen.
const DEFAULT_TASK_STATUS: &str = "processing";

/// Fallback for spans missing a component or thought type tag.
const UNKNOWN: &str = "unknown";

/// Observed latency above which a task is flagged as slow.
const HIGH_LATENCY_THRESHOLD_MS: f64 = 5000.0;

/// Maximum edges proposed per relation, regardless of input size.
const EDGE_CAP: usize = 10;

/// Deterministic summary id for the period starting at `period_start`.
pub fn summary_id(period_start: DateTime<Utc>) -> String {
    format!("trace_summary_{}", period_start.format("%Y%m%d_%H"))
}

/// Average and sorted-index percentiles over a sample set.
///
/// Percentile indices are `n/2`, `n*0.95`, and `n*0.99` into the sorted
/// samples. Empty input yields all zeroes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencyStats {
    /// Compute stats from unsorted samples.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let index = |scale: f64| sorted[((n as f64 * scale) as usize).min(n - 1)];

        Self {
            avg: samples.iter().sum::<f64>() / n as f64,
            p50: sorted[n / 2],
            p95: index(0.95),
            p99: index(0.99),
        }
    }
}

/// One thought recorded against a task, in observation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtEntry {
    pub thought_id: String,
    /// Action the handler selected for this thought.
    pub handler: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-task record accumulated over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    /// Latest explicit status marker, or "processing" if none was seen.
    pub status: String,
    /// Thoughts handled for this task, in span order.
    pub thoughts: Vec<ThoughtEntry>,
    /// Handler actions in selection order.
    pub handlers_selected: Vec<String>,
    /// Every trace that touched this task.
    pub trace_ids: BTreeSet<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// End minus start, filled in at finalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

impl TaskSummary {
    fn new(task_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: DEFAULT_TASK_STATUS.to_string(),
            thoughts: Vec::new(),
            handlers_selected: Vec::new(),
            trace_ids: BTreeSet::new(),
            start_time: timestamp,
            end_time: timestamp,
            duration_ms: None,
        }
    }
}

/// Consolidated view of one period's trace activity, one per (period, level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Deterministic id derived from the period start.
    pub id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub period_label: String,

    pub total_tasks_processed: u64,
    pub tasks_by_status: BTreeMap<String, u64>,
    pub unique_task_ids: BTreeSet<String>,
    pub task_summaries: BTreeMap<String, TaskSummary>,

    pub total_thoughts_processed: u64,
    pub thoughts_by_type: BTreeMap<String, u64>,
    /// Unique thoughts over unique tasks, 0 when no tasks were seen.
    pub avg_thoughts_per_task: f64,

    pub component_calls: BTreeMap<String, u64>,
    pub component_failures: BTreeMap<String, u64>,
    pub component_latency_ms: BTreeMap<String, LatencyStats>,

    pub dma_decisions: BTreeMap<String, u64>,
    pub guardrail_violations: BTreeMap<String, u64>,
    pub handler_actions: BTreeMap<String, u64>,

    pub avg_task_processing_time_ms: f64,
    pub p50_task_processing_time_ms: f64,
    pub p95_task_processing_time_ms: f64,
    pub p99_task_processing_time_ms: f64,
    pub total_processing_time_ms: f64,

    pub total_errors: u64,
    pub errors_by_component: BTreeMap<String, u64>,
    /// Erroring spans over total component calls, 0 when no calls were made.
    pub error_rate: f64,

    /// Most thoughts recorded against any single task.
    pub max_trace_depth: u64,
    pub avg_trace_depth: f64,

    /// How many raw spans produced this summary.
    pub source_span_count: u64,
}

/// Relation of a proposed summary edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeRelation {
    /// Summary to a task with at least one erroring span.
    ErrorTask,
    /// Summary to a task whose observed latency exceeded the threshold.
    HighLatencyTask,
}

impl std::fmt::Display for EdgeRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeRelation::ErrorTask => write!(f, "ERROR_TASK"),
            EdgeRelation::HighLatencyTask => write!(f, "HIGH_LATENCY_TASK"),
        }
    }
}

/// A directed edge proposed from a summary node to a task node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEdge {
    pub source_id: String,
    pub target_id: String,
    pub relation: EdgeRelation,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Default)]
struct Accumulator {
    task_summaries: BTreeMap<String, TaskSummary>,
    unique_thoughts: BTreeSet<String>,
    tasks_by_status: BTreeMap<String, u64>,
    thoughts_by_type: BTreeMap<String, u64>,
    component_calls: BTreeMap<String, u64>,
    component_failures: BTreeMap<String, u64>,
    component_latencies: BTreeMap<String, Vec<f64>>,
    handler_actions: BTreeMap<String, u64>,
    errors_by_component: BTreeMap<String, u64>,
    guardrail_violations: BTreeMap<String, u64>,
    dma_decisions: BTreeMap<String, u64>,
    total_errors: u64,
}

fn bump(counter: &mut BTreeMap<String, u64>, key: &str) {
    *counter.entry(key.to_string()).or_insert(0) += 1;
}

impl Accumulator {
    fn observe(&mut self, span: &SpanRecord) {
        let component_type = if span.component_type.is_empty() {
            UNKNOWN
        } else {
            span.component_type.as_str()
        };

        if let Some(task_id) = &span.task_id {
            let task = self
                .task_summaries
                .entry(task_id.clone())
                .or_insert_with(|| TaskSummary::new(task_id, span.timestamp));
            task.trace_ids.insert(span.trace_id.clone());
            task.end_time = span.timestamp;
        }

        if let Some(thought_id) = &span.thought_id {
            self.unique_thoughts.insert(thought_id.clone());
            bump(&mut self.thoughts_by_type, span.tag_or(TAG_THOUGHT_TYPE, UNKNOWN));

            if component_type == COMPONENT_HANDLER {
                if let Some(task_id) = &span.task_id {
                    let action = span.tag_or(TAG_ACTION_TYPE, UNKNOWN).to_string();
                    bump(&mut self.handler_actions, &action);
                    if let Some(task) = self.task_summaries.get_mut(task_id) {
                        task.handlers_selected.push(action.clone());
                        task.thoughts.push(ThoughtEntry {
                            thought_id: thought_id.clone(),
                            handler: action,
                            timestamp: span.timestamp,
                        });
                    }
                }
            }
        }

        if let (Some(task_id), Some(status)) = (&span.task_id, span.tag(TAG_TASK_STATUS)) {
            bump(&mut self.tasks_by_status, status);
            if let Some(task) = self.task_summaries.get_mut(task_id) {
                task.status = status.to_string();
            }
        }

        bump(&mut self.component_calls, component_type);

        if span.error {
            self.total_errors += 1;
            bump(&mut self.component_failures, component_type);
            bump(&mut self.errors_by_component, component_type);
        }

        if let Some(sample) = span.latency_sample() {
            self.component_latencies
                .entry(component_type.to_string())
                .or_default()
                .push(sample);
        }

        match component_type {
            COMPONENT_GUARDRAIL => {
                if span.tag_is(TAG_VIOLATION, "true") {
                    bump(
                        &mut self.guardrail_violations,
                        span.tag_or(TAG_GUARDRAIL_TYPE, UNKNOWN),
                    );
                }
            }
            COMPONENT_DMA => {
                bump(&mut self.dma_decisions, span.tag_or(TAG_DMA_TYPE, UNKNOWN));
            }
            _ => {}
        }
    }

    fn finish(mut self, period: &ConsolidationPeriod, source_span_count: u64) -> TraceSummary {
        let mut task_processing_times = Vec::with_capacity(self.task_summaries.len());
        for task in self.task_summaries.values_mut() {
            let duration_ms =
                (task.end_time - task.start_time).num_milliseconds().max(0) as f64;
            task.duration_ms = Some(duration_ms);
            task_processing_times.push(duration_ms);
        }

        let trace_depths: Vec<f64> = self
            .task_summaries
            .values()
            .map(|task| task.thoughts.len() as f64)
            .collect();
        let max_trace_depth = trace_depths.iter().copied().fold(0.0, f64::max) as u64;
        let avg_trace_depth = if trace_depths.is_empty() {
            0.0
        } else {
            trace_depths.iter().sum::<f64>() / trace_depths.len() as f64
        };

        let component_latency_ms: BTreeMap<String, LatencyStats> = self
            .component_latencies
            .iter()
            .map(|(component, samples)| (component.clone(), LatencyStats::from_samples(samples)))
            .collect();

        let total_calls: u64 = self.component_calls.values().sum();
        let error_rate = if total_calls > 0 {
            self.total_errors as f64 / total_calls as f64
        } else {
            0.0
        };

        let unique_tasks = self.task_summaries.len() as u64;
        let unique_thoughts = self.unique_thoughts.len() as u64;
        let avg_thoughts_per_task = if unique_tasks > 0 {
            unique_thoughts as f64 / unique_tasks as f64
        } else {
            0.0
        };

        let task_time_stats = LatencyStats::from_samples(&task_processing_times);

        TraceSummary {
            id: summary_id(period.period_start),
            period_start: period.period_start,
            period_end: period.period_end,
            period_label: period.label.clone(),
            total_tasks_processed: unique_tasks,
            tasks_by_status: self.tasks_by_status,
            unique_task_ids: self.task_summaries.keys().cloned().collect(),
            task_summaries: self.task_summaries,
            total_thoughts_processed: unique_thoughts,
            thoughts_by_type: self.thoughts_by_type,
            avg_thoughts_per_task,
            component_calls: self.component_calls,
            component_failures: self.component_failures,
            component_latency_ms,
            dma_decisions: self.dma_decisions,
            guardrail_violations: self.guardrail_violations,
            handler_actions: self.handler_actions,
            avg_task_processing_time_ms: task_time_stats.avg,
            p50_task_processing_time_ms: task_time_stats.p50,
            p95_task_processing_time_ms: task_time_stats.p95,
            p99_task_processing_time_ms: task_time_stats.p99,
            total_processing_time_ms: task_processing_times.iter().sum(),
            total_errors: self.total_errors,
            errors_by_component: self.errors_by_component,
            error_rate,
            max_trace_depth,
            avg_trace_depth,
            source_span_count,
        }
    }
}

/// Consolidate a period's spans into a summary, without storing it.
///
/// An empty span list is not an error: it yields a zeroed summary, since
/// "no incidents" is itself a valid signal.
pub fn summarize(period: &ConsolidationPeriod, spans: &[SpanRecord]) -> TraceSummary {
    let mut accumulator = Accumulator::default();
    for span in spans {
        accumulator.observe(span);
    }
    accumulator.finish(period, spans.len() as u64)
}

/// Propose edges from a summary to its problematic tasks.
///
/// At most [`EDGE_CAP`] per relation, regardless of input size. Spans
/// without a task id propose no edge.
pub fn propose_edges(summary: &TraceSummary, spans: &[SpanRecord]) -> Vec<SummaryEdge> {
    let mut error_tasks: BTreeSet<&str> = BTreeSet::new();
    let mut slow_tasks: BTreeSet<&str> = BTreeSet::new();

    for span in spans {
        let Some(task_id) = &span.task_id else {
            continue;
        };
        if span.error {
            error_tasks.insert(task_id);
        }
        if span.latency_sample().is_some_and(|ms| ms > HIGH_LATENCY_THRESHOLD_MS) {
            slow_tasks.insert(task_id);
        }
    }

    let mut edges = Vec::new();
    for task_id in error_tasks.into_iter().take(EDGE_CAP) {
        edges.push(SummaryEdge {
            source_id: summary.id.clone(),
            target_id: task_id.to_string(),
            relation: EdgeRelation::ErrorTask,
            attributes: BTreeMap::from([
                ("task_id".to_string(), task_id.to_string()),
                ("error_type".to_string(), "trace_error".to_string()),
            ]),
        });
    }
    for task_id in slow_tasks.into_iter().take(EDGE_CAP) {
        edges.push(SummaryEdge {
            source_id: summary.id.clone(),
            target_id: task_id.to_string(),
            relation: EdgeRelation::HighLatencyTask,
            attributes: BTreeMap::from([
                ("task_id".to_string(), task_id.to_string()),
                ("latency_category".to_string(), "high".to_string()),
            ]),
        });
    }
    edges
}

/// Consolidates spans and writes the resulting summary through the store.
pub struct TraceConsolidator {
    store: Arc<dyn TelemetryStore>,
}

impl TraceConsolidator {
    /// New consolidator writing through `store`.
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Consolidate one period and persist the summary.
    ///
    /// The write is the single atomic step of the run: a storage failure
    /// aborts the period with [`ConsolidationError::WriteFailed`] and leaves
    /// no partial summary behind.
    pub async fn consolidate(
        &self,
        period: &ConsolidationPeriod,
        spans: &[SpanRecord],
    ) -> ConsolidationResult<TraceSummary> {
        if spans.is_empty() {
            debug!(period = %period.label, "no spans for period, creating empty summary");
        }

        let summary = summarize(period, spans);

        if let Err(err) = self.store.write_summary(&summary, period.level).await {
            error!(period = %period.label, error = %err, "summary write failed");
            return Err(ConsolidationError::WriteFailed {
                period_label: period.label.clone(),
                message: err.to_string(),
            });
        }

        info!(
            summary_id = %summary.id,
            period = %period.label,
            spans = spans.len(),
            tasks = summary.total_tasks_processed,
            errors = summary.total_errors,
            "period consolidated"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidation::period::ConsolidationLevel;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 10, 9, h, m, s).unwrap()
    }

    fn period() -> ConsolidationPeriod {
        ConsolidationPeriod::new(
            at(0, 0, 0),
            Utc.with_ymd_and_hms(2023, 10, 15, 23, 59, 59).unwrap(),
            "Week of 2023-10-09",
            ConsolidationLevel::Basic,
        )
        .unwrap()
    }

    #[test]
    fn test_latency_stats_percentile_indices() {
        let samples: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let stats = LatencyStats::from_samples(&samples);
        assert_eq!(stats.avg, 50.5);
        assert_eq!(stats.p50, 51.0);
        assert_eq!(stats.p95, 96.0);
        assert_eq!(stats.p99, 100.0);
    }

    #[test]
    fn test_latency_stats_empty_is_zero() {
        assert_eq!(LatencyStats::from_samples(&[]), LatencyStats::default());
    }

    #[test]
    fn test_summary_id_is_deterministic() {
        assert_eq!(summary_id(at(6, 0, 0)), "trace_summary_20231009_06");
        assert_eq!(summary_id(at(6, 30, 15)), "trace_summary_20231009_06");
    }

    #[test]
    fn test_empty_period_yields_zeroed_summary() {
        let summary = summarize(&period(), &[]);
        assert_eq!(summary.id, "trace_summary_20231009_00");
        assert_eq!(summary.total_tasks_processed, 0);
        assert_eq!(summary.total_errors, 0);
        assert_eq!(summary.error_rate, 0.0);
        assert_eq!(summary.avg_thoughts_per_task, 0.0);
        assert_eq!(summary.max_trace_depth, 0);
        assert_eq!(summary.source_span_count, 0);
        assert!(summary.task_summaries.is_empty());
    }

    #[test]
    fn test_task_accumulation_and_duration() {
        let spans = vec![
            SpanRecord::new("trace-1", "processor", at(1, 0, 0)).with_task("task-1"),
            SpanRecord::new("trace-2", "processor", at(1, 0, 30)).with_task("task-1"),
        ];
        let summary = summarize(&period(), &spans);

        let task = &summary.task_summaries["task-1"];
        assert_eq!(task.status, "processing");
        assert_eq!(task.trace_ids.len(), 2);
        assert_eq!(task.start_time, at(1, 0, 0));
        assert_eq!(task.end_time, at(1, 0, 30));
        assert_eq!(task.duration_ms, Some(30_000.0));
        assert_eq!(summary.total_tasks_processed, 1);
        assert_eq!(summary.avg_task_processing_time_ms, 30_000.0);
        assert_eq!(summary.total_processing_time_ms, 30_000.0);
    }

    #[test]
    fn test_handler_spans_append_thoughts_to_owning_task() {
        let spans = vec![
            SpanRecord::new("trace-1", COMPONENT_HANDLER, at(2, 0, 0))
                .with_task("task-1")
                .with_thought("thought-1")
                .with_tag(TAG_ACTION_TYPE, "speak")
                .with_tag(TAG_THOUGHT_TYPE, "standard"),
            SpanRecord::new("trace-1", COMPONENT_HANDLER, at(2, 0, 5))
                .with_task("task-1")
                .with_thought("thought-2")
                .with_tag(TAG_ACTION_TYPE, "memorize"),
            // Thought without a task: counted, but owned by no task list.
            SpanRecord::new("trace-1", COMPONENT_HANDLER, at(2, 0, 6)).with_thought("thought-3"),
        ];
        let summary = summarize(&period(), &spans);

        let task = &summary.task_summaries["task-1"];
        assert_eq!(task.thoughts.len(), 2);
        assert_eq!(task.thoughts[0].thought_id, "thought-1");
        assert_eq!(task.thoughts[0].handler, "speak");
        assert_eq!(task.handlers_selected, vec!["speak", "memorize"]);

        assert_eq!(summary.total_thoughts_processed, 3);
        assert_eq!(summary.thoughts_by_type["standard"], 1);
        assert_eq!(summary.thoughts_by_type["unknown"], 2);
        assert_eq!(summary.handler_actions["speak"], 1);
        assert_eq!(summary.handler_actions["memorize"], 1);
        assert_eq!(summary.max_trace_depth, 2);
        assert_eq!(summary.avg_trace_depth, 2.0);
    }

    #[test]
    fn test_task_status_marker_updates_task_and_counter() {
        let spans = vec![
            SpanRecord::new("trace-1", "processor", at(3, 0, 0)).with_task("task-1"),
            SpanRecord::new("trace-1", "processor", at(3, 1, 0))
                .with_task("task-1")
                .with_tag(TAG_TASK_STATUS, "completed"),
        ];
        let summary = summarize(&period(), &spans);
        assert_eq!(summary.task_summaries["task-1"].status, "completed");
        assert_eq!(summary.tasks_by_status["completed"], 1);
    }

    #[test]
    fn test_component_errors_and_error_rate() {
        let spans = vec![
            SpanRecord::new("t", "llm", at(4, 0, 0)),
            SpanRecord::new("t", "llm", at(4, 0, 1)).with_error(),
            SpanRecord::new("t", "processor", at(4, 0, 2)),
            SpanRecord::new("t", "processor", at(4, 0, 3)),
        ];
        let summary = summarize(&period(), &spans);
        assert_eq!(summary.component_calls["llm"], 2);
        assert_eq!(summary.component_calls["processor"], 2);
        assert_eq!(summary.component_failures["llm"], 1);
        assert_eq!(summary.errors_by_component.get("processor"), None);
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.error_rate, 0.25);
    }

    #[test]
    fn test_latency_prefers_latency_and_discards_zero_duration() {
        let spans = vec![
            SpanRecord::new("t", "llm", at(5, 0, 0))
                .with_duration_ms(10.0)
                .with_latency_ms(200.0),
            SpanRecord::new("t", "llm", at(5, 0, 1)).with_duration_ms(100.0),
            // Zero duration, no latency: contributes no sample.
            SpanRecord::new("t", "llm", at(5, 0, 2)),
        ];
        let summary = summarize(&period(), &spans);
        let stats = &summary.component_latency_ms["llm"];
        assert_eq!(stats.avg, 150.0);
        assert_eq!(summary.component_calls["llm"], 3);
    }

    #[test]
    fn test_guardrail_violations_require_literal_true() {
        let spans = vec![
            SpanRecord::new("t", COMPONENT_GUARDRAIL, at(6, 0, 0))
                .with_tag(TAG_GUARDRAIL_TYPE, "content_filter")
                .with_tag(TAG_VIOLATION, "true"),
            SpanRecord::new("t", COMPONENT_GUARDRAIL, at(6, 0, 1))
                .with_tag(TAG_GUARDRAIL_TYPE, "content_filter")
                .with_tag(TAG_VIOLATION, "yes"),
            SpanRecord::new("t", COMPONENT_GUARDRAIL, at(6, 0, 2))
                .with_tag(TAG_GUARDRAIL_TYPE, "rate_limit"),
        ];
        let summary = summarize(&period(), &spans);
        assert_eq!(summary.guardrail_violations["content_filter"], 1);
        assert_eq!(summary.guardrail_violations.get("rate_limit"), None);
    }

    #[test]
    fn test_dma_decisions_counted_by_type() {
        let spans = vec![
            SpanRecord::new("t", COMPONENT_DMA, at(7, 0, 0)).with_tag(TAG_DMA_TYPE, "ethical"),
            SpanRecord::new("t", COMPONENT_DMA, at(7, 0, 1)).with_tag(TAG_DMA_TYPE, "ethical"),
            SpanRecord::new("t", COMPONENT_DMA, at(7, 0, 2)),
        ];
        let summary = summarize(&period(), &spans);
        assert_eq!(summary.dma_decisions["ethical"], 2);
        assert_eq!(summary.dma_decisions["unknown"], 1);
    }

    #[test]
    fn test_idempotent_summaries_are_structurally_equal() {
        let spans = vec![
            SpanRecord {
                span_id: "span-1".to_string(),
                ..SpanRecord::new("trace-1", COMPONENT_HANDLER, at(8, 0, 0))
            }
            .with_task("task-1")
            .with_thought("thought-1")
            .with_tag(TAG_ACTION_TYPE, "speak"),
        ];
        let first = summarize(&period(), &spans);
        let second = summarize(&period(), &spans);
        assert_eq!(first.id, second.id);
        assert_eq!(first, second);
    }

    #[test]
    fn test_edge_cap_limits_error_tasks_to_ten() {
        let spans: Vec<SpanRecord> = (0..15)
            .map(|i| {
                SpanRecord::new("trace-1", "llm", at(9, 0, i))
                    .with_task(format!("task-{i:02}"))
                    .with_error()
            })
            .collect();
        let summary = summarize(&period(), &spans);
        let edges = propose_edges(&summary, &spans);

        let error_edges: Vec<_> = edges
            .iter()
            .filter(|e| e.relation == EdgeRelation::ErrorTask)
            .collect();
        assert_eq!(error_edges.len(), 10);
        assert!(error_edges.iter().all(|e| e.source_id == summary.id));
        assert_eq!(error_edges[0].target_id, "task-00");
    }

    #[test]
    fn test_high_latency_edges_use_threshold_and_skip_taskless_spans() {
        let spans = vec![
            SpanRecord::new("t", "llm", at(10, 0, 0))
                .with_task("slow-task")
                .with_latency_ms(6000.0),
            SpanRecord::new("t", "llm", at(10, 0, 1))
                .with_task("fast-task")
                .with_latency_ms(4000.0),
            // Exactly at the threshold: not flagged.
            SpanRecord::new("t", "llm", at(10, 0, 2))
                .with_task("boundary-task")
                .with_latency_ms(5000.0),
            // Slow but taskless: no edge target.
            SpanRecord::new("t", "llm", at(10, 0, 3)).with_latency_ms(9000.0),
        ];
        let summary = summarize(&period(), &spans);
        let edges = propose_edges(&summary, &spans);

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relation, EdgeRelation::HighLatencyTask);
        assert_eq!(edges[0].target_id, "slow-task");
        assert_eq!(edges[0].attributes["latency_category"], "high");
    }
}
