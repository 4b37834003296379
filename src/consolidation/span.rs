//! Raw trace spans as consumed by the consolidator.
//!
//! Spans are produced by the tracing layer and read here without ever being
//! mutated. Tag access goes through the helpers below so missing or
//! malformed tags degrade to defaults instead of failing a run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag key carrying a thought's type.
pub const TAG_THOUGHT_TYPE: &str = "thought_type";

/// Tag key carrying a handler's selected action.
pub const TAG_ACTION_TYPE: &str = "action_type";

/// Tag key carrying an explicit task-status marker.
pub const TAG_TASK_STATUS: &str = "task_status";

/// Tag key naming the guardrail a span belongs to.
pub const TAG_GUARDRAIL_TYPE: &str = "guardrail_type";

/// Tag key marking a guardrail violation.
pub const TAG_VIOLATION: &str = "violation";

/// Tag key naming a decision-maker's decision type.
pub const TAG_DMA_TYPE: &str = "dma_type";

/// One raw trace span for a single component call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    /// Trace this span belongs to.
    pub trace_id: String,
    /// Unique span identifier.
    pub span_id: String,
    /// Task the span was recorded against, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Thought the span was recorded against, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought_id: Option<String>,
    /// Component that produced the span ("handler", "guardrail", "dma", ...).
    pub component_type: String,
    /// Free-form tags attached by the tracing layer.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// When the span was recorded.
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration of the call.
    pub duration_ms: f64,
    /// Measured latency, preferred over duration when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    /// Whether the call errored.
    pub error: bool,
}

impl SpanRecord {
    /// New span with a fresh id, no task or thought linkage, and no tags.
    pub fn new(
        trace_id: impl Into<String>,
        component_type: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: Uuid::new_v4().to_string(),
            task_id: None,
            thought_id: None,
            component_type: component_type.into(),
            tags: BTreeMap::new(),
            timestamp,
            duration_ms: 0.0,
            latency_ms: None,
            error: false,
        }
    }

    /// Attach the span to a task.
    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Attach the span to a thought.
    pub fn with_thought(mut self, thought_id: impl Into<String>) -> Self {
        self.thought_id = Some(thought_id.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Set the duration.
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Set the measured latency.
    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Mark the span as errored.
    pub fn with_error(mut self) -> Self {
        self.error = true;
        self
    }

    /// Tag value, if present and non-empty.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Tag value with a default for absent or empty tags.
    pub fn tag_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.tag(key).unwrap_or(default)
    }

    /// Whether a tag literally equals `value`.
    pub fn tag_is(&self, key: &str, value: &str) -> bool {
        self.tags.get(key).map(String::as_str) == Some(value)
    }

    /// The latency sample this span contributes, if any.
    ///
    /// `latency_ms` when present, else a strictly positive `duration_ms`.
    /// Zero-duration spans contribute nothing.
    pub fn latency_sample(&self) -> Option<f64> {
        match self.latency_ms {
            Some(latency) => Some(latency),
            None if self.duration_ms > 0.0 => Some(self.duration_ms),
            None => None,
        }
    }
}
