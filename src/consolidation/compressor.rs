//! Pluggable compression of summary payloads.
//!
//! The higher consolidation tiers bound storage growth by shrinking summary
//! bodies in place. Estimation and compression sit behind a trait so the
//! driver can be exercised against fakes and alternative strategies can be
//! swapped in.

use serde_json::Value;

use crate::storage::SummaryAttributes;

/// Result of compressing one summary payload.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    /// Reduced attributes, ready to be written back.
    pub attributes: SummaryAttributes,
    /// Fraction of serialized size removed, in [0, 1].
    pub reduction_ratio: f64,
}

/// Storage estimation and payload compression for the tier driver.
#[cfg_attr(test, mockall::automock)]
pub trait SummaryCompressor: Send + Sync {
    /// Estimated average daily storage of the given rows, in MB.
    fn estimate_daily_size_mb(&self, attributes: &[SummaryAttributes], days: u32) -> f64;

    /// Compress one summary's payload. Compression metadata is not stamped
    /// here - the driver stamps it once the storage update succeeds.
    fn compress(&self, attributes: &SummaryAttributes) -> CompressionOutcome;
}

/// Default compressor bounding per-task detail in the summary body.
///
/// Keeps the most recently finished tasks, truncates their thought and
/// handler lists, and drops the raw id lists. Period rollups and component
/// statistics survive untouched.
pub struct AttributeCompressor {
    max_tasks: usize,
    max_thoughts_per_task: usize,
}

impl AttributeCompressor {
    pub fn new(max_tasks: usize, max_thoughts_per_task: usize) -> Self {
        Self {
            max_tasks,
            max_thoughts_per_task,
        }
    }
}

impl Default for AttributeCompressor {
    fn default() -> Self {
        Self::new(20, 10)
    }
}

fn truncate_array(task: &mut Value, field: &str, limit: usize) {
    if let Some(entries) = task.get_mut(field).and_then(Value::as_array_mut) {
        entries.truncate(limit);
    }
}

impl SummaryCompressor for AttributeCompressor {
    fn estimate_daily_size_mb(&self, attributes: &[SummaryAttributes], days: u32) -> f64 {
        let total_bytes: usize = attributes.iter().map(SummaryAttributes::body_size_bytes).sum();
        total_bytes as f64 / (1024.0 * 1024.0) / days.max(1) as f64
    }

    fn compress(&self, attributes: &SummaryAttributes) -> CompressionOutcome {
        let before = attributes.body_size_bytes().max(1);
        let mut body = attributes.body.clone();

        if let Some(root) = body.as_object_mut() {
            root.remove("unique_task_ids");

            if let Some(tasks) = root.get_mut("task_summaries").and_then(Value::as_object_mut) {
                if tasks.len() > self.max_tasks {
                    let mut ranked: Vec<(String, String)> = tasks
                        .iter()
                        .map(|(task_id, task)| {
                            let end_time = task
                                .get("end_time")
                                .and_then(Value::as_str)
                                .unwrap_or_default();
                            (end_time.to_string(), task_id.clone())
                        })
                        .collect();
                    ranked.sort();
                    for (_, task_id) in ranked.iter().take(tasks.len() - self.max_tasks) {
                        tasks.remove(task_id);
                    }
                }

                for task in tasks.values_mut() {
                    if let Some(task_obj) = task.as_object_mut() {
                        task_obj.remove("trace_ids");
                    }
                    truncate_array(task, "thoughts", self.max_thoughts_per_task);
                    truncate_array(task, "handlers_selected", self.max_thoughts_per_task);
                }
            }
        }

        let mut compressed = attributes.clone();
        compressed.body = body;
        let after = compressed.body_size_bytes();
        let reduction_ratio = (1.0 - after as f64 / before as f64).clamp(0.0, 1.0);

        CompressionOutcome {
            attributes: compressed,
            reduction_ratio,
        }
    }
}
