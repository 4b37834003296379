//! Tiered consolidation driver.
//!
//! Tiers run strictly in dependency order: basic consolidates the most
//! recently completed raw window, extensive compacts the previous month's
//! basic summaries, and profound further compacts extensive output against
//! the daily storage budget. Nothing here runs concurrently - each tier
//! observes the previous tier's writes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ConsolidationConfig;
use crate::consolidation::compressor::SummaryCompressor;
use crate::consolidation::period::{
    self, ConsolidationLevel, ConsolidationPeriod,
};
use crate::consolidation::trace::{summary_id, TraceConsolidator};
use crate::error::ConsolidationResult;
use crate::storage::{SpanFilter, SummaryAttributes, SummaryFilter, SummaryRow, TelemetryStore};

/// Bookkeeping for one tier run.
#[derive(Debug, Clone, PartialEq)]
pub struct TierReport {
    pub level: ConsolidationLevel,
    /// Summaries created (basic) or examined (higher tiers).
    pub processed: u64,
    /// Rows whose compression update actually landed.
    pub compressed: u64,
    /// Sum of the landed rows' reduction ratios.
    pub reduction_ratio_sum: f64,
    /// Spans (basic) or summary rows (profound) removed by cleanup.
    pub deleted: u64,
}

impl TierReport {
    fn new(level: ConsolidationLevel) -> Self {
        Self {
            level,
            processed: 0,
            compressed: 0,
            reduction_ratio_sum: 0.0,
            deleted: 0,
        }
    }
}

/// Drives the basic, extensive, and profound consolidation tiers.
pub struct ConsolidationDriver {
    store: Arc<dyn TelemetryStore>,
    compressor: Arc<dyn SummaryCompressor>,
    consolidator: TraceConsolidator,
    clock: Arc<dyn Clock>,
    config: ConsolidationConfig,
}

impl ConsolidationDriver {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        compressor: Arc<dyn SummaryCompressor>,
        clock: Arc<dyn Clock>,
        config: ConsolidationConfig,
    ) -> Self {
        Self {
            consolidator: TraceConsolidator::new(Arc::clone(&store)),
            store,
            compressor,
            clock,
            config,
        }
    }

    /// Run every tier once, in dependency order.
    pub async fn run_all(&self) -> ConsolidationResult<Vec<TierReport>> {
        let basic = self.run_basic().await?;
        let extensive = self.run_extensive().await?;
        let profound = self.run_profound().await?;
        Ok(vec![basic, extensive, profound])
    }

    /// Consolidate the most recently completed raw window.
    ///
    /// A window whose summary already exists is skipped, keeping repeated
    /// runs idempotent. Raw spans are cleaned up afterwards, but never past
    /// the consolidated window's end - a span is only expendable once its
    /// window has a summary.
    pub async fn run_basic(&self) -> ConsolidationResult<TierReport> {
        let now = self.clock.now();
        let (window_start, window_end) = period::raw_window(now);
        let mut report = TierReport::new(ConsolidationLevel::Basic);

        let id = summary_id(window_start);
        let existing = self
            .store
            .query_summaries(&SummaryFilter::by_id(&id))
            .await?;

        if existing.is_empty() {
            let window = ConsolidationPeriod::new(
                window_start,
                window_end,
                period::window_label(window_start),
                ConsolidationLevel::Basic,
            )?;
            let spans = self
                .store
                .query_spans(&SpanFilter::between(window_start, window_end))
                .await?;
            self.consolidator.consolidate(&window, &spans).await?;
            report.processed = 1;
        } else {
            debug!(summary_id = %id, "raw window already consolidated, skipping");
        }

        let cutoff = period::retention_cutoff(now, self.config.raw_retention_hours)?
            .min(window_end);
        report.deleted = self
            .store
            .delete_spans(&SpanFilter::older_than(cutoff))
            .await?;
        if report.deleted > 0 {
            info!(deleted = report.deleted, cutoff = %cutoff, "raw span cleanup complete");
        }

        Ok(report)
    }

    /// Compact the previous month's basic summaries.
    ///
    /// Each row is compressed and re-stamped at the extensive level. A row
    /// only counts toward the compression totals when its storage update
    /// reports at least one affected row.
    pub async fn run_extensive(&self) -> ConsolidationResult<TierReport> {
        let now = self.clock.now();
        let (month_start, month_end) = period::month_period(now);
        let mut report = TierReport::new(ConsolidationLevel::Extensive);

        let rows = self
            .store
            .query_summaries(
                &SummaryFilter::by_level(ConsolidationLevel::Basic)
                    .within(month_start, month_end),
            )
            .await?;
        report.processed = rows.len() as u64;
        if rows.is_empty() {
            debug!(month = %period::month_label(month_start), "no basic summaries to compact");
            return Ok(report);
        }

        let attributes: Vec<SummaryAttributes> =
            rows.iter().map(|row| row.attributes.clone()).collect();
        let days = days_in_period(month_start, month_end);
        let daily_mb = self.compressor.estimate_daily_size_mb(&attributes, days);
        info!(
            month = %period::month_label(month_start),
            summaries = rows.len(),
            daily_mb = format!("{daily_mb:.3}"),
            "starting extensive consolidation"
        );

        for row in rows {
            self.compress_row(row, ConsolidationLevel::Extensive, now, &mut report)
                .await;
        }

        info!(
            compressed = report.compressed,
            processed = report.processed,
            "extensive consolidation complete"
        );
        Ok(report)
    }

    /// Compact the previous month's extensive output against the storage
    /// budget.
    ///
    /// Skipped entirely while the estimated daily size meets the configured
    /// budget. Basic-tier leftovers older than the compacted month are
    /// deleted only after at least one compression update has landed.
    pub async fn run_profound(&self) -> ConsolidationResult<TierReport> {
        let now = self.clock.now();
        let (month_start, month_end) = period::month_period(now);
        let mut report = TierReport::new(ConsolidationLevel::Profound);

        let rows = self
            .store
            .query_summaries(
                &SummaryFilter::by_level(ConsolidationLevel::Extensive)
                    .within(month_start, month_end),
            )
            .await?;
        report.processed = rows.len() as u64;
        if rows.is_empty() {
            return Ok(report);
        }

        let attributes: Vec<SummaryAttributes> =
            rows.iter().map(|row| row.attributes.clone()).collect();
        let days = days_in_period(month_start, month_end);
        let daily_mb = self.compressor.estimate_daily_size_mb(&attributes, days);

        if daily_mb <= self.config.profound_target_mb_per_day {
            info!(
                daily_mb = format!("{daily_mb:.3}"),
                target_mb = self.config.profound_target_mb_per_day,
                "storage within budget, skipping profound compression"
            );
            return Ok(report);
        }

        info!(
            daily_mb = format!("{daily_mb:.3}"),
            target_mb = self.config.profound_target_mb_per_day,
            summaries = rows.len(),
            "starting profound consolidation"
        );

        for row in rows {
            self.compress_row(row, ConsolidationLevel::Profound, now, &mut report)
                .await;
        }

        if report.compressed > 0 {
            report.deleted = self
                .store
                .delete_summaries(
                    &SummaryFilter::by_level(ConsolidationLevel::Basic)
                        .ended_before(month_start),
                )
                .await?;
            if report.deleted > 0 {
                info!(deleted = report.deleted, "stale basic summaries removed");
            }
        }

        Ok(report)
    }

    /// Compress one row and stamp it at the target level.
    ///
    /// The stamp exists only in the updated row: an update that affects zero
    /// rows, or fails outright, leaves the row uncounted and unstamped.
    async fn compress_row(
        &self,
        row: SummaryRow,
        target: ConsolidationLevel,
        now: DateTime<Utc>,
        report: &mut TierReport,
    ) {
        let outcome = self.compressor.compress(&row.attributes);
        let mut attributes = outcome.attributes;
        attributes.consolidation_level = target;
        attributes.compressed = true;
        attributes.compression_date = Some(now);
        attributes.compression_ratio = Some(outcome.reduction_ratio);

        match self.store.update_summary(&row.id, &attributes).await {
            Ok(affected) if affected > 0 => {
                report.compressed += 1;
                report.reduction_ratio_sum += outcome.reduction_ratio;
            }
            Ok(_) => {
                warn!(summary_id = %row.id, "compression update affected no rows, excluded");
            }
            Err(err) => {
                warn!(summary_id = %row.id, error = %err, "compression update failed, excluded");
            }
        }
    }
}

fn days_in_period(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    ((end.date_naive() - start.date_naive()).num_days() + 1).max(1) as u32
}
