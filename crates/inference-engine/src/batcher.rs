//! Batch Scoring
//!
//! Rows are independent, so the batch is split into contiguous slices scored
//! on scoped worker threads. Results keep input order and failures stay
//! confined to their row.

use crate::bundle::ModelBundle;
use crate::engine::RiskAssessment;
use crate::InferenceError;
use feature_engine::FeatureRow;
use risk_classifier::TierDistribution;
use serde::Serialize;
use std::thread;
use tracing::{debug, info, warn};

/// Below this many rows the batch is scored on the calling thread
const MIN_PARALLEL_ROWS: usize = 512;

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub scored: usize,
    pub failed: usize,
    pub distribution: TierDistribution,
}

/// Per-row results in input order plus the summary
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub results: Vec<Result<RiskAssessment, InferenceError>>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    /// Row indices and errors of failed rows
    pub fn failures(&self) -> impl Iterator<Item = (usize, &InferenceError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(idx, r)| r.as_ref().err().map(|e| (idx, e)))
    }
}

/// Batch scorer over a loaded model bundle
pub struct BatchScorer<'a> {
    bundle: &'a ModelBundle,
    workers: usize,
}

impl<'a> BatchScorer<'a> {
    /// Create a batch scorer using all available cores
    pub fn new(bundle: &'a ModelBundle) -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self { bundle, workers }
    }

    /// Limit the number of worker threads (at least one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Score every row
    pub fn score(&self, rows: &[FeatureRow]) -> BatchOutcome {
        info!("Scoring batch of {} rows", rows.len());

        let results = if self.workers == 1 || rows.len() < MIN_PARALLEL_ROWS {
            rows.iter().map(|row| self.bundle.assess_row(row)).collect()
        } else {
            self.score_parallel(rows)
        };

        let summary = summarize(&results);
        metrics::counter!("pm_risk_batch_rows_total").increment(rows.len() as u64);

        for (idx, err) in results
            .iter()
            .enumerate()
            .filter_map(|(idx, r)| r.as_ref().err().map(|e| (idx, e)))
        {
            warn!("Row {} could not be scored: {}", idx, err);
        }
        info!(
            "Batch done: {} scored, {} failed ({})",
            summary.scored, summary.failed, summary.distribution
        );

        BatchOutcome { results, summary }
    }

    fn score_parallel(&self, rows: &[FeatureRow]) -> Vec<Result<RiskAssessment, InferenceError>> {
        let slice_len = rows.len().div_ceil(self.workers);
        debug!(
            "Scoring {} rows on {} workers ({} rows each)",
            rows.len(),
            self.workers,
            slice_len
        );

        let bundle = self.bundle;
        thread::scope(|s| {
            let handles: Vec<_> = rows
                .chunks(slice_len)
                .map(|slice| {
                    s.spawn(move || {
                        slice
                            .iter()
                            .map(|row| bundle.assess_row(row))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let mut results = Vec::with_capacity(rows.len());
            for handle in handles {
                match handle.join() {
                    Ok(slice_results) => results.extend(slice_results),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            results
        })
    }
}

fn summarize(results: &[Result<RiskAssessment, InferenceError>]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: results.len(),
        ..Default::default()
    };
    for result in results {
        match result {
            Ok(assessment) => {
                summary.scored += 1;
                summary.distribution.record(assessment.risk_label);
            }
            Err(_) => summary.failed += 1,
        }
    }
    summary
}
