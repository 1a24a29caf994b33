//! Backfill of derived milestone and phase fields on historical roasts

use std::sync::Arc;

use serde::Serialize;
use shared::pipeline::{milestones, phases};
use shared::DerivedFields;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{RoastStore, StoredSeries};

/// One roast the backfill could not update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackfillItemError {
    pub roast_id: Uuid,
    pub message: String,
}

/// Summary of a backfill run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    pub scanned: usize,
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<BackfillItemError>,
}

/// Re-derives milestone times and phases from stored log rows
#[derive(Clone)]
pub struct BackfillService {
    store: Arc<dyn RoastStore>,
    batch_size: i64,
}

impl BackfillService {
    pub fn new(store: Arc<dyn RoastStore>, batch_size: i64) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Fill derived fields of every profile that lacks them.
    ///
    /// Items are processed one at a time; a failing item is recorded and the
    /// run continues. Updated profiles stop being candidates, so a second
    /// run only revisits the failures.
    pub async fn backfill_null_milestones(&self) -> AppResult<BackfillReport> {
        let mut report = BackfillReport::default();
        let mut after = None;

        loop {
            let batch = self
                .store
                .find_backfill_candidates(after, self.batch_size)
                .await?;
            let Some(last) = batch.last().copied() else {
                break;
            };
            after = Some(last);

            for roast_id in batch {
                report.scanned += 1;
                match self.backfill_one(roast_id).await {
                    Ok(()) => report.updated += 1,
                    Err(e) => {
                        tracing::warn!(%roast_id, "Backfill failed: {}", e);
                        report.failed += 1;
                        report.errors.push(BackfillItemError {
                            roast_id,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            updated = report.updated,
            failed = report.failed,
            "Backfill finished"
        );
        Ok(report)
    }

    async fn backfill_one(&self, roast_id: Uuid) -> AppResult<()> {
        let series = self.store.load_series(roast_id).await?;
        let derived = derive(&series)?;
        self.store.update_derived_fields(roast_id, &derived).await
    }
}

/// Resolve milestones and phases from a stored series.
///
/// Point flags on log rows win; the stored indices are used when no flag is
/// set. Malformed milestones are kept as resolved.
pub fn derive(series: &StoredSeries) -> AppResult<DerivedFields> {
    if series.samples.is_empty() {
        return Err(AppError::Internal(
            "no temperature log rows to resolve milestones against".to_string(),
        ));
    }

    let timex = series.timex();
    let from_flags = milestones::indices_from_flags(series.samples.iter().map(|s| s.flags));
    let indices = if from_flags.is_empty() {
        series.milestone_indices
    } else {
        from_flags
    };

    let (resolved, malformed) = milestones::resolve_lenient(&timex, &indices);
    if let Some(malformed) = malformed {
        tracing::warn!("Backfilling with malformed milestones: {}", malformed);
    }

    Ok(DerivedFields {
        milestones: resolved,
        phases: phases::compute_from_series(&resolved, &timex),
    })
}
