//! Date-keyed record of completed doses.
//!
//! This is the system of record for adherence history. It never touches the
//! per-reminder `remaining_doses`/`status` projection.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::models::DoseTakenRecord;
use crate::store::Store;

#[derive(Clone)]
pub struct DoseLedger {
    store: Arc<dyn Store>,
}

impl DoseLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Records the dose as taken on `date`. Returns `true` only when a new
    /// record was written; repeating the call is a no-op.
    pub async fn mark_taken(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool> {
        let created = self.store.insert_taken(dose_id, date).await?;
        if created {
            tracing::debug!(dose_id, %date, "dose marked taken");
        }
        Ok(created)
    }

    /// Removes the record if present. Returns `true` only when one was removed.
    pub async fn mark_not_taken(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool> {
        let removed = self.store.delete_taken(dose_id, date).await?;
        if removed {
            tracing::debug!(dose_id, %date, "dose marked not taken");
        }
        Ok(removed)
    }

    pub async fn is_taken(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool> {
        self.store.taken_exists(dose_id, date).await
    }

    pub async fn history_of(&self, dose_id: i64) -> AppResult<Vec<NaiveDate>> {
        self.store.taken_dates(dose_id).await
    }

    pub async fn taken_count_for_user_on(&self, user_id: &str, date: NaiveDate) -> AppResult<i64> {
        self.store.count_taken_for_user_on(user_id, date).await
    }

    pub async fn records_for_user_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DoseTakenRecord>> {
        if start > end {
            return Err(AppError::InvalidArgument(format!(
                "start date {start} is after end date {end}"
            )));
        }
        self.store.taken_for_user_between(user_id, start, end).await
    }
}
