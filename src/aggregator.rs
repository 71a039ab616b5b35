use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::ledger::DoseLedger;
use crate::models::{
    DailySummary, DoseDayStatus, DoseForDate, Reminder, ReminderDayStatus, ReminderForDate,
};
use crate::recurrence;
use crate::store::Store;

/// Longest span, in days, a single range summary may cover.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn adherence_percentage(taken: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(taken as f64 / total as f64 * 100.0)
}

/// Builds one day's summary from already-fetched reminders and the set of
/// (dose_id, date) pairs recorded as taken.
pub fn summarize_day(
    reminders: &[Reminder],
    taken: &HashSet<(i64, NaiveDate)>,
    date: NaiveDate,
) -> DailySummary {
    let mut reminder_statuses = Vec::new();
    let mut total_doses = 0;
    let mut doses_taken = 0;

    for reminder in reminders.iter().filter(|r| recurrence::is_applicable(r, date)) {
        let dose_statuses: Vec<DoseDayStatus> = reminder
            .doses
            .iter()
            .map(|dose| DoseDayStatus {
                dose_id: dose.id,
                dose_time: dose.dose_time.format("%H:%M:%S").to_string(),
                taken: taken.contains(&(dose.id, date)),
            })
            .collect();
        let reminder_taken = dose_statuses.iter().filter(|d| d.taken).count();

        total_doses += dose_statuses.len();
        doses_taken += reminder_taken;

        reminder_statuses.push(ReminderDayStatus {
            reminder_id: reminder.id,
            reminder_name: reminder.name.clone(),
            total_doses: dose_statuses.len(),
            doses_taken: reminder_taken,
            dose_statuses,
        });
    }

    DailySummary {
        date,
        total_reminders: reminder_statuses.len(),
        total_doses,
        doses_taken,
        doses_missed: total_doses - doses_taken,
        adherence_percentage: adherence_percentage(doses_taken, total_doses),
        reminder_statuses,
    }
}

#[derive(Clone)]
pub struct ReminderAggregator {
    store: Arc<dyn Store>,
    ledger: DoseLedger,
}

impl ReminderAggregator {
    pub fn new(store: Arc<dyn Store>, ledger: DoseLedger) -> Self {
        Self { store, ledger }
    }

    async fn taken_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<HashSet<(i64, NaiveDate)>> {
        Ok(self
            .ledger
            .records_for_user_in_range(user_id, start, end)
            .await?
            .into_iter()
            .map(|r| (r.dose_id, r.date))
            .collect())
    }

    pub async fn daily_summary(&self, user_id: &str, date: NaiveDate) -> AppResult<DailySummary> {
        let reminders = self.store.reminders_for_user(user_id).await?;
        let taken = self.taken_between(user_id, date, date).await?;
        Ok(summarize_day(&reminders, &taken, date))
    }

    /// One summary per day in `[start, end]`, ascending.
    pub async fn range_summary(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DailySummary>> {
        if start > end {
            return Err(AppError::InvalidArgument(format!(
                "start date {start} is after end date {end}"
            )));
        }
        if (end - start).num_days() + 1 > MAX_RANGE_DAYS {
            return Err(AppError::InvalidArgument(format!(
                "date range may cover at most {MAX_RANGE_DAYS} days"
            )));
        }

        let reminders = self.store.reminders_for_user(user_id).await?;
        let taken = self.taken_between(user_id, start, end).await?;

        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| summarize_day(&reminders, &taken, date))
            .collect())
    }

    pub async fn fetch_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<Vec<ReminderForDate>> {
        let reminders = self.store.reminders_for_user(user_id).await?;
        let mut out = Vec::new();

        for reminder in reminders
            .into_iter()
            .filter(|r| recurrence::is_applicable(r, date))
        {
            let mut doses = Vec::with_capacity(reminder.doses.len());
            for dose in &reminder.doses {
                let history = self.ledger.history_of(dose.id).await?;
                doses.push(DoseForDate {
                    id: dose.id,
                    dose_time: dose.dose_time,
                    taken: history.contains(&date),
                    history,
                });
            }

            out.push(ReminderForDate {
                id: reminder.id,
                name: reminder.name,
                photo: reminder.photo,
                reminder_type: reminder.reminder_type,
                category: reminder.category,
                frequency: reminder.frequency,
                days: reminder.days,
                start_date_time: reminder.start_date_time,
                end_date_time: reminder.end_date_time,
                notes: reminder.notes,
                flag: reminder.flag,
                status: reminder.status,
                remaining_doses: reminder.remaining_doses,
                date,
                doses,
            });
        }

        Ok(out)
    }
}
