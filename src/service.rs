use std::sync::Arc;

use chrono::{Local, NaiveDate, Weekday};

use crate::aggregator::ReminderAggregator;
use crate::error::{AppError, AppResult};
use crate::ledger::DoseLedger;
use crate::models::{
    CreateReminderRequest, DailySummary, Flag, Frequency, NewReminder, ProfileRequest, Reminder,
    ReminderFilter, ReminderForDate, Status, User,
};
use crate::recurrence;
use crate::store::Store;

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Checks a create request and normalises it into a `NewReminder`.
pub fn validate_new_reminder(req: CreateReminderRequest) -> AppResult<NewReminder> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::InvalidArgument("Reminder name is required".into()));
    }
    if req.doses.is_empty() {
        return Err(AppError::InvalidArgument(
            "At least one dose time is required".into(),
        ));
    }
    if let Some(end) = req.end_date_time {
        if end < req.start_date_time {
            return Err(AppError::InvalidArgument(
                "End date cannot be before start date".into(),
            ));
        }
    }

    let frequency = Frequency::from(req.frequency);
    let days = match &frequency {
        Frequency::Custom => {
            let days = normalize_days(&req.days)?;
            if days.is_empty() {
                return Err(AppError::InvalidArgument(
                    "Custom frequency requires specifying days".into(),
                ));
            }
            days
        }
        Frequency::Daily | Frequency::AlternateDays => {
            if req.days.iter().any(|d| !d.trim().is_empty()) {
                return Err(AppError::InvalidArgument(
                    "Days can only be specified for custom frequency".into(),
                ));
            }
            vec![]
        }
        Frequency::Other(other) => {
            return Err(AppError::InvalidArgument(format!(
                "unknown frequency: {other}"
            )));
        }
    };

    let mut dose_times = req.doses;
    dose_times.sort();

    Ok(NewReminder {
        name,
        photo: req.photo,
        reminder_type: req.reminder_type,
        category: req.category,
        frequency,
        days,
        start_date_time: req.start_date_time,
        end_date_time: req.end_date_time,
        notes: req.notes,
        dose_times,
    })
}

/// Upper-case full weekday names, duplicates dropped, input order kept.
fn normalize_days(days: &[String]) -> AppResult<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for raw in days.iter().map(|d| d.trim()).filter(|d| !d.is_empty()) {
        let day: Weekday = raw
            .parse()
            .map_err(|_| AppError::InvalidArgument(format!("unknown weekday: {raw}")))?;
        let name = recurrence::weekday_name(day).to_string();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    Ok(out)
}

/// Operations exposed to the HTTP layer. Every call is scoped to the
/// authenticated user id handed in by the caller.
#[derive(Clone)]
pub struct ReminderService {
    store: Arc<dyn Store>,
    ledger: DoseLedger,
    aggregator: ReminderAggregator,
    today: fn() -> NaiveDate,
}

impl ReminderService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let ledger = DoseLedger::new(store.clone());
        let aggregator = ReminderAggregator::new(store.clone(), ledger.clone());
        Self {
            store,
            ledger,
            aggregator,
            today: local_today,
        }
    }

    /// Overrides the source of "today" used by the counter projection.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn ledger(&self) -> &DoseLedger {
        &self.ledger
    }

    // --- Users ---

    pub async fn login(&self, user_id: &str, profile: ProfileRequest) -> AppResult<User> {
        let user = self.store.upsert_user(user_id, profile).await?;
        tracing::info!("👤 User {} logged in", user.id);
        Ok(user)
    }

    pub async fn fetch_user(&self, user_id: &str) -> AppResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with id: {user_id}")))
    }

    pub async fn update_user(&self, user_id: &str, profile: ProfileRequest) -> AppResult<User> {
        self.store
            .update_user(user_id, profile)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with id: {user_id}")))
    }

    pub async fn delete_user(&self, user_id: &str) -> AppResult<()> {
        if !self.store.delete_user(user_id).await? {
            return Err(AppError::NotFound(format!(
                "User not found with id: {user_id}"
            )));
        }
        tracing::info!("🗑️ User {} deleted", user_id);
        Ok(())
    }

    // --- Reminders ---

    async fn owned_reminder(&self, user_id: &str, reminder_id: i64) -> AppResult<Reminder> {
        let reminder = self
            .store
            .find_reminder(reminder_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reminder not found: {reminder_id}")))?;

        if reminder.user_id != user_id {
            return Err(AppError::Unauthorized(
                "This reminder does not belong to the user".into(),
            ));
        }
        Ok(reminder)
    }

    pub async fn create_reminder(
        &self,
        user_id: &str,
        req: CreateReminderRequest,
    ) -> AppResult<Reminder> {
        let new = validate_new_reminder(req)?;
        self.fetch_user(user_id).await?;

        let reminder = self.store.insert_reminder(user_id, new).await?;
        tracing::info!(
            "💊 Reminder {} created for {} with {} doses",
            reminder.id,
            user_id,
            reminder.doses.len()
        );
        Ok(reminder)
    }

    pub async fn fetch_reminders(&self, user_id: &str) -> AppResult<Vec<Reminder>> {
        self.store.reminders_for_user(user_id).await
    }

    pub async fn fetch_reminder(&self, user_id: &str, reminder_id: i64) -> AppResult<Reminder> {
        self.owned_reminder(user_id, reminder_id).await
    }

    /// Filters by flag and status when given. A frequency additionally keeps
    /// only reminders of that frequency that are due today.
    pub async fn fetch_filtered(
        &self,
        user_id: &str,
        filter: ReminderFilter,
    ) -> AppResult<Vec<Reminder>> {
        let flag = filter.flag.as_deref().map(str::parse::<Flag>).transpose()?;
        let status = filter
            .status
            .as_deref()
            .map(str::parse::<Status>)
            .transpose()?;
        let frequency = match filter.frequency {
            Some(f) => match Frequency::from(f) {
                Frequency::Other(other) => {
                    return Err(AppError::InvalidArgument(format!(
                        "unknown frequency: {other}"
                    )))
                }
                known => Some(known),
            },
            None => None,
        };
        let today = (self.today)();

        Ok(self
            .store
            .reminders_for_user(user_id)
            .await?
            .into_iter()
            .filter(|r| flag.map_or(true, |f| r.flag == f))
            .filter(|r| status.map_or(true, |s| r.status == s))
            .filter(|r| match &frequency {
                Some(f) => r.frequency == *f && recurrence::is_applicable(r, today),
                None => true,
            })
            .collect())
    }

    pub async fn set_flag(&self, user_id: &str, reminder_id: i64, flag: Flag) -> AppResult<Reminder> {
        self.owned_reminder(user_id, reminder_id).await?;
        self.store.set_flag(reminder_id, flag).await?;
        self.owned_reminder(user_id, reminder_id).await
    }

    pub async fn delete_reminder(&self, user_id: &str, reminder_id: i64) -> AppResult<()> {
        self.owned_reminder(user_id, reminder_id).await?;
        self.store.delete_reminder(reminder_id).await?;
        tracing::info!("🗑️ Reminder {} deleted by {}", reminder_id, user_id);
        Ok(())
    }

    // --- Ledger ---

    async fn owned_dose(&self, user_id: &str, reminder_id: i64, dose_id: i64) -> AppResult<Reminder> {
        let reminder = self.owned_reminder(user_id, reminder_id).await?;
        if reminder.dose(dose_id).is_none() {
            return Err(AppError::NotFound(format!(
                "Dose {dose_id} not found in reminder {reminder_id}"
            )));
        }
        Ok(reminder)
    }

    /// The counter tracks today's scheduled doses only.
    fn counts_toward_today(&self, reminder: &Reminder, date: NaiveDate) -> bool {
        let today = (self.today)();
        date == today && recurrence::is_applicable(reminder, today)
    }

    pub async fn mark_dose_taken(
        &self,
        user_id: &str,
        reminder_id: i64,
        dose_id: i64,
        date: NaiveDate,
    ) -> AppResult<()> {
        let reminder = self.owned_dose(user_id, reminder_id, dose_id).await?;

        let created = self.ledger.mark_taken(dose_id, date).await?;
        if created && self.counts_toward_today(&reminder, date) {
            self.store.record_dose_completed(reminder_id).await?;
        }
        Ok(())
    }

    pub async fn mark_dose_not_taken(
        &self,
        user_id: &str,
        reminder_id: i64,
        dose_id: i64,
        date: NaiveDate,
    ) -> AppResult<()> {
        let reminder = self.owned_dose(user_id, reminder_id, dose_id).await?;

        let removed = self.ledger.mark_not_taken(dose_id, date).await?;
        if removed && self.counts_toward_today(&reminder, date) {
            self.store.record_dose_reverted(reminder_id).await?;
        }
        Ok(())
    }

    pub async fn dose_history(
        &self,
        user_id: &str,
        reminder_id: i64,
        dose_id: i64,
    ) -> AppResult<Vec<NaiveDate>> {
        self.owned_dose(user_id, reminder_id, dose_id).await?;
        self.ledger.history_of(dose_id).await
    }

    pub async fn taken_count(&self, user_id: &str, date: NaiveDate) -> AppResult<i64> {
        self.ledger.taken_count_for_user_on(user_id, date).await
    }

    // --- Summaries ---

    pub async fn fetch_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<Vec<ReminderForDate>> {
        self.aggregator.fetch_for_date(user_id, date).await
    }

    pub async fn daily_summary(&self, user_id: &str, date: NaiveDate) -> AppResult<DailySummary> {
        self.aggregator.daily_summary(user_id, date).await
    }

    pub async fn range_summary(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DailySummary>> {
        self.aggregator.range_summary(user_id, start, end).await
    }
}
