//! Persistence seam.
//!
//! The traits are split by concern so that narrow consumers (the reset job in
//! particular) only depend on what they touch. `Store` bundles all of them
//! for the service layer.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::{DoseTakenRecord, Flag, NewReminder, ProfileRequest, Reminder, User};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates the user on first contact, otherwise refreshes the display
    /// attributes that were supplied.
    async fn upsert_user(&self, id: &str, profile: ProfileRequest) -> AppResult<User>;
    async fn find_user(&self, id: &str) -> AppResult<Option<User>>;
    async fn update_user(&self, id: &str, profile: ProfileRequest) -> AppResult<Option<User>>;
    /// Removes the user together with every reminder, dose and ledger row it owns.
    async fn delete_user(&self, id: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn insert_reminder(&self, user_id: &str, reminder: NewReminder) -> AppResult<Reminder>;
    async fn find_reminder(&self, id: i64) -> AppResult<Option<Reminder>>;
    async fn reminders_for_user(&self, user_id: &str) -> AppResult<Vec<Reminder>>;
    async fn delete_reminder(&self, id: i64) -> AppResult<bool>;
    async fn set_flag(&self, id: i64, flag: Flag) -> AppResult<bool>;
    /// Same-day counter path: one fewer dose remaining, TAKEN at zero.
    async fn record_dose_completed(&self, id: i64) -> AppResult<()>;
    /// Undo of `record_dose_completed`, capped at the dose count.
    async fn record_dose_reverted(&self, id: i64) -> AppResult<()>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns `false` when the (dose, date) row already existed.
    async fn insert_taken(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool>;
    /// Returns `false` when there was nothing to delete.
    async fn delete_taken(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool>;
    async fn taken_exists(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool>;
    async fn taken_dates(&self, dose_id: i64) -> AppResult<Vec<NaiveDate>>;
    async fn count_taken_for_user_on(&self, user_id: &str, date: NaiveDate) -> AppResult<i64>;
    async fn taken_for_user_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DoseTakenRecord>>;
}

#[async_trait]
pub trait CycleStore: Send + Sync {
    /// Resets every reminder in one atomic unit. Returns the number touched.
    async fn reset_all_cycles(&self) -> AppResult<u64>;
    async fn reminder_ids(&self) -> AppResult<Vec<i64>>;
    async fn reset_cycle(&self, id: i64) -> AppResult<()>;
}

pub trait Store: UserStore + ReminderStore + LedgerStore + CycleStore {}

impl<T> Store for T where T: UserStore + ReminderStore + LedgerStore + CycleStore {}
