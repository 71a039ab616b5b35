use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{CycleStore, LedgerStore, ReminderStore, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Dose, DoseTakenRecord, Flag, NewReminder, ProfileRequest, Reminder, Status, User,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, User>,
    reminders: BTreeMap<i64, Reminder>,
    /// (dose_id, date) -> record id
    taken: BTreeMap<(i64, NaiveDate), i64>,
    next_reminder_id: i64,
    next_dose_id: i64,
    next_record_id: i64,
}

impl Tables {
    fn dose_owner(&self, dose_id: i64) -> Option<&Reminder> {
        self.reminders
            .values()
            .find(|r| r.doses.iter().any(|d| d.id == dose_id))
    }

    fn dose_ids_of_user(&self, user_id: &str) -> BTreeSet<i64> {
        self.reminders
            .values()
            .filter(|r| r.user_id == user_id)
            .flat_map(|r| r.doses.iter().map(|d| d.id))
            .collect()
    }

    fn drop_ledger_rows(&mut self, dose_ids: &BTreeSet<i64>) {
        self.taken.retain(|(dose_id, _), _| !dose_ids.contains(dose_id));
    }
}

/// In-process store used by the test suite and `STORE_BACKEND=memory`.
///
/// All tables sit behind one lock, so every operation observes a consistent
/// snapshot and the (dose, date) uniqueness holds under concurrent writers.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(&self, id: &str, profile: ProfileRequest) -> AppResult<User> {
        let mut t = self.tables.write().await;

        if let Some(email) = profile.email.as_deref() {
            let taken_by_other = t
                .users
                .values()
                .any(|u| u.id != id && u.email.as_deref() == Some(email));
            if taken_by_other {
                return Err(AppError::Conflict("Data integrity violation".into()));
            }
        }

        let user = t.users.entry(id.to_string()).or_insert_with(|| User {
            id: id.to_string(),
            name: None,
            email: None,
            photo_url: None,
        });
        if profile.name.is_some() {
            user.name = profile.name;
        }
        if profile.email.is_some() {
            user.email = profile.email;
        }
        if profile.photo_url.is_some() {
            user.photo_url = profile.photo_url;
        }
        Ok(user.clone())
    }

    async fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn update_user(&self, id: &str, profile: ProfileRequest) -> AppResult<Option<User>> {
        let mut t = self.tables.write().await;
        let Some(user) = t.users.get_mut(id) else {
            return Ok(None);
        };
        user.name = profile.name;
        user.photo_url = profile.photo_url;
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: &str) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        if t.users.remove(id).is_none() {
            return Ok(false);
        }
        let dose_ids = t.dose_ids_of_user(id);
        t.drop_ledger_rows(&dose_ids);
        t.reminders.retain(|_, r| r.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn insert_reminder(&self, user_id: &str, new: NewReminder) -> AppResult<Reminder> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(user_id) {
            return Err(AppError::NotFound("User not found".into()));
        }

        t.next_reminder_id += 1;
        let id = t.next_reminder_id;

        let mut doses = Vec::with_capacity(new.dose_times.len());
        for dose_time in new.dose_times {
            t.next_dose_id += 1;
            doses.push(Dose {
                id: t.next_dose_id,
                reminder_id: id,
                dose_time,
            });
        }

        let reminder = Reminder {
            id,
            user_id: user_id.to_string(),
            name: new.name,
            photo: new.photo,
            reminder_type: new.reminder_type,
            category: new.category,
            frequency: new.frequency,
            days: new.days,
            start_date_time: new.start_date_time,
            end_date_time: new.end_date_time,
            notes: new.notes,
            flag: Flag::Active,
            status: Status::NotTaken,
            remaining_doses: doses.len() as i32,
            doses,
        };
        t.reminders.insert(id, reminder.clone());
        Ok(reminder)
    }

    async fn find_reminder(&self, id: i64) -> AppResult<Option<Reminder>> {
        Ok(self.tables.read().await.reminders.get(&id).cloned())
    }

    async fn reminders_for_user(&self, user_id: &str) -> AppResult<Vec<Reminder>> {
        Ok(self
            .tables
            .read()
            .await
            .reminders
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_reminder(&self, id: i64) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        let Some(reminder) = t.reminders.remove(&id) else {
            return Ok(false);
        };
        let dose_ids: BTreeSet<i64> = reminder.doses.iter().map(|d| d.id).collect();
        t.drop_ledger_rows(&dose_ids);
        Ok(true)
    }

    async fn set_flag(&self, id: i64, flag: Flag) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        match t.reminders.get_mut(&id) {
            Some(r) => {
                r.flag = flag;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_dose_completed(&self, id: i64) -> AppResult<()> {
        let mut t = self.tables.write().await;
        if let Some(r) = t.reminders.get_mut(&id) {
            r.remaining_doses = (r.remaining_doses - 1).max(0);
            if r.remaining_doses == 0 {
                r.status = Status::Taken;
            }
        }
        Ok(())
    }

    async fn record_dose_reverted(&self, id: i64) -> AppResult<()> {
        let mut t = self.tables.write().await;
        if let Some(r) = t.reminders.get_mut(&id) {
            r.remaining_doses = (r.remaining_doses + 1).min(r.doses.len() as i32);
            if r.remaining_doses > 0 {
                r.status = Status::NotTaken;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_taken(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        if t.dose_owner(dose_id).is_none() {
            return Err(AppError::NotFound(format!("Dose {dose_id} not found")));
        }
        if t.taken.contains_key(&(dose_id, date)) {
            return Ok(false);
        }
        t.next_record_id += 1;
        let record_id = t.next_record_id;
        t.taken.insert((dose_id, date), record_id);
        Ok(true)
    }

    async fn delete_taken(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool> {
        Ok(self
            .tables
            .write()
            .await
            .taken
            .remove(&(dose_id, date))
            .is_some())
    }

    async fn taken_exists(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool> {
        Ok(self.tables.read().await.taken.contains_key(&(dose_id, date)))
    }

    async fn taken_dates(&self, dose_id: i64) -> AppResult<Vec<NaiveDate>> {
        let t = self.tables.read().await;
        Ok(t.taken
            .range((dose_id, NaiveDate::MIN)..=(dose_id, NaiveDate::MAX))
            .map(|((_, date), _)| *date)
            .collect())
    }

    async fn count_taken_for_user_on(&self, user_id: &str, date: NaiveDate) -> AppResult<i64> {
        let t = self.tables.read().await;
        let dose_ids = t.dose_ids_of_user(user_id);
        Ok(t.taken
            .keys()
            .filter(|(dose_id, d)| *d == date && dose_ids.contains(dose_id))
            .count() as i64)
    }

    async fn taken_for_user_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DoseTakenRecord>> {
        let t = self.tables.read().await;
        let dose_ids = t.dose_ids_of_user(user_id);
        let mut records: Vec<DoseTakenRecord> = t
            .taken
            .iter()
            .filter(|((dose_id, date), _)| {
                dose_ids.contains(dose_id) && *date >= start && *date <= end
            })
            .map(|((dose_id, date), id)| DoseTakenRecord {
                id: *id,
                dose_id: *dose_id,
                date: *date,
            })
            .collect();
        records.sort_by_key(|r| (r.date, r.dose_id));
        Ok(records)
    }
}

#[async_trait]
impl CycleStore for MemoryStore {
    async fn reset_all_cycles(&self) -> AppResult<u64> {
        let mut t = self.tables.write().await;
        for r in t.reminders.values_mut() {
            r.remaining_doses = r.doses.len() as i32;
            r.status = Status::NotTaken;
        }
        Ok(t.reminders.len() as u64)
    }

    async fn reminder_ids(&self) -> AppResult<Vec<i64>> {
        Ok(self.tables.read().await.reminders.keys().copied().collect())
    }

    async fn reset_cycle(&self, id: i64) -> AppResult<()> {
        let mut t = self.tables.write().await;
        let r = t
            .reminders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Reminder {id} not found")))?;
        r.remaining_doses = r.doses.len() as i32;
        r.status = Status::NotTaken;
        Ok(())
    }
}
