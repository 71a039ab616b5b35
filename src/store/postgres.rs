use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use super::{CycleStore, LedgerStore, ReminderStore, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Dose, DoseTakenRecord, Flag, Frequency, NewReminder, ProfileRequest, Reminder, Status, User,
};

const REMINDER_COLUMNS: &str = "id, user_id, name, photo, reminder_type, category, frequency, days, \
     start_date_time, end_date_time, notes, flag, status, remaining_doses";

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: Option<String>,
    email: Option<String>,
    photo_url: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            photo_url: row.photo_url,
        }
    }
}

#[derive(FromRow)]
struct ReminderRow {
    id: i64,
    user_id: String,
    name: String,
    photo: Option<String>,
    reminder_type: String,
    category: Option<String>,
    frequency: String,
    days: Option<String>,
    start_date_time: NaiveDateTime,
    end_date_time: Option<NaiveDateTime>,
    notes: Option<String>,
    flag: String,
    status: String,
    remaining_doses: i32,
}

impl ReminderRow {
    fn into_reminder(self, doses: Vec<Dose>) -> AppResult<Reminder> {
        Ok(Reminder {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            photo: self.photo,
            reminder_type: self.reminder_type.parse()?,
            category: self.category,
            frequency: Frequency::from(self.frequency),
            days: split_days(self.days.as_deref()),
            start_date_time: self.start_date_time,
            end_date_time: self.end_date_time,
            notes: self.notes,
            flag: self.flag.parse()?,
            status: self.status.parse()?,
            remaining_doses: self.remaining_doses,
            doses,
        })
    }
}

#[derive(FromRow)]
struct DoseRow {
    id: i64,
    reminder_id: i64,
    dose_time: NaiveTime,
}

#[derive(FromRow)]
struct TakenRow {
    id: i64,
    dose_id: i64,
    date: NaiveDate,
}

fn split_days(days: Option<&str>) -> Vec<String> {
    days.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_days(days: &[String]) -> Option<String> {
    if days.is_empty() {
        None
    } else {
        Some(days.join(","))
    }
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::new(pool))
    }

    async fn attach_doses(&self, rows: Vec<ReminderRow>) -> AppResult<Vec<Reminder>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let dose_rows = sqlx::query_as::<_, DoseRow>(
            "SELECT id, reminder_id, dose_time FROM doses WHERE reminder_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_reminder: HashMap<i64, Vec<Dose>> = HashMap::new();
        for row in dose_rows {
            by_reminder.entry(row.reminder_id).or_default().push(Dose {
                id: row.id,
                reminder_id: row.reminder_id,
                dose_time: row.dose_time,
            });
        }

        rows.into_iter()
            .map(|row| {
                let doses = by_reminder.remove(&row.id).unwrap_or_default();
                row.into_reminder(doses)
            })
            .collect()
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn upsert_user(&self, id: &str, profile: ProfileRequest) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, photo_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = COALESCE(EXCLUDED.name, users.name),
                email = COALESCE(EXCLUDED.email, users.email),
                photo_url = COALESCE(EXCLUDED.photo_url, users.photo_url)
            RETURNING id, name, email, photo_url
            "#,
        )
        .bind(id)
        .bind(profile.name)
        .bind(profile.email)
        .bind(profile.photo_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, photo_url FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn update_user(&self, id: &str, profile: ProfileRequest) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET name = $2, photo_url = $3 WHERE id = $1 \
             RETURNING id, name, email, photo_url",
        )
        .bind(id)
        .bind(profile.name)
        .bind(profile.photo_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn delete_user(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReminderStore for PgStore {
    async fn insert_reminder(&self, user_id: &str, new: NewReminder) -> AppResult<Reminder> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ReminderRow>(&format!(
            "INSERT INTO reminders (user_id, name, photo, reminder_type, category, frequency, days, \
             start_date_time, end_date_time, notes, flag, status, remaining_doses) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&new.name)
        .bind(&new.photo)
        .bind(new.reminder_type.as_str())
        .bind(&new.category)
        .bind(new.frequency.to_string())
        .bind(join_days(&new.days))
        .bind(new.start_date_time)
        .bind(new.end_date_time)
        .bind(&new.notes)
        .bind(Flag::Active.as_str())
        .bind(Status::NotTaken.as_str())
        .bind(new.dose_times.len() as i32)
        .fetch_one(&mut *tx)
        .await?;

        let mut doses = Vec::with_capacity(new.dose_times.len());
        for dose_time in &new.dose_times {
            let dose = sqlx::query_as::<_, DoseRow>(
                "INSERT INTO doses (reminder_id, dose_time) VALUES ($1, $2) \
                 RETURNING id, reminder_id, dose_time",
            )
            .bind(row.id)
            .bind(dose_time)
            .fetch_one(&mut *tx)
            .await?;

            doses.push(Dose {
                id: dose.id,
                reminder_id: dose.reminder_id,
                dose_time: dose.dose_time,
            });
        }

        tx.commit().await?;

        row.into_reminder(doses)
    }

    async fn find_reminder(&self, id: i64) -> AppResult<Option<Reminder>> {
        let row = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_doses(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn reminders_for_user(&self, user_id: &str) -> AppResult<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_doses(rows).await
    }

    async fn delete_reminder(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_flag(&self, id: i64, flag: Flag) -> AppResult<bool> {
        let result = sqlx::query("UPDATE reminders SET flag = $2 WHERE id = $1")
            .bind(id)
            .bind(flag.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_dose_completed(&self, id: i64) -> AppResult<()> {
        // right-hand sides see the pre-update row
        sqlx::query(
            r#"
            UPDATE reminders SET
                remaining_doses = GREATEST(remaining_doses - 1, 0),
                status = CASE WHEN remaining_doses <= 1 THEN 'TAKEN' ELSE status END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_dose_reverted(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE reminders r SET
                remaining_doses = LEAST(
                    r.remaining_doses + 1,
                    (SELECT COUNT(*) FROM doses d WHERE d.reminder_id = r.id)
                ),
                status = 'NOT_TAKEN'
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn insert_taken(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO dose_taken_records (dose_id, date) VALUES ($1, $2) \
             ON CONFLICT (dose_id, date) DO NOTHING",
        )
        .bind(dose_id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_taken(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM dose_taken_records WHERE dose_id = $1 AND date = $2")
            .bind(dose_id)
            .bind(date)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn taken_exists(&self, dose_id: i64, date: NaiveDate) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM dose_taken_records WHERE dose_id = $1 AND date = $2)",
        )
        .bind(dose_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn taken_dates(&self, dose_id: i64) -> AppResult<Vec<NaiveDate>> {
        let dates: Vec<NaiveDate> = sqlx::query_scalar(
            "SELECT date FROM dose_taken_records WHERE dose_id = $1 ORDER BY date ASC",
        )
        .bind(dose_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(dates)
    }

    async fn count_taken_for_user_on(&self, user_id: &str, date: NaiveDate) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM dose_taken_records dtr
            JOIN doses d ON d.id = dtr.dose_id
            JOIN reminders r ON r.id = d.reminder_id
            WHERE r.user_id = $1 AND dtr.date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn taken_for_user_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<DoseTakenRecord>> {
        let rows = sqlx::query_as::<_, TakenRow>(
            r#"
            SELECT dtr.id, dtr.dose_id, dtr.date
            FROM dose_taken_records dtr
            JOIN doses d ON d.id = dtr.dose_id
            JOIN reminders r ON r.id = d.reminder_id
            WHERE r.user_id = $1 AND dtr.date BETWEEN $2 AND $3
            ORDER BY dtr.date ASC, dtr.dose_id ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DoseTakenRecord {
                id: row.id,
                dose_id: row.dose_id,
                date: row.date,
            })
            .collect())
    }
}

#[async_trait]
impl CycleStore for PgStore {
    async fn reset_all_cycles(&self) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reminders r SET
                remaining_doses = (SELECT COUNT(*) FROM doses d WHERE d.reminder_id = r.id),
                status = 'NOT_TAKEN'
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn reminder_ids(&self) -> AppResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM reminders ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn reset_cycle(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reminders r SET
                remaining_doses = (SELECT COUNT(*) FROM doses d WHERE d.reminder_id = r.id),
                status = 'NOT_TAKEN'
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reminder {id} not found")));
        }
        Ok(())
    }
}
