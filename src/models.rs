use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderType {
    Medicine,
    HeartRate,
    Insulin,
    Bp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flag {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    NotTaken,
    Taken,
}

/// Recurrence rule of a reminder.
///
/// Stored as text. Values that do not name a known rule are kept in
/// `Other` so a bad row never fails a read; such reminders are simply
/// never due.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Daily,
    AlternateDays,
    Custom,
    Other(String),
}

impl From<String> for Frequency {
    fn from(s: String) -> Self {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Self::Daily,
            "ALTERNATE_DAYS" => Self::AlternateDays,
            "CUSTOM" => Self::Custom,
            _ => Self::Other(s),
        }
    }
}

impl From<Frequency> for String {
    fn from(f: Frequency) -> Self {
        f.to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "DAILY"),
            Self::AlternateDays => write!(f, "ALTERNATE_DAYS"),
            Self::Custom => write!(f, "CUSTOM"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

macro_rules! text_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(AppError::InvalidArgument(format!(
                        concat!("unknown ", $what, ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum!(ReminderType, "reminder type", {
    Medicine => "MEDICINE",
    HeartRate => "HEART_RATE",
    Insulin => "INSULIN",
    Bp => "BP",
});

text_enum!(Flag, "flag", {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
});

text_enum!(Status, "status", {
    NotTaken => "NOT_TAKEN",
    Taken => "TAKEN",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dose {
    pub id: i64,
    pub reminder_id: i64,
    pub dose_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub photo: Option<String>,
    pub reminder_type: ReminderType,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub days: Vec<String>,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub flag: Flag,
    pub status: Status,
    pub remaining_doses: i32,
    pub doses: Vec<Dose>,
}

impl Reminder {
    pub fn start_date(&self) -> NaiveDate {
        self.start_date_time.date()
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date_time.map(|dt| dt.date())
    }

    pub fn dose(&self, dose_id: i64) -> Option<&Dose> {
        self.doses.iter().find(|d| d.id == dose_id)
    }
}

/// Ledger entry: one dose completed on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseTakenRecord {
    pub id: i64,
    pub dose_id: i64,
    pub date: NaiveDate,
}

/// A validated reminder ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub name: String,
    pub photo: Option<String>,
    pub reminder_type: ReminderType,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub days: Vec<String>,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub dose_times: Vec<NaiveTime>,
}

// --- Request bodies ---

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderRequest {
    pub name: String,
    pub photo: Option<String>,
    pub reminder_type: ReminderType,
    pub category: Option<String>,
    pub frequency: String,
    #[serde(default)]
    pub days: Vec<String>,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub doses: Vec<NaiveTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReminderFilter {
    pub flag: Option<String>,
    pub status: Option<String>,
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub start_date: String,
    pub end_date: String,
}

// --- Summaries ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoseDayStatus {
    pub dose_id: i64,
    pub dose_time: String,
    pub taken: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderDayStatus {
    pub reminder_id: i64,
    pub reminder_name: String,
    pub total_doses: usize,
    pub doses_taken: usize,
    pub dose_statuses: Vec<DoseDayStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_reminders: usize,
    pub total_doses: usize,
    pub doses_taken: usize,
    pub doses_missed: usize,
    pub adherence_percentage: f64,
    pub reminder_statuses: Vec<ReminderDayStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoseForDate {
    pub id: i64,
    pub dose_time: NaiveTime,
    pub taken: bool,
    pub history: Vec<NaiveDate>,
}

/// A full reminder as seen on one date, doses annotated with the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderForDate {
    pub id: i64,
    pub name: String,
    pub photo: Option<String>,
    pub reminder_type: ReminderType,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub days: Vec<String>,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub flag: Flag,
    pub status: Status,
    pub remaining_doses: i32,
    pub date: NaiveDate,
    pub doses: Vec<DoseForDate>,
}
