//! Decides on which calendar dates a reminder is due.
//!
//! Everything here is pure: callers pass the schedule fields explicitly and
//! get a plain `bool` back. "Not applicable" is never an error.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::{Frequency, Reminder};

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

/// Schedule check on raw fields. Bounds are inclusive calendar dates.
pub fn is_due(
    frequency: &Frequency,
    days: &[String],
    start: NaiveDate,
    end: Option<NaiveDate>,
    date: NaiveDate,
) -> bool {
    if date < start || end.is_some_and(|end| date > end) {
        return false;
    }

    match frequency {
        Frequency::Daily => true,
        Frequency::AlternateDays => (date - start).num_days() % 2 == 0,
        Frequency::Custom => {
            let today = weekday_name(date.weekday());
            days.iter().any(|d| d.trim().eq_ignore_ascii_case(today))
        }
        Frequency::Other(_) => false,
    }
}

pub fn is_applicable(reminder: &Reminder, date: NaiveDate) -> bool {
    is_due(
        &reminder.frequency,
        &reminder.days,
        reminder.start_date(),
        reminder.end_date(),
        date,
    )
}

/// Every date in `[start, end]` on which the reminder is due, ascending.
pub fn applicable_dates(reminder: &Reminder, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_applicable(reminder, *d))
        .collect()
}
