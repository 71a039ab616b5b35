#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pill_scheduler::models::{CreateReminderRequest, ProfileRequest, Reminder, ReminderType};
use pill_scheduler::service::ReminderService;
use pill_scheduler::store::{MemoryStore, Store};

pub const TODAY: &str = "2024-03-02";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn fixed_today() -> NaiveDate {
    date(TODAY)
}

pub fn request(frequency: &str, days: &[&str], start: &str, doses: &[&str]) -> CreateReminderRequest {
    CreateReminderRequest {
        name: "Metformin".into(),
        photo: None,
        reminder_type: ReminderType::Medicine,
        category: Some("tablet".into()),
        frequency: frequency.into(),
        days: days.iter().map(|d| d.to_string()).collect(),
        start_date_time: NaiveDateTime::parse_from_str(&format!("{start} 09:00"), "%Y-%m-%d %H:%M")
            .unwrap(),
        end_date_time: None,
        notes: None,
        doses: doses
            .iter()
            .map(|t| NaiveTime::parse_from_str(t, "%H:%M").unwrap())
            .collect(),
    }
}

pub struct Fixture {
    pub store: Arc<dyn Store>,
    pub service: ReminderService,
}

pub async fn fixture(users: &[&str]) -> Fixture {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let service = ReminderService::new(store.clone()).with_clock(fixed_today);
    for user in users {
        service
            .login(user, ProfileRequest::default())
            .await
            .unwrap();
    }
    Fixture { store, service }
}

impl Fixture {
    pub async fn daily(&self, user: &str, start: &str, doses: &[&str]) -> Reminder {
        self.service
            .create_reminder(user, request("DAILY", &[], start, doses))
            .await
            .unwrap()
    }
}
