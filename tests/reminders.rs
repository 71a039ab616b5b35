mod common;

use common::{date, fixture, request, TODAY};
use pill_scheduler::models::{Flag, ProfileRequest, ReminderFilter, Status};
use pill_scheduler::AppError;

#[tokio::test]
async fn created_reminder_starts_active_with_full_counter() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["20:00", "08:00", "14:00"]).await;

    assert_eq!(r.flag, Flag::Active);
    assert_eq!(r.status, Status::NotTaken);
    assert_eq!(r.remaining_doses, 3);
    assert!(r.doses.iter().all(|d| d.reminder_id == r.id));
}

#[tokio::test]
async fn custom_reminder_without_days_is_rejected() {
    let fx = fixture(&["alice"]).await;
    let err = fx
        .service
        .create_reminder("alice", request("CUSTOM", &[], "2024-01-01", &["08:00"]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidArgument(_)));
    assert!(fx.service.fetch_reminders("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_user_cannot_create_reminders() {
    let fx = fixture(&[]).await;
    let err = fx
        .service
        .create_reminder("ghost", request("DAILY", &[], "2024-01-01", &["08:00"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn deleting_someone_elses_reminder_is_refused_and_changes_nothing() {
    let fx = fixture(&["alice", "mallory"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;

    let err = fx.service.delete_reminder("mallory", r.id).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let still_there = fx.service.fetch_reminder("alice", r.id).await.unwrap();
    assert_eq!(still_there, r);
}

#[tokio::test]
async fn missing_reminder_is_not_found() {
    let fx = fixture(&["alice"]).await;
    assert!(matches!(
        fx.service.fetch_reminder("alice", 999).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        fx.service.delete_reminder("alice", 999).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn marking_another_users_dose_is_refused() {
    let fx = fixture(&["alice", "mallory"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;

    let err = fx
        .service
        .mark_dose_taken("mallory", r.id, r.doses[0].id, date("2024-01-02"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    assert!(fx.service.ledger().history_of(r.doses[0].id).await.unwrap().is_empty());
}

#[tokio::test]
async fn dose_must_belong_to_the_addressed_reminder() {
    let fx = fixture(&["alice"]).await;
    let first = fx.daily("alice", "2024-01-01", &["08:00"]).await;
    let second = fx.daily("alice", "2024-01-01", &["09:00"]).await;

    let err = fx
        .service
        .mark_dose_taken("alice", first.id, second.doses[0].id, date("2024-01-02"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn completing_todays_doses_flips_status_and_unmarking_reverts() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00", "20:00"]).await;
    let today = date(TODAY);

    fx.service.mark_dose_taken("alice", r.id, r.doses[0].id, today).await.unwrap();
    // repeated mark must not decrement twice
    fx.service.mark_dose_taken("alice", r.id, r.doses[0].id, today).await.unwrap();
    let half = fx.service.fetch_reminder("alice", r.id).await.unwrap();
    assert_eq!(half.remaining_doses, 1);
    assert_eq!(half.status, Status::NotTaken);

    fx.service.mark_dose_taken("alice", r.id, r.doses[1].id, today).await.unwrap();
    let done = fx.service.fetch_reminder("alice", r.id).await.unwrap();
    assert_eq!(done.remaining_doses, 0);
    assert_eq!(done.status, Status::Taken);

    fx.service.mark_dose_not_taken("alice", r.id, r.doses[1].id, today).await.unwrap();
    let undone = fx.service.fetch_reminder("alice", r.id).await.unwrap();
    assert_eq!(undone.remaining_doses, 1);
    assert_eq!(undone.status, Status::NotTaken);
}

#[tokio::test]
async fn marks_for_other_dates_leave_the_counter_alone() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;

    fx.service
        .mark_dose_taken("alice", r.id, r.doses[0].id, date("2024-01-15"))
        .await
        .unwrap();

    let after = fx.service.fetch_reminder("alice", r.id).await.unwrap();
    assert_eq!(after.remaining_doses, 1);
    assert_eq!(after.status, Status::NotTaken);
    assert!(fx
        .service
        .ledger()
        .is_taken(r.doses[0].id, date("2024-01-15"))
        .await
        .unwrap());
}

#[tokio::test]
async fn marks_on_unscheduled_days_leave_the_counter_alone() {
    let fx = fixture(&["alice"]).await;
    let today = date(TODAY);
    // one day after the start: an off day for alternate-day reminders
    let off_day = fx
        .service
        .create_reminder("alice", request("ALTERNATE_DAYS", &[], "2024-03-01", &["08:00", "20:00"]))
        .await
        .unwrap();
    let not_started = fx.daily("alice", "2024-03-05", &["08:00"]).await;

    for r in [&off_day, &not_started] {
        fx.service.mark_dose_taken("alice", r.id, r.doses[0].id, today).await.unwrap();
        let after = fx.service.fetch_reminder("alice", r.id).await.unwrap();
        assert_eq!(after.remaining_doses, r.remaining_doses);
        assert_eq!(after.status, Status::NotTaken);
        assert!(fx.service.ledger().is_taken(r.doses[0].id, today).await.unwrap());

        fx.service.mark_dose_not_taken("alice", r.id, r.doses[0].id, today).await.unwrap();
        let reverted = fx.service.fetch_reminder("alice", r.id).await.unwrap();
        assert_eq!(reverted.remaining_doses, r.remaining_doses);
    }
}

#[tokio::test]
async fn filters_combine_flag_status_and_frequency() {
    let fx = fixture(&["alice"]).await;
    let daily = fx.daily("alice", "2024-01-01", &["08:00"]).await;
    let paused = fx.daily("alice", "2024-01-01", &["09:00"]).await;
    fx.service.set_flag("alice", paused.id, Flag::Inactive).await.unwrap();
    // 2024-03-02 is a Saturday
    fx.service
        .create_reminder("alice", request("CUSTOM", &["MONDAY"], "2024-01-01", &["10:00"]))
        .await
        .unwrap();

    let active = fx
        .service
        .fetch_filtered(
            "alice",
            ReminderFilter {
                flag: Some("ACTIVE".into()),
                status: Some("NOT_TAKEN".into()),
                frequency: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(active.len(), 2);

    let custom_today = fx
        .service
        .fetch_filtered(
            "alice",
            ReminderFilter {
                frequency: Some("CUSTOM".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(custom_today.is_empty());

    let daily_active = fx
        .service
        .fetch_filtered(
            "alice",
            ReminderFilter {
                flag: Some("active".into()),
                frequency: Some("DAILY".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(daily_active.len(), 1);
    assert_eq!(daily_active[0].id, daily.id);
}

#[tokio::test]
async fn bad_filter_values_are_invalid_arguments() {
    let fx = fixture(&["alice"]).await;
    let err = fx
        .service
        .fetch_filtered(
            "alice",
            ReminderFilter {
                flag: Some("PAUSED".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn deleting_a_user_cascades() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;
    fx.service
        .mark_dose_taken("alice", r.id, r.doses[0].id, date("2024-01-02"))
        .await
        .unwrap();

    fx.service.delete_user("alice").await.unwrap();

    assert!(matches!(
        fx.service.fetch_user("alice").await,
        Err(AppError::NotFound(_))
    ));
    assert!(fx.service.fetch_reminders("alice").await.unwrap().is_empty());
    assert!(fx.service.ledger().history_of(r.doses[0].id).await.unwrap().is_empty());
}

#[tokio::test]
async fn login_is_an_upsert_and_emails_stay_unique() {
    let fx = fixture(&[]).await;
    let profile = ProfileRequest {
        name: Some("Alice".into()),
        email: Some("alice@example.com".into()),
        photo_url: None,
    };

    let first = fx.service.login("alice", profile.clone()).await.unwrap();
    let again = fx.service.login("alice", ProfileRequest::default()).await.unwrap();
    assert_eq!(first, again);

    let err = fx.service.login("impostor", profile).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}
