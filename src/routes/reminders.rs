use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;

use super::{parse_date, respond, ApiResult, AppState};
use crate::auth::AuthUser;
use crate::models::{
    CreateReminderRequest, DailySummary, Flag, HistoryQuery, Reminder, ReminderFilter,
    ReminderForDate,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reminder/create", post(create_reminder))
        .route("/reminder/fetch", get(fetch_reminders))
        .route("/reminder/fetch/filters", get(fetch_filtered))
        .route("/reminder/fetch/:id", get(fetch_reminder))
        .route("/reminder/flag/:id/:flag", put(set_flag))
        .route("/reminder/delete/:id", delete(delete_reminder))
        .route("/reminder/mark-taken/:reminder_id/:dose_id/:date", put(mark_taken))
        .route("/reminder/mark-not-taken/:reminder_id/:dose_id/:date", put(mark_not_taken))
        .route("/reminder/by-date/:date", get(reminders_for_date))
        .route("/reminder/daily-summary/:date", get(daily_summary))
        .route("/reminder/history", get(history))
        .route("/reminder/dose-history/:reminder_id/:dose_id", get(dose_history))
        .route("/reminder/taken-count/:date", get(taken_count))
}

async fn create_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateReminderRequest>,
) -> ApiResult<Reminder> {
    let reminder = state.service.create_reminder(&user_id, body).await?;
    respond(StatusCode::CREATED, "Reminder created successfully", Some(reminder))
}

async fn fetch_reminders(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<Reminder>> {
    let reminders = state.service.fetch_reminders(&user_id).await?;
    respond(StatusCode::OK, "Reminders fetched successfully", Some(reminders))
}

async fn fetch_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Reminder> {
    let reminder = state.service.fetch_reminder(&user_id, id).await?;
    respond(StatusCode::OK, "Reminder fetched successfully", Some(reminder))
}

async fn fetch_filtered(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(filter): Query<ReminderFilter>,
) -> ApiResult<Vec<Reminder>> {
    let reminders = state.service.fetch_filtered(&user_id, filter).await?;
    respond(StatusCode::OK, "Filtered reminders fetched successfully", Some(reminders))
}

async fn set_flag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, flag)): Path<(i64, String)>,
) -> ApiResult<Reminder> {
    let flag: Flag = flag.parse()?;
    let reminder = state.service.set_flag(&user_id, id, flag).await?;
    respond(StatusCode::OK, format!("Reminder flagged {flag}"), Some(reminder))
}

async fn delete_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    state.service.delete_reminder(&user_id, id).await?;
    respond(StatusCode::OK, "Reminder deleted successfully", None)
}

async fn mark_taken(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((reminder_id, dose_id, date)): Path<(i64, i64, String)>,
) -> ApiResult<()> {
    let date = parse_date(&date)?;
    state
        .service
        .mark_dose_taken(&user_id, reminder_id, dose_id, date)
        .await?;
    respond(
        StatusCode::OK,
        "Dose marked as taken for specified date successfully",
        None,
    )
}

async fn mark_not_taken(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((reminder_id, dose_id, date)): Path<(i64, i64, String)>,
) -> ApiResult<()> {
    let date = parse_date(&date)?;
    state
        .service
        .mark_dose_not_taken(&user_id, reminder_id, dose_id, date)
        .await?;
    respond(
        StatusCode::OK,
        "Dose marked as not taken for specified date successfully",
        None,
    )
}

async fn reminders_for_date(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> ApiResult<Vec<ReminderForDate>> {
    let date = parse_date(&date)?;
    let reminders = state.service.fetch_for_date(&user_id, date).await?;
    respond(
        StatusCode::OK,
        format!("Reminders for date {date} fetched successfully"),
        Some(reminders),
    )
}

async fn daily_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> ApiResult<DailySummary> {
    let date = parse_date(&date)?;
    let summary = state.service.daily_summary(&user_id, date).await?;
    respond(
        StatusCode::OK,
        format!("Daily summary for {date} fetched successfully"),
        Some(summary),
    )
}

async fn history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<DailySummary>> {
    let start = parse_date(&query.start_date)?;
    let end = parse_date(&query.end_date)?;
    let summaries = state.service.range_summary(&user_id, start, end).await?;
    respond(StatusCode::OK, "Reminder history fetched successfully", Some(summaries))
}

async fn dose_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((reminder_id, dose_id)): Path<(i64, i64)>,
) -> ApiResult<Vec<NaiveDate>> {
    let dates = state
        .service
        .dose_history(&user_id, reminder_id, dose_id)
        .await?;
    respond(StatusCode::OK, "Dose history fetched successfully", Some(dates))
}

async fn taken_count(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> ApiResult<i64> {
    let date = parse_date(&date)?;
    let count = state.service.taken_count(&user_id, date).await?;
    respond(
        StatusCode::OK,
        format!("Doses taken on {date} counted successfully"),
        Some(count),
    )
}
