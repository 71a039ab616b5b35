use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode, routing::get, Json, Router};
use chrono::NaiveDate;
use serde::Serialize;

use crate::auth::IdentityResolver;
use crate::error::{AppError, AppResult};
use crate::service::ReminderService;

pub mod reminders;
pub mod users;

#[derive(Clone)]
pub struct AppState {
    pub service: ReminderService,
    pub identity: Arc<dyn IdentityResolver>,
}

impl FromRef<AppState> for Arc<dyn IdentityResolver> {
    fn from_ref(state: &AppState) -> Self {
        state.identity.clone()
    }
}

/// Envelope shared by every successful response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: String,
    pub data: Option<T>,
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

pub fn respond<T>(status: StatusCode, message: impl Into<String>, data: Option<T>) -> ApiResult<T> {
    Ok((
        status,
        Json(ApiResponse {
            status: status.as_u16(),
            message: message.into(),
            data,
        }),
    ))
}

pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::InvalidArgument(format!("Invalid date '{raw}' (expected YYYY-MM-DD)"))
    })
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(users::routes())
        .merge(reminders::routes())
        .route("/health", get(|| async { "✅ Backend up" }))
        .with_state(state)
}
