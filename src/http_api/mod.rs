use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    BusinessCalendar, BusinessCalendarConfig, CaptureError, CaptureOptions, DependencyEdge,
    InstantiationError, InstantiationOptions, MAX_WORKDAY_SPAN, PersistenceError,
    StorageLocation, Template, TemplateStore, TemplateSummary, WorkItem, capture_template,
    instantiate::DryRunReport, parse_loose_date, preview_instantiation,
};

#[derive(Clone)]
pub struct AppState {
    calendar: Arc<RwLock<BusinessCalendar>>,
    store: Arc<dyn TemplateStore>,
}

impl AppState {
    pub fn new<S>(calendar: BusinessCalendar, store: S) -> Self
    where
        S: TemplateStore + 'static,
    {
        Self {
            calendar: Arc::new(RwLock::new(calendar)),
            store: Arc::new(store),
        }
    }

    pub fn with_shared(
        calendar: Arc<RwLock<BusinessCalendar>>,
        store: Arc<dyn TemplateStore>,
    ) -> Self {
        Self { calendar, store }
    }

    /// Copy of the current calendar, so a request works on one consistent snapshot.
    fn calendar_snapshot(&self) -> BusinessCalendar {
        self.calendar.read().clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::NotFound(id) => ApiError::NotFound(format!("template {id} not found")),
            PersistenceError::Validation(_) | PersistenceError::InvalidData(_) => {
                ApiError::Invalid(value.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CaptureError> for ApiError {
    fn from(value: CaptureError) -> Self {
        match value {
            CaptureError::DuplicateItemId(_) => ApiError::Conflict(value.to_string()),
            CaptureError::RootNotFound(_) | CaptureError::EmptyName => {
                ApiError::Invalid(value.to_string())
            }
        }
    }
}

impl From<InstantiationError> for ApiError {
    fn from(value: InstantiationError) -> Self {
        match value {
            InstantiationError::InvalidTemplate(err) => ApiError::Invalid(err.to_string()),
            InstantiationError::RootCreation(err) => ApiError::Internal(format!("{err:#}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

fn parse_date_param(raw: &str) -> Result<NaiveDate, ApiError> {
    parse_loose_date(raw).ok_or_else(|| ApiError::invalid(format!("invalid date '{raw}'")))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/calendar", get(get_calendar).put(update_calendar))
        .route("/calendar/days/:date", get(get_day))
        .route("/calendar/workdays", get(count_workdays))
        .route("/calendar/end-date", get(end_date))
        .route("/calendar/holidays", post(add_holiday))
        .route("/calendar/holidays/:date", delete(remove_holiday))
        .route("/calendar/exceptions", post(add_exception))
        .route("/calendar/exceptions/:date", delete(remove_exception))
        .route("/templates", get(list_templates))
        .route("/templates/capture", post(capture))
        .route(
            "/templates/:id",
            get(get_template).put(rename_template).delete(delete_template),
        )
        .route("/templates/:id/preview", post(preview_template))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_calendar(State(state): State<AppState>) -> Json<BusinessCalendarConfig> {
    let config = state.calendar.read().to_config();
    Json(config)
}

async fn update_calendar(
    State(state): State<AppState>,
    Json(config): Json<BusinessCalendarConfig>,
) -> Result<Json<BusinessCalendarConfig>, ApiError> {
    let calendar =
        BusinessCalendar::from_config(&config).map_err(|err| ApiError::invalid(err.to_string()))?;
    let current = {
        let mut guard = state.calendar.write();
        *guard = calendar;
        guard.to_config()
    };
    Ok(Json(current))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DayInfo {
    pub date: NaiveDate,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u32,
    pub is_holiday: bool,
    pub is_workday_exception: bool,
    pub is_workday: bool,
}

async fn get_day(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<DayInfo>, ApiError> {
    use chrono::Datelike;

    let date = parse_date_param(&raw)?;
    let calendar = state.calendar.read();
    Ok(Json(DayInfo {
        date,
        weekday: date.weekday().num_days_from_sunday(),
        is_holiday: calendar.is_holiday(date),
        is_workday_exception: calendar.is_workday_exception(date),
        is_workday: calendar.is_workday(date),
    }))
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start: String,
    end: String,
}

async fn count_workdays(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let start = parse_date_param(&query.start)?;
    let end = parse_date_param(&query.end)?;
    let workdays = state.calendar.read().count_workdays(start, end);
    Ok(Json(json!({ "start": start, "end": end, "workdays": workdays })))
}

#[derive(Debug, Deserialize)]
struct EndDateQuery {
    start: String,
    workdays: i64,
}

async fn end_date(
    State(state): State<AppState>,
    Query(query): Query<EndDateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let start = parse_date_param(&query.start)?;
    if query.workdays.unsigned_abs() > MAX_WORKDAY_SPAN.unsigned_abs() {
        return Err(ApiError::invalid(format!(
            "workdays must be within +/-{MAX_WORKDAY_SPAN}"
        )));
    }
    let calendar = state.calendar.read();
    let end_date = calendar.calculate_end_date_by_workdays(start, query.workdays);
    let calendar_days = calendar.calculate_calendar_days(start, query.workdays);
    Ok(Json(json!({
        "start": start,
        "workdays": query.workdays,
        "end_date": end_date,
        "calendar_days": calendar_days,
    })))
}

#[derive(Debug, Deserialize)]
struct DatePayload {
    date: String,
}

async fn add_holiday(
    State(state): State<AppState>,
    Json(payload): Json<DatePayload>,
) -> Result<(StatusCode, Json<BusinessCalendarConfig>), ApiError> {
    let mut guard = state.calendar.write();
    guard
        .add_holiday_str(&payload.date)
        .ok_or_else(|| ApiError::invalid(format!("invalid date '{}'", payload.date)))?;
    Ok((StatusCode::CREATED, Json(guard.to_config())))
}

async fn remove_holiday(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let date = parse_date_param(&raw)?;
    if !state.calendar.write().remove_holiday(date) {
        return Err(ApiError::not_found(format!("{date} is not a holiday")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn add_exception(
    State(state): State<AppState>,
    Json(payload): Json<DatePayload>,
) -> Result<(StatusCode, Json<BusinessCalendarConfig>), ApiError> {
    let mut guard = state.calendar.write();
    guard
        .add_workday_exception_str(&payload.date)
        .ok_or_else(|| ApiError::invalid(format!("invalid date '{}'", payload.date)))?;
    Ok((StatusCode::CREATED, Json(guard.to_config())))
}

async fn remove_exception(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let date = parse_date_param(&raw)?;
    if !state.calendar.write().remove_workday_exception(date) {
        return Err(ApiError::not_found(format!(
            "{date} is not a workday exception"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<TemplateSummary>>, ApiError> {
    Ok(Json(state.store.list_templates()?))
}

#[derive(Debug, Deserialize)]
pub struct CapturePayload {
    pub root_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub storage_location: StorageLocation,
    pub items: Vec<WorkItem>,
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,
}

async fn capture(
    State(state): State<AppState>,
    Json(payload): Json<CapturePayload>,
) -> Result<(StatusCode, Json<Template>), ApiError> {
    let options = CaptureOptions {
        name: payload.name,
        storage_location: payload.storage_location,
    };
    let calendar = state.calendar_snapshot();
    let template = capture_template(
        &payload.root_id,
        &payload.items,
        &payload.edges,
        &calendar,
        &options,
    )?;
    state.store.save_template(&template)?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Template>, ApiError> {
    match state.store.load_template(&id)? {
        Some(template) => Ok(Json(template)),
        None => Err(ApiError::not_found(format!("template {id} not found"))),
    }
}

#[derive(Debug, Deserialize)]
struct RenamePayload {
    name: String,
}

async fn rename_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RenamePayload>,
) -> Result<Json<Template>, ApiError> {
    Ok(Json(state.store.rename_template(&id, &payload.name)?))
}

async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_template(&id)? {
        return Err(ApiError::not_found(format!("template {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn preview_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(options): Json<InstantiationOptions>,
) -> Result<Json<DryRunReport>, ApiError> {
    let template = state
        .store
        .load_template(&id)?
        .ok_or_else(|| ApiError::not_found(format!("template {id} not found")))?;
    let calendar = state.calendar_snapshot();
    let report = preview_instantiation(&template, &options, &calendar).await?;
    Ok(Json(report))
}
