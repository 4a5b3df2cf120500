use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use fourdx_core::session::{self, StepContent, WigSession};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct AdvanceQuery {
    /// The step the caller is looking at. A stale value is rejected.
    pub expected_step: Option<u8>,
}

#[derive(Deserialize, Default)]
pub struct ResetQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Deserialize, Default)]
pub struct StepQuery {
    #[serde(default)]
    pub review: bool,
}

#[derive(Deserialize)]
pub struct TextBody {
    pub text: String,
}

/// GET /api/sessions/{week}: the session, or `null` if none exists.
pub async fn get_session(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(raw): Path<String>,
) -> Result<Json<Option<WigSession>>, AppError> {
    let s = app
        .run(&headers, move |ctx| {
            let week = super::resolve_week(ctx, &raw)?;
            session::get(ctx, week)
        })
        .await?;
    Ok(Json(s))
}

/// POST /api/sessions/{week}/schedule
pub async fn schedule_session(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(raw): Path<String>,
) -> Result<(StatusCode, Json<WigSession>), AppError> {
    let s = app
        .run(&headers, move |ctx| {
            let week = super::resolve_week(ctx, &raw)?;
            session::schedule(ctx, week)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(s)))
}

/// POST /api/sessions/{week}/start
pub async fn start_session(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(raw): Path<String>,
) -> Result<Json<WigSession>, AppError> {
    let s = app
        .run(&headers, move |ctx| {
            let week = super::resolve_week(ctx, &raw)?;
            session::start(ctx, week)
        })
        .await?;
    Ok(Json(s))
}

/// POST /api/sessions/{week}/advance?expected_step=N
pub async fn advance_session(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(raw): Path<String>,
    Query(q): Query<AdvanceQuery>,
) -> Result<Json<WigSession>, AppError> {
    let s = app
        .run(&headers, move |ctx| {
            let week = super::resolve_week(ctx, &raw)?;
            session::advance(ctx, week, q.expected_step)
        })
        .await?;
    Ok(Json(s))
}

/// PUT /api/sessions/{week}/notes
pub async fn put_notes(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(raw): Path<String>,
    Json(body): Json<TextBody>,
) -> Result<Json<WigSession>, AppError> {
    let s = app
        .run(&headers, move |ctx| {
            let week = super::resolve_week(ctx, &raw)?;
            session::set_notes(ctx, week, &body.text)
        })
        .await?;
    Ok(Json(s))
}

/// PUT /api/sessions/{week}/obstacles
pub async fn put_obstacles(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(raw): Path<String>,
    Json(body): Json<TextBody>,
) -> Result<Json<WigSession>, AppError> {
    let s = app
        .run(&headers, move |ctx| {
            let week = super::resolve_week(ctx, &raw)?;
            session::set_obstacles(ctx, week, &body.text)
        })
        .await?;
    Ok(Json(s))
}

/// DELETE /api/sessions/{week}?confirm=true: ADMIN or MANAGER only.
pub async fn reset_session(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(raw): Path<String>,
    Query(q): Query<ResetQuery>,
) -> Result<StatusCode, AppError> {
    app.run(&headers, move |ctx| {
        let week = super::resolve_week(ctx, &raw)?;
        session::reset(ctx, week, q.confirm)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/sessions/{week}/steps/{n}?review=true
pub async fn get_step(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path((raw, n)): Path<(String, u8)>,
    Query(q): Query<StepQuery>,
) -> Result<Json<StepContent>, AppError> {
    let content = app
        .run(&headers, move |ctx| {
            let week = super::resolve_week(ctx, &raw)?;
            session::step_content(ctx, week, n, q.review)
        })
        .await?;
    Ok(Json(content))
}
