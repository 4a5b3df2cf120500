use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use fourdx_core::week::{self, WeekId};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct WeekInfo {
    pub week_id: WeekId,
    pub display: String,
    pub monday: chrono::NaiveDate,
    pub sunday: chrono::NaiveDate,
    pub previous: WeekId,
    pub next: WeekId,
    pub is_past: bool,
    pub is_current: bool,
}

fn info(w: WeekId, current: WeekId) -> WeekInfo {
    WeekInfo {
        week_id: w,
        display: w.display(),
        monday: w.monday(),
        sunday: w.sunday(),
        previous: week::previous_week_id(w),
        next: week::next_week_id(w),
        is_past: week::is_past(w, current),
        is_current: w == current,
    }
}

/// GET /api/weeks/current: the current week and its neighbours.
pub async fn current_week(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<WeekInfo>, AppError> {
    let result = app
        .run(&headers, |ctx| {
            let current = ctx.current_week();
            Ok(info(current, current))
        })
        .await?;
    Ok(Json(result))
}

/// GET /api/weeks/{week}: any week, relative to the current one.
pub async fn get_week(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(raw): Path<String>,
) -> Result<Json<WeekInfo>, AppError> {
    let result = app
        .run(&headers, move |ctx| {
            let w = super::resolve_week(ctx, &raw)?;
            Ok(info(w, ctx.current_week()))
        })
        .await?;
    Ok(Json(result))
}
