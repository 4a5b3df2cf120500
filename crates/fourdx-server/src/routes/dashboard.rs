use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use fourdx_core::dashboard::{self, WeekDashboard};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/dashboard/{week}: scoreboard rollup. `current` is accepted.
pub async fn get_dashboard(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(raw): Path<String>,
) -> Result<Json<WeekDashboard>, AppError> {
    let d = app
        .run(&headers, move |ctx| {
            let week = super::resolve_week(ctx, &raw)?;
            dashboard::week_dashboard(ctx, week)
        })
        .await?;
    Ok(Json(d))
}
