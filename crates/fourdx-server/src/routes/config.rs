use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use fourdx_core::config::ConfigPatch;
use fourdx_core::template::{self, CommitmentTemplate, TemplateCategory};
use fourdx_core::workspace;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct TemplateQuery {
    pub category: Option<TemplateCategory>,
}

/// GET /api/config: team configuration plus validation warnings.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let cfg = app.config();
    Ok(Json(serde_json::json!({
        "config": &*cfg,
        "warnings": cfg.validate(),
    })))
}

/// PUT /api/config: merge an edit into the WIG (admin or manager). Rejected
/// edits leave both the file and the live config unchanged.
pub async fn put_config(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let saved = app
        .run(&headers, move |ctx| workspace::update_config(&root, ctx, &patch))
        .await?;
    app.set_config(saved.clone());
    let warnings = saved.validate();
    Ok(Json(serde_json::json!({
        "config": saved,
        "warnings": warnings,
    })))
}

/// GET /api/templates?category=: the commitment template library.
pub async fn list_templates(
    State(app): State<AppState>,
    Query(q): Query<TemplateQuery>,
) -> Result<Json<Vec<CommitmentTemplate>>, AppError> {
    let cfg = app.config();
    let list = template::list(&cfg, q.category).into_iter().cloned().collect();
    Ok(Json(list))
}
