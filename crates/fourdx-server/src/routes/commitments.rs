use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use fourdx_core::commitment::{Commitment, CommitmentPatch, MeasureLink};
use fourdx_core::error::FourdxError;
use fourdx_core::ledger;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub week: Option<String>,
    pub member: Option<String>,
}

#[derive(Deserialize)]
pub struct NewCommitment {
    /// Defaults to the acting member.
    #[serde(default)]
    pub member_id: Option<String>,
    /// Defaults to the current week.
    #[serde(default)]
    pub week: Option<String>,
    /// Required unless `template_id` is given.
    #[serde(default)]
    pub description: Option<String>,
    /// Create from a library template instead of a free-form description.
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub lead_measure_id: Option<String>,
    #[serde(default)]
    pub lead_measure_name: Option<String>,
}

/// GET /api/commitments?week=&member=: a week's commitments, optionally for
/// one member. `week` defaults to the current week.
pub async fn list_commitments(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Commitment>>, AppError> {
    let list = app
        .run(&headers, move |ctx| {
            let week = match q.week.as_deref() {
                Some(raw) => super::resolve_week(ctx, raw)?,
                None => ctx.current_week(),
            };
            match q.member.as_deref() {
                Some(member) => ledger::list_for_member_week(ctx, member, week),
                None => ledger::list_for_week(ctx, week),
            }
        })
        .await?;
    Ok(Json(list))
}

/// POST /api/commitments: create a commitment, free-form or from a template.
pub async fn create_commitment(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewCommitment>,
) -> Result<(StatusCode, Json<Commitment>), AppError> {
    let created = app
        .run(&headers, move |ctx| {
            let member = body
                .member_id
                .or_else(|| ctx.actor_id().map(str::to_string))
                .ok_or_else(|| {
                    FourdxError::InvalidMember("member_id or x-member-id header required".into())
                })?;
            let week = match body.week.as_deref() {
                Some(raw) => super::resolve_week(ctx, raw)?,
                None => ctx.current_week(),
            };
            if let Some(template_id) = body.template_id.as_deref() {
                return ledger::create_from_template(ctx, &member, week, template_id);
            }
            let link = body.lead_measure_id.map(|id| MeasureLink {
                id,
                name: body.lead_measure_name,
            });
            let description = body.description.unwrap_or_default();
            ledger::create(ctx, &member, week, &description, link)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/commitments/{id}: merge fields; a status change is scored.
pub async fn update_commitment(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<CommitmentPatch>,
) -> Result<Json<Commitment>, AppError> {
    let updated = app
        .run(&headers, move |ctx| ledger::update(ctx, &id, &patch))
        .await?;
    Ok(Json(updated))
}

/// POST /api/commitments/{id}/cycle: incomplete → completed → partial → incomplete.
pub async fn cycle_commitment(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Commitment>, AppError> {
    let updated = app
        .run(&headers, move |ctx| ledger::cycle_status(ctx, &id))
        .await?;
    Ok(Json(updated))
}

/// DELETE /api/commitments/{id}
pub async fn delete_commitment(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Commitment>, AppError> {
    let removed = app
        .run(&headers, move |ctx| ledger::delete(ctx, &id))
        .await?;
    Ok(Json(removed))
}
