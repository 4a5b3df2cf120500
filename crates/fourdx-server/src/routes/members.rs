use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use fourdx_core::member::{self, MemberPatch, TeamMember};
use fourdx_core::scoring;
use fourdx_core::types::Role;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct NewMember {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// GET /api/members: the roster, by name.
pub async fn list_members(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TeamMember>>, AppError> {
    let members = app.run(&headers, member::list).await?;
    Ok(Json(members))
}

/// POST /api/members: provision a member with zeroed gamification state.
pub async fn create_member(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewMember>,
) -> Result<(StatusCode, Json<TeamMember>), AppError> {
    let created = app
        .run(&headers, move |ctx| {
            member::add(
                ctx,
                body.id.as_deref(),
                &body.name,
                &body.email,
                body.role.unwrap_or(Role::Staff),
            )
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/members/{id}: one member's score, streak and achievements.
pub async fn get_member(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TeamMember>, AppError> {
    let m = app.run(&headers, move |ctx| member::get(ctx, &id)).await?;
    Ok(Json(m))
}

/// PATCH /api/members/{id}: profile edits. Role changes need a manager.
pub async fn update_member(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<MemberPatch>,
) -> Result<Json<TeamMember>, AppError> {
    let m = app
        .run(&headers, move |ctx| member::update(ctx, &id, &patch))
        .await?;
    Ok(Json(m))
}

/// DELETE /api/members/{id}: take a member off the roster (admin or manager).
pub async fn remove_member(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TeamMember>, AppError> {
    let removed = app
        .run(&headers, move |ctx| member::remove(ctx, &id))
        .await?;
    Ok(Json(removed))
}

/// POST /api/members/{id}/rollover: settle the member for last week if that
/// has not happened yet. Safe to call on every visit.
pub async fn rollover_member(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = app
        .run(&headers, move |ctx| {
            let outcome = scoring::settle_member(ctx, &id)?;
            let m = member::touch(ctx, &id)?;
            Ok(serde_json::json!({ "rollover": outcome, "member": m }))
        })
        .await?;
    Ok(Json(result))
}
