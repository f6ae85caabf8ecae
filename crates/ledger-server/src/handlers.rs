use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use ledger::{
    numeric_id, require_authenticated, require_super_admin, write_setting, Aliases, Filter,
    Record, Role, Row, ThrottleDecision, WriteThrottle, ALIASES_KEY, ID_FIELD, RECORDS_TABLE,
    SUB_PASSWORD_KEY,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;

pub const CREDENTIAL_HEADER: &str = "x-admin-password";

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UpdateRecordResponse {
    pub success: bool,
    pub record: Record,
}

#[derive(Deserialize)]
pub struct SubPasswordRequest {
    #[serde(default)]
    pub password: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LoginResponse>, AppError> {
    let role = require_authenticated(resolve_role(&state, &headers).await)?;
    info!(?role, "login");
    Ok(Json(LoginResponse { success: true, role }))
}

pub async fn list_records(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Record>>, AppError> {
    state.cache.sync(false).await?;
    Ok(Json(state.cache.snapshot().records.clone()))
}

pub async fn create_record(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(record): Json<Record>,
) -> Result<Json<SuccessResponse>, AppError> {
    let role = require_authenticated(resolve_role(&state, &headers).await)?;

    let now = WriteThrottle::now_ms();
    if let ThrottleDecision::Blocked { remaining_minutes } = state.throttle.check(role, now) {
        return Err(AppError::too_many_requests(remaining_minutes));
    }

    state.store.insert(RECORDS_TABLE, record.0).await?;
    state.throttle.record_write(role, now);
    state.refresh_after_write().await;
    Ok(SuccessResponse::ok())
}

/// Never fails: any problem loading the cache yields an empty mapping.
pub async fn get_aliases(State(state): State<Arc<AppState>>) -> Json<Aliases> {
    if let Err(err) = state.cache.sync(false).await {
        warn!("serving empty aliases: {err}");
        return Json(Aliases::default());
    }
    Json(state.cache.snapshot().aliases.clone())
}

pub async fn update_aliases(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(aliases): Json<Aliases>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_super_admin(resolve_role(&state, &headers).await)?;
    write_setting(state.store.as_ref(), ALIASES_KEY, aliases.into_value()).await?;
    state.refresh_after_write().await;
    Ok(SuccessResponse::ok())
}

pub async fn set_sub_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SubPasswordRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_super_admin(resolve_role(&state, &headers).await)?;
    let disabled = payload.password.is_empty();
    write_setting(state.store.as_ref(), SUB_PASSWORD_KEY, Value::String(payload.password)).await?;
    // The resolver reads the secret from the cache, so the new value only
    // takes effect once this reload lands.
    state.refresh_after_write().await;
    info!(disabled, "sub-admin password updated");
    Ok(SuccessResponse::ok())
}

pub async fn update_record(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
    headers: HeaderMap,
    Json(record): Json<Record>,
) -> Result<Json<UpdateRecordResponse>, AppError> {
    require_super_admin(resolve_role(&state, &headers).await)?;
    let patch: Row = record.into_patch();

    let mut rows = state
        .store
        .update(RECORDS_TABLE, &Filter::eq(ID_FIELD, record_id.as_str()), &patch)
        .await?;
    if rows.is_empty() {
        if let Some(numeric) = numeric_id(&record_id) {
            rows = state
                .store
                .update(RECORDS_TABLE, &Filter::eq(ID_FIELD, numeric), &patch)
                .await?;
        }
    }
    let Some(updated) = rows.into_iter().next() else {
        return Err(AppError::not_found(format!("record {record_id} not found")));
    };

    state.refresh_after_write().await;
    Ok(Json(UpdateRecordResponse {
        success: true,
        record: Record::from(updated),
    }))
}

/// Succeeds whether or not a row matched.
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    require_super_admin(resolve_role(&state, &headers).await)?;

    let removed = state
        .store
        .delete(RECORDS_TABLE, &Filter::eq(ID_FIELD, record_id.as_str()))
        .await?;
    if removed.is_empty() {
        if let Some(numeric) = numeric_id(&record_id) {
            state
                .store
                .delete(RECORDS_TABLE, &Filter::eq(ID_FIELD, numeric))
                .await?;
        }
    }

    state.refresh_after_write().await;
    Ok(SuccessResponse::ok())
}

/// Resolves against the live cache. A cold cache is loaded first so the stored
/// sub-admin secret is known; load failures leave only the super-admin tier.
async fn resolve_role(state: &AppState, headers: &HeaderMap) -> Role {
    if let Err(err) = state.cache.sync(false).await {
        warn!("cache unavailable during auth: {err}");
    }
    let credential = extract_credential(headers);
    state
        .auth
        .resolve(credential.as_deref(), &state.cache.snapshot())
}

fn extract_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(CREDENTIAL_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
