//! Route handlers.
//!
//! Each handler validates its input, hands one storage call to the blocking
//! pool and serializes the result. Not-found is decided here, not in
//! storage, so every route reports it the same way.

use crate::api::AppState;
use crate::api::extract::{IssueId, ValidJson};
use crate::api::schemas::{IssueCreate, IssuePatch, IssueResponse, ListQuery};
use crate::error::{IssueTrackerError, Result, StructuredError};
use crate::storage::SqliteStorage;
use axum::Json;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");

/// Run a storage call on the blocking pool.
async fn with_storage<F, R>(state: &AppState, f: F) -> Result<R>
where
    F: FnOnce(&SqliteStorage) -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    let storage = Arc::clone(&state.storage);
    tokio::task::spawn_blocking(move || f(&storage)).await?
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Issue Tracker API",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/docs",
        "endpoints": {
            "create_issue": "POST /issues",
            "list_issues": "GET /issues",
            "get_issue": "GET /issues/{id}",
            "update_issue": "PUT /issues/{id}",
            "partial_update": "PATCH /issues/{id}",
            "delete_issue": "DELETE /issues/{id}",
        },
    }))
}

pub async fn health(State(state): State<AppState>) -> Response {
    match with_storage(&state, SqliteStorage::ping).await {
        Ok(()) => Json(json!({"status": "healthy"})).into_response(),
        Err(err) => {
            warn!(error = %err, "health check failed");
            StructuredError::unavailable("database did not answer").into_response()
        }
    }
}

pub async fn create_issue(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<IssueCreate>,
) -> Result<Response> {
    let fields = body.into_fields()?;
    let issue = with_storage(&state, move |storage| storage.create_issue(&fields)).await?;
    info!(id = issue.id, "issue created");

    let location = format!("/issues/{}", issue.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(IssueResponse::from(issue)),
    )
        .into_response())
}

pub async fn list_issues(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let filters = ListQuery::parse(query.as_deref())?.into_filters(state.limits)?;
    let (issues, total) =
        with_storage(&state, move |storage| storage.list_page(&filters)).await?;

    let body: Vec<IssueResponse> = issues.into_iter().map(IssueResponse::from).collect();
    Ok(([(TOTAL_COUNT_HEADER, total.to_string())], Json(body)).into_response())
}

pub async fn get_issue(
    State(state): State<AppState>,
    IssueId(id): IssueId,
) -> Result<Json<IssueResponse>> {
    let issue = with_storage(&state, move |storage| storage.get_issue(id))
        .await?
        .ok_or(IssueTrackerError::IssueNotFound { id })?;
    Ok(Json(issue.into()))
}

pub async fn replace_issue(
    State(state): State<AppState>,
    IssueId(id): IssueId,
    ValidJson(body): ValidJson<IssueCreate>,
) -> Result<Json<IssueResponse>> {
    let fields = body.into_fields()?;
    let issue = with_storage(&state, move |storage| storage.replace_issue(id, &fields))
        .await?
        .ok_or(IssueTrackerError::IssueNotFound { id })?;
    info!(id, "issue replaced");
    Ok(Json(issue.into()))
}

pub async fn patch_issue(
    State(state): State<AppState>,
    IssueId(id): IssueId,
    ValidJson(body): ValidJson<IssuePatch>,
) -> Result<Json<IssueResponse>> {
    let update = body.into_update()?;
    let issue = with_storage(&state, move |storage| storage.patch_issue(id, &update))
        .await?
        .ok_or(IssueTrackerError::IssueNotFound { id })?;
    info!(id, "issue updated");
    Ok(Json(issue.into()))
}

pub async fn delete_issue(
    State(state): State<AppState>,
    IssueId(id): IssueId,
) -> Result<StatusCode> {
    if with_storage(&state, move |storage| storage.delete_issue(id)).await? {
        info!(id, "issue deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(IssueTrackerError::IssueNotFound { id })
    }
}
