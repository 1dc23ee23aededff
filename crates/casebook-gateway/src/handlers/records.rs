//! Collection and singleton endpoints backed by `CaseStore`.

use super::ApiResult;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use casebook_core::models::{AgentActivity, CaseRecord, Singleton, TimelineEvent};
use serde_json::{json, Value};

pub(crate) async fn list<T>(State(state): State<AppState>) -> ApiResult<Json<Vec<T>>>
where
    T: CaseRecord + 'static,
{
    Ok(Json(state.store.list::<T>()?))
}

/// POST body is an array; each record is inserted or overwritten by id.
pub(crate) async fn upsert<T>(
    State(state): State<AppState>,
    Json(records): Json<Vec<T>>,
) -> ApiResult<Json<Value>>
where
    T: CaseRecord + 'static,
{
    let saved = state.store.upsert_batch(&records)?;
    Ok(Json(json!({ "saved": saved })))
}

/// The path id wins over any id in the body.
pub(crate) async fn update<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(record): Json<T>,
) -> ApiResult<Json<T>>
where
    T: CaseRecord + 'static,
{
    Ok(Json(state.store.update(&id, record)?))
}

/// Timeline saves replace the whole collection.
pub(crate) async fn replace_timeline(
    State(state): State<AppState>,
    Json(events): Json<Vec<TimelineEvent>>,
) -> ApiResult<Json<Value>> {
    let saved = state.store.replace_all(&events)?;
    Ok(Json(json!({ "saved": saved })))
}

/// Newest first.
pub(crate) async fn list_activities(State(state): State<AppState>) -> ApiResult<Json<Vec<AgentActivity>>> {
    let mut activities: Vec<AgentActivity> = state.store.list()?;
    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(Json(activities))
}

pub(crate) async fn get_singleton<S>(State(state): State<AppState>) -> ApiResult<Json<S>>
where
    S: Singleton + Send + 'static,
{
    Ok(Json(state.store.get_singleton::<S>()?))
}

pub(crate) async fn put_singleton<S>(State(state): State<AppState>, Json(value): Json<S>) -> ApiResult<Json<S>>
where
    S: Singleton + Send + 'static,
{
    state.store.put_singleton(&value)?;
    Ok(Json(value))
}
