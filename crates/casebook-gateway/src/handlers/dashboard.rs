use super::ApiResult;
use crate::AppState;
use axum::{extract::State, Json};
use casebook_core::models::{Act, Event, Information, Person, RiskFlags};
use casebook_core::{compute_metrics, DashboardInput, DashboardMetrics};

/// Recomputed from the ESF collections on every request.
pub(crate) async fn metrics(State(state): State<AppState>) -> ApiResult<Json<DashboardMetrics>> {
    let events: Vec<Event> = state.store.list()?;
    let acts: Vec<Act> = state.store.list()?;
    let persons: Vec<Person> = state.store.list()?;
    let information: Vec<Information> = state.store.list()?;
    let flags: RiskFlags = state.store.get_singleton()?;

    Ok(Json(compute_metrics(&DashboardInput {
        events: &events,
        acts: &acts,
        persons: &persons,
        information: &information,
        flags,
    })))
}
