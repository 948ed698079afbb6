use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};

use crate::errors::StampError;
use crate::routes::PrettyJson;
use crate::services::stamp_service;
use crate::state::{AppState, DayEntries};

/// Build the stamp routes: `/stamp` and `/list`.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/stamp", get(stamp))
        .route("/list", get(list))
        .with_state(state)
}

/// Raw query pairs in request order. Repeated names are allowed.
type QueryPairs = Vec<(String, String)>;

/// First value given for `name`, or an empty string when absent.
pub fn first_param(pairs: &[(String, String)], name: &str) -> String {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

//
// ─────────────────────────────────────────────────────────────
// GET /stamp?begin=..&finish=..
// Record at the current minute, return the day so far
// ─────────────────────────────────────────────────────────────
//
async fn stamp(
    State(state): State<AppState>,
    Query(params): Query<QueryPairs>,
) -> Result<PrettyJson<DayEntries>, StampError> {
    let begin = first_param(&params, "begin");
    let finish = first_param(&params, "finish");
    stamp_service::stamp_now(&state, begin, finish).map(PrettyJson)
}

//
// ─────────────────────────────────────────────────────────────
// GET /list?day=YYYY-MM-DD
// Return the day's entries or 404
// ─────────────────────────────────────────────────────────────
//
async fn list(
    State(state): State<AppState>,
    Query(params): Query<QueryPairs>,
) -> Result<PrettyJson<DayEntries>, StampError> {
    stamp_service::list_day(&state, &first_param(&params, "day")).map(PrettyJson)
}
