use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::routes::{stamp_routes, system_routes};
use crate::state::AppState;

/// Build the complete Axum application:
/// - /stamp, /list   (record and read stamps)
/// - /system         (alive + version)
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(stamp_routes::routes(state))
        .nest("/system", system_routes::routes())
        // A panicking handler answers 500 instead of dropping the connection
        .layer(CatchPanicLayer::new())
        // Request log
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
