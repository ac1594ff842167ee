use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, handlers};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/hazards", get(handlers::list_hazards_handler))
        .route("/sync", post(handlers::trigger_sync_handler))
        .route("/sync/last", get(handlers::last_sync_handler))
}
