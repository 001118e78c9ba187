pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_request_bytes());

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/screenings",
            post(handlers::handle_run_screening).get(handlers::handle_list_screenings),
        )
        .route(
            "/api/v1/screenings/:job_id",
            get(handlers::handle_get_screening),
        )
        .layer(body_limit)
        .with_state(state)
}
