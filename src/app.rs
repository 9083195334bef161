use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Build the full router. Everything under `/api` except register and login
/// passes through the auth gate.
pub fn app(state: AppState) -> Router {
    let api = &state.config.api;
    let security = &state.config.security;

    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(public_auth_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(api.max_request_size_bytes));

    if security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn public_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(public::register))
        .route("/api/login", post(public::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/whoami", get(protected::whoami))
        .route(
            "/api/tasks",
            post(protected::create_task).get(protected::list_tasks),
        )
        .route("/api/tasks/:id/complete", patch(protected::complete_task))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}
