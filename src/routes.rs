use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::{require_admin, require_auth};
use crate::state::AppState;

pub fn router(state: AppState, max_body_size: usize) -> Router {
    // Public routes
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::handle_register))
        .route("/api/auth/login", post(handlers::handle_login));

    // Admin routes; layers run bottom-up, so authentication happens before the role check
    let admin_routes = Router::new()
        .route("/api/admin/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/api/admin/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // Any authenticated principal; ownership is decided per resource
    let user_routes = Router::new()
        .route("/api/user/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route(
            "/api/user/tasks/:id",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/api/user/:id", get(handlers::get_user).put(handlers::update_user))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(auth_routes)
        .merge(admin_routes)
        .merge(user_routes)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .with_state(state)
}
