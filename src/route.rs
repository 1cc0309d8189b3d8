use std::sync::Arc;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{
    handler::*,
    middleware::{login_limiter, LoginLimiter},
    AppState,
};

/// Notes routes, plus `login_routes` (if any) behind the state's login limiter.
pub fn create_router(
    app_state: Arc<AppState>,
    cors_origins: &[String],
    login_routes: Option<Router>,
) -> Router {
    let limiter = app_state.login_limiter.clone();

    let mut router = Router::new()
        .route("/", get(health_checker_handler))
        .route(
            "/notes",
            get(get_all_notes)
                .post(create_new_note)
                .patch(update_note)
                .delete(delete_note),
        )
        .with_state(app_state);

    if let Some(login_routes) = login_routes {
        router = router.merge(limit_login(login_routes, limiter));
    }

    router
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Puts every route of `login_routes` behind the login rate limiter.
pub fn limit_login(login_routes: Router, limiter: LoginLimiter) -> Router {
    login_routes.route_layer(from_fn_with_state(limiter, login_limiter))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
}
