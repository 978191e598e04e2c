//! REST API for users-core
//!
//! Routes are grouped by rate-limit class: `/auth`, `/devices` and `/users`
//! each carry their class limit, counted per endpoint and client address.
//! `/` and `/health` are open.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AuthenticationService;

pub mod error;
pub mod extract;
pub mod handlers;
pub mod rate_limit;
pub mod security_headers;

pub use error::{ApiError, ApiResult};
pub use extract::{ApiJson, CurrentPrincipal, OptionalJson};
pub use rate_limit::{EndpointClass, RateGate, RateLimitConfig, RateLimiter};

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub auth_service: Arc<AuthenticationService>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// Create the REST API router with a fresh rate limiter.
pub fn create_router(auth_service: Arc<AuthenticationService>, rate_limit: RateLimitConfig) -> Router {
    create_router_with_state(ApiState {
        auth_service,
        rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
    })
}

pub fn create_router_with_state(state: ApiState) -> Router {
    let gate = |class: EndpointClass| RateGate {
        limiter: state.rate_limiter.clone(),
        class,
    };

    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/stream/token", post(handlers::auth::stream_token))
        .route_layer(middleware::from_fn_with_state(
            gate(EndpointClass::Auth),
            rate_limit::enforce_rate_limit,
        ));

    let device_routes = Router::new()
        .route("/", get(handlers::devices::list).post(handlers::devices::create))
        .route("/:id", get(handlers::devices::get).delete(handlers::devices::delete))
        .route_layer(middleware::from_fn_with_state(
            gate(EndpointClass::Devices),
            rate_limit::enforce_rate_limit,
        ));

    let user_routes = Router::new()
        .route("/me", get(handlers::users::me))
        .route_layer(middleware::from_fn_with_state(
            gate(EndpointClass::Users),
            rate_limit::enforce_rate_limit,
        ));

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .nest("/auth", auth_routes)
        .nest("/devices", device_routes)
        .nest("/users", user_routes)
        .layer(middleware::from_fn(security_headers::security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
