//! axum integration: session extractor, error mapping, the route-gate
//! middleware and the access-control routes.
//!
//! # Example
//!
//! ```rust,ignore
//! use tenantry::api::axum::{AccessState, access_routes, route_gate};
//!
//! let state = AccessState::new(&repositories, jwt_service, AccessConfig::default());
//!
//! let app = Router::new()
//!     .nest("/api", access_routes())
//!     .merge(pages)
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), route_gate))
//!     .with_state(state);
//! ```

mod error;
mod handlers;
mod middleware;
mod routes;
mod state;

pub use error::AppError;
pub use middleware::{
    SESSION_COOKIE, SessionUser, extract_bearer_token, extract_session_cookie, route_gate, session_token,
};
pub use routes::access_routes;
pub use state::{AccessBackend, AccessState, OrgInvites, TeamInvites};
