/// API routes and handlers
pub mod auth;
pub mod complaints;
pub mod health;
pub mod middleware;
pub mod reports;

use crate::{config::ServerConfig, context::AppContext};
use axum::Router;

/// Build API routes
pub fn routes(config: &ServerConfig) -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(complaints::routes(config))
        .merge(reports::routes())
}
