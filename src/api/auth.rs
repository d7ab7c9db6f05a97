/// Registration, login and token endpoints
use crate::{
    account::{AuthResponse, LoginRequest, RegisterRequest},
    auth::AuthContext,
    context::AppContext,
    db::account::User,
    error::FmsResult,
    validation::ValidJson,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/user", get(current_user))
}

/// Create an account and return its first token
async fn register(
    State(ctx): State<AppContext>,
    ValidJson(new_user): ValidJson<RegisterRequest>,
) -> FmsResult<(StatusCode, Json<AuthResponse>)> {
    let (user, token) = ctx.account_manager.register(new_user).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

/// Exchange credentials for a token
async fn login(
    State(ctx): State<AppContext>,
    ValidJson(credentials): ValidJson<LoginRequest>,
) -> FmsResult<Json<AuthResponse>> {
    let (user, token) = ctx.account_manager.login(&credentials).await?;

    Ok(Json(AuthResponse { user, token }))
}

/// Revoke the token used for this request
async fn logout(State(ctx): State<AppContext>, auth: AuthContext) -> FmsResult<Json<Value>> {
    ctx.account_manager.revoke_token(auth.token_id).await?;

    tracing::info!(user_id = auth.user.id, "logged_out");

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

async fn current_user(auth: AuthContext) -> Json<User> {
    Json(auth.user)
}
