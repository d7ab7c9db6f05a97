/// Authentication extractors
use crate::{
    account::ValidatedToken,
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::account::User,
    error::FmsError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - extracts and validates the bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub token_id: i64,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = FmsError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| FmsError::Authentication("Missing authorization header".to_string()))?;

        let ValidatedToken { token_id, user } =
            state.account_manager.validate_token(&token).await?;

        Ok(AuthContext { user, token_id })
    }
}

/// Caller allowed to review all complaints
///
/// Any authenticated user qualifies unless the server requires admins for
/// report review.
#[derive(Debug, Clone)]
pub struct ReviewerContext {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppContext> for ReviewerContext {
    type Rejection = FmsError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if state.config.authentication.reports_require_admin && !auth.is_admin() {
            tracing::warn!(user_id = auth.user.id, "report_review_denied: not an admin");
            return Err(FmsError::Authorization("Admin role required".to_string()));
        }

        Ok(ReviewerContext { user: auth.user })
    }
}
