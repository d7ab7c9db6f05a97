/// Account manager implementation using runtime queries
use crate::{
    account::{password, token, Credentials, NewUser, ValidatedToken},
    config::ServerConfig,
    db::account::{PersonalAccessToken, User},
    error::{FmsError, FmsResult},
    metrics,
};
use chrono::{TimeDelta, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

const TOKEN_NAME: &str = "auth-token";

const USER_COLUMNS: &str = "id, name, email, password_hash, is_admin, employee_id, department_code,
     government_id, phone, date_of_birth, created_at, updated_at";

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new user and issue their first token
    pub async fn register(&self, new_user: NewUser) -> FmsResult<(User, String)> {
        if self.email_exists(&new_user.email).await? {
            return Err(FmsError::field("email", "The email has already been taken."));
        }

        let password_hash = password::hash_password(&new_user.password)?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, is_admin, employee_id, department_code,
                                government_id, phone, date_of_birth, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(new_user.is_admin)
        .bind(&new_user.employee_id)
        .bind(&new_user.department_code)
        .bind(&new_user.government_id)
        .bind(&new_user.phone)
        .bind(new_user.date_of_birth)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| {
            // Lost a race with a concurrent registration
            let duplicate =
                matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
            if duplicate {
                FmsError::field("email", "The email has already been taken.")
            } else {
                FmsError::Database(e)
            }
        })?;

        let user = User {
            id: result.last_insert_rowid(),
            name: new_user.name,
            email: new_user.email,
            password_hash,
            is_admin: new_user.is_admin,
            employee_id: new_user.employee_id,
            department_code: new_user.department_code,
            government_id: new_user.government_id,
            phone: new_user.phone,
            date_of_birth: new_user.date_of_birth,
            created_at: now,
            updated_at: now,
        };

        let plain_token = self.create_token(user.id).await?;

        tracing::info!(user_id = user.id, is_admin = user.is_admin, "account_registered");
        metrics::record_account_creation(user.is_admin);

        Ok((user, plain_token))
    }

    /// Check credentials and issue a new token
    ///
    /// Unknown email and wrong password fail the same way.
    pub async fn login(&self, credentials: &Credentials) -> FmsResult<(User, String)> {
        let invalid = || FmsError::field("email", "The provided credentials are incorrect.");

        let user = match self.find_by_email(&credentials.email).await? {
            Some(user) => user,
            None => {
                metrics::record_login(false);
                return Err(invalid());
            }
        };

        if !password::verify_password(&credentials.password, &user.password_hash)? {
            tracing::warn!(user_id = user.id, "login_failed: wrong password");
            metrics::record_login(false);
            return Err(invalid());
        }

        let plain_token = self.create_token(user.id).await?;

        tracing::info!(user_id = user.id, "login_succeeded");
        metrics::record_login(true);

        Ok((user, plain_token))
    }

    /// Insert a token row and return the plain-text token
    pub async fn create_token(&self, user_id: i64) -> FmsResult<String> {
        let secret = token::generate_secret();
        let now = Utc::now();
        let expires_at = self
            .config
            .authentication
            .token_ttl_minutes
            .map(|minutes| {
                TimeDelta::try_minutes(minutes)
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or_else(|| {
                        FmsError::Config(format!(
                            "Token lifetime of {} minutes is out of range",
                            minutes
                        ))
                    })
            })
            .transpose()?;

        let result = sqlx::query(
            "INSERT INTO personal_access_tokens (user_id, name, token_hash, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(user_id)
        .bind(TOKEN_NAME)
        .bind(token::hash_secret(&secret))
        .bind(expires_at)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(token::plain_text(result.last_insert_rowid(), &secret))
    }

    /// Resolve a bearer token to its user
    pub async fn validate_token(&self, presented: &str) -> FmsResult<ValidatedToken> {
        let unauthenticated = || FmsError::Authentication("Invalid or expired token".to_string());

        let (id, secret) = token::parse(presented).ok_or_else(unauthenticated)?;

        let row = sqlx::query_as::<_, PersonalAccessToken>(
            "SELECT id, user_id, name, token_hash, last_used_at, expires_at, created_at
             FROM personal_access_tokens WHERE token_hash = ?1",
        )
        .bind(token::hash_secret(secret))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(unauthenticated)?;

        if id.is_some_and(|id| id != row.id) {
            return Err(unauthenticated());
        }

        let now = Utc::now();
        if row.is_expired(now) {
            return Err(FmsError::Authentication("Token expired".to_string()));
        }

        sqlx::query("UPDATE personal_access_tokens SET last_used_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(row.id)
            .execute(&self.db)
            .await?;

        let user = self
            .find_by_id(row.user_id)
            .await?
            .ok_or_else(unauthenticated)?;

        Ok(ValidatedToken {
            token_id: row.id,
            user,
        })
    }

    /// Delete a single token (logout)
    pub async fn revoke_token(&self, token_id: i64) -> FmsResult<()> {
        let result = sqlx::query("DELETE FROM personal_access_tokens WHERE id = ?1")
            .bind(token_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(FmsError::NotFound(format!("Token {} not found", token_id)));
        }

        Ok(())
    }

    /// Get user by id
    pub async fn find_by_id(&self, id: i64) -> FmsResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Get user by email
    pub async fn find_by_email(&self, email: &str) -> FmsResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Check if email exists
    async fn email_exists(&self, email: &str) -> FmsResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Delete expired tokens, returning how many were removed
    pub async fn prune_expired_tokens(&self) -> FmsResult<u64> {
        let result = sqlx::query(
            "DELETE FROM personal_access_tokens WHERE expires_at IS NOT NULL AND expires_at < ?1",
        )
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
