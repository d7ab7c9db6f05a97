/// Account database models
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_admin: bool,
    pub employee_id: Option<String>,
    pub department_code: Option<String>,
    pub government_id: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Personal access token record (only the hash of the secret is stored)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PersonalAccessToken {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub token_hash: String,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PersonalAccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now > at).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_password_hash_is_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: 1,
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_admin: false,
            employee_id: None,
            department_code: None,
            government_id: None,
            phone: None,
            date_of_birth: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "asha@example.com");
    }

    #[test]
    fn test_token_expiry() {
        let now = Utc::now();
        let mut token = PersonalAccessToken {
            id: 1,
            user_id: 1,
            name: "auth-token".to_string(),
            token_hash: "abc".to_string(),
            last_used_at: None,
            expires_at: None,
            created_at: now,
        };
        assert!(!token.is_expired(now));

        token.expires_at = Some(now - Duration::minutes(1));
        assert!(token.is_expired(now));
    }
}
