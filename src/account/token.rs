/// Personal access token format
///
/// Plain-text tokens look like `<id>|<secret>`. The id is the database row,
/// the secret is 40 random alphanumerics, and only `sha256(secret)` is stored.
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

pub const SECRET_LENGTH: usize = 40;

/// Generate a fresh random secret
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

/// Hex-encoded SHA-256 of a secret
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Build the plain-text token handed to the client
pub fn plain_text(id: i64, secret: &str) -> String {
    format!("{}|{}", id, secret)
}

/// Split a presented token into (optional id, secret)
///
/// A bare secret without an id prefix is accepted.
pub fn parse(token: &str) -> Option<(Option<i64>, &str)> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    match token.split_once('|') {
        Some((id, secret)) => {
            let id = id.parse::<i64>().ok()?;
            if secret.is_empty() {
                return None;
            }
            Some((Some(id), secret))
        }
        None => Some((None, token)),
    }
}
