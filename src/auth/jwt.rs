use chrono::{Utc, Duration};
use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Serialize, Deserialize};
use crate::error::AppError;
use crate::models::user::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
    pub username: String,
}

pub fn sign_token(
    user_id: i64,
    role: Role,
    username: &str,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::internal(format!("Token lifetime of {ttl_hours}h is out of range")))?;
    let claims = Claims {
        sub: user_id,
        role,
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
        username: username.to_string(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("Token signing failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256)
    )
    .map(|d| d.claims)
    .map_err(|e| AppError::unauthorized(format!("Invalid or expired token: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_token_carries_role_and_username() {
        let token = sign_token(7, Role::Manager, "somchai", "test-secret", 24).unwrap();
        let claims = verify_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.username, "somchai");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_token(1, Role::User, "a", "one", 24).unwrap();
        assert!(verify_token(&token, "two").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign_token(1, Role::User, "a", "secret", -2).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn absurd_lifetime_is_an_error_not_a_panic() {
        assert!(sign_token(1, Role::User, "a", "secret", i64::MAX).is_err());
    }
}
