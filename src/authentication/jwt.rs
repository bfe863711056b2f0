use chrono::Duration;
use chrono::Local;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::database::schema::{Id, User};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

/// The authenticated user a request acts on behalf of.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
        }
    }
}

/// HMAC-SHA256 key used to sign and verify session tokens.
#[derive(Clone)]
pub struct JwtKey {
    key: Hmac<Sha256>,
}

impl JwtKey {
    pub fn new(secret: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            key: Hmac::new_from_slice(secret)?,
        })
    }

    pub fn generate_session(&self, user: &User) -> Result<String, potion::Error> {
        self.sign(&JwtSessionData::new(user.id, user.username.to_owned()))
    }

    pub fn sign(&self, claims: &JwtSessionData) -> Result<String, potion::Error> {
        claims
            .sign_with_key(&self.key)
            .map_err(|_| HtmlError::InternalServerError.new("Failed to sign session"))
    }

    pub fn verify(&self, token: &str) -> Result<JwtSessionData, potion::Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid token"))?;

        if session.is_expired() {
            return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 3,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Cook".to_string(),
        }
    }

    #[test]
    fn session_round_trips_through_token() {
        let key = JwtKey::new(b"secret").unwrap();
        let Ok(token) = key.generate_session(&user()) else {
            panic!("failed to sign");
        };

        let Ok(session) = key.verify(&token) else {
            panic!("failed to verify");
        };
        let session: SessionData = session.into();

        assert_eq!(session.user_id, 3);
        assert_eq!(session.username, "cook");
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        let key = JwtKey::new(b"secret").unwrap();
        let other = JwtKey::new(b"other secret").unwrap();
        let Ok(token) = other.generate_session(&user()) else {
            panic!("failed to sign");
        };
        assert!(key.verify(&token).is_err());
        assert!(key.verify("garbage").is_err());

        let mut claims = JwtSessionData::new(3, "cook".to_string());
        claims.exp = Local::now().timestamp() - 60;
        let Ok(expired) = key.sign(&claims) else {
            panic!("failed to sign");
        };
        assert!(key.verify(&expired).is_err());
    }
}
