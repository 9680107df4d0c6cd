use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use time::OffsetDateTime;

use crate::models::user::Role;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried in the bearer token. `sub` is the user's email, matching
/// what the frontends decode for display.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub uid: i64,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token has expired")]
    Expired,
}

/// Signs and verifies HS256 bearer tokens for the platform.
pub struct TokenKeys {
    secret: Vec<u8>,
    ttl_seconds: i64,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_seconds: ttl_hours * 3600,
        }
    }

    pub fn mint(&self, user_id: i64, email: &str, role: Role) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: email.to_string(),
            uid: user_id,
            role,
            iat: now,
            exp: now + self.ttl_seconds,
        };

        let header = URL_SAFE_NO_PAD.encode(TOKEN_HEADER);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| anyhow::anyhow!("Invalid signing key: {}", e))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (header, payload, signature) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(TokenError::Malformed),
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::Malformed)?;
        mac.update(format!("{}.{}", header, payload).as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new("a-test-signing-secret", 5)
    }

    #[test]
    fn mint_and_verify_round_trip() {
        let keys = keys();
        let token = keys.mint(42, "vendor@books.lk", Role::Vendor).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.uid, 42);
        assert_eq!(claims.sub, "vendor@books.lk");
        assert_eq!(claims.role, Role::Vendor);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_tampered_payload() {
        let keys = keys();
        let token = keys.mint(42, "vendor@books.lk", Role::Vendor).unwrap();

        // swap the payload for one claiming admin, keeping the signature
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = Claims {
            sub: "vendor@books.lk".to_string(),
            uid: 42,
            role: Role::Admin,
            iat: 0,
            exp: i64::MAX,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(keys.verify(&forged).unwrap_err(), TokenError::InvalidSignature);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = keys().mint(1, "a@b.c", Role::Customer).unwrap();
        let other = TokenKeys::new("some-other-secret", 5);
        assert_eq!(other.verify(&token).unwrap_err(), TokenError::InvalidSignature);
    }

    #[test]
    fn rejects_expired_token() {
        let keys = TokenKeys::new("a-test-signing-secret", 0);
        let token = keys.mint(1, "a@b.c", Role::Customer).unwrap();
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(keys().verify("not-a-token").unwrap_err(), TokenError::Malformed);
        assert_eq!(keys().verify("a.b.c.d").unwrap_err(), TokenError::Malformed);
        assert_eq!(keys().verify("").unwrap_err(), TokenError::Malformed);
    }
}
