use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// Session token payload. The payload carries no secret data; tamper
/// evidence comes from the HS256 signature.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    /// Malformed, tampered and expired tokens all fail the same way; the
    /// caller cannot distinguish them.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keys built directly from a secret; no pool, no async runtime needed.
    fn make_keys() -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(b"test"),
            decoding: DecodingKey::from_secret(b"test"),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl: Duration::from_secs(300),
        }
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys();
        assert!(keys.verify("not.a.token").is_err());
        assert!(keys.verify("").is_err());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let keys = make_keys();
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            issuer: keys.issuer.clone(),
            audience: keys.audience.clone(),
            ttl: keys.ttl,
        };
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys();
        // Expired well past the default 60s leeway.
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: (now - TimeDuration::seconds(7200)).unix_timestamp() as usize,
            exp: (now - TimeDuration::seconds(3600)).unix_timestamp() as usize,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let keys = make_keys();
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = keys.sign(Uuid::new_v4()).expect("sign other");
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        assert!(keys.verify(&parts.join(".")).is_err());
    }
}
