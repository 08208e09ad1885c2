use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

/// Claims carried by a bearer token: subject, issued-at, expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Signing and verification keys plus the token lifetime. Stateless aside
/// from the secret fixed at construction.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    /// An empty secret is a startup misconfiguration, rejected here so it can
    /// never become a per-request failure.
    pub fn new(secret: &str, ttl: Duration) -> anyhow::Result<Self> {
        if secret.trim().is_empty() {
            anyhow::bail!("jwt signing secret must not be empty");
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn issue(&self, subject: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: subject,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %subject, "jwt signed");
        Ok(token)
    }

    /// Verify a token and return its subject. Malformed, forged and expired
    /// tokens all collapse to `None`; callers cannot tell them apart.
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(subject = %data.claims.sub, "jwt verified");
                Some(data.claims.sub)
            }
            Err(e) => {
                debug!(error = %e, "jwt rejected");
                None
            }
        }
    }
}
