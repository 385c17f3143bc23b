use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::records::{UserRecord, UserType};

type HmacSha256 = Hmac<Sha256>;

/// Fixed algorithm tag; there is no negotiation.
const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub username: String,
    pub user_type: UserType,
    pub exp: i64,
}

/// Minimal signed bearer-token scheme: three dot-joined base64 segments
/// (header, claims, HMAC-SHA256 signature over `header.payload`).
///
/// Tokens are stateless and there is no revocation list: once issued, a
/// token stays valid until its expiry regardless of logout.
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>, ttl_days: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Mint a token for `user`, expiring `ttl` from now.
    pub fn issue(&self, user: &UserRecord) -> anyhow::Result<String> {
        let claims = TokenClaims {
            user_id: user.id,
            username: user.username.clone(),
            user_type: user.user_type,
            exp: (OffsetDateTime::now_utc() + self.ttl).unix_timestamp(),
        };
        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &TokenClaims) -> anyhow::Result<String> {
        let header = BASE64.encode(HEADER);
        let payload = BASE64.encode(serde_json::to_vec(claims)?);
        let signature = BASE64.encode(self.mac(&header, &payload)?.finalize().into_bytes());
        Ok(format!("{header}.{payload}.{signature}"))
    }

    /// Verify signature and expiry, returning the claims on success.
    ///
    /// Fails on anything but exactly three segments, on a signature mismatch
    /// (compared in constant time), on an unparseable payload, and on an
    /// elapsed expiry.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let mut segments = token.split('.');
        let (header, payload, signature) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return None,
            };

        let signature = BASE64.decode(signature).ok()?;
        let mac = self.mac(header, payload).ok()?;
        mac.verify_slice(&signature).ok()?;

        let claims: TokenClaims = serde_json::from_slice(&BASE64.decode(payload).ok()?).ok()?;
        if claims.exp < OffsetDateTime::now_utc().unix_timestamp() {
            return None;
        }
        Some(claims)
    }

    fn mac(&self, header: &str, payload: &str) -> anyhow::Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("hmac key: {e}"))?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}
