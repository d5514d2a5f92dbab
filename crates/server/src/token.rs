//! HS256 bearer tokens.
//!
//! A token is `base64url(header).base64url(claims).base64url(hmac)` with the
//! HMAC-SHA256 taken over the first two segments.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token.")]
    Invalid,
    #[error("Token has expired.")]
    Expired,
    #[error("invalid signing key: {0}")]
    Key(String),
    #[error("failed to encode token: {0}")]
    Encode(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Identity carried by a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Key("secret must not be empty".to_string()));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|err| TokenError::Key(err.to_string()))?;
        Ok(Self { mac, ttl })
    }

    pub fn issue(&self, user_id: i64, username: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, username, Utc::now())
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    fn issue_at(
        &self,
        user_id: i64,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let header = encode_segment(&header)?;
        let claims = encode_segment(&claims)?;
        let signing_input = format!("{header}.{claims}");
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&signing_input));
        Ok(format!("{signing_input}.{signature}"))
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Invalid);
        };

        let decoded: Header = decode_segment(header)?;
        if decoded.alg != ALGORITHM {
            return Err(TokenError::Invalid);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Invalid)?;
        let mut mac = self.mac.clone();
        mac.update(format!("{header}.{claims}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Invalid)?;

        let claims: Claims = decode_segment(claims)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, input: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|err| TokenError::Encode(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Invalid)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("dairy-secret", Duration::hours(24)).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let signer = signer();
        let token = signer.issue(7, "ramesh").unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "ramesh");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = signer();
        let issued = Utc::now() - Duration::hours(25);
        let token = signer.issue_at(7, "ramesh", issued).unwrap();
        assert_eq!(signer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenSigner::new("another-secret", Duration::hours(24)).unwrap();
        let token = other.issue(7, "ramesh").unwrap();
        assert_eq!(signer().verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let signer = signer();
        let token = signer.issue(7, "ramesh").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = encode_segment(&Claims {
            user_id: 1,
            username: "admin".to_string(),
            iat: 0,
            exp: i64::MAX,
        })
        .unwrap();
        let token = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(signer.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(signer().verify("not-a-token"), Err(TokenError::Invalid));
        assert_eq!(signer().verify("a.b.c.d"), Err(TokenError::Invalid));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            TokenSigner::new("", Duration::hours(1)),
            Err(TokenError::Key(_))
        ));
    }
}
