use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, warn};

use crate::{config::JwtConfig, error::AccountError};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT payload. Readable by anyone holding the token, tamper-proof via HMAC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: i64,
    pub email: String,
}

/// Signs and verifies session tokens with a server-held symmetric secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl From<&JwtConfig> for TokenCodec {
    fn from(cfg: &JwtConfig) -> Self {
        Self::new(
            cfg.secret.as_bytes(),
            cfg.issuer.clone(),
            Duration::seconds(cfg.ttl_minutes.saturating_mul(60)),
        )
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            ttl,
        }
    }

    pub fn sign(&self, user_id: i64, email: &str) -> Result<String, AccountError> {
        let now = OffsetDateTime::now_utc();
        let exp = now.checked_add(self.ttl).ok_or_else(|| {
            error!(user_id, "jwt expiry out of range");
            AccountError::TokenSigning("token lifetime out of range".into())
        })?;
        let claims = Claims {
            user_id,
            email: email.to_owned(),
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, user_id, "jwt sign failed");
            AccountError::TokenSigning(e.to_string())
        })?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn parse(&self, token: &str) -> Result<TokenIdentity, AccountError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(error = %e, "jwt rejected");
            AccountError::InvalidToken
        })?;
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(TokenIdentity {
            user_id: data.claims.user_id,
            email: data.claims.email,
        })
    }

    /// Parses an `Authorization` header value of the form `Bearer <token>`.
    pub fn parse_bearer(&self, header_value: &str) -> Result<TokenIdentity, AccountError> {
        let token = header_value
            .strip_prefix("Bearer ")
            .or_else(|| header_value.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AccountError::InvalidToken)?;
        self.parse(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(secret.as_bytes(), "test", Duration::minutes(5))
    }

    #[test]
    fn sign_and_parse_roundtrip() {
        let keys = codec("dev-secret");
        let token = keys.sign(42, "user@test.io").expect("sign");
        let identity = keys.parse(&token).expect("parse");
        assert_eq!(
            identity,
            TokenIdentity {
                user_id: 42,
                email: "user@test.io".into()
            }
        );
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = codec("secret-a").sign(1, "a@b.co").unwrap();
        let err = codec("secret-b").parse(&token).unwrap_err();
        assert!(matches!(err, AccountError::InvalidToken));
    }

    #[test]
    fn rejects_other_hmac_algorithm_with_same_secret() {
        let keys = codec("dev-secret");
        let claims = Claims {
            user_id: 1,
            email: "a@b.co".into(),
            iat: OffsetDateTime::now_utc().unix_timestamp() as usize,
            exp: (OffsetDateTime::now_utc() + Duration::minutes(5)).unix_timestamp() as usize,
            iss: "test".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        assert!(matches!(keys.parse(&token), Err(AccountError::InvalidToken)));
    }

    #[test]
    fn rejects_unsigned_token() {
        // {"alg":"none","typ":"JWT"} . valid-looking claims . empty signature
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
            eyJ1c2VyX2lkIjoxLCJlbWFpbCI6ImFAYi5jbyIsImlhdCI6MSwiZXhwIjo5OTk5OTk5OTk5OSwiaXNzIjoidGVzdCJ9.";
        assert!(matches!(
            codec("dev-secret").parse(token),
            Err(AccountError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let expired = TokenCodec::new(b"dev-secret", "test", Duration::minutes(-10));
        let token = expired.sign(1, "a@b.co").unwrap();
        assert!(matches!(expired.parse(&token), Err(AccountError::InvalidToken)));
    }

    #[test]
    fn oversized_lifetime_is_an_error_not_a_panic() {
        let keys = TokenCodec::new(b"s", "i", Duration::days(365 * 10_000));
        let err = keys.sign(1, "a@b.co").unwrap_err();
        assert!(matches!(err, AccountError::TokenSigning(_)));
    }

    #[test]
    fn codec_from_config_uses_minutes() {
        let cfg = JwtConfig {
            secret: "dev-secret".into(),
            issuer: "test".into(),
            ttl_minutes: 5,
        };
        let keys = TokenCodec::from(&cfg);
        let token = keys.sign(3, "a@b.co").unwrap();
        assert_eq!(keys.parse(&token).unwrap().user_id, 3);
    }

    #[test]
    fn rejects_wrong_issuer() {
        let token = TokenCodec::new(b"same", "other", Duration::minutes(5))
            .sign(1, "a@b.co")
            .unwrap();
        let err = TokenCodec::new(b"same", "test", Duration::minutes(5))
            .parse(&token)
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidToken));
    }

    #[test]
    fn rejects_tampered_and_garbage_tokens() {
        let keys = codec("dev-secret");
        let token = keys.sign(1, "a@b.co").unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;
        let flipped = if token[sig_start..].starts_with('A') { "B" } else { "A" };
        let mut tampered = token.clone();
        tampered.replace_range(sig_start..sig_start + 1, flipped);
        assert!(keys.parse(&tampered).is_err());
        assert!(keys.parse("").is_err());
        assert!(keys.parse("not.a.jwt").is_err());
    }

    #[test]
    fn parse_bearer_header() {
        let keys = codec("dev-secret");
        let token = keys.sign(9, "a@b.co").unwrap();
        let identity = keys.parse_bearer(&format!("Bearer {token}")).unwrap();
        assert_eq!(identity.user_id, 9);
        assert!(matches!(keys.parse_bearer("Bearer "), Err(AccountError::InvalidToken)));
        assert!(matches!(keys.parse_bearer(&token), Err(AccountError::InvalidToken)));
    }
}
