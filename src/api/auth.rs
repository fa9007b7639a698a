//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the owner id. Issuing tokens
//! belongs to the identity provider; [`TokenKeys::mint`] exists for local
//! testing and the `docvault token` command.

use super::AppState;
use crate::error::VaultError;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for `owner_id` valid for `ttl`.
    pub fn mint(&self, owner_id: &str, ttl: Duration) -> Result<String, VaultError> {
        let now = Utc::now();
        let claims = Claims {
            sub: owner_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| VaultError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, VaultError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => VaultError::Unauthenticated("token expired".into()),
                _ => VaultError::Unauthenticated(format!("invalid token: {e}")),
            },
        )?;
        if data.claims.sub.trim().is_empty() {
            return Err(VaultError::Unauthenticated("token has no subject".into()));
        }
        Ok(data.claims)
    }
}

/// The authenticated owner of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

impl Owner {
    pub fn id(&self) -> &str {
        &self.0
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, VaultError> {
    let value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| VaultError::Unauthenticated("missing Authorization header".into()))?
        .to_str()
        .map_err(|_| VaultError::Unauthenticated("malformed Authorization header".into()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(VaultError::Unauthenticated(
            "expected a Bearer token".into(),
        )),
    }
}

impl FromRequestParts<AppState> for Owner {
    type Rejection = VaultError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        trace!("Verifying bearer token");
        let claims = state.keys.verify(token)?;
        debug!(owner_id = %claims.sub, "Authenticated request");
        Ok(Owner(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("http://localhost/documents");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn mint_then_verify() {
        let keys = TokenKeys::new("secret");
        let token = keys.mint("alice", Duration::hours(1)).unwrap();
        assert_eq!(keys.verify(&token).unwrap().sub, "alice");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let keys = TokenKeys::new("secret");
        let other = TokenKeys::new("other");
        let token = other.mint("alice", Duration::hours(1)).unwrap();
        assert!(matches!(keys.verify(&token), Err(VaultError::Unauthenticated(_))));

        let stale = keys.mint("alice", Duration::hours(-2)).unwrap();
        let err = keys.verify(&stale).unwrap_err();
        assert!(err.to_string().contains("expired"), "{err}");
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))).unwrap(), "abc");
        assert_eq!(bearer_token(&parts(Some("bearer  abc "))).unwrap(), "abc");
        assert!(bearer_token(&parts(None)).is_err());
        assert!(bearer_token(&parts(Some("Basic abc"))).is_err());
        assert!(bearer_token(&parts(Some("Bearer "))).is_err());
    }
}
