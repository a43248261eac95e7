//! Caller identity as supplied by the upstream sign-in layer.
//!
//! The OAuth exchange happens outside this server. Its result arrives as two
//! headers: `Authorization: Bearer <token>` carries the delegated credential
//! and `X-Snipvault-User` carries the username.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use snipvault_store::Credential;
use std::convert::Infallible;

/// Header carrying the signed-in username.
pub const USER_HEADER: &str = "x-snipvault-user";

/// Who is calling, if anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub username: Option<String>,
    pub credential: Option<Credential>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed in with both a username and a credential.
    pub fn is_signed_in(&self) -> bool {
        self.username.is_some() && self.credential.is_some()
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let credential = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                let (scheme, token) = v.trim().split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|t| !t.is_empty())
            .map(Credential::new);

        let username = headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        Self {
            username,
            credential,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_reads_bearer_and_user() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer gho_abc"));
        headers.insert(USER_HEADER, HeaderValue::from_static(" alice "));

        let identity = Identity::from_headers(&headers);
        assert_eq!(identity.username.as_deref(), Some("alice"));
        assert_eq!(identity.credential.as_ref().map(|c| c.token()), Some("gho_abc"));
        assert!(identity.is_signed_in());
    }

    #[test]
    fn test_ignores_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        let identity = Identity::from_headers(&headers);
        assert!(identity.credential.is_none());
        assert!(!identity.is_signed_in());
    }

    #[test]
    fn test_no_headers_is_anonymous() {
        assert_eq!(Identity::from_headers(&HeaderMap::new()), Identity::anonymous());
    }
}
