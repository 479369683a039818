//! Bearer-token identity for authenticated routes.
//!
//! Tokens have the form `<user-id>.<hex sha256(secret:user-id:secret)>`. Issuing
//! them to learners (magic links, sessions) happens elsewhere; this module only
//! mints and verifies.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::routes::ApiError;
use crate::state::AppState;

/// Mints and verifies user tokens with a server secret.
pub struct TokenAuth {
    secret: String,
}

impl TokenAuth {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, user_id: &str) -> String {
        format!("{user_id}.{}", self.signature(user_id))
    }

    /// User id carried by `token`, if its signature is valid.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (user_id, signature) = token.rsplit_once('.')?;
        if user_id.is_empty() {
            return None;
        }
        let expected = self.signature(user_id);
        constant_time_eq(expected.as_bytes(), signature.as_bytes()).then(|| user_id.to_string())
    }

    fn signature(&self, user_id: &str) -> String {
        let digest = Sha256::new()
            .chain_update(self.secret.as_bytes())
            .chain_update(b":")
            .chain_update(user_id.as_bytes())
            .chain_update(b":")
            .chain_update(self.secret.as_bytes())
            .finalize();
        hex::encode(digest)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Authenticated caller, extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "Unauthorized: missing or invalid token",
                )
            })?;

        match state.auth.verify(token.trim()) {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                debug!("rejected bearer token");
                Err(ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "Unauthorized: invalid token",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::Request;
    use grader::core::rules::builtin_table;
    use grader::io::achievements::LedgerStore;
    use grader::io::progress::ProgressLedger;
    use grader::io::shares::ShareLedger;
    use grader::submit::Grader;
    use grader::test_support::{ScriptedRuntime, printed};

    fn state() -> AppState {
        let grader = Grader::new(
            Arc::new(ScriptedRuntime::always(printed(&[]))),
            builtin_table(),
            Arc::new(LedgerStore::in_memory()),
        );
        AppState::new(
            grader,
            TokenAuth::new("test-secret"),
            ProgressLedger::in_memory(),
            ShareLedger::in_memory(),
            "http://localhost:5173",
        )
    }

    async fn extract(header: Option<&str>) -> Result<AuthUser, ApiError> {
        let mut builder = Request::builder().uri("/api/code/validate");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, ()) = builder.body(()).expect("request").into_parts();
        AuthUser::from_request_parts(&mut parts, &state()).await
    }

    #[test]
    fn issued_tokens_verify() {
        let auth = TokenAuth::new("s3cret");
        let token = auth.issue("user.with.dots");
        assert_eq!(auth.verify(&token).as_deref(), Some("user.with.dots"));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let auth = TokenAuth::new("s3cret");
        let token = auth.issue("alice");
        let forged = token.replacen("alice", "mallory", 1);
        assert_eq!(auth.verify(&forged), None);
        assert_eq!(TokenAuth::new("other").verify(&token), None);
        assert_eq!(auth.verify("no-signature"), None);
        assert_eq!(auth.verify(&format!(".{}", auth.signature(""))), None);
    }

    #[tokio::test]
    async fn extractor_accepts_valid_bearer() {
        let token = TokenAuth::new("test-secret").issue("u1");
        let user = extract(Some(&format!("Bearer {token}"))).await.expect("auth");
        assert_eq!(user, AuthUser("u1".to_string()));
    }

    #[tokio::test]
    async fn extractor_rejects_missing_and_bad_tokens() {
        for header in [None, Some("Basic abc"), Some("Bearer u1.deadbeef")] {
            let err = extract(header).await.expect_err("should reject");
            assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        }
    }
}
