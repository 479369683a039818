//! Shared application state for the API server.

use std::sync::Arc;

use grader::io::progress::ProgressLedger;
use grader::io::shares::ShareLedger;
use grader::submit::Grader;

use crate::auth::TokenAuth;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runtime, rule table, and achievement store. Read-only per request.
    pub grader: Grader,
    /// Verifies bearer tokens on authenticated routes.
    pub auth: Arc<TokenAuth>,
    pub progress: Arc<ProgressLedger>,
    pub shares: Arc<ShareLedger>,
    /// Frontend base URL used to build share links.
    pub public_url: Arc<str>,
}

impl AppState {
    pub fn new(
        grader: Grader,
        auth: TokenAuth,
        progress: ProgressLedger,
        shares: ShareLedger,
        public_url: &str,
    ) -> Self {
        Self {
            grader,
            auth: Arc::new(auth),
            progress: Arc::new(progress),
            shares: Arc::new(shares),
            public_url: Arc::from(public_url.trim_end_matches('/')),
        }
    }
}
