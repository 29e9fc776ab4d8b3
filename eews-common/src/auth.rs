//! OAuth2 access token resolution for Google Cloud APIs
//!
//! **Priority:** ENV → gcloud CLI
//!
//! The token is resolved once per run; runs are short batch jobs well within
//! a token's lifetime.

use crate::{Error, Result};
use std::process::Command;
use tracing::{debug, info};

/// Environment variable holding a ready-made bearer token
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Resolve a bearer token for storage and model calls
pub fn resolve_access_token() -> Result<String> {
    if let Some(token) = token_from_env() {
        info!("Access token loaded from {}", ACCESS_TOKEN_ENV);
        return Ok(token);
    }

    debug!("{} not set, asking gcloud for a token", ACCESS_TOKEN_ENV);
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .map_err(|e| Error::Auth(format!("Could not run gcloud: {}", e)))?;

    if !output.status.success() {
        return Err(Error::Auth(format!(
            "gcloud auth print-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !is_valid_token(&token) {
        return Err(Error::Auth("gcloud returned an empty access token".to_string()));
    }
    info!("Access token obtained from gcloud");
    Ok(token)
}

fn token_from_env() -> Option<String> {
    std::env::var(ACCESS_TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| is_valid_token(t))
}

/// Validate token (non-empty, non-whitespace)
pub fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}
