//! Firebase ID token verification
//!
//! Implements the AuthPort by asking the Identity Toolkit which account a
//! token belongs to. Rejected tokens resolve to `None`.

use crate::error::{AppError, Result};
use crate::ports::auth::AuthPort;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

/// Firebase auth implementation
pub struct FirebaseAuthService {
    client: Client,
    web_api_key: String,
}

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    #[serde(rename = "idToken")]
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(rename = "localId")]
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

impl FirebaseAuthService {
    /// Create a verifier for the project owning `web_api_key`
    pub fn new(web_api_key: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            web_api_key,
        })
    }

    fn first_uid(response: LookupResponse) -> Option<String> {
        response
            .users
            .into_iter()
            .map(|u| u.local_id)
            .find(|uid| !uid.is_empty())
    }
}

#[async_trait]
impl AuthPort for FirebaseAuthService {
    async fn verify_token(&self, id_token: &str) -> Result<Option<String>> {
        if !self.is_configured() || id_token.is_empty() {
            return Ok(None);
        }

        let response = self
            .client
            .post(format!("{}/accounts:lookup", IDENTITY_TOOLKIT_BASE))
            .query(&[("key", &self.web_api_key)])
            .json(&LookupRequest { id_token })
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Token lookup failed: {}", e)))?;

        if response.status().is_client_error() {
            // Expired, revoked or malformed token
            log::debug!("Token rejected: {}", response.status());
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::Auth(format!(
                "Token lookup failed: {}",
                response.status()
            )));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse lookup response: {}", e)))?;
        Ok(Self::first_uid(lookup))
    }

    fn is_configured(&self) -> bool {
        !self.web_api_key.is_empty()
    }
}
