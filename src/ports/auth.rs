/// Authentication port trait
///
/// Implementations: Firebase ID tokens.
use crate::error::Result;
use async_trait::async_trait;

/// Port trait for bearer-token verification
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthPort: Send + Sync {
    /// Resolve a bearer token to a user id
    ///
    /// `Ok(None)` means the token was not accepted; errors are reserved for
    /// the verification service being unreachable.
    async fn verify_token(&self, id_token: &str) -> Result<Option<String>>;

    /// Check if verification is configured
    fn is_configured(&self) -> bool;
}
