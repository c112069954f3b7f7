//! Authentication adapters
//!
//! Implementations of the AuthPort:
//! - Firebase ID tokens (Identity Toolkit lookup)

pub mod firebase;

pub use firebase::FirebaseAuthService;
