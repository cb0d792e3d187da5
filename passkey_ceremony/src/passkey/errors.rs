use thiserror::Error;

use crate::utils::UtilError;

/// Errors that can occur while verifying WebAuthn ceremony responses.
///
/// These carry diagnostic detail for logs. The ceremony layer reduces them to
/// a plain failed outcome before anything reaches the client.
#[derive(Debug, Error)]
pub enum PasskeyError {
    /// Error related to relying-party configuration (e.g., invalid RP ID or origin)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The signed challenge is not the one issued for this session
    #[error("Invalid challenge: {0}")]
    Challenge(String),

    /// Error validating the client data JSON from the browser
    #[error("Invalid client data: {0}")]
    ClientData(String),

    /// Error parsing or validating the authenticator data structure
    #[error("Invalid authenticator data: {0}")]
    AuthenticatorData(String),

    /// Unsupported or malformed attestation statement
    #[error("Attestation error: {0}")]
    Attestation(String),

    /// Error during cryptographic verification of WebAuthn assertions
    #[error("Verification error: {0}")]
    Verification(String),

    /// Sign count did not advance, a possible cloned authenticator
    #[error("Counter error: {0}")]
    Counter(String),

    /// Error with improperly formatted data
    #[error("Invalid format: {0}")]
    Format(String),

    /// Error from utility operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),

    /// Error from JSON serialization/deserialization
    #[error("Serde error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
