use thiserror::Error;

use crate::passkey::PasskeyError;
use crate::storage::StorageError;
use crate::utils::UtilError;

/// Ways a ceremony can fail.
///
/// Only [`CeremonyError::message`] ever reaches the client; the wrapped
/// verification and storage errors are for logs.
#[derive(Debug, Error)]
pub enum CeremonyError {
    #[error("User already exists")]
    UserAlreadyExists,

    #[error("User does not exist")]
    UserDoesNotExist,

    /// No pending challenge for this session
    #[error("Session expired")]
    SessionExpired,

    #[error("Registration failed: {0}")]
    RegistrationFailed(PasskeyError),

    /// The attested credential is already bound to another account
    #[error("Credential is already registered")]
    CredentialInUse,

    #[error("Authenticator is not registered with this site")]
    AuthenticatorNotRegistered,

    #[error("Login failed: {0}")]
    LoginFailed(PasskeyError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CeremonyError {
    /// Text safe to show the client. Login failures deliberately carry none.
    pub fn message(&self) -> Option<String> {
        let message = match self {
            Self::UserAlreadyExists => "User already exists",
            Self::UserDoesNotExist => "User does not exist",
            Self::SessionExpired => "Session expired",
            Self::RegistrationFailed(_) | Self::CredentialInUse => "Registration failed",
            Self::AuthenticatorNotRegistered => "Authenticator is not registered with this site",
            Self::LoginFailed(_) => return None,
            Self::InvalidInput(msg) => return Some(msg.clone()),
            Self::Storage(_) | Self::Internal(_) => "Internal error",
        };
        Some(message.to_string())
    }

    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::Storage(_) | Self::Internal(_) => tracing::error!("{}", self),
            Self::RegistrationFailed(_) | Self::LoginFailed(_) | Self::CredentialInUse => {
                tracing::warn!("{}", self)
            }
            _ => tracing::info!("{}", self),
        }
        self
    }
}

impl From<StorageError> for CeremonyError {
    fn from(err: StorageError) -> Self {
        let error = Self::Storage(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<UtilError> for CeremonyError {
    fn from(err: UtilError) -> Self {
        let error = Self::Internal(err.to_string());
        tracing::error!("{}", error);
        error
    }
}
