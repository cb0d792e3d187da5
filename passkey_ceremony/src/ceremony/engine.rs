use std::sync::Arc;

use crate::config::RelyingPartyConfig;
use crate::passkey::{COSE_ALG_ES256, COSE_ALG_RS256, SignatureVerifier, WebAuthnVerifier};
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::userdb::CredentialStore;

use super::errors::CeremonyError;

/// COSE algorithms offered at registration, in preference order.
pub(super) const SUPPORTED_ALGORITHMS: [i64; 2] = [COSE_ALG_ES256, COSE_ALG_RS256];

/// Drives registration and login ceremonies for one relying party.
///
/// All state that must survive between a begin and its complete lives in the
/// injected store, so any number of engines may serve the same deployment.
#[derive(Clone)]
pub struct CeremonyEngine {
    pub(super) config: RelyingPartyConfig,
    pub(super) credentials: CredentialStore,
    pub(super) sessions: SessionStore,
    pub(super) verifier: Arc<dyn SignatureVerifier>,
}

impl CeremonyEngine {
    pub fn new(config: RelyingPartyConfig, kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_verifier(config, kv, Arc::new(WebAuthnVerifier::new()))
    }

    pub fn with_verifier(
        config: RelyingPartyConfig,
        kv: Arc<dyn KeyValueStore>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let sessions = SessionStore::new(kv.clone(), config.session_ttl_secs);
        Self {
            credentials: CredentialStore::new(kv),
            sessions,
            verifier,
            config,
        }
    }

    pub fn config(&self) -> &RelyingPartyConfig {
        &self.config
    }

    pub fn credential_store(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.sessions
    }
}

pub(super) fn validate_email(email: &str) -> Result<&str, CeremonyError> {
    if email.trim().is_empty() {
        return Err(CeremonyError::InvalidInput(
            "Email must not be empty".to_string(),
        ));
    }
    Ok(email)
}
