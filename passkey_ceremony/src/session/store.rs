use std::sync::Arc;

use crate::storage::{KeyValueStore, StorageError};
use crate::utils::{UtilError, gen_random_string};

use super::types::ChallengeSession;

const SESSION_PREFIX: &str = "session";
const SESSION_ID_LEN: usize = 16;

/// Typed access to `session:<sessionId>` records.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    ttl_secs: u64,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl_secs: u64) -> Self {
        Self { kv, ttl_secs }
    }

    /// Mints an identifier for a client that has no session yet.
    pub fn new_session_id() -> Result<String, UtilError> {
        gen_random_string(SESSION_ID_LEN)
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<ChallengeSession>, StorageError> {
        match self.kv.get(SESSION_PREFIX, session_id).await? {
            Some(json) => {
                let mut session: ChallengeSession = serde_json::from_str(&json)?;
                session.session_id = session_id.to_string();
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Returns the stored session, or an empty one persisted on the spot.
    pub async fn load_or_create(&self, session_id: &str) -> Result<ChallengeSession, StorageError> {
        if let Some(session) = self.get(session_id).await? {
            return Ok(session);
        }

        tracing::debug!("Creating new challenge session {}", session_id);
        let session = ChallengeSession::new(session_id);
        self.save(&session).await?;
        Ok(session)
    }

    pub async fn save(&self, session: &ChallengeSession) -> Result<(), StorageError> {
        let json = serde_json::to_string(session)?;
        self.kv
            .put_with_ttl(SESSION_PREFIX, &session.session_id, json, self.ttl_secs)
            .await
    }

    /// Records a freshly issued challenge for `email`, replacing any earlier one.
    pub async fn start_ceremony(
        &self,
        session_id: &str,
        email: &str,
        challenge: &str,
    ) -> Result<(), StorageError> {
        let mut session = self.load_or_create(session_id).await?;
        session.email = Some(email.to_string());
        session.current_challenge = Some(challenge.to_string());
        self.save(&session).await
    }

    /// Drops the current challenge so it can never be presented again.
    pub async fn clear_challenge(&self, session: &ChallengeSession) -> Result<(), StorageError> {
        let cleared = ChallengeSession {
            current_challenge: None,
            ..session.clone()
        };
        self.save(&cleared).await?;
        tracing::debug!("Cleared challenge for session {}", session.session_id);
        Ok(())
    }
}
