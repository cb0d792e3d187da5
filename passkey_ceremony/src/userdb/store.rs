use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::storage::{KeyValueStore, StorageError};

use super::types::User;

const USER_PREFIX: &str = "user";
const CREDENTIAL_PREFIX: &str = "credential";
const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Outcome of a conditional user creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCreation {
    Created,
    /// A user with this email is already stored; nothing was written
    UserExists,
    /// One of the user's credential IDs belongs to another user; nothing was written
    CredentialInUse,
}

/// Outcome of recording a verified login against the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRecord {
    Updated,
    /// The stored count already reached the reported one; nothing was written
    CounterRegressed { stored: u32 },
    /// The user or the device is gone; nothing was written
    Missing,
}

/// Typed access to `user:<email>` records.
///
/// Credential ID uniqueness across users is kept with a
/// `credential:<credentialID>` → email index claimed before the user record.
#[derive(Clone)]
pub struct CredentialStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn find_user(&self, email: &str) -> Result<Option<User>, StorageError> {
        match self.kv.get(USER_PREFIX, email).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Email owning `credential_id`, if any user has registered it.
    pub async fn credential_owner(
        &self,
        credential_id: &str,
    ) -> Result<Option<String>, StorageError> {
        self.kv.get(CREDENTIAL_PREFIX, credential_id).await
    }

    /// Creates `user` only if neither the email nor any of its credential IDs
    /// are taken. Both checks are conditional writes, never read-then-write.
    pub async fn create_user(&self, user: &User) -> Result<UserCreation, StorageError> {
        let json = serde_json::to_string(user)?;

        let mut claimed = Vec::with_capacity(user.devices.len());
        for device in &user.devices {
            let won = match self
                .kv
                .put_if_not_exists(
                    CREDENTIAL_PREFIX,
                    &device.credential_id,
                    user.email.clone(),
                    0,
                )
                .await
            {
                Ok(won) => won,
                Err(e) => {
                    self.release_claims(&claimed).await;
                    return Err(e);
                }
            };
            if !won {
                tracing::warn!(
                    "Credential {} is already registered to another user",
                    device.credential_id
                );
                self.release_claims(&claimed).await;
                return Ok(UserCreation::CredentialInUse);
            }
            claimed.push(device.credential_id.as_str());
        }

        match self
            .kv
            .put_if_not_exists(USER_PREFIX, &user.email, json, 0)
            .await
        {
            Ok(true) => {
                tracing::info!("Created user {} with {} device(s)", user.email, claimed.len());
                Ok(UserCreation::Created)
            }
            Ok(false) => {
                tracing::debug!("User {} already exists", user.email);
                self.release_claims(&claimed).await;
                Ok(UserCreation::UserExists)
            }
            Err(e) => {
                self.release_claims(&claimed).await;
                Err(e)
            }
        }
    }

    /// Stores `sign_count` and `used_at` for one device, but only while the
    /// stored count is zero or below the new one.
    ///
    /// The record is re-read and swapped conditionally, so a concurrent login
    /// that already advanced the count makes this one report a regression.
    pub async fn record_login(
        &self,
        email: &str,
        credential_id: &str,
        sign_count: u32,
        used_at: DateTime<Utc>,
    ) -> Result<LoginRecord, StorageError> {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let Some(current) = self.kv.get(USER_PREFIX, email).await? else {
                return Ok(LoginRecord::Missing);
            };
            let mut user: User = serde_json::from_str(&current)?;
            let Some(device) = user.find_device_mut(credential_id) else {
                return Ok(LoginRecord::Missing);
            };

            let stored = device.sign_count;
            if stored != 0 && sign_count <= stored {
                return Ok(LoginRecord::CounterRegressed { stored });
            }
            device.sign_count = sign_count;
            device.last_used_at = Some(used_at);

            let json = serde_json::to_string(&user)?;
            if self
                .kv
                .compare_and_swap(USER_PREFIX, email, &current, json)
                .await?
            {
                return Ok(LoginRecord::Updated);
            }
            tracing::debug!("User {} changed during login, retrying", email);
        }

        Err(StorageError::Storage(format!(
            "User {email} kept changing; gave up after {MAX_UPDATE_ATTEMPTS} attempts"
        )))
    }

    /// Failed releases are logged, not returned.
    async fn release_claims(&self, credential_ids: &[&str]) {
        for id in credential_ids {
            if let Err(e) = self.kv.remove(CREDENTIAL_PREFIX, id).await {
                tracing::error!("Failed to release claim on credential {}: {}", id, e);
            }
        }
    }
}
