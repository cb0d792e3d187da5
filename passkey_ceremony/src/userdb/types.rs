use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::passkey::AuthenticatorTransport;

/// A registered account, keyed by email in the store.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct User {
    pub email: String,
    pub devices: Vec<Device>,
}

/// One public-key credential bound to a user.
///
/// Binary fields are kept as base64url text so the record stays plain JSON.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(rename = "credentialID")]
    pub credential_id: String,
    /// COSE_Key encoding of the credential public key
    #[serde(rename = "publicKeyCOSE")]
    pub public_key_cose: String,
    pub sign_count: u32,
    #[serde(default)]
    pub transports: Vec<AuthenticatorTransport>,
    /// AAGUID of the authenticator model, hyphenated
    #[serde(default)]
    pub aaguid: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(email: String, device: Device) -> Self {
        Self {
            email,
            devices: vec![device],
        }
    }

    /// Finds a device by exact credential ID text.
    pub fn find_device(&self, credential_id: &str) -> Option<&Device> {
        self.devices
            .iter()
            .find(|d| d.credential_id == credential_id)
    }

    pub(crate) fn find_device_mut(&mut self, credential_id: &str) -> Option<&mut Device> {
        self.devices
            .iter_mut()
            .find(|d| d.credential_id == credential_id)
    }
}
