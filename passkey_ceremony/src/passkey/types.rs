use serde::{Deserialize, Serialize};

use super::errors::PasskeyError;
use crate::utils::base64url_decode;

pub(crate) const PUBLIC_KEY_TYPE: &str = "public-key";

/// Transport hints an authenticator reports and a client may use to reach it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorTransport {
    Usb,
    Nfc,
    Ble,
    SmartCard,
    Hybrid,
    Internal,
    Cable,
    /// Any hint this server does not recognise; never stored or sent back
    #[serde(other)]
    Unknown,
}

/// Options for `navigator.credentials.create()`.
///
/// The user handle and name are both the account email. Attestation is always
/// `"none"` and resident keys are discouraged.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub challenge: String,
    pub rp: RelyingParty,
    pub user: PublicKeyCredentialUserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub timeout: u32,
    pub attestation: String,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
}

impl RegistrationOptions {
    /// COSE algorithm identifiers offered to the authenticator, in preference order.
    pub fn supported_algorithm_ids(&self) -> Vec<i64> {
        self.pub_key_cred_params.iter().map(|p| p.alg).collect()
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct RelyingParty {
    pub name: String,
    pub id: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialUserEntity {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub type_: String,
    pub alg: i64,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub resident_key: String,
    pub require_resident_key: bool,
    pub user_verification: String,
}

/// Reference to an existing credential, used in allow and exclude lists.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CredentialDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<AuthenticatorTransport>,
}

/// Options for `navigator.credentials.get()`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: String,
    pub timeout: u32,
    pub rp_id: String,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: String,
}

/// Credential returned by the client after `navigator.credentials.create()`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AuthenticatorAttestationResponse,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(default)]
    pub transports: Vec<AuthenticatorTransport>,
}

/// Assertion returned by the client after `navigator.credentials.get()`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AuthenticatorAssertionResponse,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

fn validate_credential_envelope(id: &str, raw_id: &str, type_: &str) -> Result<(), PasskeyError> {
    if type_ != PUBLIC_KEY_TYPE {
        return Err(PasskeyError::Format(format!(
            "Unexpected credential type: {type_}"
        )));
    }
    if id != raw_id {
        return Err(PasskeyError::Format("id and rawId differ".to_string()));
    }
    if base64url_decode(raw_id)?.is_empty() {
        return Err(PasskeyError::Format("Empty credential ID".to_string()));
    }
    Ok(())
}

impl RegistrationResponse {
    /// Structural checks applied before any cryptographic verification.
    pub fn validate(&self) -> Result<(), PasskeyError> {
        validate_credential_envelope(&self.id, &self.raw_id, &self.type_)
    }
}

impl AuthenticatorAttestationResponse {
    /// Reported transports without the ones this server does not recognise.
    pub fn known_transports(&self) -> Vec<AuthenticatorTransport> {
        self.transports
            .iter()
            .copied()
            .filter(|t| *t != AuthenticatorTransport::Unknown)
            .collect()
    }
}

impl AuthenticationResponse {
    /// Structural checks applied before any cryptographic verification.
    pub fn validate(&self) -> Result<(), PasskeyError> {
        validate_credential_envelope(&self.id, &self.raw_id, &self.type_)
    }
}
