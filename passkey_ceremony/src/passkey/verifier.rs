use super::attestation::{parse_attestation_object, verify_attestation};
use super::auth_data::AuthenticatorData;
use super::client_data::{CeremonyType, ParsedClientData};
use super::cose::CoseKey;
use super::errors::PasskeyError;
use super::types::{AuthenticationResponse, RegistrationResponse};
use crate::utils::{base64url_decode, base64url_encode};

/// What the relying party expects of a registration response.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationExpectations<'a> {
    /// The single challenge issued for this ceremony
    pub challenge: &'a str,
    pub origin: &'a str,
    pub rp_id: &'a str,
    pub require_user_verification: bool,
    /// COSE algorithms advertised in the creation options
    pub algorithms: &'a [i64],
}

/// What the relying party expects of an authentication response.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticationExpectations<'a> {
    pub challenge: &'a str,
    pub origin: &'a str,
    pub rp_id: &'a str,
    /// Stored COSE_Key of the credential being asserted
    pub public_key_cose: &'a [u8],
    pub prior_sign_count: u32,
    pub require_user_verification: bool,
}

/// Facts extracted from a verified registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInfo {
    /// base64url (unpadded) credential ID
    pub credential_id: String,
    pub public_key_cose: Vec<u8>,
    pub aaguid: String,
    pub fmt: String,
    pub alg: i64,
    pub sign_count: u32,
    pub user_verified: bool,
}

/// Facts extracted from a verified assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticationInfo {
    pub new_sign_count: u32,
    pub user_verified: bool,
}

/// Cryptographic checks on signed client responses.
///
/// Implementations are pure: they never touch a store, so the ceremony layer
/// stays in charge of every state transition.
pub trait SignatureVerifier: Send + Sync {
    fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &RegistrationExpectations<'_>,
    ) -> Result<RegistrationInfo, PasskeyError>;

    fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &AuthenticationExpectations<'_>,
    ) -> Result<AuthenticationInfo, PasskeyError>;
}

/// WebAuthn Level 2 verification for "none" attestation with ES256 and RS256
/// credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebAuthnVerifier;

impl WebAuthnVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl SignatureVerifier for WebAuthnVerifier {
    fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &RegistrationExpectations<'_>,
    ) -> Result<RegistrationInfo, PasskeyError> {
        response.validate()?;

        let client_data = ParsedClientData::from_base64(&response.response.client_data_json)?;
        client_data.verify(CeremonyType::Create, expected.challenge, expected.origin)?;

        let attestation = parse_attestation_object(&response.response.attestation_object)?;
        let auth_data = AuthenticatorData::parse(attestation.auth_data.clone())?;
        auth_data.verify(expected.rp_id, expected.require_user_verification)?;
        verify_attestation(&attestation)?;

        let credential = auth_data.attested_credential.as_ref().ok_or_else(|| {
            PasskeyError::AuthenticatorData("No attested credential data present".to_string())
        })?;

        let raw_id = base64url_decode(&response.raw_id)?;
        if credential.credential_id != raw_id {
            return Err(PasskeyError::AuthenticatorData(
                "Credential ID in authenticator data does not match rawId".to_string(),
            ));
        }

        let key = CoseKey::from_bytes(&credential.public_key_cose)?;
        if !expected.algorithms.contains(&key.alg()) {
            return Err(PasskeyError::Verification(format!(
                "Algorithm {} was not offered",
                key.alg()
            )));
        }

        tracing::debug!(
            "Registration verified: fmt={}, alg={}, aaguid={}",
            attestation.fmt,
            key.alg(),
            credential.aaguid_string()
        );

        Ok(RegistrationInfo {
            credential_id: base64url_encode(&credential.credential_id),
            public_key_cose: credential.public_key_cose.clone(),
            aaguid: credential.aaguid_string(),
            fmt: attestation.fmt.clone(),
            alg: key.alg(),
            sign_count: auth_data.counter,
            user_verified: auth_data.is_user_verified(),
        })
    }

    fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &AuthenticationExpectations<'_>,
    ) -> Result<AuthenticationInfo, PasskeyError> {
        response.validate()?;

        let client_data = ParsedClientData::from_base64(&response.response.client_data_json)?;
        client_data.verify(CeremonyType::Get, expected.challenge, expected.origin)?;

        let auth_data = AuthenticatorData::from_base64(&response.response.authenticator_data)?;
        auth_data.verify(expected.rp_id, expected.require_user_verification)?;

        let key = CoseKey::from_bytes(expected.public_key_cose)?;
        let signature = base64url_decode(&response.response.signature)
            .map_err(|e| PasskeyError::Format(format!("Invalid signature: {e}")))?;

        let mut signed_data = Vec::with_capacity(auth_data.raw_data.len() + 32);
        signed_data.extend_from_slice(&auth_data.raw_data);
        signed_data.extend_from_slice(client_data.hash().as_ref());

        key.verify(&signed_data, &signature)?;
        tracing::debug!("Signature verification successful");

        verify_counter(expected.prior_sign_count, auth_data.counter)?;

        Ok(AuthenticationInfo {
            new_sign_count: auth_data.counter,
            user_verified: auth_data.is_user_verified(),
        })
    }
}

/// A counter that fails to advance past a nonzero stored value means the
/// credential may have been cloned. Authenticators that never count report 0.
fn verify_counter(stored: u32, received: u32) -> Result<(), PasskeyError> {
    if stored == 0 && received == 0 {
        return Ok(());
    }
    if stored != 0 && received <= stored {
        tracing::warn!(
            "Counter regression: stored {}, received {}. Possible cloned authenticator",
            stored,
            received
        );
        return Err(PasskeyError::Counter(format!(
            "Counter did not increase: stored {stored}, received {received}"
        )));
    }
    Ok(())
}
