use ring::digest;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::errors::PasskeyError;
use crate::utils::base64url_decode;

/// Ceremony type recorded by the client in `clientDataJSON.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CeremonyType {
    Create,
    Get,
}

impl CeremonyType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Create => "webauthn.create",
            Self::Get => "webauthn.get",
        }
    }
}

#[derive(Deserialize, Debug)]
struct WebAuthnClientData {
    #[serde(rename = "type")]
    type_: String,
    challenge: String, // base64url encoded
    origin: String,
}

#[derive(Debug)]
pub(super) struct ParsedClientData {
    pub(super) challenge: String,
    pub(super) origin: String,
    pub(super) type_: String,
    /// Exact bytes the client hashed; the signature covers these, not a re-serialisation
    pub(super) raw_data: Vec<u8>,
}

impl ParsedClientData {
    pub(super) fn from_base64(client_data_json: &str) -> Result<Self, PasskeyError> {
        let raw_data = base64url_decode(client_data_json)
            .map_err(|e| PasskeyError::Format(format!("Failed to decode: {e}")))?;

        let data: WebAuthnClientData = serde_json::from_slice(&raw_data)
            .map_err(|e| PasskeyError::ClientData(format!("Invalid client data JSON: {e}")))?;

        Ok(Self {
            challenge: data.challenge,
            origin: data.origin,
            type_: data.type_,
            raw_data,
        })
    }

    /// Checks type, challenge and origin against what this relying party expects.
    pub(super) fn verify(
        &self,
        ceremony: CeremonyType,
        expected_challenge: &str,
        expected_origin: &str,
    ) -> Result<(), PasskeyError> {
        if self.type_ != ceremony.as_str() {
            return Err(PasskeyError::ClientData(format!(
                "Invalid type. Expected '{}', Got: {}",
                ceremony.as_str(),
                self.type_
            )));
        }

        let expected = base64url_decode(expected_challenge)
            .map_err(|_| PasskeyError::Challenge("Stored challenge is not base64url".into()))?;
        let received = base64url_decode(&self.challenge)
            .map_err(|_| PasskeyError::Challenge("Client challenge is not base64url".into()))?;

        if !bool::from(expected.ct_eq(&received)) {
            tracing::debug!(
                "Challenge mismatch: expected {}, got {}",
                expected_challenge,
                self.challenge
            );
            return Err(PasskeyError::Challenge(
                "Challenge mismatch. For more details, run with RUST_LOG=debug".into(),
            ));
        }

        if self.origin != expected_origin {
            return Err(PasskeyError::ClientData(format!(
                "Invalid origin. Expected: {}, Got: {}",
                expected_origin, self.origin
            )));
        }

        Ok(())
    }

    pub(super) fn hash(&self) -> digest::Digest {
        digest::digest(&digest::SHA256, &self.raw_data)
    }
}
