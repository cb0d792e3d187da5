use ciborium::value::Value as CborValue;
use ring::digest;
use uuid::Uuid;

use super::errors::PasskeyError;
use crate::utils::base64url_decode;

/// Flags for AuthenticatorData as defined in WebAuthn Level 2
mod auth_data_flags {
    /// User Present (UP) - Bit 0
    pub(super) const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub(super) const UV: u8 = 1 << 2;
    /// Backup Eligibility (BE) - Bit 3
    pub(super) const BE: u8 = 1 << 3;
    /// Backup State (BS) - Bit 4
    pub(super) const BS: u8 = 1 << 4;
    /// Attested Credential Data Present - Bit 6
    pub(super) const AT: u8 = 1 << 6;
    /// Extension Data Present - Bit 7
    pub(super) const ED: u8 = 1 << 7;
}

const RP_ID_HASH_LEN: usize = 32;
const HEADER_LEN: usize = 37;
const AAGUID_LEN: usize = 16;
const MAX_CREDENTIAL_ID_LEN: usize = 1023;

/// AuthenticatorData structure as defined in WebAuthn Level 2
/// https://www.w3.org/TR/webauthn-2/#sctn-authenticator-data
#[derive(Debug)]
pub(super) struct AuthenticatorData {
    /// SHA-256 hash of the RP ID (32 bytes)
    pub(super) rp_id_hash: Vec<u8>,
    pub(super) flags: u8,
    /// Signature counter, 32-bit unsigned big-endian
    pub(super) counter: u32,
    /// Present only when the AT flag is set (registration)
    pub(super) attested_credential: Option<AttestedCredentialData>,
    /// Raw authenticator data, part of the signed message
    pub(super) raw_data: Vec<u8>,
}

#[derive(Debug)]
pub(super) struct AttestedCredentialData {
    pub(super) aaguid: [u8; AAGUID_LEN],
    pub(super) credential_id: Vec<u8>,
    /// COSE_Key, re-encoded as a standalone CBOR item
    pub(super) public_key_cose: Vec<u8>,
}

impl AttestedCredentialData {
    pub(super) fn aaguid_string(&self) -> String {
        Uuid::from_bytes(self.aaguid).hyphenated().to_string()
    }
}

impl AuthenticatorData {
    pub(super) fn from_base64(auth_data: &str) -> Result<Self, PasskeyError> {
        let data = base64url_decode(auth_data)
            .map_err(|e| PasskeyError::Format(format!("Failed to decode: {e}")))?;
        Self::parse(data)
    }

    /// Format (minimum 37 bytes):
    /// - RP ID Hash (32 bytes)
    /// - Flags (1 byte)
    /// - Counter (4 bytes)
    /// - Optional: Attested Credential Data
    /// - Optional: Extensions
    pub(super) fn parse(data: Vec<u8>) -> Result<Self, PasskeyError> {
        if data.len() < HEADER_LEN {
            return Err(PasskeyError::AuthenticatorData(
                "Authenticator data too short. For more details, run with RUST_LOG=debug".into(),
            ));
        }

        let flags = data[RP_ID_HASH_LEN];
        let attested_credential = if flags & auth_data_flags::AT != 0 {
            Some(parse_attested_credential_data(&data[HEADER_LEN..])?)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash: data[..RP_ID_HASH_LEN].to_vec(),
            flags,
            counter: u32::from_be_bytes([data[33], data[34], data[35], data[36]]),
            attested_credential,
            raw_data: data,
        })
    }

    /// Check if user was present during the ceremony
    pub(super) fn is_user_present(&self) -> bool {
        (self.flags & auth_data_flags::UP) != 0
    }

    /// Check if user was verified by the authenticator
    pub(super) fn is_user_verified(&self) -> bool {
        (self.flags & auth_data_flags::UV) != 0
    }

    pub(super) fn is_backup_eligible(&self) -> bool {
        (self.flags & auth_data_flags::BE) != 0
    }

    pub(super) fn is_backed_up(&self) -> bool {
        (self.flags & auth_data_flags::BS) != 0
    }

    pub(super) fn has_extension_data(&self) -> bool {
        (self.flags & auth_data_flags::ED) != 0
    }

    /// Checks the RP ID hash and the user presence/verification flags.
    pub(super) fn verify(
        &self,
        expected_rp_id: &str,
        require_user_verification: bool,
    ) -> Result<(), PasskeyError> {
        let expected_hash = digest::digest(&digest::SHA256, expected_rp_id.as_bytes());
        if self.rp_id_hash != expected_hash.as_ref() {
            return Err(PasskeyError::AuthenticatorData(format!(
                "Invalid RP ID hash. Expected: {:?}, Got: {:?}",
                expected_hash.as_ref(),
                self.rp_id_hash
            )));
        }

        if !self.is_user_present() {
            return Err(PasskeyError::AuthenticatorData(
                "User not present. For more details, run with RUST_LOG=debug".into(),
            ));
        }

        if require_user_verification && !self.is_user_verified() {
            return Err(PasskeyError::AuthenticatorData(format!(
                "User verification required but flag not set. Flags: {:02x}",
                self.flags
            )));
        }

        tracing::debug!(
            "Authenticator data verified: UP={}, UV={}, BE={}, BS={}, ED={}, counter={}",
            self.is_user_present(),
            self.is_user_verified(),
            self.is_backup_eligible(),
            self.is_backed_up(),
            self.has_extension_data(),
            self.counter
        );

        Ok(())
    }
}

fn parse_attested_credential_data(data: &[u8]) -> Result<AttestedCredentialData, PasskeyError> {
    // AAGUID (16) + credential ID length (2)
    if data.len() < AAGUID_LEN + 2 {
        return Err(PasskeyError::AuthenticatorData(
            "Attested credential data too short".to_string(),
        ));
    }

    let mut aaguid = [0u8; AAGUID_LEN];
    aaguid.copy_from_slice(&data[..AAGUID_LEN]);

    let mut pos = AAGUID_LEN;
    let cred_id_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
    pos += 2;

    if cred_id_len == 0 || cred_id_len > MAX_CREDENTIAL_ID_LEN {
        return Err(PasskeyError::AuthenticatorData(format!(
            "Invalid credential ID length: {cred_id_len}"
        )));
    }
    if data.len() < pos + cred_id_len {
        return Err(PasskeyError::AuthenticatorData(
            "Authenticator data too short for credential ID".to_string(),
        ));
    }

    let credential_id = data[pos..pos + cred_id_len].to_vec();
    pos += cred_id_len;

    // Extensions may follow the key, so decode exactly one CBOR item
    let mut rest = &data[pos..];
    let key: CborValue = ciborium::de::from_reader(&mut rest)
        .map_err(|e| PasskeyError::Format(format!("Invalid public key CBOR: {e}")))?;

    let mut public_key_cose = Vec::new();
    ciborium::ser::into_writer(&key, &mut public_key_cose)
        .map_err(|e| PasskeyError::Format(format!("Failed to encode public key: {e}")))?;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id,
        public_key_cose,
    })
}
