use ciborium::value::Value as CborValue;

use super::errors::PasskeyError;
use crate::utils::base64url_decode;

pub(super) const ATTESTATION_FORMAT_NONE: &str = "none";

/// Decoded `attestationObject` from a registration response.
#[derive(Debug)]
pub(super) struct AttestationObject {
    pub(super) fmt: String,
    pub(super) auth_data: Vec<u8>,
    pub(super) att_stmt: Vec<(CborValue, CborValue)>,
}

pub(super) fn parse_attestation_object(
    attestation_base64: &str,
) -> Result<AttestationObject, PasskeyError> {
    let attestation_bytes = base64url_decode(attestation_base64)
        .map_err(|e| PasskeyError::Format(format!("Failed to decode attestation object: {e}")))?;

    let attestation_cbor: CborValue = ciborium::de::from_reader(&attestation_bytes[..])
        .map_err(|e| PasskeyError::Format(format!("Invalid CBOR data: {e}")))?;

    let CborValue::Map(map) = attestation_cbor else {
        return Err(PasskeyError::Format(
            "Invalid attestation format".to_string(),
        ));
    };

    let mut fmt = None;
    let mut auth_data = None;
    let mut att_stmt = None;

    for (key, value) in map {
        let CborValue::Text(k) = key else {
            continue;
        };
        match (k.as_str(), value) {
            ("fmt", CborValue::Text(f)) => fmt = Some(f),
            ("authData", CborValue::Bytes(data)) => auth_data = Some(data),
            ("attStmt", CborValue::Map(stmt)) => att_stmt = Some(stmt),
            _ => {}
        }
    }

    tracing::debug!(
        "Attestation format: {:?}, auth data length: {:?}, attestation statement entries: {:?}",
        fmt,
        auth_data.as_ref().map(Vec::len),
        att_stmt.as_ref().map(Vec::len)
    );

    match (fmt, auth_data, att_stmt) {
        (Some(fmt), Some(auth_data), Some(att_stmt)) => Ok(AttestationObject {
            fmt,
            auth_data,
            att_stmt,
        }),
        _ => Err(PasskeyError::Format(
            "Missing required attestation data".to_string(),
        )),
    }
}

/// Only self-asserted `"none"` attestation is accepted, and it must carry an
/// empty statement.
pub(super) fn verify_attestation(attestation: &AttestationObject) -> Result<(), PasskeyError> {
    match attestation.fmt.as_str() {
        ATTESTATION_FORMAT_NONE => {
            if !attestation.att_stmt.is_empty() {
                return Err(PasskeyError::Attestation(
                    "attStmt must be empty for none attestation".to_string(),
                ));
            }
            tracing::debug!("None attestation verified");
            Ok(())
        }
        other => Err(PasskeyError::Attestation(format!(
            "Unsupported attestation format: {other}"
        ))),
    }
}
