use ciborium::value::Value as CborValue;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1, RSA_PKCS1_2048_8192_SHA256, RsaPublicKeyComponents,
    UnparsedPublicKey,
};

use super::errors::PasskeyError;

/// ECDSA w/ SHA-256 on P-256
pub const COSE_ALG_ES256: i64 = -7;
/// RSASSA-PKCS1-v1_5 w/ SHA-256
pub const COSE_ALG_RS256: i64 = -257;

const COSE_KEY_KTY: i64 = 1;
const COSE_KEY_ALG: i64 = 3;
const COSE_KTY_EC2: i64 = 2;
const COSE_KTY_RSA: i64 = 3;
const COSE_EC2_CRV: i64 = -1;
const COSE_EC2_X: i64 = -2;
const COSE_EC2_Y: i64 = -3;
const COSE_RSA_N: i64 = -1;
const COSE_RSA_E: i64 = -2;
const COSE_CRV_P256: i64 = 1;
const P256_COORD_LEN: usize = 32;

/// Credential public key decoded from its COSE_Key encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CoseKey {
    Ec2 { x: Vec<u8>, y: Vec<u8> },
    Rsa { n: Vec<u8>, e: Vec<u8> },
}

impl CoseKey {
    pub(super) fn from_bytes(bytes: &[u8]) -> Result<Self, PasskeyError> {
        let value: CborValue = ciborium::de::from_reader(bytes)
            .map_err(|e| PasskeyError::Format(format!("Invalid public key CBOR: {e}")))?;
        Self::from_cbor(&value)
    }

    fn from_cbor(value: &CborValue) -> Result<Self, PasskeyError> {
        let CborValue::Map(map) = value else {
            return Err(PasskeyError::Format("COSE key is not a map".to_string()));
        };

        let int_param = |label: i64| -> Option<i64> {
            find_param(map, label).and_then(|v| match v {
                CborValue::Integer(i) => i64::try_from(*i).ok(),
                _ => None,
            })
        };
        let bytes_param = |label: i64| -> Option<Vec<u8>> {
            find_param(map, label).and_then(|v| match v {
                CborValue::Bytes(b) => Some(b.clone()),
                _ => None,
            })
        };

        let kty = int_param(COSE_KEY_KTY)
            .ok_or_else(|| PasskeyError::Format("COSE key has no kty".to_string()))?;
        let alg = int_param(COSE_KEY_ALG)
            .ok_or_else(|| PasskeyError::Format("COSE key has no alg".to_string()))?;

        match (kty, alg) {
            (COSE_KTY_EC2, COSE_ALG_ES256) => {
                if int_param(COSE_EC2_CRV) != Some(COSE_CRV_P256) {
                    return Err(PasskeyError::Format("Unsupported EC2 curve".to_string()));
                }
                let (Some(x), Some(y)) = (bytes_param(COSE_EC2_X), bytes_param(COSE_EC2_Y))
                else {
                    return Err(PasskeyError::Format(
                        "Missing EC2 coordinates".to_string(),
                    ));
                };
                if x.len() != P256_COORD_LEN || y.len() != P256_COORD_LEN {
                    return Err(PasskeyError::Format(format!(
                        "Invalid coordinate length: x={}, y={}",
                        x.len(),
                        y.len()
                    )));
                }
                Ok(Self::Ec2 { x, y })
            }
            (COSE_KTY_RSA, COSE_ALG_RS256) => {
                let (Some(n), Some(e)) = (bytes_param(COSE_RSA_N), bytes_param(COSE_RSA_E))
                else {
                    return Err(PasskeyError::Format(
                        "Missing RSA modulus or exponent".to_string(),
                    ));
                };
                if n.is_empty() || e.is_empty() {
                    return Err(PasskeyError::Format("Empty RSA key component".to_string()));
                }
                Ok(Self::Rsa { n, e })
            }
            _ => Err(PasskeyError::Format(format!(
                "Unsupported key type or algorithm: kty={kty}, alg={alg}"
            ))),
        }
    }

    pub(super) fn alg(&self) -> i64 {
        match self {
            Self::Ec2 { .. } => COSE_ALG_ES256,
            Self::Rsa { .. } => COSE_ALG_RS256,
        }
    }

    /// Verifies `signature` over `message` with this key.
    pub(super) fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), PasskeyError> {
        let result = match self {
            Self::Ec2 { x, y } => {
                // Uncompressed SEC1 point
                let mut point = Vec::with_capacity(1 + x.len() + y.len());
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, &point).verify(message, signature)
            }
            Self::Rsa { n, e } => RsaPublicKeyComponents {
                n: n.as_slice(),
                e: e.as_slice(),
            }
            .verify(&RSA_PKCS1_2048_8192_SHA256, message, signature),
        };

        result.map_err(|_| {
            PasskeyError::Verification(format!(
                "Signature verification failed for alg {}",
                self.alg()
            ))
        })
    }
}

fn find_param(map: &[(CborValue, CborValue)], label: i64) -> Option<&CborValue> {
    map.iter().find_map(|(k, v)| match k {
        CborValue::Integer(i) if i64::try_from(*i).ok() == Some(label) => Some(v),
        _ => None,
    })
}
