//! Software authenticator for unit tests
//!
//! Produces genuine "none" attestation objects and signed assertions with
//! `ring` keys, so the verifier is exercised end to end without a browser.

use async_trait::async_trait;
use ciborium::value::Value as CborValue;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair, RSA_PKCS1_SHA256, RsaKeyPair,
};
use serde_json::json;

use crate::passkey::{
    AuthenticationResponse, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
    AuthenticatorTransport, RegistrationResponse,
};
use crate::storage::{InMemoryStore, KeyValueStore, StorageError};
use crate::utils::{base64url_decode, base64url_encode};

pub(crate) const TEST_ORIGIN: &str = "https://example.com";
pub(crate) const TEST_RP_ID: &str = "example.com";

const RSA_PKCS8: &[u8] = include_bytes!("../testdata/rsa2048_pkcs8.der");
const RSA_MODULUS_B64: &str = "nAMMi0H2co8dkQsiRs0RWq_VS5oQagEwLrn3rtux8C7FcDRR0n1KTNLeQYAxV76_ofnRKI307hwnFAbZphmsLKlerG8h39ePLeyJeHB668nN4JFFNNleA2VE-ri6sTa1vr_1punR5RAa1AdTIempwS-eSe7hF0pAa05RoLppjWbNsvktlKqd8Gw7OS6_N9PBkSvxh_L4fdWV614vF1tRAfqvi-8OOe1crmzTIzPR-4-nRs5oYN-3x613led__M9uDAO2oMRMgUjfAQUkrrCi3ocV0Mn4TuvQvtGbtYqD2oruqcpfKba20AEHFzDzaPjcUrmE9veiEZKQzQLvPdpCew";
const RSA_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];
const RSA_SIGNATURE_LEN: usize = 256;

const FLAG_UP: u8 = 0x01;
const FLAG_UV: u8 = 0x04;
const FLAG_AT: u8 = 0x40;
const TEST_AAGUID: [u8; 16] = [0xAA; 16];

enum SigningKey {
    Es256(EcdsaKeyPair),
    Rs256(RsaKeyPair),
}

pub(crate) struct SoftAuthenticator {
    key: SigningKey,
    credential_id: Vec<u8>,
    sign_count: u32,
    user_verified: bool,
    attestation_format: String,
    rng: SystemRandom,
}

impl SoftAuthenticator {
    pub(crate) fn es256() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .unwrap();
        Self::with_key(SigningKey::Es256(key_pair), rng)
    }

    pub(crate) fn rs256() -> Self {
        let key_pair = RsaKeyPair::from_pkcs8(RSA_PKCS8).unwrap();
        Self::with_key(SigningKey::Rs256(key_pair), SystemRandom::new())
    }

    fn with_key(key: SigningKey, rng: SystemRandom) -> Self {
        let mut credential_id = vec![0u8; 16];
        rng.fill(&mut credential_id).unwrap();
        Self {
            key,
            credential_id,
            sign_count: 0,
            user_verified: true,
            attestation_format: "none".to_string(),
            rng,
        }
    }

    pub(crate) fn with_sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    pub(crate) fn with_user_verified(mut self, user_verified: bool) -> Self {
        self.user_verified = user_verified;
        self
    }

    pub(crate) fn with_attestation_format(mut self, fmt: &str) -> Self {
        self.attestation_format = fmt.to_string();
        self
    }

    pub(crate) fn set_sign_count(&mut self, sign_count: u32) {
        self.sign_count = sign_count;
    }

    pub(crate) fn credential_id(&self) -> String {
        base64url_encode(&self.credential_id)
    }

    pub(crate) fn cose_public_key(&self) -> Vec<u8> {
        let int = |v: i64| CborValue::Integer(v.into());
        let key = match &self.key {
            SigningKey::Es256(key_pair) => {
                let point = key_pair.public_key().as_ref();
                vec![
                    (int(1), int(2)),
                    (int(3), int(-7)),
                    (int(-1), int(1)),
                    (int(-2), CborValue::Bytes(point[1..33].to_vec())),
                    (int(-3), CborValue::Bytes(point[33..65].to_vec())),
                ]
            }
            SigningKey::Rs256(_) => vec![
                (int(1), int(3)),
                (int(3), int(-257)),
                (
                    int(-1),
                    CborValue::Bytes(base64url_decode(RSA_MODULUS_B64).unwrap()),
                ),
                (int(-2), CborValue::Bytes(RSA_EXPONENT.to_vec())),
            ],
        };
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&CborValue::Map(key), &mut bytes).unwrap();
        bytes
    }

    pub(crate) fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.key {
            SigningKey::Es256(key_pair) => key_pair
                .sign(&self.rng, message)
                .unwrap()
                .as_ref()
                .to_vec(),
            SigningKey::Rs256(key_pair) => {
                let mut signature = vec![0u8; RSA_SIGNATURE_LEN];
                key_pair
                    .sign(&RSA_PKCS1_SHA256, &self.rng, message, &mut signature)
                    .unwrap();
                signature
            }
        }
    }

    fn flags(&self) -> u8 {
        if self.user_verified {
            FLAG_UP | FLAG_UV
        } else {
            FLAG_UP
        }
    }

    fn auth_data_header(&self, rp_id: &str, flags: u8, counter: u32) -> Vec<u8> {
        let mut data = digest::digest(&digest::SHA256, rp_id.as_bytes())
            .as_ref()
            .to_vec();
        data.push(flags);
        data.extend_from_slice(&counter.to_be_bytes());
        data
    }

    fn client_data(type_: &str, challenge: &str, origin: &str) -> Vec<u8> {
        json!({
            "type": type_,
            "challenge": challenge,
            "origin": origin,
            "crossOrigin": false
        })
        .to_string()
        .into_bytes()
    }

    /// Answers `navigator.credentials.create()` for the given challenge.
    pub(crate) fn register(&self, challenge: &str, origin: &str, rp_id: &str) -> RegistrationResponse {
        let mut auth_data = self.auth_data_header(rp_id, self.flags() | FLAG_AT, 0);
        auth_data.extend_from_slice(&TEST_AAGUID);
        auth_data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(&self.credential_id);
        auth_data.extend_from_slice(&self.cose_public_key());

        let attestation = CborValue::Map(vec![
            (
                CborValue::Text("fmt".into()),
                CborValue::Text(self.attestation_format.clone()),
            ),
            (CborValue::Text("attStmt".into()), CborValue::Map(vec![])),
            (CborValue::Text("authData".into()), CborValue::Bytes(auth_data)),
        ]);
        let mut attestation_object = Vec::new();
        ciborium::ser::into_writer(&attestation, &mut attestation_object).unwrap();

        let id = self.credential_id();
        RegistrationResponse {
            id: id.clone(),
            raw_id: id,
            response: AuthenticatorAttestationResponse {
                client_data_json: base64url_encode(&Self::client_data(
                    "webauthn.create",
                    challenge,
                    origin,
                )),
                attestation_object: base64url_encode(&attestation_object),
                transports: vec![AuthenticatorTransport::Internal],
            },
            type_: "public-key".to_string(),
            authenticator_attachment: Some("platform".to_string()),
        }
    }

    /// Answers `navigator.credentials.get()` with the current sign count.
    pub(crate) fn login(&self, challenge: &str, origin: &str, rp_id: &str) -> AuthenticationResponse {
        let auth_data = self.auth_data_header(rp_id, self.flags(), self.sign_count);
        let client_data = Self::client_data("webauthn.get", challenge, origin);

        let mut signed_data = auth_data.clone();
        signed_data.extend_from_slice(digest::digest(&digest::SHA256, &client_data).as_ref());

        let id = self.credential_id();
        AuthenticationResponse {
            id: id.clone(),
            raw_id: id,
            response: AuthenticatorAssertionResponse {
                client_data_json: base64url_encode(&client_data),
                authenticator_data: base64url_encode(&auth_data),
                signature: base64url_encode(&self.sign(&signed_data)),
                user_handle: None,
            },
            type_: "public-key".to_string(),
            authenticator_attachment: Some("platform".to_string()),
        }
    }
}

/// In-memory store that yields to the scheduler before every call, so
/// concurrent ceremonies interleave, and can fail conditional puts on a prefix.
pub(crate) struct InterleavingStore {
    inner: InMemoryStore,
    failing_prefix: Option<&'static str>,
}

impl InterleavingStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            failing_prefix: None,
        }
    }

    pub(crate) fn failing_conditional_puts(prefix: &'static str) -> Self {
        Self {
            inner: InMemoryStore::new(),
            failing_prefix: Some(prefix),
        }
    }
}

#[async_trait]
impl KeyValueStore for InterleavingStore {
    async fn init(&self) -> Result<(), StorageError> {
        self.inner.init().await
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<String>, StorageError> {
        tokio::task::yield_now().await;
        self.inner.get(prefix, key).await
    }

    async fn put(&self, prefix: &str, key: &str, value: String) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.inner.put(prefix, key, value).await
    }

    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: String,
        ttl: u64,
    ) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.inner.put_with_ttl(prefix, key, value, ttl).await
    }

    async fn put_if_not_exists(
        &self,
        prefix: &str,
        key: &str,
        value: String,
        ttl: u64,
    ) -> Result<bool, StorageError> {
        tokio::task::yield_now().await;
        if self.failing_prefix == Some(prefix) {
            return Err(StorageError::Storage("Connection reset".to_string()));
        }
        self.inner.put_if_not_exists(prefix, key, value, ttl).await
    }

    async fn compare_and_swap(
        &self,
        prefix: &str,
        key: &str,
        expected: &str,
        value: String,
    ) -> Result<bool, StorageError> {
        tokio::task::yield_now().await;
        self.inner.compare_and_swap(prefix, key, expected, value).await
    }

    async fn remove(&self, prefix: &str, key: &str) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.inner.remove(prefix, key).await
    }
}
