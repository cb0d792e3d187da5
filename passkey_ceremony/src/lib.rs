//! passkey-ceremony - relying-party side of WebAuthn registration and login
//!
//! The crate issues challenges, verifies "none" attestation and ES256/RS256
//! assertions, and keeps users, credentials and challenge sessions in an
//! injected key-value store.

mod ceremony;
mod config;
mod passkey;
mod session;
mod storage;
mod userdb;
mod utils;

#[cfg(test)]
mod test_utils;

pub use ceremony::{CeremonyEngine, CeremonyError, CeremonyOutcome};

pub use config::RelyingPartyConfig;

pub use passkey::{
    AuthenticationExpectations, AuthenticationInfo, AuthenticationOptions, AuthenticationResponse,
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorSelection,
    AuthenticatorTransport, COSE_ALG_ES256, COSE_ALG_RS256, CredentialDescriptor, PasskeyError,
    PubKeyCredParam, PublicKeyCredentialUserEntity, RegistrationExpectations, RegistrationInfo,
    RegistrationOptions, RegistrationResponse, RelyingParty, SignatureVerifier, WebAuthnVerifier,
};

pub use session::{ChallengeSession, SessionStore};

pub use storage::{InMemoryStore, KeyValueStore, RedisStore, StorageError, store_from_env};

pub use userdb::{CredentialStore, Device, LoginRecord, User, UserCreation};

pub use utils::{UtilError, gen_random_string};
