mod attestation;
mod auth_data;
mod client_data;
mod cose;
mod errors;
mod types;
mod verifier;

pub use cose::{COSE_ALG_ES256, COSE_ALG_RS256};
pub use errors::PasskeyError;
pub use types::{
    AuthenticationOptions, AuthenticationResponse, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, AuthenticatorSelection, AuthenticatorTransport,
    CredentialDescriptor, PubKeyCredParam, PublicKeyCredentialUserEntity, RegistrationOptions,
    RegistrationResponse, RelyingParty,
};
pub use verifier::{
    AuthenticationExpectations, AuthenticationInfo, RegistrationExpectations, RegistrationInfo,
    SignatureVerifier, WebAuthnVerifier,
};

pub(crate) use types::PUBLIC_KEY_TYPE;
