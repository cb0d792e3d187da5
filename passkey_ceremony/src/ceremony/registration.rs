use chrono::Utc;

use crate::passkey::{
    AuthenticatorSelection, PUBLIC_KEY_TYPE, PubKeyCredParam, PublicKeyCredentialUserEntity,
    RegistrationExpectations, RegistrationOptions, RegistrationResponse, RelyingParty,
};
use crate::userdb::{Device, User, UserCreation};
use crate::utils::{base64url_encode, gen_challenge};

use super::engine::{CeremonyEngine, SUPPORTED_ALGORITHMS, validate_email};
use super::errors::CeremonyError;
use super::types::CeremonyOutcome;

impl CeremonyEngine {
    /// Issues creation options for a new account and records the challenge in
    /// the caller's session.
    pub async fn begin_registration(
        &self,
        session_id: &str,
        email: &str,
    ) -> CeremonyOutcome<RegistrationOptions> {
        self.start_registration(session_id, email)
            .await
            .map_err(CeremonyError::log)
            .into()
    }

    /// Verifies the client's attestation and creates the account.
    pub async fn complete_registration(
        &self,
        session_id: &str,
        response: &RegistrationResponse,
    ) -> CeremonyOutcome<()> {
        CeremonyOutcome::completed(
            self.finish_registration(session_id, response)
                .await
                .map_err(CeremonyError::log),
        )
    }

    async fn start_registration(
        &self,
        session_id: &str,
        email: &str,
    ) -> Result<RegistrationOptions, CeremonyError> {
        let email = validate_email(email)?;

        if self.credentials.find_user(email).await?.is_some() {
            return Err(CeremonyError::UserAlreadyExists);
        }

        let challenge = gen_challenge()?;
        let options = RegistrationOptions {
            challenge: challenge.clone(),
            rp: RelyingParty {
                name: self.config.rp_name().to_string(),
                id: self.config.rp_id().to_string(),
            },
            user: PublicKeyCredentialUserEntity {
                id: email.to_string(),
                name: email.to_string(),
                display_name: email.to_string(),
            },
            pub_key_cred_params: SUPPORTED_ALGORITHMS
                .iter()
                .map(|&alg| PubKeyCredParam {
                    type_: PUBLIC_KEY_TYPE.to_string(),
                    alg,
                })
                .collect(),
            timeout: self.config.timeout_ms(),
            attestation: "none".to_string(),
            exclude_credentials: vec![],
            authenticator_selection: AuthenticatorSelection {
                resident_key: "discouraged".to_string(),
                require_resident_key: false,
                user_verification: "preferred".to_string(),
            },
        };

        self.sessions
            .start_ceremony(session_id, email, &challenge)
            .await?;

        tracing::debug!("Registration options for {}: {:?}", email, options);
        Ok(options)
    }

    async fn finish_registration(
        &self,
        session_id: &str,
        response: &RegistrationResponse,
    ) -> Result<(), CeremonyError> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(CeremonyError::SessionExpired)?;
        let Some((email, challenge)) = session.pending() else {
            return Err(CeremonyError::SessionExpired);
        };

        // Single use: the challenge is gone before anything is verified
        self.sessions.clear_challenge(&session).await?;

        let expected = RegistrationExpectations {
            challenge,
            origin: self.config.origin(),
            rp_id: self.config.rp_id(),
            require_user_verification: false,
            algorithms: &SUPPORTED_ALGORITHMS,
        };
        let info = self
            .verifier
            .verify_registration(response, &expected)
            .map_err(CeremonyError::RegistrationFailed)?;

        tracing::debug!(
            "Attested credential {} (fmt={}, alg={}, initial counter={})",
            info.credential_id,
            info.fmt,
            info.alg,
            info.sign_count
        );

        let device = Device {
            credential_id: info.credential_id,
            public_key_cose: base64url_encode(&info.public_key_cose),
            sign_count: 0,
            transports: response.response.known_transports(),
            aaguid: Some(info.aaguid),
            created_at: Utc::now(),
            last_used_at: None,
        };

        match self
            .credentials
            .create_user(&User::new(email.to_string(), device))
            .await?
        {
            UserCreation::Created => {
                tracing::info!("Registered passkey for {}", email);
                Ok(())
            }
            UserCreation::UserExists => Err(CeremonyError::UserAlreadyExists),
            UserCreation::CredentialInUse => Err(CeremonyError::CredentialInUse),
        }
    }
}
