use chrono::Utc;

use crate::passkey::{
    AuthenticationExpectations, AuthenticationOptions, AuthenticationResponse,
    CredentialDescriptor, PUBLIC_KEY_TYPE, PasskeyError,
};
use crate::userdb::LoginRecord;
use crate::utils::{base64url_decode, gen_challenge};

use super::engine::{CeremonyEngine, validate_email};
use super::errors::CeremonyError;
use super::types::CeremonyOutcome;

impl CeremonyEngine {
    /// Issues request options listing every credential registered to `email`.
    pub async fn begin_login(
        &self,
        session_id: &str,
        email: &str,
    ) -> CeremonyOutcome<AuthenticationOptions> {
        self.start_login(session_id, email)
            .await
            .map_err(CeremonyError::log)
            .into()
    }

    /// Verifies the client's assertion and advances the stored sign count.
    pub async fn complete_login(
        &self,
        session_id: &str,
        response: &AuthenticationResponse,
    ) -> CeremonyOutcome<()> {
        CeremonyOutcome::completed(
            self.finish_login(session_id, response)
                .await
                .map_err(CeremonyError::log),
        )
    }

    async fn start_login(
        &self,
        session_id: &str,
        email: &str,
    ) -> Result<AuthenticationOptions, CeremonyError> {
        let email = validate_email(email)?;

        let user = self
            .credentials
            .find_user(email)
            .await?
            .ok_or(CeremonyError::UserDoesNotExist)?;

        let challenge = gen_challenge()?;
        let options = AuthenticationOptions {
            challenge: challenge.clone(),
            timeout: self.config.timeout_ms(),
            rp_id: self.config.rp_id().to_string(),
            allow_credentials: user
                .devices
                .iter()
                .map(|device| CredentialDescriptor {
                    id: device.credential_id.clone(),
                    type_: PUBLIC_KEY_TYPE.to_string(),
                    transports: device.transports.clone(),
                })
                .collect(),
            user_verification: "required".to_string(),
        };

        self.sessions
            .start_ceremony(session_id, email, &challenge)
            .await?;

        tracing::debug!("Authentication options for {}: {:?}", email, options);
        Ok(options)
    }

    async fn finish_login(
        &self,
        session_id: &str,
        response: &AuthenticationResponse,
    ) -> Result<(), CeremonyError> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(CeremonyError::SessionExpired)?;
        let Some((email, challenge)) = session.pending() else {
            return Err(CeremonyError::SessionExpired);
        };

        self.sessions.clear_challenge(&session).await?;

        let user = self
            .credentials
            .find_user(email)
            .await?
            .ok_or(CeremonyError::UserDoesNotExist)?;

        let device = user
            .find_device(&response.raw_id)
            .ok_or(CeremonyError::AuthenticatorNotRegistered)?;

        let public_key = base64url_decode(&device.public_key_cose).map_err(|e| {
            CeremonyError::Internal(format!(
                "Stored public key for {} is corrupt: {e}",
                device.credential_id
            ))
        })?;

        let expected = AuthenticationExpectations {
            challenge,
            origin: self.config.origin(),
            rp_id: self.config.rp_id(),
            public_key_cose: &public_key,
            prior_sign_count: device.sign_count,
            require_user_verification: true,
        };
        let info = self
            .verifier
            .verify_authentication(response, &expected)
            .map_err(CeremonyError::LoginFailed)?;

        // A concurrent login may have advanced the count since it was read
        match self
            .credentials
            .record_login(email, &device.credential_id, info.new_sign_count, Utc::now())
            .await?
        {
            LoginRecord::Updated => {
                tracing::info!("User {} logged in", email);
                Ok(())
            }
            LoginRecord::CounterRegressed { stored } => {
                tracing::warn!(
                    "Sign count {} for {} does not advance the stored count {}",
                    info.new_sign_count,
                    device.credential_id,
                    stored
                );
                Err(CeremonyError::LoginFailed(PasskeyError::Counter(format!(
                    "stored {stored} >= reported {}",
                    info.new_sign_count
                ))))
            }
            LoginRecord::Missing => Err(CeremonyError::AuthenticatorNotRegistered),
        }
    }
}
