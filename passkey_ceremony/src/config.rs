//! Relying-party configuration shared by every ceremony of a deployment

use std::env;

use url::Url;

use crate::passkey::PasskeyError;

const DEFAULT_TIMEOUT_SECS: u32 = 60;
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Fixed relying-party parameters.
///
/// `origin` and `rp_id` must stay stable for the lifetime of a deployment:
/// changing either invalidates every challenge that was issued but not yet
/// completed, since the client signs over both values.
#[derive(Debug, Clone)]
pub struct RelyingPartyConfig {
    pub(crate) origin: String,
    pub(crate) rp_id: String,
    pub(crate) rp_name: String,
    /// Ceremony timeout communicated to the authenticator, in seconds
    pub(crate) timeout_secs: u32,
    /// Lifetime of a challenge session record in the store, in seconds
    pub(crate) session_ttl_secs: u64,
}

impl RelyingPartyConfig {
    /// Creates a configuration after checking that `rp_id` is the origin's host
    /// or a registrable suffix of it.
    pub fn new(origin: impl Into<String>, rp_id: impl Into<String>) -> Result<Self, PasskeyError> {
        let origin = origin.into();
        let rp_id = rp_id.into();
        let host = origin_host(&origin)?;

        if !rp_id_matches_host(&rp_id, &host) {
            return Err(PasskeyError::Config(format!(
                "RP ID '{rp_id}' is not a suffix of origin host '{host}'"
            )));
        }

        Ok(Self {
            rp_name: rp_id.clone(),
            origin,
            rp_id,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        })
    }

    /// Reads the configuration from `ORIGIN`, `PASSKEY_RP_ID`, `PASSKEY_RP_NAME`,
    /// `PASSKEY_TIMEOUT` and `PASSKEY_SESSION_TTL`.
    pub fn from_env() -> Result<Self, PasskeyError> {
        let origin = env::var("ORIGIN")
            .map_err(|_| PasskeyError::Config("ORIGIN must be set".to_string()))?;

        let rp_id = match env::var("PASSKEY_RP_ID") {
            Ok(id) if !id.is_empty() => id,
            _ => origin_host(&origin)?,
        };

        let mut config = Self::new(origin, rp_id)?;

        if let Ok(name) = env::var("PASSKEY_RP_NAME") {
            config.rp_name = name;
        }
        config.timeout_secs = parse_env_or("PASSKEY_TIMEOUT", DEFAULT_TIMEOUT_SECS);
        config.session_ttl_secs = parse_env_or("PASSKEY_SESSION_TTL", DEFAULT_SESSION_TTL_SECS);

        tracing::info!(
            "Relying party configured: origin={}, rp_id={}, rp_name={}",
            config.origin,
            config.rp_id,
            config.rp_name
        );

        Ok(config)
    }

    pub fn with_rp_name(mut self, rp_name: impl Into<String>) -> Self {
        self.rp_name = rp_name.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_session_ttl_secs(mut self, session_ttl_secs: u64) -> Self {
        self.session_ttl_secs = session_ttl_secs;
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn rp_id(&self) -> &str {
        &self.rp_id
    }

    pub fn rp_name(&self) -> &str {
        &self.rp_name
    }

    pub(crate) fn timeout_ms(&self) -> u32 {
        self.timeout_secs.saturating_mul(1000)
    }
}

fn origin_host(origin: &str) -> Result<String, PasskeyError> {
    let url = Url::parse(origin)
        .map_err(|e| PasskeyError::Config(format!("Invalid ORIGIN '{origin}': {e}")))?;
    url.host_str()
        .map(|h| h.to_string())
        .ok_or_else(|| PasskeyError::Config(format!("ORIGIN '{origin}' has no host")))
}

fn rp_id_matches_host(rp_id: &str, host: &str) -> bool {
    if rp_id.is_empty() {
        return false;
    }
    host == rp_id
        || host
            .strip_suffix(rp_id)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn parse_env_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Err(_) => default,
        Ok(v) => v.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}: {}. Using default '{}'", name, v, default);
            default
        }),
    }
}
