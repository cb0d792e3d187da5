use serde::{Deserialize, Serialize};

/// Server-side state correlated with an opaque client session identifier.
///
/// `current_challenge` is single-use: it is set by a begin operation and
/// cleared by the matching complete operation whatever its outcome.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSession {
    #[serde(skip)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_challenge: Option<String>,
}

impl ChallengeSession {
    pub(crate) fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            ..Default::default()
        }
    }

    /// The email and challenge of an in-flight ceremony, if both are present.
    pub(crate) fn pending(&self) -> Option<(&str, &str)> {
        match (&self.email, &self.current_challenge) {
            (Some(email), Some(challenge)) => Some((email.as_str(), challenge.as_str())),
            _ => None,
        }
    }
}
