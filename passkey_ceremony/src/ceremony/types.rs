use serde::Serialize;

use super::errors::CeremonyError;

/// Result of a ceremony step as handed to the transport layer.
///
/// Serialises as `{success, data?, message?}` with absent fields omitted.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CeremonyOutcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> CeremonyOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(error: &CeremonyError) -> Self {
        Self {
            success: false,
            data: None,
            message: error.message(),
        }
    }
}

impl CeremonyOutcome<()> {
    /// Outcome of a step that has nothing to return on success.
    pub(crate) fn completed(result: Result<(), CeremonyError>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                data: None,
                message: None,
            },
            Err(e) => Self::failure(&e),
        }
    }
}

impl<T> From<Result<T, CeremonyError>> for CeremonyOutcome<T> {
    fn from(result: Result<T, CeremonyError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}
