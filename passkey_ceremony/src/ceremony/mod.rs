mod authentication;
mod engine;
mod errors;
mod registration;
mod types;

pub use engine::CeremonyEngine;
pub use errors::CeremonyError;
pub use types::CeremonyOutcome;
