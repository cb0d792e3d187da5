mod store;
mod types;

pub use store::{CredentialStore, LoginRecord, UserCreation};
pub use types::{Device, User};
