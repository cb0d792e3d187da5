pub const TEST_ORIGIN: &str = "https://auth.example.com";
pub const TEST_RP_ID: &str = "example.com";
pub const TEST_EMAIL: &str = "alice@example.com";
