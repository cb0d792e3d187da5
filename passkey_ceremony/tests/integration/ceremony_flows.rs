use std::sync::Arc;

use passkey_ceremony::{
    AuthenticationResponse, CeremonyEngine, InMemoryStore, KeyValueStore, RegistrationResponse,
    RelyingPartyConfig, SessionStore,
};
use serde_json::Value;

use crate::common::{MockAuthenticator, TEST_EMAIL, TEST_ORIGIN, TEST_RP_ID};

fn engine_with_store() -> (CeremonyEngine, Arc<InMemoryStore>) {
    let config = RelyingPartyConfig::new(TEST_ORIGIN, TEST_RP_ID)
        .expect("valid relying party")
        .with_rp_name("Example Corp");
    let store = Arc::new(InMemoryStore::new());
    (CeremonyEngine::new(config, store.clone()), store)
}

async fn register(engine: &CeremonyEngine, authenticator: &MockAuthenticator) -> String {
    let session = SessionStore::new_session_id().unwrap();
    let begin = engine.begin_registration(&session, TEST_EMAIL).await;
    let options = serde_json::to_value(begin.data.expect("registration options")).unwrap();

    let response: RegistrationResponse =
        serde_json::from_value(authenticator.create(&options, TEST_ORIGIN)).unwrap();
    let outcome = engine.complete_registration(&session, &response).await;
    assert!(outcome.success, "registration failed: {:?}", outcome.message);
    session
}

async fn login(engine: &CeremonyEngine, authenticator: &MockAuthenticator) -> Value {
    let session = SessionStore::new_session_id().unwrap();
    let begin = engine.begin_login(&session, TEST_EMAIL).await;
    let options = serde_json::to_value(begin.data.expect("authentication options")).unwrap();

    let response: AuthenticationResponse =
        serde_json::from_value(authenticator.get(&options, TEST_ORIGIN)).unwrap();
    serde_json::to_value(engine.complete_login(&session, &response).await).unwrap()
}

#[tokio::test]
async fn test_register_then_login() {
    // Given a relying party on a subdomain of its RP ID
    let (engine, _) = engine_with_store();
    let mut authenticator = MockAuthenticator::new();

    // When the user registers and logs in twice
    register(&engine, &authenticator).await;
    authenticator.sign_count = 1;
    let first = login(&engine, &authenticator).await;
    authenticator.sign_count = 2;
    let second = login(&engine, &authenticator).await;

    // Then both logins succeed with a bare success outcome
    assert_eq!(first, serde_json::json!({"success": true}));
    assert_eq!(second, serde_json::json!({"success": true}));
    let user = engine
        .credential_store()
        .find_user(TEST_EMAIL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.devices[0].sign_count, 2);
}

#[tokio::test]
async fn test_registration_options_wire_format() {
    let (engine, _) = engine_with_store();

    let outcome = engine.begin_registration("sid", TEST_EMAIL).await;
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["success"], true);
    assert!(json.get("message").is_none());
    let data = &json["data"];
    assert_eq!(data["rp"]["name"], "Example Corp");
    assert_eq!(data["rp"]["id"], TEST_RP_ID);
    assert_eq!(data["user"]["id"], TEST_EMAIL);
    assert_eq!(data["attestation"], "none");
    assert_eq!(data["timeout"], 60_000);
    assert_eq!(data["authenticatorSelection"]["residentKey"], "discouraged");
    let algs: Vec<i64> = data["pubKeyCredParams"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["alg"].as_i64().unwrap())
        .collect();
    assert_eq!(algs, vec![-7, -257]);
}

#[tokio::test]
async fn test_authentication_options_list_registered_credential() {
    let (engine, _) = engine_with_store();
    let authenticator = MockAuthenticator::new();
    register(&engine, &authenticator).await;

    let outcome = engine.begin_login("sid", TEST_EMAIL).await;
    let json = serde_json::to_value(&outcome).unwrap();

    let allowed = &json["data"]["allowCredentials"][0];
    assert_eq!(allowed["id"], authenticator.credential_id());
    assert_eq!(allowed["type"], "public-key");
    assert_eq!(allowed["transports"], serde_json::json!(["usb", "nfc"]));
    assert_eq!(json["data"]["userVerification"], "required");
    assert_eq!(json["data"]["rpId"], TEST_RP_ID);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    // Given a registered email
    let (engine, _) = engine_with_store();
    register(&engine, &MockAuthenticator::new()).await;

    // When a second registration is attempted for the same email
    let outcome = engine.begin_registration("sid", TEST_EMAIL).await;

    // Then it is rejected
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        serde_json::json!({"success": false, "message": "User already exists"})
    );
}

#[tokio::test]
async fn test_persisted_record_shapes() {
    let (engine, store) = engine_with_store();
    let authenticator = MockAuthenticator::new();
    let session = register(&engine, &authenticator).await;

    let user: Value =
        serde_json::from_str(&store.get("user", TEST_EMAIL).await.unwrap().unwrap()).unwrap();
    let device = &user["devices"][0];
    assert_eq!(device["credentialID"], authenticator.credential_id());
    assert_eq!(device["signCount"], 0);
    assert!(device["publicKeyCOSE"].as_str().unwrap().len() > 40);

    let owner = store
        .get("credential", &authenticator.credential_id())
        .await
        .unwrap();
    assert_eq!(owner.as_deref(), Some(TEST_EMAIL));

    // The spent session keeps only the email
    let session: Value =
        serde_json::from_str(&store.get("session", &session).await.unwrap().unwrap()).unwrap();
    assert_eq!(session, serde_json::json!({"email": TEST_EMAIL}));
}

#[tokio::test]
async fn test_cloned_authenticator_is_rejected() {
    // Given a login that advanced the stored count to 5
    let (engine, _) = engine_with_store();
    let mut authenticator = MockAuthenticator::new();
    register(&engine, &authenticator).await;
    authenticator.sign_count = 5;
    assert_eq!(login(&engine, &authenticator).await["success"], true);

    // When an assertion reports 3
    authenticator.sign_count = 3;
    let outcome = login(&engine, &authenticator).await;

    // Then the login fails with no detail
    assert_eq!(outcome, serde_json::json!({"success": false}));
}

#[tokio::test]
async fn test_unrecognised_transport_hint_is_dropped() {
    // Given a browser reporting a transport this server does not know
    let (engine, _) = engine_with_store();
    let authenticator = MockAuthenticator::new();
    let session = SessionStore::new_session_id().unwrap();
    let begin = engine.begin_registration(&session, TEST_EMAIL).await;
    let options = serde_json::to_value(begin.data.expect("registration options")).unwrap();
    let mut credential = authenticator.create(&options, TEST_ORIGIN);
    credential["response"]["transports"] = serde_json::json!(["usb", "smoke-signal", "nfc"]);

    // When registering with it
    let response: RegistrationResponse = serde_json::from_value(credential).unwrap();
    let outcome = engine.complete_registration(&session, &response).await;

    // Then registration succeeds and only the known hints are offered at login
    assert!(outcome.success, "registration failed: {:?}", outcome.message);
    let login = serde_json::to_value(engine.begin_login("sid", TEST_EMAIL).await).unwrap();
    assert_eq!(
        login["data"]["allowCredentials"][0]["transports"],
        serde_json::json!(["usb", "nfc"])
    );
}
