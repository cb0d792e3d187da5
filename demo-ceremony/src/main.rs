//! Drives the ceremony engine from JSON lines on stdin.
//!
//! Each input line is one request:
//!
//! ```text
//! {"op": "begin-register", "email": "a@example.com"}
//! {"op": "complete-register", "session": "<id>", "response": { ...PublicKeyCredential JSON... }}
//! {"op": "begin-login", "session": "<id>", "email": "a@example.com"}
//! {"op": "complete-login", "session": "<id>", "response": { ... }}
//! ```
//!
//! and produces one line `{"session": "<id>", "outcome": {success, data?, message?}}`
//! on stdout. A missing `session` on a begin request mints a fresh one.

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use passkey_ceremony::{
    AuthenticationResponse, CeremonyEngine, RegistrationResponse, RelyingPartyConfig,
    SessionStore, store_from_env,
};

#[derive(Deserialize, Debug)]
#[serde(tag = "op", rename_all = "kebab-case")]
enum Request {
    BeginRegister {
        session: Option<String>,
        email: String,
    },
    CompleteRegister {
        session: String,
        response: RegistrationResponse,
    },
    BeginLogin {
        session: Option<String>,
        email: String,
    },
    CompleteLogin {
        session: String,
        response: AuthenticationResponse,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // stdout carries the JSON protocol
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn session_or_new(session: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match session {
        Some(id) => Ok(id),
        None => Ok(SessionStore::new_session_id()?),
    }
}

async fn handle(
    engine: &CeremonyEngine,
    request: Request,
) -> Result<Value, Box<dyn std::error::Error>> {
    let (session, outcome) = match request {
        Request::BeginRegister { session, email } => {
            let session = session_or_new(session)?;
            let outcome = engine.begin_registration(&session, &email).await;
            (session, serde_json::to_value(outcome)?)
        }
        Request::CompleteRegister { session, response } => {
            let outcome = engine.complete_registration(&session, &response).await;
            (session, serde_json::to_value(outcome)?)
        }
        Request::BeginLogin { session, email } => {
            let session = session_or_new(session)?;
            let outcome = engine.begin_login(&session, &email).await;
            (session, serde_json::to_value(outcome)?)
        }
        Request::CompleteLogin { session, response } => {
            let outcome = engine.complete_login(&session, &response).await;
            (session, serde_json::to_value(outcome)?)
        }
    };

    Ok(json!({ "session": session, "outcome": outcome }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = RelyingPartyConfig::from_env()?;
    let store = store_from_env().await?;
    let engine = CeremonyEngine::new(config, store);

    tracing::info!(
        "Ceremony engine ready for origin {}; reading requests from stdin",
        engine.config().origin()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                tracing::debug!("Request: {:?}", request);
                handle(&engine, request).await?
            }
            Err(e) => {
                tracing::warn!("Malformed request: {}", e);
                json!({ "outcome": { "success": false, "message": "Malformed request" } })
            }
        };

        stdout.write_all(reply.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
