#![forbid(unsafe_code)]

use std::sync::Arc;

use pacsrepair::AddressServiceClient;
use pacsrepair_api::{router, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let address_service = match std::env::var("PACSREPAIR_ADDRESS_SERVICE_URL") {
        Ok(url) => match AddressServiceClient::new(url) {
            Ok(client) => Some(client),
            Err(err) => {
                error!("failed to create address service client: {err}");
                return;
            }
        },
        Err(_) => None,
    };
    let state = match AppState::new(address_service) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            error!("failed to initialise server state: {err}");
            return;
        }
    };
    let app = router(state);

    let host = std::env::var("PACSREPAIR_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PACSREPAIR_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{host}:{port}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            return;
        }
    };

    info!("listening on http://{addr}");
    if let Err(err) = axum::serve(listener, app).await {
        error!("server error: {err}");
    }
}
