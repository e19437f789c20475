#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics from corrupt data.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, http::Request, routing::any};
use server::auth::{GatewayState, Principal, authenticate, load_auth_configuration};
use server::config::ServerConfig;
use server::diagnostics::TracingDiagnostics;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: auth_directory={}, listen_port={}",
        config.auth_directory.display(),
        config.listen_port
    );

    // Load the trust configuration before accepting any connection.
    // A failure here is fatal; a partially trusted server is never started.
    let diagnostics = Arc::new(TracingDiagnostics);
    let configuration =
        match load_auth_configuration(&config.auth_directory, diagnostics.as_ref()) {
            Ok(configuration) => configuration,
            Err(e) => {
                tracing::error!("Failed to load authentication configuration: {e}");
                std::process::exit(1);
            }
        };
    tracing::info!(
        "Loaded {} provider trust record(s), allow_anonymous={}",
        configuration.providers.len(),
        configuration.allow_anonymous
    );

    let state = GatewayState {
        configuration: Arc::new(configuration),
        diagnostics,
    };

    // The fact engine behind the gateway is an external collaborator; this
    // handler stands in for it.
    let app = Router::new()
        .route("/facts", any(fact_handler))
        .layer(axum::middleware::from_fn_with_state(state, authenticate));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}

/// Placeholder downstream handler. Reads the principal the gateway attached,
/// or none for an anonymous request.
async fn fact_handler(request: Request<axum::body::Body>) -> String {
    match request.extensions().get::<Principal>() {
        Some(principal) => {
            tracing::debug!("request from {} via {}", principal.id, principal.provider);
            format!("hello, {}\n", principal.id)
        }
        None => "hello, anonymous\n".to_string(),
    }
}
