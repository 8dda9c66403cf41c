use std::sync::Arc;

use axum::http::{Method, header};
use tower_http::cors::{Any, CorsLayer};

use message_composer::compose::SessionRegistry;
use message_composer::config::ComposerConfig;
use message_composer::generation::create_gateway;
use message_composer::routes::{ComposeRouteState, compose_routes};
use message_composer::store::{LibSqlMessageStore, MessageStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ComposerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export COMPOSER_PRIMARY_URL=https://.../generateMessage");
        eprintln!("  export COMPOSER_PROVIDER_API_KEY=sk-...");
        std::process::exit(1);
    });

    eprintln!("✉️  Message Composer v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Primary: {}", config.primary_url);
    eprintln!("   Fallback: {} ({})", config.provider_url, config.model);
    eprintln!("   Database: {}", config.db_path);
    eprintln!("   API: http://0.0.0.0:{}/api/compose/{{user}}", config.port);

    let gateway = Arc::new(create_gateway(&config)?);

    let db_path = std::path::Path::new(&config.db_path);
    let store: Arc<dyn MessageStore> = Arc::new(
        LibSqlMessageStore::new_local(db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
                std::process::exit(1);
            }),
    );

    let state = ComposeRouteState {
        sessions: Arc::new(SessionRegistry::new()),
        gateway,
        store,
    };

    let app = compose_routes(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Compose server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
