//! Pollhub server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use pollhub_api::{AppState, router};
use pollhub_common::{Config, build_storage, config::StorageKind};
use pollhub_core::UserService;
use pollhub_db::repositories::UserRepository;
use tokio::signal;
use axum::http::{HeaderValue, header};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollhub=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting pollhub server...");

    // Load configuration
    let config = Config::load()?;

    // Connect and bring the schema up to date before serving anything
    let db = pollhub_db::init(&config).await?;
    info!("Connected to database");

    pollhub_db::migrate(&db).await?;
    info!("Database migrations complete");

    let db = Arc::new(db);

    // Bootstrap admins
    let user_service = UserService::new(UserRepository::new(Arc::clone(&db)));
    user_service.promote_admins(&config.admin.usernames).await?;

    // Upload storage
    let storage = build_storage(&config.storage).await?;
    info!(backend = ?config.storage.backend, "Storage backend ready");

    let state = AppState::new(db, storage, &config)?;

    let mut app = router(state);

    // Local uploads are served by the app itself when their URL is a path.
    let files_path = config.storage.public_url.trim_end_matches('/');
    if config.storage.backend == StorageKind::Local && files_path.starts_with('/') {
        let files = tower::ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .service(ServeDir::new(&config.storage.local_path));
        app = app.nest_service(files_path, files);
    }

    let app = app.layer(TraceLayer::new_for_http());

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
