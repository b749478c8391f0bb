#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, HeaderName, Method};
use hush_adapter::config::AdapterConfig;
use hush_adapter::{router, AdapterRuntime};
use hush_engines::platform::USER_TOKEN_HEADER;
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AdapterConfig::from_env();
    let addr: SocketAddr = config.http_bind.parse()?;
    let runtime = AdapterRuntime::from_config(&config)?;

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_TOKEN_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60));
    let app = router(runtime).layer(cors);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "hush_adapter_http listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("hush_adapter_http stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
