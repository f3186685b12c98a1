use crate::config::Config;
use crate::error::Result;
use crate::handlers::{health_check, hello};
use crate::middleware::{logging_middleware, ThrottleLayer};
use crate::registry::ClientRegistry;
use axum::routing::get;
use axum::{middleware, Router};
use std::net::SocketAddr;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Router with every route behind the throttle
pub fn create_app(registry: ClientRegistry) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .with_state(registry.clone())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(logging_middleware))
                .layer(ThrottleLayer::new(registry)),
        )
}

pub struct Server {
    app: Router,
    registry: ClientRegistry,
    bind_addr: SocketAddr,
}

impl Server {
    pub fn new(config: Config) -> Result<Self> {
        let registry = ClientRegistry::new(config.throttle()?);
        let app = create_app(registry.clone());

        Ok(Self {
            app,
            registry,
            bind_addr: config.bind_addr,
        })
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub async fn run(self) -> Result<()> {
        let sweeper = self.registry.spawn_sweeper();
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        let throttle = self.registry.config();
        tracing::info!("ipthrottle listening on {}", self.bind_addr);
        tracing::info!(
            refill_rate = throttle.quota.refill_rate,
            burst = throttle.quota.burst,
            idle_timeout_secs = throttle.idle_timeout.as_secs(),
            sweep_interval_secs = throttle.sweep_interval.as_secs(),
            "Throttling clients"
        );

        // Run server with graceful shutdown
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        sweeper.abort();
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_rejects_invalid_config() {
        let config = Config {
            burst: 0,
            ..Config::default()
        };
        assert!(Server::new(config).is_err());
    }

    #[test]
    fn test_server_uses_configured_quota() {
        let config = Config {
            refill_rate: 5.0,
            burst: 7,
            ..Config::default()
        };
        let server = Server::new(config).unwrap();
        assert_eq!(server.registry().config().quota.burst, 7);
        assert!(server.registry().is_empty());
    }
}
