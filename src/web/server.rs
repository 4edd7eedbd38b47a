//! Web server for ClassConnect.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::Config;
use crate::db::SharedDatabase;
use crate::rate_limit::RateLimiter;
use crate::security::{MaintenanceScheduler, SecurityEventSink};

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Per-route-class rate limiter.
    limiter: Arc<RateLimiter>,
    /// Security event sink.
    sink: Arc<SecurityEventSink>,
    /// Configuration.
    config: Config,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, db: SharedDatabase) -> Self {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .expect("Invalid web server address");

        let sink = Arc::new(SecurityEventSink::new());
        let app_state = Arc::new(AppState::new(
            db,
            &config.auth,
            config.server.production,
            sink.clone(),
        ));
        let limiter = Arc::new(RateLimiter::local(&config.rate_limit));

        Self {
            addr,
            app_state,
            limiter,
            sink,
            config: config.clone(),
        }
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn build_router(&self) -> axum::Router {
        create_router(
            self.app_state.clone(),
            self.limiter.clone(),
            self.sink.clone(),
            &self.config.server.cors_origins,
        )
        .merge(create_health_router())
    }

    /// Start background maintenance (stale-session purge).
    fn start_maintenance(&self) {
        let scheduler =
            MaintenanceScheduler::new(self.app_state.db.clone(), &self.config.maintenance);
        scheduler.start();
        tracing::info!(
            interval_secs = self.config.maintenance.cleanup_interval_secs,
            "Session maintenance task started"
        );
    }

    /// Run the web server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        // Start maintenance after successful bind
        self.start_maintenance();

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr, std::io::Error> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        self.start_maintenance();

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            let service = router.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
