//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState holds:
//! - **Gateway**: the dispute session gateway over the bid engine
//! - **Sessions**: the realtime session hub the gateway publishes to
//! - **Metrics**: the Prometheus handle rendered at `/metrics`, when installed
//!
//! The ledger store behind the gateway is either the in-memory ledger or
//! [`crate::db::PgLedger`], chosen at startup.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use parley_state::{BidEngine, LedgerStore, MemoryLedger};

use crate::gateway::DisputeGateway;
use crate::session::SessionHub;

/// Application configuration, read from the environment.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to (`PORT`, default 8080).
    pub port: u16,
    /// Postgres connection string (`DATABASE_URL`). Absent means in-memory.
    pub database_url: Option<String>,
    /// Whether `/metrics` and the metrics middleware are mounted
    /// (`PARLEY_METRICS_ENABLED`, default true).
    pub metrics_enabled: bool,
    /// Events buffered per dispute session (`PARLEY_SESSION_CAPACITY`).
    pub session_capacity: usize,
}

/// Custom Debug that redacts the database URL, which may carry credentials.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("metrics_enabled", &self.metrics_enabled)
            .field("session_capacity", &self.session_capacity)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            metrics_enabled: true,
            session_capacity: SessionHub::DEFAULT_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            metrics_enabled: lookup("PARLEY_METRICS_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(defaults.metrics_enabled),
            session_capacity: lookup("PARLEY_SESSION_CAPACITY")
                .and_then(|c| c.parse().ok())
                .filter(|c: &usize| *c > 0)
                .unwrap_or(defaults.session_capacity),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: DisputeGateway,
    pub sessions: SessionHub,
    pub config: AppConfig,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// In-memory state with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryLedger::new()))
    }

    /// State over an explicit ledger store. The session hub is wired in as
    /// the gateway's notifier.
    pub fn with_store(config: AppConfig, store: Arc<dyn LedgerStore>) -> Self {
        let sessions = SessionHub::new(config.session_capacity);
        let gateway = DisputeGateway::new(BidEngine::new(store), Arc::new(sessions.clone()));
        Self {
            gateway,
            sessions,
            config,
            metrics: None,
        }
    }

    /// Attach the Prometheus handle rendered at `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert!(config.metrics_enabled);
        assert_eq!(config.session_capacity, 64);
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("DATABASE_URL", "postgres://parley:secret@db/parley"),
            ("PARLEY_METRICS_ENABLED", "FALSE"),
            ("PARLEY_SESSION_CAPACITY", "8"),
        ]));
        assert_eq!(config.port, 9090);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://parley:secret@db/parley")
        );
        assert!(!config.metrics_enabled);
        assert_eq!(config.session_capacity, 8);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("DATABASE_URL", "   "),
            ("PARLEY_SESSION_CAPACITY", "0"),
        ]));
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.session_capacity, 64);
    }

    #[test]
    fn debug_redacts_database_url() {
        let config = AppConfig {
            database_url: Some("postgres://parley:secret@db/parley".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn gateway_publishes_to_state_sessions() {
        let state = AppState::new();
        let dispute = state.gateway.create_dispute().await.unwrap();
        let mut session = state.sessions.subscribe(dispute.id);
        state.gateway.place_bid(dispute.id.get(), 10).await.unwrap();
        assert!(session.next().await.is_some());
    }
}
