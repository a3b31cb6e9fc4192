//! Application state wiring the gateway together.
//!
//! AppState pins the generic `SessionManager` to the loopback connection
//! provider and the configured document store backend. Both the CLI and the
//! REST API go through it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wagate_core::lifecycle::{SessionManager, SessionManagerConfig};
use wagate_core::provider::loopback::LoopbackProvider;
use wagate_infra::store::DocumentBackend;
use wagate_types::config::GatewayConfig;

use crate::http::extractors::auth::hash_api_key;

/// Session manager pinned to the concrete provider and store.
pub type Gateway = SessionManager<LoopbackProvider, DocumentBackend>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub config: Arc<GatewayConfig>,
    pub data_dir: PathBuf,
    /// SHA-256 of `server.api_key`; `None` disables authentication.
    pub api_key_hash: Option<String>,
    /// Cancelled when the server begins shutting down; ends long-lived streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Open the configured store under `data_dir` and build the gateway.
    pub async fn open(data_dir: PathBuf, config: GatewayConfig) -> anyhow::Result<Self> {
        let store = DocumentBackend::open(&data_dir, config.store.backend).await?;
        let gateway = SessionManager::new(
            LoopbackProvider::new(),
            Arc::new(store),
            SessionManagerConfig::from(&config),
        )
        .await?;

        let api_key_hash = config
            .server
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(hash_api_key);

        Ok(Self {
            gateway,
            config: Arc::new(config),
            data_dir,
            api_key_hash,
            shutdown: CancellationToken::new(),
        })
    }

    /// The in-process provider, for loopback control endpoints.
    pub fn loopback(&self) -> &LoopbackProvider {
        self.gateway.provider()
    }
}
