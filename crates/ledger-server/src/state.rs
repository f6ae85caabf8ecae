use std::sync::Arc;

use ledger::{
    AuthResolver, InMemoryRecordStore, LedgerCache, RecordStore, RestRecordStore,
    RestStoreConfig, SystemConfig, WriteThrottle,
};
use tracing::{info, warn};

use crate::error::AppError;

pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub cache: LedgerCache,
    pub auth: AuthResolver,
    pub throttle: WriteThrottle,
}

impl AppState {
    pub fn new(config: &SystemConfig, store: Arc<dyn RecordStore>) -> Self {
        let auth = AuthResolver::new(config.get_string("security.admin_password"));
        let cooldown = config.get_number("throttle.cooldown_seconds").max(0) as u64;
        Self {
            cache: LedgerCache::new(store.clone()),
            store,
            auth,
            throttle: WriteThrottle::new(cooldown),
        }
    }

    pub fn from_config(config: SystemConfig) -> Result<Self, AppError> {
        let store = build_store(&config)?;
        Ok(Self::new(&config, store))
    }

    /// Forced resync after a successful mutation. The mutation already landed,
    /// so a failed reload is logged and the stale snapshot is served until the
    /// next sync.
    pub async fn refresh_after_write(&self) {
        if let Err(err) = self.cache.sync(true).await {
            warn!("cache resync after write failed: {err}");
        }
    }
}

fn build_store(config: &SystemConfig) -> Result<Arc<dyn RecordStore>, AppError> {
    let url = config.get_string("store.url");
    if url.trim().is_empty() {
        warn!("store.url not set, records are kept in memory only");
        return Ok(InMemoryRecordStore::shared());
    }
    let timeout_ms = config.get_number("store.timeout_ms");
    let timeout_ms = if timeout_ms <= 0 { 10_000 } else { timeout_ms };
    info!("using remote store at {url}");
    let store = RestRecordStore::new(RestStoreConfig {
        base_url: url,
        api_key: config.get_string("store.key"),
        timeout_ms: timeout_ms as u64,
    })?;
    Ok(Arc::new(store))
}
