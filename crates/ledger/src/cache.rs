use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::record::{Aliases, Record, ALIASES_KEY, PLAY_DATE_FIELD, RECORDS_TABLE, SUB_PASSWORD_KEY};
use crate::store::{read_setting, RecordStore, Select, StoreError};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheSnapshot {
    pub records: Vec<Record>,
    pub aliases: Aliases,
    pub sub_password: Option<String>,
}

impl CacheSnapshot {
    pub fn sub_password(&self) -> Option<&str> {
        self.sub_password.as_deref().filter(|secret| !secret.is_empty())
    }
}

pub struct LedgerCache {
    store: Arc<dyn RecordStore>,
    current: RwLock<Arc<CacheSnapshot>>,
}

impl LedgerCache {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            current: RwLock::new(Arc::new(CacheSnapshot::default())),
        }
    }

    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.current.read().clone()
    }

    pub fn is_populated(&self) -> bool {
        !self.current.read().records.is_empty()
    }

    /// Reloads records, aliases and the sub-admin secret.
    ///
    /// Without `force_refresh` this is a no-op once records have been loaded.
    /// Store rejections degrade to empty defaults; only a transport failure on
    /// the records read is returned, and the old snapshot stays in place.
    pub async fn sync(&self, force_refresh: bool) -> Result<(), StoreError> {
        if !force_refresh && self.is_populated() {
            return Ok(());
        }

        let store = self.store.as_ref();
        let records_query = Select::all().order_desc(PLAY_DATE_FIELD);
        let (records, aliases, sub_password) = tokio::join!(
            store.select(RECORDS_TABLE, &records_query),
            read_setting(store, ALIASES_KEY),
            read_setting(store, SUB_PASSWORD_KEY),
        );

        let records = match records {
            Ok(rows) => rows.into_iter().map(Record::from).collect(),
            Err(err) if err.is_transport() => return Err(err),
            Err(err) => {
                warn!("failed to load records: {err}");
                Vec::new()
            }
        };
        let aliases = match aliases {
            Ok(Some(value)) => Aliases::from_value(value),
            Ok(None) => Aliases::default(),
            Err(err) => {
                warn!("failed to load aliases: {err}");
                Aliases::default()
            }
        };
        let sub_password = match sub_password {
            Ok(Some(Value::String(secret))) => Some(secret),
            Ok(_) => None,
            Err(err) => {
                warn!("failed to load sub-admin password: {err}");
                None
            }
        };

        let snapshot = CacheSnapshot {
            records,
            aliases,
            sub_password,
        };
        debug!(records = snapshot.records.len(), "cache synced");
        *self.current.write() = Arc::new(snapshot);
        Ok(())
    }
}
