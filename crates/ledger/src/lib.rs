pub mod auth;
pub mod cache;
pub mod config;
pub mod rate_limit;
pub mod record;
pub mod rest_store;
pub mod static_config;
pub mod store;

pub use auth::{require_authenticated, require_super_admin, AccessError, AuthResolver, Role};
pub use cache::{CacheSnapshot, LedgerCache};
pub use config::{ConfigError, SystemConfig, SystemConfigLoader};
pub use rate_limit::{ThrottleDecision, WriteThrottle, DEFAULT_COOLDOWN_SECONDS};
pub use record::{
    numeric_id, Aliases, Record, ALIASES_KEY, ID_FIELD, PLAY_DATE_FIELD, RECORDS_TABLE,
    SETTINGS_TABLE, SUB_PASSWORD_KEY,
};
pub use rest_store::{RestRecordStore, RestStoreConfig};
pub use store::{
    read_setting, write_setting, Filter, InMemoryRecordStore, OrderBy, RecordStore, Row, Select,
    StoreError,
};
