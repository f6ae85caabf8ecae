#[derive(Clone, Debug)]
pub struct StaticConfigItem {
    pub key: &'static str,
    pub env: &'static str,
    pub value_type: &'static str,
    pub default_value: &'static str,
}

pub static STATIC_CONFIG_TABLE: &[StaticConfigItem] = &[
    StaticConfigItem {
        key: "store.url",
        env: "SUPABASE_URL",
        value_type: "string",
        default_value: "",
    },
    StaticConfigItem {
        key: "store.key",
        env: "SUPABASE_KEY",
        value_type: "string",
        default_value: "",
    },
    StaticConfigItem {
        key: "store.timeout_ms",
        env: "LEDGER_STORE_TIMEOUT_MS",
        value_type: "number",
        default_value: "10000",
    },
    StaticConfigItem {
        key: "security.admin_password",
        env: "ADMIN_PASSWORD",
        value_type: "string",
        default_value: "admin123",
    },
    StaticConfigItem {
        key: "throttle.cooldown_seconds",
        env: "SUB_ADMIN_COOLDOWN_SECONDS",
        value_type: "number",
        default_value: "600",
    },
];
