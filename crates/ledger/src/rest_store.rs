use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::store::{Filter, RecordStore, Row, Select, StoreError};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone, Debug)]
pub struct RestStoreConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

/// Client for a PostgREST-style table API (`/rest/v1/<table>`).
#[derive(Clone)]
pub struct RestRecordStore {
    client: reqwest::Client,
    config: RestStoreConfig,
}

impl RestRecordStore {
    pub fn new(config: RestStoreConfig) -> Result<Self, StoreError> {
        let timeout = Duration::from_millis(config.timeout_ms.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers(&config.api_key)?)
            .build()
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url.trim_end_matches('/'), table)
    }

    async fn send(
        &self,
        method: Method,
        table: &str,
        params: Vec<(String, String)>,
        prefer: &str,
        body: Option<Value>,
    ) -> Result<Vec<Row>, StoreError> {
        debug!("store {} {}", method, table);
        let mut request = self
            .client
            .request(method, self.table_url(table))
            .query(&params)
            .header("Prefer", prefer);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(classify_failure(status, &bytes));
        }
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|err| StoreError::Serialization(err.to_string()))
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, StoreError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        if let Some(filter) = &query.filter {
            params.push(filter_param(filter));
        }
        if let Some(order) = &query.order {
            let direction = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        self.send(Method::GET, table, params, "return=representation", None)
            .await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Vec<Row>, StoreError> {
        self.send(
            Method::POST,
            table,
            Vec::new(),
            "return=representation",
            Some(Value::Object(row)),
        )
        .await
    }

    async fn update(&self, table: &str, filter: &Filter, patch: &Row) -> Result<Vec<Row>, StoreError> {
        self.send(
            Method::PATCH,
            table,
            vec![filter_param(filter)],
            "return=representation",
            Some(Value::Object(patch.clone())),
        )
        .await
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        self.send(
            Method::DELETE,
            table,
            vec![filter_param(filter)],
            "return=representation",
            None,
        )
        .await
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Vec<Row>, StoreError> {
        self.send(
            Method::POST,
            table,
            vec![("on_conflict".to_string(), on_conflict.to_string())],
            "resolution=merge-duplicates,return=representation",
            Some(Value::Object(row)),
        )
        .await
    }
}

fn default_headers(api_key: &str) -> Result<HeaderMap, StoreError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if api_key.is_empty() {
        return Ok(headers);
    }
    let key = HeaderValue::from_str(api_key)
        .map_err(|err| StoreError::Transport(format!("invalid store key: {err}")))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|err| StoreError::Transport(format!("invalid store key: {err}")))?;
    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

pub(crate) fn filter_param(filter: &Filter) -> (String, String) {
    let value = match &filter.value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    (filter.column.clone(), format!("eq.{value}"))
}

pub(crate) fn classify_failure(status: StatusCode, body: &[u8]) -> StoreError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|value| value.get("code"))
        .and_then(Value::as_str);
    let message = parsed
        .as_ref()
        .and_then(|value| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    if code == Some(UNIQUE_VIOLATION) || status == StatusCode::CONFLICT {
        return StoreError::Conflict(message);
    }
    StoreError::Rejected {
        status: status.as_u16(),
        message,
    }
}
