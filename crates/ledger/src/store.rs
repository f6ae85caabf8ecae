use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::record::{ID_FIELD, SETTINGS_TABLE};

pub type Row = Map<String, Value>;

pub const SETTINGS_KEY_FIELD: &str = "key";
pub const SETTINGS_VALUE_FIELD: &str = "value";

#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Conflict(String),
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("store unreachable: {0}")]
    Transport(String),
    #[error("malformed store payload: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Select {
    pub filter: Option<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Select {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Mutations return the rows they touched.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, StoreError>;
    async fn insert(&self, table: &str, row: Row) -> Result<Vec<Row>, StoreError>;
    async fn update(&self, table: &str, filter: &Filter, patch: &Row) -> Result<Vec<Row>, StoreError>;
    async fn delete(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError>;
    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Vec<Row>, StoreError>;
}

pub async fn read_setting(store: &dyn RecordStore, key: &str) -> Result<Option<Value>, StoreError> {
    let query = Select::all()
        .filter(Filter::eq(SETTINGS_KEY_FIELD, key))
        .limit(1);
    let rows = store.select(SETTINGS_TABLE, &query).await?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|mut row| row.remove(SETTINGS_VALUE_FIELD)))
}

pub async fn write_setting(store: &dyn RecordStore, key: &str, value: Value) -> Result<(), StoreError> {
    let mut row = Row::new();
    row.insert(SETTINGS_KEY_FIELD.to_string(), Value::from(key));
    row.insert(SETTINGS_VALUE_FIELD.to_string(), value);
    store.upsert(SETTINGS_TABLE, row, SETTINGS_KEY_FIELD).await?;
    Ok(())
}

#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<Mutex<HashMap<String, Vec<Row>>>>,
    failures: Arc<Mutex<HashMap<String, StoreError>>>,
    select_failures: Arc<Mutex<HashMap<String, StoreError>>>,
    next_id: Arc<AtomicU64>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            ..Self::default()
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    pub fn fail_table(&self, table: &str, err: StoreError) {
        self.failures.lock().insert(table.to_string(), err);
    }

    /// Fails only the next `select` on `table`.
    pub fn fail_next_select(&self, table: &str, err: StoreError) {
        self.select_failures.lock().insert(table.to_string(), err);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
        self.select_failures.lock().clear();
    }

    fn begin(&self, table: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        match self.failures.lock().get(table) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn unique_column(table: &str) -> &'static str {
        if table == SETTINGS_TABLE {
            SETTINGS_KEY_FIELD
        } else {
            ID_FIELD
        }
    }

    // Called with the table lock held. Generated ids skip any id already
    // present, and explicit numeric ids move the counter past themselves.
    fn assign_id(&self, table: &str, row: &mut Row, existing: &[Row]) {
        if table == SETTINGS_TABLE {
            return;
        }
        if let Some(explicit) = row.get(ID_FIELD) {
            if let Some(id) = explicit.as_u64() {
                self.next_id.fetch_max(id.saturating_add(1), AtomicOrdering::SeqCst);
            }
            return;
        }
        loop {
            let id = Value::from(self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
            if !existing.iter().any(|other| other.get(ID_FIELD) == Some(&id)) {
                row.insert(ID_FIELD.to_string(), id);
                return;
            }
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Row>, StoreError> {
        self.begin(table)?;
        if let Some(err) = self.select_failures.lock().remove(table) {
            return Err(err);
        }
        let tables = self.tables.lock();
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_filter(row, query.filter.as_ref()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Vec<Row>, StoreError> {
        self.begin(table)?;
        let unique = Self::unique_column(table);
        let mut tables = self.tables.lock();
        let rows = tables.entry(table.to_string()).or_default();
        if let Some(key) = row.get(unique) {
            if rows.iter().any(|existing| existing.get(unique) == Some(key)) {
                return Err(StoreError::Conflict(format!("{table}.{unique} = {key}")));
            }
        }
        self.assign_id(table, &mut row, rows);
        rows.push(row.clone());
        Ok(vec![row])
    }

    async fn update(&self, table: &str, filter: &Filter, patch: &Row) -> Result<Vec<Row>, StoreError> {
        self.begin(table)?;
        let mut tables = self.tables.lock();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches_filter(row, Some(filter))) {
            for (key, value) in patch {
                row.insert(key.clone(), value.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        self.begin(table)?;
        let mut tables = self.tables.lock();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        let (removed, kept): (Vec<Row>, Vec<Row>) = rows
            .drain(..)
            .partition(|row| matches_filter(row, Some(filter)));
        *rows = kept;
        Ok(removed)
    }

    async fn upsert(&self, table: &str, mut row: Row, on_conflict: &str) -> Result<Vec<Row>, StoreError> {
        self.begin(table)?;
        let mut tables = self.tables.lock();
        let rows = tables.entry(table.to_string()).or_default();
        let key = row.get(on_conflict).cloned();
        match rows
            .iter()
            .position(|existing| key.is_some() && existing.get(on_conflict) == key.as_ref())
        {
            Some(index) => {
                let existing = &mut rows[index];
                for (field, value) in &row {
                    existing.insert(field.clone(), value.clone());
                }
                Ok(vec![existing.clone()])
            }
            None => {
                self.assign_id(table, &mut row, rows);
                rows.push(row.clone());
                Ok(vec![row])
            }
        }
    }
}

fn matches_filter(row: &Row, filter: Option<&Filter>) -> bool {
    match filter {
        None => true,
        Some(filter) => row.get(&filter.column) == Some(&filter.value),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
