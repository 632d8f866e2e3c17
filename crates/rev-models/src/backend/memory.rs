use super::{Backend, Page, ReadPage};
use crate::config::ManagerConfig;
use crate::error::{ModelError, Result};
use crate::model::{ModelMeta, Record};
use crate::query::{sort_records, OrderBy, Where};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct Table {
    records: Vec<Record>,
    /// Last value handed out per auto-number field.
    counters: HashMap<String, i64>,
}

/// In-memory backend: one ordered table per model.
///
/// The tables sit behind a `Mutex` so the backend can be shared as
/// `Arc<dyn Backend>`; the lock is only taken inside synchronous sections
/// and never held across an await.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Table>>,
    delay: Option<Duration>,
    simulate_failure: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits `delay` before touching the tables, mimicking a
    /// network-backed store.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn from_config(config: &ManagerConfig) -> Self {
        Self {
            delay: config.backend_delay(),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with [`ModelError::Backend`].
    pub fn set_simulate_failure(&self, simulate: bool) {
        self.simulate_failure.store(simulate, Ordering::SeqCst);
    }

    /// Number of records currently stored for `model`.
    pub fn count(&self, model: &str) -> usize {
        self.lock()
            .map(|tables| tables.get(model).map_or(0, |t| t.records.len()))
            .unwrap_or(0)
    }

    /// Number of `read` calls served since creation or the last reset.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn reset_read_count(&self) {
        self.reads.store(0, Ordering::SeqCst);
    }

    async fn begin(&self, meta: &ModelMeta, call: &str) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.simulate_failure.load(Ordering::SeqCst) {
            return Err(ModelError::Backend(format!(
                "simulated failure in {} for model {}",
                call,
                meta.name()
            )));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Table>>> {
        self.tables
            .lock()
            .map_err(|_| ModelError::Backend("memory backend lock poisoned".to_string()))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn create(&self, meta: &ModelMeta, mut record: Record) -> Result<Record> {
        self.begin(meta, "create").await?;
        let mut tables = self.lock()?;
        let table = tables.entry(meta.name().to_string()).or_default();

        for field in meta.fields().iter().filter(|f| f.is_auto_number()) {
            let counter = table.counters.entry(field.name().to_string()).or_insert(0);
            *counter += 1;
            record.insert(field.name().to_string(), Value::from(*counter));
        }
        let record = in_field_order(meta, record);

        table.records.push(record.clone());
        tracing::trace!(model = meta.name(), "memory backend stored record");
        Ok(record)
    }

    async fn read(
        &self,
        meta: &ModelMeta,
        filter: &Where,
        order_by: &[OrderBy],
        page: Page,
    ) -> Result<ReadPage> {
        self.begin(meta, "read").await?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.lock()?;
        let Some(table) = tables.get(meta.name()) else {
            return Ok(ReadPage::default());
        };

        let mut matched: Vec<Record> = table
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        drop(tables);

        sort_records(&mut matched, order_by);
        let total_count = matched.len();
        let records = matched
            .into_iter()
            .skip(page.offset)
            .take(page.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(ReadPage {
            records,
            total_count,
        })
    }

    async fn update(&self, meta: &ModelMeta, changes: &Record, filter: &Where) -> Result<usize> {
        self.begin(meta, "update").await?;
        let mut tables = self.lock()?;
        let Some(table) = tables.get_mut(meta.name()) else {
            return Ok(0);
        };

        let mut count = 0;
        for record in table.records.iter_mut().filter(|r| filter.matches(r)) {
            let mut changed = std::mem::take(record);
            for (field, value) in changes {
                changed.insert(field.clone(), value.clone());
            }
            *record = in_field_order(meta, changed);
            count += 1;
        }
        Ok(count)
    }

    async fn remove(&self, meta: &ModelMeta, filter: &Where) -> Result<usize> {
        self.begin(meta, "remove").await?;
        let mut tables = self.lock()?;
        let Some(table) = tables.get_mut(meta.name()) else {
            return Ok(0);
        };

        let before = table.records.len();
        table.records.retain(|r| !filter.matches(r));
        Ok(before - table.records.len())
    }
}

/// Lays a record out in the model's field declaration order. Keys the model
/// does not declare keep their relative order after the declared ones.
fn in_field_order(meta: &ModelMeta, record: Record) -> Record {
    let mut ordered = Record::new();
    for field in meta.stored_fields() {
        if let Some(value) = record.get(field.name()) {
            ordered.insert(field.name().to_string(), value.clone());
        }
    }
    for (key, value) in record {
        if !ordered.contains_key(&key) {
            ordered.insert(key, value);
        }
    }
    ordered
}
