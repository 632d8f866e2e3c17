//! # Storage Layer
//!
//! The [`Backend`] trait is the CRUD contract a storage implementation must
//! satisfy. The operation pipeline owns validation and relation resolution;
//! a backend only stores, filters, orders and pages plain [`Record`]s.
//!
//! ## Contract
//!
//! - `create` stores a record and returns it as stored, with every
//!   auto-number field assigned.
//! - `read` applies filter, then ordering, then paging, and reports the
//!   number of matching records irrespective of paging.
//! - `update` applies the given values to every matching record and
//!   returns how many matched.
//! - `remove` deletes every matching record and returns how many matched.
//!
//! Matching nothing is not an error for any call. Errors returned by a
//! backend are unexpected faults and propagate past the pipeline.
//!
//! ## Implementations
//!
//! - [`memory::MemoryBackend`]: in-process tables, for development and tests.

use crate::error::Result;
use crate::model::{ModelMeta, Record};
use crate::query::{OrderBy, Where};
use async_trait::async_trait;

pub mod memory;

pub use memory::MemoryBackend;

/// One window of read results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadPage {
    pub records: Vec<Record>,
    /// Matching records before paging.
    pub total_count: usize,
}

/// Paging window. `limit: None` reads every matching record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Store a new record, assigning auto-number fields.
    async fn create(&self, meta: &ModelMeta, record: Record) -> Result<Record>;

    /// Filter, order and page the records of a model.
    async fn read(
        &self,
        meta: &ModelMeta,
        filter: &Where,
        order_by: &[OrderBy],
        page: Page,
    ) -> Result<ReadPage>;

    /// Apply `changes` to every matching record.
    async fn update(&self, meta: &ModelMeta, changes: &Record, filter: &Where) -> Result<usize>;

    /// Delete every matching record.
    async fn remove(&self, meta: &ModelMeta, filter: &Where) -> Result<usize>;
}
