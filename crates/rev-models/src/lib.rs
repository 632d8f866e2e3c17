//! # rev-models
//!
//! rev-models is a **data-modelling library**: applications declare models
//! made of typed fields, and every create, read, update or remove goes
//! through one pipeline that validates data and resolves relations before a
//! pluggable storage backend sees it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Manager (manager.rs)                                       │
//! │  - Registry of models and backends                          │
//! │  - Thin facade over the operations                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Operations (operations/*.rs)                               │
//! │  - validating → executing → resolving-relations → complete  │
//! │  - Return structured OperationResult values                 │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                    │
//!          ▼                                    ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │  Validation (validation/)│   │  Storage (backend/)          │
//! │  - Field + model rules   │   │  - Backend trait             │
//! │  - Async rules, timeout  │   │  - MemoryBackend             │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! Models are described by [`model::ModelMeta`] values built from
//! [`fields::Field`] descriptors. Queries ([`query::Where`],
//! [`query::OrderBy`]) are parsed against that metadata, so a typo in a field
//! name fails before any backend call.
//!
//! ## Error Model
//!
//! Outcomes a caller is expected to handle, such as failed validation or an
//! update that found nothing, come back as an
//! [`operations::OperationResult`] with `success = false`. Programming and
//! environment faults (unregistered models, malformed queries, validation
//! timeouts, backend failures) are [`error::ModelError`]s.
//!
//! ## Async
//!
//! Operations are `async` and run on tokio. Async field validators are
//! spawned as tasks, so validation must run inside a tokio runtime.
//!
//! ## Logging
//!
//! The library emits [`tracing`] events (registration, operation stages,
//! validation timeouts) and never installs a subscriber itself.
//!
//! ## Module Overview
//!
//! - [`fields`]: field descriptors and kinds
//! - [`model`]: model metadata and instances
//! - [`validation`]: the validation engine
//! - [`query`]: filter and ordering
//! - [`backend`]: the storage contract and the in-memory backend
//! - [`operations`]: the CRUD pipeline
//! - [`manager`]: the registry and facade
//! - [`config`]: manager configuration
//! - [`error`]: error types

pub mod backend;
pub mod config;
pub mod error;
pub mod fields;
pub mod manager;
pub mod model;
pub mod operations;
pub mod query;
pub mod validation;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use error::{ModelError, Result};
pub use manager::ModelManager;
