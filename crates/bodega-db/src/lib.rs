//! # bodega-db: Ledger Store and Inventory Service for Bodega
//!
//! SQLite persistence for the costing engine in `bodega-core`, and the
//! service that turns each stock mutation into one atomic write-set.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bodega Data Flow                                 │
//! │                                                                         │
//! │  Caller (POS screen, seed binary, tests)                               │
//! │       │  inventory.sale(cart, PaymentMethod::Cash)                     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bodega-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │InventoryService│──►│ LedgerStore    │──►│ Repositories │   │   │
//! │  │   │ (service/)     │   │ (store.rs)     │   │ (repository/)│   │   │
//! │  │   │                │   │                │   │              │   │   │
//! │  │   │ WorkingSet     │   │ run_atomic     │   │ guarded SQL  │   │   │
//! │  │   │ CostingStrategy│   │ ChangeSet feed │   │ per table    │   │   │
//! │  │   └────────────────┘   └────────────────┘   └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   Database (pool.rs) · migrations · AppConfig (config.rs)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool and per-tenant handles
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store and service error types
//! - [`repository`] - SQL per table
//! - [`store`] - The [`LedgerStore`] capability and its SQLite implementation
//! - [`service`] - [`InventoryService`]: stock mutations, catalog, reports
//! - [`config`] - Environment configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bodega_db::{Database, DbConfig};
//! use bodega_core::{CartLine, InventoryMethod, PaymentMethod, DEFAULT_TENANT_ID};
//!
//! let db = Database::new(DbConfig::new("bodega.db")).await?;
//! let inventory = db.inventory(DEFAULT_TENANT_ID, InventoryMethod::Cpp);
//!
//! let outcome = inventory
//!     .sale(&[CartLine::new(&product_id, 2)], PaymentMethod::Cash)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};
pub use service::InventoryService;
pub use store::{ChangeSet, Collection, DocumentChange, LedgerStore, LedgerWrite, SqliteLedgerStore};

// Repository re-exports for convenience
pub use repository::{
    BatchRepository, MovementRepository, ProductRepository, PurchaseOrderRepository,
    SettingsRepository, SupplierRepository,
};
