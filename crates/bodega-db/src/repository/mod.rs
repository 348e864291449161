//! # Repository Module
//!
//! SQL for each table, one repository per table.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where the SQL Lives                                  │
//! │                                                                         │
//! │  InventoryService                                                      │
//! │       │  store.read_product(id) / store.run_atomic(writes)             │
//! │       ▼                                                                 │
//! │  SqliteLedgerStore                                                     │
//! │  ├── reads   → repo.get_by_id(id)          (pool)                      │
//! │  └── writes  → repo.update_guarded(&mut tx, ..)  (one transaction)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductRepository, BatchRepository, MovementRepository, ...           │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repository is bound to one tenant and filters on `tenant_id`.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog and costing state
//! - [`BatchRepository`] - FIFO lots
//! - [`MovementRepository`] - Append-only ledger
//! - [`SupplierRepository`] - Suppliers
//! - [`PurchaseOrderRepository`] - Purchase orders with JSON lines
//! - [`SettingsRepository`] - Per-tenant settings

pub mod batch;
pub mod movement;
pub mod product;
pub mod purchase_order;
pub mod settings;
pub mod supplier;

pub use batch::BatchRepository;
pub use movement::MovementRepository;
pub use product::ProductRepository;
pub use purchase_order::PurchaseOrderRepository;
pub use settings::SettingsRepository;
pub use supplier::SupplierRepository;
