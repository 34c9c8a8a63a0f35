//! # medipos-db: Persistence and Sale Engine for MediPOS
//!
//! SQLite persistence layer and the transactional sale engine built on it.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       medipos-db Overview                               │
//! │                                                                         │
//! │  Database (pool + migrations)                                          │
//! │      │                                                                  │
//! │      ├── MedicineRepository     catalog CRUD, search, low-stock        │
//! │      ├── BatchRepository        the ledger: guarded deduct / restore   │
//! │      ├── SaleRepository         sale + item persistence                │
//! │      │                                                                  │
//! │      └── SaleService            the coordinator:                       │
//! │              validate → plan (medipos-core FEFO) → one transaction     │
//! │              (deduct + persist) → commit → AuditSink.notify            │
//! │                                                                         │
//! │  AuditSink                      post-commit, best-effort event channel │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use medipos_db::{AuditSink, Database, DbConfig};
//! use medipos_core::{PaymentMethod, SaleLine};
//!
//! let db = Database::new(DbConfig::new("./medipos.db")).await?;
//! let (audit, mut audit_rx) = AuditSink::channel();
//! let sales = db.sale_service(audit);
//!
//! let record = sales
//!     .create_sale(&[SaleLine::new(&medicine_id, 8)], "seller-1", PaymentMethod::Cash)
//!     .await?;
//! println!("{} total {}", record.sale.invoice_number, record.sale.total());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sales;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditAction, AuditEvent, AuditSink};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::batch::BatchRepository;
pub use repository::medicine::{LowStockMedicine, MedicineRepository};
pub use repository::sale::SaleRepository;
pub use sales::{SaleService, SalesError, SalesResult};
