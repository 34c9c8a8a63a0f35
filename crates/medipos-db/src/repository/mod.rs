//! # Repository Module
//!
//! Database repository implementations for MediPOS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  SaleService / caller                                                  │
//! │       │                                                                 │
//! │       │  db.batches().eligible_for_sale(medicine_id, today)            │
//! │       ▼                                                                 │
//! │  BatchRepository                                                       │
//! │  ├── eligible_for_sale(&self, medicine_id, on)                         │
//! │  ├── deduct(executor, batch_id, qty)     ← ledger write (guarded)      │
//! │  └── restore(executor, batch_id, qty)    ← ledger write                │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Ledger writes take an explicit executor so the coordinator can run    │
//! │  them inside its own transaction; reads run on the pool directly.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`medicine::MedicineRepository`] - Catalog CRUD and search
//! - [`batch::BatchRepository`] - The batch ledger: the only mutation path
//!   for remaining quantities
//! - [`sale::SaleRepository`] - Sale and sale item persistence

pub mod batch;
pub mod medicine;
pub mod sale;
