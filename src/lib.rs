//! IMS Viewer: inventory spreadsheets in, business reports out
//!
//! Imports supplier, customer, material, purchase, sales, payment, receipt,
//! and inventory sheets into a SQLite-backed document store, then serves
//! CRUD operations, reconciliation/aging reports, and an analysis method
//! dispatcher that always answers with one of two JSON envelopes.

pub mod analysis;
pub mod cli;
pub mod core;
pub mod entities;
pub mod reports;
