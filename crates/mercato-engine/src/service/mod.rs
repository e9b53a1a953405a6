//! # Services
//!
//! Borrowed views over the [`Engine`](crate::Engine), one per aggregate:
//!
//! - [`sale::SaleService`] - Sale lifecycle with stock reservations
//! - [`stock::StockService`] - Adjustments, reservations, reorder levels
//! - [`product::ProductService`] - Catalog entries with their opening stock
//!
//! Every method takes the acting user first and checks its permission before
//! touching the database. The actor's tenant scopes every read and write.

pub mod product;
pub mod sale;
pub mod stock;
