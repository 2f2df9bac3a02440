//! Database schema and shared data models
//!
//! All DineMap services open the same SQLite file; this module owns the
//! schema for the tables the market-expansion workflow touches and the
//! row types that cross service boundaries. The row types build without
//! the `sqlx` feature; schema and query code need it.

#[cfg(feature = "sqlx")]
pub mod init;
pub mod models;
#[cfg(feature = "sqlx")]
pub mod settings;

#[cfg(feature = "sqlx")]
pub use init::*;
pub use models::*;
#[cfg(feature = "sqlx")]
pub use settings::*;
