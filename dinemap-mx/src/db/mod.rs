//! Database operations for the market-expansion service
//!
//! Schema lives in dinemap-common; these modules are the queries this
//! service runs against it.

pub mod activity;
pub mod cities;
pub mod votes;
