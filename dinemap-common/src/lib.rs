//! # DineMap Common Library
//!
//! Shared code for all DineMap services including:
//! - Database schema and shared row models
//! - Settings table accessors
//! - Signed review-link token generation and verification
//! - Root folder and configuration resolution

pub mod config;
pub mod db;
pub mod error;
pub mod token;

pub use error::{Error, Result};
