//! HTTP API handlers for dinemap-mx

pub mod cities;
pub mod health;
pub mod pages;
pub mod vote;

pub use cities::{create_city, get_city, list_cities, review_links, trigger_research};
pub use health::health_routes;
pub use vote::review_vote;
