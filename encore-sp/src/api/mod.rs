//! HTTP API handlers for encore-sp

pub mod cors;
pub mod search;

pub use cors::cors_headers;
pub use search::{search, search_preflight};
