//! # Encore Common Library
//!
//! Shared code for the Encore services:
//! - Datastore contract and SQLite implementation
//! - Row models and change events
//! - Rating aggregation and track helpers
//! - Music catalog and social-audio oEmbed clients
//! - Configuration loading and the shared health endpoint

pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod models;
pub mod ratings;
pub mod storage;
pub mod store;
pub mod track;
pub mod upstream;

pub use error::{Error, Result};
