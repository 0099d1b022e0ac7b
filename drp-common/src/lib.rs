//! # DRP Common Library
//!
//! Shared code for the disaster response platform services including:
//! - Error types
//! - Configuration loading and data directory resolution
//! - Database initialization (SQLite)
//! - TTL cache store used by every enrichment resolver
//! - Realtime event types and the relay ingestion client

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod realtime;

pub use cache::CacheStore;
pub use error::{Error, Result};
pub use realtime::RelayClient;
