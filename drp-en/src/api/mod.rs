//! HTTP API handlers for drp-en

pub mod analyze;
pub mod cleanup;
pub mod geocode;
pub mod health;
pub mod official_updates;
pub mod social_media;

pub use analyze::{analyze, verify_image};
pub use cleanup::cache_cleanup;
pub use geocode::geocode;
pub use health::health_check;
pub use official_updates::official_updates;
pub use social_media::social_media;
