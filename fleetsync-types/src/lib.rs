//! Core type definitions for FleetSync.
//!
//! This crate defines the fundamental types shared by every layer of the
//! sync engine:
//! - Record identifiers (integer or string, UUID v7 for newly created records)
//! - Millisecond-precision UTC timestamps with lenient ISO-8601 parsing
//!
//! Domain records themselves (vehicles, drivers, freights, ...) are opaque
//! JSON payloads and live in `fleetsync-model`.

mod ids;
mod timestamp;

pub use ids::RecordId;
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid record id: {0}")]
    InvalidId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
