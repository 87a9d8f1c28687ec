// src/error.rs

/// Error types for the persistence adapter. Extraction and query paths never
/// fail; storage is the only surface with a real failure taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
