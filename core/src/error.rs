use thiserror::Error;

#[derive(Error, Debug)]
pub enum LootError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Catalog integrity error: {reason}")]
    CatalogIntegrity { reason: String },

    #[error("Container type '{container_type}' is not eligible for population")]
    NotEligible { container_type: String },

    #[error("Unknown item '{key}'")]
    UnknownItem { key: String },

    #[error("Remote catalog fetch failed: {0}")]
    RemoteFetch(#[from] RemoteFetchError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type LootResult<T> = Result<T, LootError>;

/// Failure while building a single item. Caught at the slot boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("item '{key}' is not a known item definition")]
    UnknownItem { key: String },

    #[error("item factory refused to create '{key}'")]
    FactoryRefused { key: String },

    #[error("no rarity buckets built for '{container_type}'")]
    MissingBuckets { container_type: String },
}

/// Failure talking to a remote catalog source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteFetchError {
    #[error("the requested table id was not found")]
    NotFound,

    #[error("transport error: {reason}")]
    Transport { reason: String },

    #[error("malformed catalog document: {reason}")]
    Malformed { reason: String },
}
