use thiserror::Error;

/// Failure taxonomy. Everything below the level of a whole scheduled run
/// is contained and logged where it occurs: a fetch failure skips one
/// keyword, an extraction failure drops one post, a persistence failure
/// skips one upsert, a delivery failure prunes one channel.
#[derive(Error, Debug)]
pub enum LovebugError {
    #[error("fetch failed for keyword '{keyword}': {message}")]
    Fetch { keyword: String, message: String },

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("delivery failed for channel {0}")]
    Delivery(u64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
