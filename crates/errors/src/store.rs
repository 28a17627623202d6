//! Vendor store and lock error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("no candidate version of `{name}` satisfies `{requirement}`")]
    UnresolvableDependency { name: String, requirement: String },

    #[error("fetch failed for {name}-{version}: {cause}")]
    FetchFailed {
        name: String,
        version: String,
        cause: String,
    },

    #[error("hash mismatch for {name}-{version}: expected {expected}, got {actual}")]
    HashMismatch {
        name: String,
        version: String,
        expected: String,
        actual: String,
    },
}
