#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the deskbuild orchestrator
//!
//! This crate provides fine-grained error types organized by domain.
//! Descriptor and resolution errors indicate an invalid input set and abort
//! a run before any build starts; store and build errors are local to one
//! component.

use thiserror::Error;

pub mod build;
pub mod descriptor;
pub mod resolve;
pub mod store;

pub use build::BuildError;
pub use descriptor::DescriptorError;
pub use resolve::ResolveError;
pub use store::StoreError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_domain() {
        let err: Error = DescriptorError::EmptyComponentName.into();
        assert!(err.to_string().starts_with("descriptor error:"));

        let err: Error = BuildError::BuildFailed { exit_code: 2 }.into();
        assert!(err.to_string().contains("exit code 2"));
    }

    #[test]
    fn io_error_carries_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io_with_path(&io, "/tmp/x");
        match err {
            Error::Io { kind, path, .. } => {
                assert_eq!(kind, std::io::ErrorKind::NotFound);
                assert_eq!(path.unwrap(), std::path::PathBuf::from("/tmp/x"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
