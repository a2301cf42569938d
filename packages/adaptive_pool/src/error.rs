use thiserror::Error;

use crate::BoxedError;

/// Errors that can occur when creating an [`AdaptivePool`][crate::AdaptivePool].
///
/// Running out of resources is not an error. [`acquire()`][crate::AdaptivePool::acquire]
/// signals that case by returning `None`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The resource initializer failed, so the pool could not be populated.
    #[error("resource initializer failed: {source}")]
    Initialize {
        /// The failure reported by the initializer.
        source: BoxedError,
    },
}

/// A specialized `Result` type for adaptive pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::error::Error as _;
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn initialize_error_exposes_source() {
        let error = Error::Initialize {
            source: "database unreachable".into(),
        };

        assert_eq!(
            error.to_string(),
            "resource initializer failed: database unreachable"
        );
        assert_eq!(
            error.source().map(ToString::to_string).as_deref(),
            Some("database unreachable")
        );
    }
}
