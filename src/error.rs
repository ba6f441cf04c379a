//! Error types for engine operations.

use crate::path::{Path, Seg};
use thiserror::Error;

/// Result type alias for engine operations.
pub type GraftResult<T> = Result<T, GraftError>;

/// Errors raised by the update engine.
///
/// Every error leaves the original root untouched; failed operations also
/// fully release their frame and any batch bookkeeping before returning.
#[derive(Debug, Error)]
pub enum GraftError {
    /// Reading through null or a non-container mid-chain. Names the
    /// attempted segment and the actual runtime kind of the value found.
    #[error("cannot read {seg} of {found} at {path}")]
    Path {
        /// Path up to (not including) the failing segment.
        path: Path,
        /// The segment whose read failed.
        seg: Seg,
        /// Runtime kind of the value that was actually there.
        found: &'static str,
    },

    /// Misusing the engine: overlapping in-flight chains on the same root,
    /// resolving a chain with a terminal that does not match its entry
    /// operation, or capturing a live batch draft from outside the batch.
    #[error("invalid engine use: {message}")]
    Misuse {
        /// Description of the misuse.
        message: String,
    },

    /// Operation incompatible with the container kind at this position
    /// (e.g. an index write on a record, or key addressing on a sequence).
    #[error("{op} is not supported on {found} at {path}")]
    Kind {
        /// Path to the offending container.
        path: Path,
        /// The attempted operation.
        op: &'static str,
        /// Runtime kind of the container found.
        found: &'static str,
    },

    /// Sequence index past the end.
    #[error("index {index} out of bounds (len: {len}) at {path}")]
    IndexOutOfBounds {
        /// Path to the sequence.
        path: Path,
        /// The index that was accessed.
        index: usize,
        /// The actual length of the sequence.
        len: usize,
    },

    /// Dev-mode tamper detection: in-place write to a value the engine
    /// already handed back. Only raised while dev mode is enabled.
    #[error("in-place write to frozen {found} at {path} (dev mode)")]
    Frozen {
        /// Path to the frozen container.
        path: Path,
        /// Runtime kind of the frozen container.
        found: &'static str,
    },
}

impl GraftError {
    /// Create a path error.
    #[inline]
    pub fn path_error(path: Path, seg: Seg, found: &'static str) -> Self {
        GraftError::Path { path, seg, found }
    }

    /// Create a misuse error.
    #[inline]
    pub fn misuse(message: impl Into<String>) -> Self {
        GraftError::Misuse {
            message: message.into(),
        }
    }

    /// Create a container-kind error.
    #[inline]
    pub fn kind_error(path: Path, op: &'static str, found: &'static str) -> Self {
        GraftError::Kind { path, op, found }
    }

    /// Create an index out of bounds error.
    #[inline]
    pub fn index_out_of_bounds(path: Path, index: usize, len: usize) -> Self {
        GraftError::IndexOutOfBounds { path, index, len }
    }

    /// Create a frozen-write error.
    #[inline]
    pub fn frozen(path: Path, found: &'static str) -> Self {
        GraftError::Frozen { path, found }
    }

    /// Prefix the error's path with `prefix`, for errors surfaced from a
    /// nested scope (e.g. a batch operating under a base path).
    pub fn with_prefix(self, prefix: &Path) -> Self {
        match self {
            GraftError::Path { path, seg, found } => GraftError::Path {
                path: prefix.join(&path),
                seg,
                found,
            },
            GraftError::Kind { path, op, found } => GraftError::Kind {
                path: prefix.join(&path),
                op,
                found,
            },
            GraftError::IndexOutOfBounds { path, index, len } => GraftError::IndexOutOfBounds {
                path: prefix.join(&path),
                index,
                len,
            },
            GraftError::Frozen { path, found } => GraftError::Frozen {
                path: prefix.join(&path),
                found,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn test_path_error_names_segment_and_kind() {
        let err = GraftError::path_error(path!("user"), Seg::field("name"), "null");
        assert_eq!(err.to_string(), "cannot read .name of null at $.user");
    }

    #[test]
    fn test_kind_error_display() {
        let err = GraftError::kind_error(path!("tags"), "index access", "set");
        assert_eq!(err.to_string(), "index access is not supported on set at $.tags");
    }

    #[test]
    fn test_with_prefix() {
        let err = GraftError::index_out_of_bounds(path!("items"), 5, 2);
        let err = err.with_prefix(&path!("data"));
        assert!(err.to_string().contains("$.data.items"));
    }
}
