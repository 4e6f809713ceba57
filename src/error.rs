//! Error types for layout operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`LayoutError`].
pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid layout json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error at line {line}: {message}")]
    ConfigParse { line: usize, message: String },

    /// The layout document has no root record.
    #[error("layout document is empty")]
    EmptyDocument,

    /// A layout record disagrees with the node it is applied to.
    #[error("layout mismatch at {path:?}: expected {expected_kind} `{expected_name}`, found {found_kind} `{found_name}`")]
    StructuralMismatch {
        path: PathBuf,
        expected_kind: &'static str,
        expected_name: String,
        found_kind: String,
        found_name: String,
    },

    /// A pack strategy broke its contract. This is a bug, not bad input.
    #[error("packer `{strategy}` broke its contract for {folder:?}: {detail}")]
    PackerContract {
        strategy: &'static str,
        folder: PathBuf,
        detail: String,
    },

    #[error("not a folder: {0:?}")]
    NotAFolder(PathBuf),

    #[error("node is not part of this tree")]
    UnknownNode,

    #[error("layout build failed: {0}")]
    BuildFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LayoutError::StructuralMismatch {
            path: PathBuf::from("/root/src"),
            expected_kind: "directory",
            expected_name: "src".to_string(),
            found_kind: "file".to_string(),
            found_name: "main.rs".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected directory `src`"));
        assert!(msg.contains("found file `main.rs`"));

        assert_eq!(LayoutError::EmptyDocument.to_string(), "layout document is empty");
    }

    #[test]
    fn test_io_conversion() {
        let err: LayoutError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, LayoutError::Io(_)));
    }
}
