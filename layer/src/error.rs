use thiserror::Error;

use crate::path::Path;

/// Errors produced while parsing a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The text does not start with `/`.
    #[error("path is not absolute: {0}")]
    NotAbsolute(String),
    /// A prim or property name is empty or contains characters outside `[A-Za-z0-9_]`.
    #[error("invalid element `{element}` in path `{path}`")]
    InvalidElement { path: String, element: String },
    /// Children can only be appended to prim paths.
    #[error("cannot append `{name}` to property path `{parent}`")]
    PropertyParent { parent: String, name: String },
}

/// Errors returned by the high-level [`Layer`](crate::Layer) editing API.
///
/// The primitive API never fails: invalid targets are silent no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error("spec already exists: {0}")]
    SpecExists(Path),
    #[error("spec not found: {0}")]
    SpecNotFound(Path),
    #[error("parent spec not found for {0}")]
    ParentNotFound(Path),
    #[error("not a prim path: {0}")]
    NotAPrim(Path),
    #[error("not a property path: {0}")]
    NotAProperty(Path),
    #[error("cannot move {from} under itself ({to})")]
    InvalidMove { from: Path, to: Path },
}
