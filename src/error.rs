//! Error types for stlcarve.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

use crate::mesh::{FaceId, GroupId};

/// Result type alias using [`CarveError`].
pub type Result<T> = std::result::Result<T, CarveError>;

/// Errors that can occur while building, selecting, or exporting a mesh.
#[derive(Error, Debug)]
pub enum CarveError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has zero area, so no normal can be computed for it.
    #[error("face {face:?} is degenerate (zero area)")]
    DegenerateFace {
        /// The degenerate face.
        face: FaceId,
    },

    /// A face index is outside `0..face_count`.
    #[error("face index {face} out of range (mesh has {face_count} faces)")]
    InvalidFace {
        /// The offending face index.
        face: usize,
        /// Number of faces in the mesh.
        face_count: usize,
    },

    /// A group id does not name an existing group.
    #[error("group {group:?} does not exist ({group_count} groups)")]
    InvalidGroup {
        /// The offending group id.
        group: GroupId,
        /// Number of groups in the store.
        group_count: usize,
    },

    /// Export was requested but no face qualifies for output.
    #[error("nothing to export: no group has any member face")]
    EmptyExport,

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The extension or format name that was not recognized.
        extension: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// A session command could not be parsed.
    #[error("line {line}: {message}")]
    InvalidCommand {
        /// One-based line number in the script (0 for a single command).
        line: usize,
        /// What was wrong with the command.
        message: String,
    },

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration in {path}: {message}")]
    Config {
        /// The configuration file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

impl CarveError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        CarveError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an invalid command error.
    pub fn invalid_command(line: usize, message: impl Into<String>) -> Self {
        CarveError::InvalidCommand {
            line,
            message: message.into(),
        }
    }

    /// Whether this error means an identifier was out of range.
    pub fn is_invalid_index(&self) -> bool {
        matches!(
            self,
            CarveError::InvalidFace { .. } | CarveError::InvalidGroup { .. }
        )
    }
}
