/// Error types for OOXML operations.
use thiserror::Error;

/// Result type for OOXML operations.
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Error types for OOXML operations.
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// OPC package error
    #[error("OPC error: {0}")]
    Opc(#[from] crate::ooxml::opc::error::OpcError),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Part not found
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Invalid content type
    #[error("Invalid content type: expected {expected}, got {got}")]
    InvalidContentType { expected: String, got: String },

    /// Invalid relationship
    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    /// Invalid format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A slide index outside the source presentation
    #[error("Slide index {index} out of range (presentation has {len} slides)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A required structural relationship is absent
    #[error("Part {part} has no relationship of type {reltype}")]
    MissingRelationship { part: String, reltype: String },

    /// A layout name absent from the supplied layout map
    #[error("Layout not found in layout map: {0}")]
    LayoutNotFound(String),

    /// A shape could not be copied and the failure policy is abort
    #[error("Shape {index} ({element}) could not be copied: {reason}")]
    ShapeCopyFailed {
        index: usize,
        element: String,
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<quick_xml::Error> for OoxmlError {
    fn from(err: quick_xml::Error) -> Self {
        OoxmlError::Xml(err.to_string())
    }
}

impl OoxmlError {
    /// Build a [`OoxmlError::MissingRelationship`] for a part.
    pub(crate) fn missing_relationship(part: impl std::fmt::Display, reltype: &str) -> Self {
        OoxmlError::MissingRelationship {
            part: part.to_string(),
            reltype: reltype.to_string(),
        }
    }
}
