//! Error types for extent computation and link building.

/// Errors raised while computing the range of a tensor.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExtentError {
    /// Empty, ragged, non-numeric or more than two-dimensional values
    #[error("Tensor shape mismatch: {reason}")]
    ShapeMismatch { reason: String },
}

pub type ExtentResult<T> = Result<T, ExtentError>;

/// Errors that abort a link-building pass. No partial edge list is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// A link points past the end of the previous layer (convolutional diagram only)
    #[error("Source index {index} out of range for layer {layer} with {len} nodes")]
    IndexOutOfRange { layer: usize, index: usize, len: usize },

    /// Node coordinates are not parallel to the network
    #[error("No coordinate for node {node} in layer {layer}")]
    MissingCoordinate { layer: usize, node: usize },
}

pub type LinkResult<T> = Result<T, LinkError>;
