use thiserror::Error;

/// The error type for cascade model construction and forward passes.
///
/// Configuration problems are reported when a model is built. Shape problems
/// are reported by `forward` before any layer runs, so a bad input never
/// reaches the tensor backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CascadeError {
    /// The configuration is inconsistent with the fixed architecture.
    #[error("Invalid model configuration: {reason}")]
    InvalidConfiguration {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// An input or fusion tensor cannot flow through the network geometry.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// A fusion feature was passed to a stage built without a fusion block.
    #[error("Stage at level {level} has no fusion block but received a fusion feature")]
    UnexpectedFusionFeature {
        /// Level of the stage that received the feature.
        level: usize,
    },
}

/// A specialized `Result` type for cascade operations.
pub type CascadeResult<T> = Result<T, CascadeError>;
