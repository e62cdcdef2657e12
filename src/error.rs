use thiserror::Error;

use crate::analysis::FitError;
use crate::collection::CollectionError;
use crate::constraints::{ConstraintError, ExpressionError};
use crate::model::ModelError;
use crate::parameters::{BoundsError, ParameterError};
use crate::registry::RegistryError;

/// Error types for the diffrefine library.
///
/// Each layer defines its own error enum; this type wraps them so that call
/// sites spanning several layers (the fit orchestrator, the project) can use
/// `?` throughout.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation failure on a descriptor or parameter.
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Invalid bounds or a value outside them.
    #[error(transparent)]
    Bounds(#[from] BoundsError),

    /// Named-collection failure (missing entry).
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// UID registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Malformed or unevaluable constraint expression.
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// Constraint registration or application failure.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// Inconsistent model or measurement data.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Fit orchestration failure.
    #[error(transparent)]
    Fit(#[from] FitError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for diffrefine operations.
pub type Result<T> = std::result::Result<T, Error>;
