//! Input binding.
//!
//! Turns a step's ordered input declarations plus the caller's scope into the step's own scope.
//! See [`InputsBinding`] for the resolution rules.

mod inputs;

use thiserror::Error;

use crate::expression::EvaluationError;

pub use inputs::InputsBinding;

/// Failure raised while binding a list of inputs.
///
/// Binding is all-or-nothing: the first failure aborts the call and no partial scope is
/// returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingError {
    /// The input's default expression failed to evaluate.
    #[error("error binding input '{input}': {source}")]
    Evaluation {
        input: String,
        #[source]
        source: EvaluationError,
    },
    /// A required input resolved to null.
    #[error("input with name '{input}' is required, but value is empty")]
    MissingRequiredInput { input: String },
}

impl BindingError {
    pub fn is_evaluation(&self) -> bool {
        matches!(self, Self::Evaluation { .. })
    }

    pub fn is_missing_required(&self) -> bool {
        matches!(self, Self::MissingRequiredInput { .. })
    }

    /// Name of the input whose binding failed.
    pub fn input_name(&self) -> &str {
        match self {
            Self::Evaluation { input, .. } | Self::MissingRequiredInput { input } => input,
        }
    }
}
