use std::sync::Arc;

use serde_json::Value as JsonValue;
use strata_types::Input;
use tracing::{debug, warn};

use super::BindingError;
use crate::expression::{EvaluationError, EvaluationScope, ExpressionEvaluator, ScriptEvaluator};
use crate::properties::SystemPropertyStore;
use crate::value::{Context, Value};

/// Binds a step's declared inputs against the caller's scope.
///
/// Each input is resolved in declaration order:
///
/// 1. **Assign-from**: a non-private input whose name exists in the caller context takes the
///    caller's value. Nothing is evaluated.
/// 2. **Default**: otherwise the literal default is used, or the default expression is evaluated
///    against the caller context overlaid with the inputs bound so far. The input's own name is
///    pre-seeded as null when nothing else provides it, so `${ input1 }` on a private input
///    yields null instead of failing.
/// 3. **Required check**: a required input that resolved to null aborts the call.
///
/// The result is marked sensitive when the input is declared sensitive, when it inherited a
/// sensitive caller value, or when its expression read a sensitive variable or system property. Bound values are visible to later inputs.
///
/// The caller context is borrowed immutably and never modified; the returned [`Context`] is a
/// fresh scope holding only the declared inputs.
///
/// # Examples
///
/// ```rust
/// use indexmap::indexmap;
/// use serde_json::json;
/// use strata_engine::{InputsBinding, Value};
/// use strata_types::Input;
///
/// let inputs = vec![Input::builder("input1", "${ 3 + valX }").build()];
/// let context = indexmap! { "valX".to_string() => Value::new(5) };
///
/// let bound = InputsBinding::new().bind_inputs(&inputs, &context, None)?;
/// assert_eq!(bound["input1"].raw(), &json!(8));
/// assert_eq!(context.len(), 1);
/// # Ok::<(), strata_engine::BindingError>(())
/// ```
#[derive(Clone)]
pub struct InputsBinding {
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl Default for InputsBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InputsBinding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("InputsBinding").finish_non_exhaustive()
    }
}

impl InputsBinding {
    /// Creates a binder backed by the built-in [`ScriptEvaluator`] with default limits.
    pub fn new() -> Self {
        Self::with_evaluator(Arc::new(ScriptEvaluator::default()))
    }

    /// Creates a binder backed by a custom expression evaluator.
    pub fn with_evaluator(evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Resolves `inputs` in order and returns the new step scope.
    ///
    /// # Errors
    ///
    /// - [`BindingError::Evaluation`] when a default expression fails, whether or not the input
    ///   is required.
    /// - [`BindingError::MissingRequiredInput`] when a required input resolves to null.
    ///
    /// The first failure aborts binding; inputs bound before it are discarded.
    pub fn bind_inputs(
        &self,
        inputs: &[Input],
        context: &Context,
        system_properties: Option<&SystemPropertyStore>,
    ) -> Result<Context, BindingError> {
        let mut bound = Context::with_capacity(inputs.len());

        for input in inputs {
            let value = self.bind_input(input, context, &bound, system_properties)?;
            bound.insert(input.name.clone(), value);
        }

        Ok(bound)
    }

    fn bind_input(
        &self,
        input: &Input,
        context: &Context,
        bound: &Context,
        system_properties: Option<&SystemPropertyStore>,
    ) -> Result<Value, BindingError> {
        let (raw, from_sensitive, source) = if !input.private_input
            && let Some(inherited) = context.get(&input.name)
        {
            (inherited.raw().clone(), inherited.is_sensitive(), "assign-from")
        } else if input.is_expression {
            let expression = input.expression().ok_or_else(|| BindingError::Evaluation {
                input: input.name.clone(),
                source: EvaluationError::syntax("expression source must be a string", 0),
            })?;
            let mut scope = EvaluationScope::new(system_properties);
            scope.extend_from(context);
            scope.extend_from(bound);
            scope.seed_placeholder(&input.name);

            let raw = self
                .evaluator
                .evaluate(expression, &scope)
                .map_err(|source| BindingError::Evaluation {
                    input: input.name.clone(),
                    source,
                })?;
            (raw, scope.touched_sensitive(), "expression")
        } else {
            (input.default.clone().unwrap_or(JsonValue::Null), false, "default")
        };

        if raw.is_null() && input.required {
            warn!(input = %input.name, source, "required input resolved to null");
            return Err(BindingError::MissingRequiredInput {
                input: input.name.clone(),
            });
        }

        let value = Value::with_sensitivity(raw, input.sensitive || from_sensitive);
        debug!(input = %input.name, source, value = %value.redacted(), "bound input");
        Ok(value)
    }
}
