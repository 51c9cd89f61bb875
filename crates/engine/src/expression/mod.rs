//! # Expression Evaluation
//!
//! Input defaults may embed expressions (`${ 3 + valX }`). The binding engine evaluates them
//! through the [`ExpressionEvaluator`] capability so the concrete language stays swappable; this
//! crate ships [`ScriptEvaluator`], a small sandboxed, Python-flavoured language implemented
//! in-house.
//!
//! ## Scope
//!
//! An evaluator sees exactly one [`EvaluationScope`]: the variables visible to the expression
//! plus, through a separate lookup, the run's system properties. Bare identifiers resolve only
//! against variables; a name that is absent is an [`EvaluationError::UndefinedName`], never a
//! silent null.
//!
//! ## Supported Syntax
//!
//! - Literals: `42`, `4.2`, `'text'`, `"text"`, `True`/`False`/`None`, `[1, 2]`
//! - Arithmetic: `+ - * / // %`, string and list concatenation with `+`
//! - Comparison: `== != < <= > >=`, `in`, `not in` (chainable)
//! - Logic: `and`, `or`, `not`, `a if condition else b`
//! - Access: `items[0]`, `mapping['key']`
//! - Functions: `str int float bool len get get_sp check_empty lower upper strip`
//!
//! ```rust
//! use strata_engine::expression::{EvaluationScope, ExpressionEvaluator, ScriptEvaluator};
//! use strata_engine::Value;
//! use serde_json::json;
//!
//! let val_x = Value::new(5);
//! let mut scope = EvaluationScope::new(None);
//! scope.insert("valX", &val_x);
//!
//! let result = ScriptEvaluator::default().evaluate("3 + valX", &scope)?;
//! assert_eq!(result, json!(8));
//! # Ok::<(), strata_engine::expression::EvaluationError>(())
//! ```

mod functions;
mod interpreter;
mod lexer;
mod parser;

use std::cell::Cell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::properties::SystemPropertyStore;
use crate::value::{Context, NULL_PLACEHOLDER, Value};

pub use interpreter::ScriptEvaluator;

/// Failure raised while evaluating an expression.
///
/// Every variant is terminal for the binding call that triggered it, whether or not the input
/// being bound is required.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    /// The expression referenced a name that is not in scope.
    #[error("name '{name}' is not defined")]
    UndefinedName { name: String },
    /// The expression could not be parsed.
    #[error("syntax error at offset {position}: {message}")]
    Syntax { message: String, position: usize },
    /// A call named a function the evaluator does not provide.
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },
    /// The expression parsed but failed while running (type mismatch, division by zero, ...).
    #[error("evaluation failed: {message}")]
    Runtime { message: String },
    /// The expression exceeded a configured resource limit.
    #[error("evaluation limit exceeded: {message}")]
    LimitExceeded { message: String },
}

impl EvaluationError {
    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime { message: message.into() }
    }

    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn limit(message: impl Into<String>) -> Self {
        Self::LimitExceeded { message: message.into() }
    }
}

/// Resource limits applied by [`ScriptEvaluator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Longest accepted expression source, in characters.
    pub max_expression_length: usize,
    /// Deepest accepted nesting of sub-expressions.
    pub max_depth: usize,
    /// Largest string (in bytes) or list (in items) an operation may produce.
    pub max_value_length: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_expression_length: 4 * 1024,
            max_depth: 64,
            max_value_length: 1024 * 1024,
        }
    }
}

/// Pluggable capability that computes an expression's raw value against a scope.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, scope: &EvaluationScope<'_>) -> Result<JsonValue, EvaluationError>;
}

/// Variables and system properties visible to a single evaluation.
///
/// The scope borrows every value it exposes and records whether a sensitive one was read, so
/// the caller can keep derived values secret.
#[derive(Debug)]
pub struct EvaluationScope<'a> {
    variables: HashMap<&'a str, &'a Value>,
    properties: Option<&'a SystemPropertyStore>,
    touched_sensitive: Cell<bool>,
}

impl<'a> EvaluationScope<'a> {
    pub fn new(properties: Option<&'a SystemPropertyStore>) -> Self {
        Self {
            variables: HashMap::new(),
            properties,
            touched_sensitive: Cell::new(false),
        }
    }

    /// Adds every entry of `context`, replacing same-named entries already present.
    pub fn extend_from(&mut self, context: &'a Context) {
        for (name, value) in context {
            self.variables.insert(name.as_str(), value);
        }
    }

    pub fn insert(&mut self, name: &'a str, value: &'a Value) {
        self.variables.insert(name, value);
    }

    /// Makes `name` resolvable as null unless it is already bound.
    pub fn seed_placeholder(&mut self, name: &'a str) {
        self.variables.entry(name).or_insert(&NULL_PLACEHOLDER);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Resolves a variable by name.
    pub fn lookup(&self, name: &str) -> Option<&JsonValue> {
        let value = self.variables.get(name)?;
        self.observe(value);
        Some(value.raw())
    }

    /// Resolves a system property by fully qualified name.
    pub fn system_property(&self, qualified_name: &str) -> Option<&JsonValue> {
        let value = self.properties?.get(qualified_name)?;
        self.observe(value);
        Some(value.raw())
    }

    /// Whether any sensitive variable or property was read so far.
    pub fn touched_sensitive(&self) -> bool {
        self.touched_sensitive.get()
    }

    fn observe(&self, value: &Value) {
        if value.is_sensitive() {
            self.touched_sensitive.set(true);
        }
    }
}
