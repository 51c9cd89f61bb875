//! Input declarations attached to compiled steps.
//!
//! Declarations preserve authoring order: the runtime binds them sequentially and later inputs
//! may reference earlier ones. They are created by the compiler and never mutated at runtime.

pub mod validation;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Opening marker of an embedded expression in an authored default.
pub const EXPRESSION_PREFIX: &str = "${";
/// Closing marker of an embedded expression in an authored default.
pub const EXPRESSION_SUFFIX: &str = "}";

/// Declares a single input of a step, flow, or operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Input {
    /// Name under which the bound value is published to the step scope.
    pub name: String,
    /// Literal default, or the expression source when `is_expression` is set.
    #[serde(default)]
    pub default: Option<JsonValue>,
    /// When true, `default` holds expression source to evaluate at bind time.
    #[serde(default, rename = "expression")]
    pub is_expression: bool,
    /// Whether a null resolution fails binding. Inputs are required unless stated otherwise.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Private inputs never adopt an identically named caller variable.
    #[serde(default, rename = "private", alias = "private_input")]
    pub private_input: bool,
    /// Marks the bound value as secret so logs and persisted records redact it.
    #[serde(default, alias = "encrypted")]
    pub sensitive: bool,
}

impl Input {
    /// Starts a builder for an input with the given authored default.
    ///
    /// String defaults wrapped as `${ ... }` are unwrapped and flagged as expressions.
    pub fn builder(name: impl Into<String>, default: impl Into<JsonValue>) -> InputBuilder {
        InputBuilder::new(name, default)
    }

    /// Returns the expression source when this input is expression-backed.
    pub fn expression(&self) -> Option<&str> {
        if !self.is_expression {
            return None;
        }
        self.default.as_ref().and_then(JsonValue::as_str)
    }
}

const fn default_required() -> bool {
    true
}

/// Fluent builder mirroring how the compiler assembles declarations.
#[derive(Debug, Clone)]
pub struct InputBuilder {
    input: Input,
}

impl InputBuilder {
    pub fn new(name: impl Into<String>, default: impl Into<JsonValue>) -> Self {
        let default = default.into();
        let (default, is_expression) = match default {
            JsonValue::Null => (None, false),
            JsonValue::String(text) => match unwrap_expression(&text) {
                Some(expression) => (Some(JsonValue::String(expression.to_string())), true),
                None => (Some(JsonValue::String(text)), false),
            },
            other => (Some(other), false),
        };

        Self {
            input: Input {
                name: name.into(),
                default,
                is_expression,
                required: true,
                private_input: false,
                sensitive: false,
            },
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.input.required = required;
        self
    }

    pub fn private_input(mut self, private_input: bool) -> Self {
        self.input.private_input = private_input;
        self
    }

    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.input.sensitive = sensitive;
        self
    }

    /// Overrides wrapper detection, for defaults that were already unwrapped by the compiler.
    pub fn expression(mut self, is_expression: bool) -> Self {
        self.input.is_expression = is_expression;
        self
    }

    pub fn build(self) -> Input {
        self.input
    }
}

/// Strips a single `${ ... }` wrapper spanning the whole string.
///
/// Returns `None` when the text is not exactly one wrapped expression, so strings that merely
/// contain a marker stay literal.
pub fn unwrap_expression(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix(EXPRESSION_PREFIX)?.strip_suffix(EXPRESSION_SUFFIX)?;
    if inner.contains(EXPRESSION_PREFIX) {
        return None;
    }
    let inner = inner.trim();
    if inner.is_empty() { None } else { Some(inner) }
}
