//! # Strata Engine
//!
//! Runtime core shared by flow and operation executors. It binds step inputs against the
//! caller's scope, evaluates embedded `${ ... }` expressions, and tracks the hierarchical
//! position of every step invocation.
//!
//! ## Key Features
//!
//! - **Input Binding**: Ordered resolution of declared inputs with assign-from, defaults,
//!   expressions, privacy, and required checks
//! - **Expressions**: A sandboxed, Python-flavoured expression language behind a pluggable
//!   [`ExpressionEvaluator`] capability
//! - **Sensitive Data**: Values carry a sensitivity flag that survives binding and derivation and
//!   is honored by every log line
//! - **Execution Paths**: Slash-separated addresses (`0/2/1`) for nested step invocations
//!
//! ## Usage
//!
//! ```rust
//! use indexmap::indexmap;
//! use serde_json::json;
//! use strata_engine::{ExecutionPath, InputsBinding, Value};
//! use strata_types::Input;
//!
//! let inputs = vec![
//!     Input::builder("host", "localhost").build(),
//!     Input::builder("url", "${ 'http://' + host + ':' + str(port) }").build(),
//! ];
//! let caller = indexmap! { "port".to_string() => Value::new(8080) };
//!
//! let scope = InputsBinding::new().bind_inputs(&inputs, &caller, None)?;
//! assert_eq!(scope["url"].raw(), &json!("http://localhost:8080"));
//!
//! let mut path = ExecutionPath::new();
//! path.down();
//! path.forward();
//! assert_eq!(path.current_path(), "0/1");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`bindings`**: The input binding engine and its error type
//! - **`expression`**: Evaluator capability, scope, limits, and the built-in language
//! - **`properties`**: Read-only store of namespaced system properties
//! - **`env`**: Per-execution runtime state such as the execution path
//! - **`value`**: Bound values and the ordered [`Context`] scope

pub mod bindings;
pub mod env;
pub mod expression;
pub mod properties;
pub mod value;

// Re-export commonly used types for convenience
pub use bindings::{BindingError, InputsBinding};
pub use env::{ExecutionPath, ExecutionPathError};
pub use expression::{EvaluationError, EvaluationScope, EvaluatorConfig, ExpressionEvaluator, ScriptEvaluator};
pub use properties::SystemPropertyStore;
pub use value::{Context, Value};
