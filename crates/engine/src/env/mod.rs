//! Per-execution runtime environment.
//!
//! Holds the state a running execution carries alongside its scopes. Today that is the
//! [`ExecutionPath`] used to address every step invocation.

pub mod execution_path;

pub use execution_path::{ExecutionPath, ExecutionPathError, PATH_SEPARATOR};
