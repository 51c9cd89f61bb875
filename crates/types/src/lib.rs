//! Shared type definitions handed from the Strata compiler to the runtime.
//!
//! The compiler collaborator turns authored flows into a validated artifact; the pieces the
//! runtime consumes directly live here so both sides agree on one serde representation:
//!
//! - [`bindings::Input`]: per-step input declarations, in authoring order.
//! - [`properties::SystemProperty`]: namespaced constants loaded once per run.
//! - [`bindings::validation`]: compile-time guards run before a step ever reaches the runtime.

pub mod bindings;
pub mod properties;

pub use bindings::{Input, InputBuilder};
pub use properties::{PropertyError, SystemProperty};
