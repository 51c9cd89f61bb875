//! Compile-time guards over input declarations.
//!
//! These checks run in the compiler before a step reaches the runtime. The binding engine
//! assumes they passed: duplicate input names would otherwise silently overwrite each other.

use std::collections::HashSet;

use anyhow::{Result, bail};

use super::Input;

/// Placeholder replaced with the offending name in caller-supplied error templates.
pub const NAME_PLACEHOLDER: &str = "name_placeholder01";

/// Rejects an input whose name collides, ignoring case, with a declared output name.
///
/// `error_message` is a template; every occurrence of [`NAME_PLACEHOLDER`] is replaced with the
/// colliding input name.
pub fn validate_mutually_exclusive_names<'a>(
    inputs: &[Input],
    output_names: impl IntoIterator<Item = &'a str> + Clone,
    error_message: &str,
) -> Result<()> {
    for input in inputs {
        let input_name = input.name.to_lowercase();
        let collides = output_names
            .clone()
            .into_iter()
            .any(|output_name| output_name.to_lowercase() == input_name);
        if collides {
            bail!(error_message.replace(NAME_PLACEHOLDER, &input.name));
        }
    }
    Ok(())
}

/// Rejects empty or repeated input names within one step.
pub fn validate_unique_input_names(inputs: &[Input]) -> Result<()> {
    let mut seen = HashSet::with_capacity(inputs.len());
    for input in inputs {
        if input.name.trim().is_empty() {
            bail!("input name cannot be empty");
        }
        if !seen.insert(input.name.as_str()) {
            bail!("duplicate input name '{}'", input.name);
        }
    }
    Ok(())
}
