//! Hierarchical addressing of step invocations.
//!
//! An [`ExecutionPath`] is a stack of parent positions plus a cursor. Entering a nested flow
//! pushes the cursor and restarts counting at zero; returning pops it back. The rendered path
//! (`2/0/3`) is unique within an execution tree and depends only on navigation counts.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// Separator placed between the levels of a rendered path.
pub const PATH_SEPARATOR: &str = "/";

/// Contract violations raised by [`ExecutionPath`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionPathError {
    /// `up()` was called without a matching `down()`.
    #[error("execution path underflow: up() called at depth 0 (position {position})")]
    StackUnderflow { position: usize },
}

/// Stack-discipline position tracker for one execution tree or branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPath {
    /// Recorded positions of enclosing levels, outermost first.
    parent_positions: Vec<usize>,
    position: usize,
}

impl ExecutionPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances to the next sibling step.
    pub fn forward(&mut self) {
        self.position += 1;
    }

    /// Enters a nested scope, restarting the cursor at zero.
    pub fn down(&mut self) {
        self.parent_positions.push(self.position);
        self.position = 0;
    }

    /// Returns to the enclosing scope at its last recorded position.
    ///
    /// Every `down()` must be paired with exactly one `up()`. An unpaired call is a defect in the
    /// caller and leaves the path unchanged.
    pub fn up(&mut self) -> Result<(), ExecutionPathError> {
        match self.parent_positions.pop() {
            Some(parent_position) => {
                self.position = parent_position;
                Ok(())
            }
            None => {
                error!(position = self.position, "execution path up() without matching down()");
                Err(ExecutionPathError::StackUnderflow { position: self.position })
            }
        }
    }

    /// Nesting depth; zero at the root.
    pub fn depth(&self) -> usize {
        self.parent_positions.len()
    }

    /// Cursor within the current level.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Address of the current step, outermost level first.
    pub fn current_path(&self) -> String {
        self.render(self.position)
    }

    /// Address the next sibling would receive, without moving the cursor.
    pub fn peek_forward_path(&self) -> String {
        self.render(self.position + 1)
    }

    /// Independent copy for a parallel branch forked at the current position.
    pub fn branch(&self) -> Self {
        debug!(path = %self, "forking execution path for parallel branch");
        self.clone()
    }

    fn render(&self, position: usize) -> String {
        if self.parent_positions.is_empty() {
            return position.to_string();
        }
        let mut rendered = self
            .parent_positions
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR);
        rendered.push_str(PATH_SEPARATOR);
        rendered.push_str(&position.to_string());
        rendered
    }
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.current_path())
    }
}
