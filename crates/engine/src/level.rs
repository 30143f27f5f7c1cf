// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dotted-path position of an action within the tree, e.g. `1.3.2`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A level is assigned once, at insertion into a [`crate::pipeline::Pipeline`],
/// and never mutated afterwards except by a retry wrapper re-entering its own
/// subtree (which reuses the same level on every attempt).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(Vec<usize>);

impl Level {
    /// The level of the root pipeline's implicit branch (`branch_level = 1`).
    pub fn root_branch() -> Self {
        Level(vec![1])
    }

    /// The level of the `k`th action (1-based) appended under this level.
    pub fn child(&self, k: usize) -> Level {
        let mut path = self.0.clone();
        path.push(k);
        Level(path)
    }

    /// The dotted-path components, root-to-leaf.
    pub fn components(&self) -> &[usize] {
        &self.0
    }

    /// Depth of this level (number of dotted components).
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", rendered.join("."))
    }
}

#[cfg(test)]
#[path = "level_tests.rs"]
mod tests;
