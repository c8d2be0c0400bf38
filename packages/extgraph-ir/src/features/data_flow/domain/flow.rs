//! Flow records.
//!
//! A flow is a finite path of identifier occurrences linked by
//! data-dependence edges. Hop 1 is the origin; `location` renders as
//! `"L:C - L:C"` with an inclusive start and exclusive end column.

use crate::features::ast::domain::NodeId;
use serde::{Deserialize, Serialize};

/// One hop of a rendered flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub no: usize,
    pub location: String,
    pub filename: String,
    pub identifier: String,
    pub line_of_code: String,
}

/// An un-rendered path through the dependence overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPath {
    pub occurrences: Vec<NodeId>,
    /// True when the depth bound cut the path short.
    pub truncated: bool,
}

impl FlowPath {
    pub fn tail(&self) -> NodeId {
        *self
            .occurrences
            .last()
            .expect("a flow path has at least its origin")
    }

    pub fn origin(&self) -> NodeId {
        self.occurrences[0]
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}
