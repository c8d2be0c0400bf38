//! Program dependence graph: control flow, control dependence, call
//! edges, and the lazy data-dependence overlay.

pub mod domain;
pub mod infrastructure;

pub use domain::PdgEdgeKind;
pub use infrastructure::{
    guarding_conditions, CallGraph, CfgPoint, ControlFlow, DataDeps, Direction, Guard, GuardKind,
};
