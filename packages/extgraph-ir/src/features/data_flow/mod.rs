//! Transitive data-flow queries and flow-record rendering.

pub mod domain;
pub mod infrastructure;

pub use domain::{FlowPath, FlowStep};
pub use infrastructure::{render_flow, render_step, FlowEngine};
