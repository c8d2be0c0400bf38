pub mod engine;
pub mod trace;

pub use engine::FlowEngine;
pub use trace::{render_flow, render_step};
