pub mod flow;

pub use flow::{FlowPath, FlowStep};
