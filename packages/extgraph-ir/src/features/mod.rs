pub mod ast;
pub mod data_flow;
pub mod detection;
pub mod pdg;
pub mod reporting;
pub mod scoping;
