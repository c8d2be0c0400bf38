//! Cross-feature building blocks: source spans, error taxonomy, text helpers.

pub mod models;
pub mod utils;
