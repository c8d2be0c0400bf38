pub mod deadline;
pub mod source_text;

pub use deadline::Deadline;
pub use source_text::SourceText;
