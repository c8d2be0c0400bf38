pub mod dotted;
pub mod ingest;

pub use dotted::{dotted_name, member_path, member_root, property_name};
pub use ingest::{ingest_document, ingest_json};
