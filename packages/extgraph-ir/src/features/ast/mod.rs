//! Typed syntax tree: arena, ESTree JSON ingest, parser port.

pub mod domain;
pub mod infrastructure;
pub mod ports;
pub mod test_support;

pub use domain::{DeclKind, LiteralValue, Node, NodeId, NodeKind, SyntaxTree};
pub use infrastructure::{dotted_name, ingest_document, ingest_json, member_root};
pub use ports::EstreeParser;
