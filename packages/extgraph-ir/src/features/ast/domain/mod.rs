pub mod arena;
pub mod node;

pub use arena::{children_of, SyntaxTree};
pub use node::{DeclKind, LiteralValue, Node, NodeId, NodeKind, PropertyKind};
