pub mod hoist;
pub mod position;
pub mod resolver;

pub use hoist::collect_declarations;
pub use position::{identifier_position, IdentPosition};
pub use resolver::resolve_scopes;
