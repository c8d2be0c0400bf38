pub mod calls;
pub mod cfg;
pub mod control_deps;
pub mod def_use;

pub use calls::{function_of_binding, params_of, pattern_leaves, CallGraph};
pub use cfg::{CfgPoint, ControlFlow, UnitCfg};
pub use control_deps::{control_parents, guarding_conditions, Guard, GuardKind};
pub use def_use::{DataDeps, Direction};
