//! PDG edge taxonomy.

use serde::{Deserialize, Serialize};

/// The four edge overlays a program dependence graph adds to the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PdgEdgeKind {
    /// Intra-procedural control successor.
    ControlFlow,
    /// Statement → statement guarded by it.
    ControlDependence,
    /// Definition reaching a use with no intervening redefinition.
    DataDependence,
    /// Call site → locally resolved callee.
    Call,
}

impl PdgEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdgEdgeKind::ControlFlow => "CONTROL_FLOW",
            PdgEdgeKind::ControlDependence => "CONTROL_DEP",
            PdgEdgeKind::DataDependence => "DATA_DEP",
            PdgEdgeKind::Call => "CALL",
        }
    }
}
