pub mod binder;
pub mod parser;

pub use binder::{bind, DiagramModel};
pub use parser::{build_model, parse, DiagramNode, DiagramRelationship, NodeKind};
