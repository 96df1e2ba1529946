pub mod helpers;
pub mod node;
pub mod walk;

pub use node::{ArraySlot, LiteralValue, Loc, Node, NodeKind, PropKind, VarKind};
