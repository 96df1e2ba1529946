//! The individual AST transformation passes, plus two small bookkeeping
//! passes with no module of their own: `applyImportAndExportNameChanges`
//! (consumes `extraInfo.mapping`) and `dump` (hands the last pass's textual
//! side output — e.g. `emitDCEGraph`'s JSON — straight to the output sink).

pub mod dce_graph;
pub mod heap;
pub mod jsdce;
pub mod minify;

use crate::ast::walk::{descend_default, recursive_walk, RecursiveRewrite};
use crate::ast::{Node, NodeKind};
use crate::extra_info::ExtraInfo;

struct MappingRenameVisitor<'a> {
    mapping: &'a std::collections::HashMap<String, String>,
}

impl RecursiveRewrite for MappingRenameVisitor<'_> {
    fn visit(&mut self, node: &mut Node) {
        match &mut node.kind {
            NodeKind::ImportDeclaration { specifiers, .. } => {
                for s in specifiers.iter_mut() {
                    if let NodeKind::Identifier { name } = &mut s.kind {
                        if let Some(new_name) = self.mapping.get(name) {
                            *name = new_name.clone();
                        }
                    }
                }
            }
            NodeKind::ExportSpecifier { local, exported } => {
                for idn in [local.as_mut(), exported.as_mut()] {
                    if let NodeKind::Identifier { name } = &mut idn.kind {
                        if let Some(new_name) = self.mapping.get(name) {
                            *name = new_name.clone();
                        }
                    }
                }
            }
            _ => {}
        }
        descend_default(self, node);
    }
}

/// Renames the local/imported/exported identifiers of `import`/`export`
/// specifiers using `extraInfo.mapping`, leaving every other identifier
/// alone — general renaming is the job of the minify passes, this one only
/// patches up module-boundary bindings after an upstream rename.
pub fn apply_import_and_export_name_changes(ast: &mut Node, extra: &ExtraInfo) {
    if extra.mapping.is_empty() {
        return;
    }
    let mut visitor = MappingRenameVisitor {
        mapping: &extra.mapping,
    };
    recursive_walk(&mut visitor, ast);
}
