//! emitDCEGraph / applyDCEGraphRemovals: the JS↔wasm reachability graph and
//! its paired removal pass.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::ast::helpers::{empty_out, has_side_effects};
use crate::ast::walk::{children, descend_default, recursive_walk, RecursiveRewrite};
use crate::ast::{LiteralValue, Node, NodeKind};
use crate::errors::{GlueError, GlueResult};
use crate::extra_info::ExtraInfo;

const DEFAULT_IMPORT_MODULE: &str = "env";

#[derive(Default, Clone)]
struct GraphNode {
    import: Option<(String, String)>,
    export: Option<String>,
    reaches: BTreeSet<String>,
    root: bool,
}

fn is_ident_named(node: &Node, name: &str) -> bool {
    matches!(&node.kind, NodeKind::Identifier { name: n } if n == name)
}

fn is_member_named(node: &Node, obj_name: &str) -> bool {
    matches!(&node.kind, NodeKind::MemberExpression { object, .. }
        if matches!(&object.kind, NodeKind::Identifier { name } if name == obj_name))
}

fn wasm_exports_member(node: &Node) -> Option<String> {
    if let NodeKind::MemberExpression { object, property, computed: true } = &node.kind {
        if is_ident_named(object, "wasmExports") {
            if let NodeKind::Literal { value: LiteralValue::String(s), .. } = &property.kind {
                return Some(s.clone());
            }
        }
    }
    None
}

fn is_module_prop(node: &Node, expected_prop: &str) -> bool {
    if let NodeKind::MemberExpression { object, property, computed: true } = &node.kind {
        if is_ident_named(object, "Module") {
            if let NodeKind::Literal { value: LiteralValue::String(s), .. } = &property.kind {
                return s == expected_prop;
            }
        }
    }
    false
}

fn collect_wasm_exports_refs(node: &Node, out: &mut Vec<String>) {
    if let Some(w) = wasm_exports_member(node) {
        out.push(w);
        return;
    }
    for c in children(node) {
        collect_wasm_exports_refs(c, out);
    }
}

fn prop_key_name(key: &Node, computed: bool) -> Option<String> {
    match &key.kind {
        NodeKind::Identifier { name } if !computed => Some(name.clone()),
        NodeKind::Literal { value: LiteralValue::String(s), .. } => Some(s.clone()),
        _ => None,
    }
}

fn register_import(
    js_name: &str,
    native_name: &str,
    ident_graph: &mut HashMap<String, String>,
    registry: &mut BTreeMap<String, GraphNode>,
) {
    let graph_name = format!("emcc$import${js_name}");
    ident_graph.insert(js_name.to_string(), graph_name.clone());
    registry.entry(graph_name).or_default().import =
        Some((DEFAULT_IMPORT_MODULE.to_string(), native_name.to_string()));
}

fn record_imports(
    properties: &[Node],
    ident_graph: &mut HashMap<String, String>,
    registry: &mut BTreeMap<String, GraphNode>,
) {
    for p in properties {
        if let NodeKind::Property { key, value, computed, .. } = &p.kind {
            let Some(native_name) = prop_key_name(key, *computed) else { continue };
            match &value.kind {
                NodeKind::Identifier { name: js_name } => {
                    register_import(js_name, &native_name, ident_graph, registry);
                }
                NodeKind::LogicalExpression { operator, left, .. } if operator == "||" => {
                    if let NodeKind::Identifier { name: js_name } = &left.kind {
                        register_import(js_name, &native_name, ident_graph, registry);
                    }
                }
                // Literal / function-expression values are purely inline: ignored.
                _ => {}
            }
        }
    }
}

fn save_asm_export(
    js_name: &str,
    wasm_name: &str,
    registry: &mut BTreeMap<String, GraphNode>,
    ident_graph: &mut HashMap<String, String>,
    module_prop_graph: &mut HashMap<String, String>,
    dyn_call_names: &mut Vec<String>,
) {
    let graph_name = format!("emcc$export${js_name}");
    registry.entry(graph_name.clone()).or_default().export = Some(wasm_name.to_string());
    ident_graph.insert(js_name.to_string(), graph_name.clone());
    module_prop_graph.insert(js_name.to_string(), graph_name.clone());
    ident_graph.insert(wasm_name.to_string(), graph_name.clone());
    if wasm_name.starts_with("dynCall_") {
        dyn_call_names.push(graph_name);
    }
}

enum ExportMatch {
    Linked(String, String),
    Unlinked,
}

fn recognize_single_export(id: &Node, init: &Node) -> Option<ExportMatch> {
    let NodeKind::Identifier { name: js_name } = &id.kind else { return None };

    if let Some(wasm_name) = wasm_exports_member(init) {
        return Some(ExportMatch::Linked(js_name.clone(), wasm_name));
    }

    if let NodeKind::AssignmentExpression { left, right, operator } = &init.kind {
        if operator == "=" && is_module_prop(left, js_name) {
            if matches!(&right.kind, NodeKind::Literal { value: LiteralValue::Number(_), .. }) {
                return Some(ExportMatch::Unlinked);
            }
            let mut found = Vec::new();
            collect_wasm_exports_refs(right, &mut found);
            if found.len() == 1 {
                return Some(ExportMatch::Linked(js_name.clone(), found.remove(0)));
            }
        }
    }
    None
}

fn recognize_assign_wasm_exports(
    body: &mut Node,
    registry: &mut BTreeMap<String, GraphNode>,
    ident_graph: &mut HashMap<String, String>,
    module_prop_graph: &mut HashMap<String, String>,
    dyn_call_names: &mut Vec<String>,
) {
    let NodeKind::BlockStatement { body: stmts } = &mut body.kind else { return };
    for s in stmts.iter_mut() {
        let matched = if let NodeKind::ExpressionStatement { expression, .. } = &s.kind {
            if let NodeKind::AssignmentExpression { left, right, operator } = &expression.kind {
                if operator == "=" {
                    if let NodeKind::Identifier { name } = &left.kind {
                        wasm_exports_member(right).map(|w| (name.clone(), w))
                    } else {
                        None
                    }
                } else {
                    None
                }
            } else {
                None
            }
        } else {
            None
        };
        if let Some((js_name, wasm_name)) = matched {
            save_asm_export(&js_name, &wasm_name, registry, ident_graph, module_prop_graph, dyn_call_names);
            empty_out(s);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn recognize_top_level(
    stmt: &mut Node,
    registry: &mut BTreeMap<String, GraphNode>,
    ident_graph: &mut HashMap<String, String>,
    module_prop_graph: &mut HashMap<String, String>,
    dyn_call_names: &mut Vec<String>,
    defun_bodies: &mut Vec<(String, Node)>,
) {
    match &mut stmt.kind {
        NodeKind::VariableDeclaration { declarations, .. } => {
            let mut recognized = false;
            for d in declarations.iter_mut() {
                let NodeKind::VariableDeclarator { id, init: Some(init) } = &mut d.kind else { continue };
                if is_ident_named(id.as_ref(), "wasmImports") {
                    if let NodeKind::ObjectExpression { properties } = &init.kind {
                        record_imports(properties, ident_graph, registry);
                        recognized = true;
                    }
                } else if let Some(m) = recognize_single_export(id.as_ref(), init.as_ref()) {
                    if let ExportMatch::Linked(js, wasm) = m {
                        save_asm_export(&js, &wasm, registry, ident_graph, module_prop_graph, dyn_call_names);
                    }
                    recognized = true;
                }
            }
            if recognized {
                empty_out(stmt);
            }
        }
        NodeKind::ExpressionStatement { expression, .. } => {
            if let NodeKind::AssignmentExpression { left, right, operator } = &expression.kind {
                if operator == "=" && is_ident_named(left, "wasmImports") {
                    if let NodeKind::ObjectExpression { properties } = &right.kind {
                        record_imports(properties, ident_graph, registry);
                        empty_out(stmt);
                    }
                }
            }
        }
        NodeKind::FunctionDeclaration { id: Some(idn), body, .. } => {
            let NodeKind::Identifier { name } = &idn.kind else { return };
            if name == "assignWasmExports" {
                recognize_assign_wasm_exports(body, registry, ident_graph, module_prop_graph, dyn_call_names);
                empty_out(stmt);
                return;
            }
            let defun_name = name.clone();
            let defun_graph = format!("emcc$defun${defun_name}");
            if let Some(existing) = ident_graph.get(&defun_name) {
                if existing != &defun_graph {
                    registry.entry(existing.clone()).or_default().reaches.insert(defun_graph.clone());
                }
            }
            ident_graph.entry(defun_name.clone()).or_insert_with(|| defun_graph.clone());
            let body_owned = std::mem::replace(body.as_mut(), Node::new(NodeKind::EmptyStatement));
            defun_bodies.push((defun_name, body_owned));
            registry.entry(defun_graph).or_default();
            empty_out(stmt);
        }
        _ => {}
    }
}

fn register_reach(target: &str, registry: &mut BTreeMap<String, GraphNode>, current_defun: Option<&str>) {
    match current_defun {
        Some(defun_graph) => {
            registry.entry(defun_graph.to_string()).or_default().reaches.insert(target.to_string());
        }
        None => {
            registry.entry(target.to_string()).or_default().root = true;
        }
    }
}

fn walk_reach(
    node: &Node,
    ident_graph: &HashMap<String, String>,
    module_prop_graph: &HashMap<String, String>,
    dyn_call_names: &[String],
    registry: &mut BTreeMap<String, GraphNode>,
    current_defun: Option<&str>,
) {
    match &node.kind {
        NodeKind::Identifier { name } => {
            if let Some(g) = ident_graph.get(name) {
                register_reach(g, registry, current_defun);
            } else {
                tracing::trace!(identifier = %name, "emitDCEGraph: identifier has no known graph target");
            }
        }
        NodeKind::MemberExpression { object, property, computed } => {
            if *computed {
                if is_member_module_or_exports(object) {
                    if let NodeKind::Identifier { name: obj_name } = &object.kind {
                        if obj_name == "Module" {
                            if let NodeKind::Literal { value: LiteralValue::String(prop), .. } = &property.kind {
                                match module_prop_graph.get(prop) {
                                    Some(g) => register_reach(g, registry, current_defun),
                                    None => tracing::trace!(prop = %prop, "emitDCEGraph: Module[...] has no known graph target"),
                                }
                            }
                            return;
                        }
                        if obj_name == "wasmExports" {
                            if let NodeKind::Literal { value: LiteralValue::String(w), .. } = &property.kind {
                                if let Some(g) = ident_graph.get(w) {
                                    registry.entry(g.clone()).or_default().root = true;
                                }
                            }
                            return;
                        }
                    }
                }
            }
            walk_reach(object, ident_graph, module_prop_graph, dyn_call_names, registry, current_defun);
            if *computed {
                walk_reach(property, ident_graph, module_prop_graph, dyn_call_names, registry, current_defun);
            }
        }
        NodeKind::CallExpression { callee, arguments } => {
            if is_ident_named(callee, "dynCall") && !arguments.is_empty() {
                match &arguments[0].kind {
                    NodeKind::Literal { value: LiteralValue::String(sig), .. } if sig != "dynCall_" => {
                        register_reach(&format!("emcc$export$dynCall_{sig}"), registry, current_defun);
                    }
                    _ => {
                        for g in dyn_call_names.to_vec() {
                            register_reach(&g, registry, current_defun);
                        }
                    }
                }
                for a in &arguments[1..] {
                    walk_reach(a, ident_graph, module_prop_graph, dyn_call_names, registry, current_defun);
                }
                return;
            }
            walk_reach(callee, ident_graph, module_prop_graph, dyn_call_names, registry, current_defun);
            for a in arguments {
                walk_reach(a, ident_graph, module_prop_graph, dyn_call_names, registry, current_defun);
            }
        }
        _ => {
            for c in children(node) {
                walk_reach(c, ident_graph, module_prop_graph, dyn_call_names, registry, current_defun);
            }
        }
    }
}

fn is_member_module_or_exports(object: &Node) -> bool {
    matches!(&object.kind, NodeKind::Identifier { name } if name == "Module" || name == "wasmExports")
}

#[derive(Serialize)]
struct GraphEntry {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    import: Option<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export: Option<String>,
    reaches: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    root: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn serialize_graph(registry: &BTreeMap<String, GraphNode>) -> GlueResult<String> {
    let entries: Vec<GraphEntry> = registry
        .iter()
        .map(|(name, node)| GraphEntry {
            name: name.clone(),
            import: node.import.clone(),
            export: node.export.clone(),
            reaches: node.reaches.iter().cloned().collect(),
            root: node.root,
        })
        .collect();
    Ok(serde_json::to_string(&entries)?)
}

/// Mutates `ast` (erasing recognized top-level forms) and returns the
/// reachability graph as a JSON array string, ready to `dump` to stdout.
pub fn emit_dce_graph(ast: &mut Node, extra: &ExtraInfo) -> GlueResult<String> {
    let NodeKind::Program { body } = &mut ast.kind else {
        return Err(GlueError::ShapeViolation("emitDCEGraph requires a Program node".into()));
    };

    let mut registry: BTreeMap<String, GraphNode> = BTreeMap::new();
    let mut ident_graph: HashMap<String, String> = HashMap::new();
    let mut module_prop_graph: HashMap<String, String> = HashMap::new();
    let mut dyn_call_names: Vec<String> = Vec::new();
    let mut defun_bodies: Vec<(String, Node)> = Vec::new();

    for stmt in body.iter_mut() {
        recognize_top_level(stmt, &mut registry, &mut ident_graph, &mut module_prop_graph, &mut dyn_call_names, &mut defun_bodies);
    }

    for (js_name, wasm_name) in &extra.exports {
        save_asm_export(js_name, wasm_name, &mut registry, &mut ident_graph, &mut module_prop_graph, &mut dyn_call_names);
    }

    for (name, defun_body) in &defun_bodies {
        let graph_name = format!("emcc$defun${name}");
        registry.entry(graph_name.clone()).or_default();
        walk_reach(defun_body, &ident_graph, &module_prop_graph, &dyn_call_names, &mut registry, Some(&graph_name));
    }

    for stmt in body.iter() {
        walk_reach(stmt, &ident_graph, &module_prop_graph, &dyn_call_names, &mut registry, None);
    }

    serialize_graph(&registry)
}

fn filter_import_props(properties: &mut Vec<Node>, unused_imports: &[String], matched: &mut HashSet<String>) {
    properties.retain(|p| {
        if let NodeKind::Property { key, value, computed, .. } = &p.kind {
            if let Some(native_name) = prop_key_name(key, *computed) {
                if unused_imports.iter().any(|u| u == &native_name) {
                    matched.insert(native_name);
                    return has_side_effects(value);
                }
            }
        }
        true
    });
}

fn match_export_assignment(expr: &Node, unused_exports: &[String], matched: &mut HashSet<String>) -> bool {
    if let NodeKind::AssignmentExpression { left, right, operator } = &expr.kind {
        if operator != "=" {
            return false;
        }
        if matches!(left.kind, NodeKind::Identifier { .. }) {
            if let Some(w) = wasm_exports_member(right) {
                matched.insert(w.clone());
                return unused_exports.iter().any(|u| u == &w);
            }
        }
        if is_member_named(left, "Module") {
            if let NodeKind::AssignmentExpression { right: inner_right, operator: inner_op, .. } = &right.kind {
                if inner_op == "=" {
                    if let Some(w) = wasm_exports_member(inner_right) {
                        matched.insert(w.clone());
                        return unused_exports.iter().any(|u| u == &w);
                    }
                }
            }
        }
    }
    false
}

struct RemovalVisitor<'a> {
    unused_imports: &'a [String],
    unused_exports: &'a [String],
    matched_imports: &'a mut HashSet<String>,
    matched_exports: &'a mut HashSet<String>,
}

impl RecursiveRewrite for RemovalVisitor<'_> {
    fn visit(&mut self, node: &mut Node) {
        match &mut node.kind {
            NodeKind::VariableDeclaration { declarations, .. } => {
                for d in declarations.iter_mut() {
                    if let NodeKind::VariableDeclarator { id, init: Some(init) } = &mut d.kind {
                        if is_ident_named(id.as_ref(), "wasmImports") {
                            if let NodeKind::ObjectExpression { properties } = &mut init.kind {
                                filter_import_props(properties, self.unused_imports, self.matched_imports);
                            }
                        }
                    }
                }
            }
            NodeKind::ExpressionStatement { expression, .. } => {
                let mut handled = false;
                if let NodeKind::AssignmentExpression { left, right, operator } = &mut expression.kind {
                    if operator == "=" && is_ident_named(left.as_ref(), "wasmImports") {
                        if let NodeKind::ObjectExpression { properties } = &mut right.kind {
                            filter_import_props(properties, self.unused_imports, self.matched_imports);
                            handled = true;
                        }
                    }
                }
                if !handled && match_export_assignment(expression, self.unused_exports, self.matched_exports) {
                    empty_out(node);
                    return;
                }
            }
            _ => {}
        }
        descend_default(self, node);
    }
}

/// Consumes `unusedImports`/`unusedExports`, erasing the matching import
/// properties and export-assignment statements. Fatal if any entry was
/// never found in the AST.
pub fn apply_dce_graph_removals(ast: &mut Node, unused_imports: &[String], unused_exports: &[String]) -> GlueResult<()> {
    let mut matched_imports = HashSet::new();
    let mut matched_exports = HashSet::new();
    {
        let mut visitor = RemovalVisitor {
            unused_imports,
            unused_exports,
            matched_imports: &mut matched_imports,
            matched_exports: &mut matched_exports,
        };
        recursive_walk(&mut visitor, ast);
    }

    for imp in unused_imports {
        if !matched_imports.contains(imp) {
            return Err(GlueError::Consistency(format!("unusedImports entry '{imp}' was never found in the AST")));
        }
    }
    for exp in unused_exports {
        if !matched_exports.contains(exp) {
            return Err(GlueError::Consistency(format!("unusedExports entry '{exp}' was never found in the AST")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn scenario_c_minimal_graph() {
        let src = "var wasmImports = { env_log: _log }; var _malloc = wasmExports['malloc']; function _log(){ _malloc(); }";
        let (mut ast, _) = parse_program(src, false).unwrap();
        let json = emit_dce_graph(&mut ast, &ExtraInfo::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entries = value.as_array().unwrap();

        let find = |name: &str| entries.iter().find(|e| e["name"] == name).unwrap();

        let defun = find("emcc$defun$_log");
        assert_eq!(defun["reaches"], serde_json::json!(["emcc$export$_malloc"]));

        let export = find("emcc$export$_malloc");
        assert_eq!(export["export"], "malloc");

        let import = find("emcc$import$_log");
        assert_eq!(import["import"], serde_json::json!(["env", "env_log"]));
        assert_eq!(import["reaches"], serde_json::json!(["emcc$defun$_log"]));
    }

    #[test]
    fn scenario_d_apply_removals() {
        let src = "var wasmImports = { env_log: _log }; var _malloc = wasmExports['malloc']; function _log(){ _malloc(); }";
        let (mut ast, _) = parse_program(src, false).unwrap();
        apply_dce_graph_removals(
            &mut ast,
            &["env_log".to_string()],
            &["malloc".to_string()],
        )
        .unwrap();

        let NodeKind::Program { body } = &ast.kind else { unreachable!() };
        for stmt in body {
            if let NodeKind::VariableDeclaration { declarations, .. } = &stmt.kind {
                for d in declarations {
                    if let NodeKind::VariableDeclarator { id, init: Some(init) } = &d.kind {
                        if is_ident_named(id, "wasmImports") {
                            if let NodeKind::ObjectExpression { properties } = &init.kind {
                                assert!(properties.is_empty());
                            }
                        }
                    }
                }
            }
            if let NodeKind::ExpressionStatement { expression, .. } = &stmt.kind {
                if let NodeKind::AssignmentExpression { left, .. } = &expression.kind {
                    assert!(!is_ident_named(left, "_malloc"));
                }
            }
        }
    }

    #[test]
    fn apply_removals_rejects_unmatched_entry() {
        let src = "var wasmImports = { env_log: _log };";
        let (mut ast, _) = parse_program(src, false).unwrap();
        let err = apply_dce_graph_removals(&mut ast, &["nonexistent".to_string()], &[]).unwrap_err();
        assert!(matches!(err, GlueError::Consistency(_)));
    }
}
