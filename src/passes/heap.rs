//! The five heap-rewrite passes: littleEndianHeap,
//! growableHeap, unsignPointers, asanify, safeHeap. All share one shape —
//! `recursiveWalk` with handlers keyed on whether a node is a HEAP access —
//! and differ only in the rewrite they apply and which helper functions they
//! must not descend into.

use crate::ast::walk::{descend_default, recursive_walk, RecursiveRewrite};
use crate::ast::{LiteralValue, Node, NodeKind};

const HEAP_NAMES: &[&str] = &[
    "HEAP8", "HEAPU8", "HEAP16", "HEAPU16", "HEAP32", "HEAPU32", "HEAP64", "HEAPU64", "HEAPF32", "HEAPF64",
];

fn is_ident_named(node: &Node, name: &str) -> bool {
    matches!(&node.kind, NodeKind::Identifier { name: n } if n == name)
}

fn heap_access_name(node: &Node) -> Option<&str> {
    if let NodeKind::MemberExpression { object, computed: true, .. } = &node.kind {
        if let NodeKind::Identifier { name } = &object.kind {
            if HEAP_NAMES.contains(&name.as_str()) {
                return Some(name.as_str());
            }
        }
    }
    None
}

fn is_heap_member(node: &Node) -> bool {
    heap_access_name(node).is_some()
}

fn heap_type_size(name: &str) -> (&'static str, f64) {
    match name {
        "HEAP8" => ("I8", 1.0),
        "HEAPU8" => ("U8", 1.0),
        "HEAP16" => ("I16", 2.0),
        "HEAPU16" => ("U16", 2.0),
        "HEAP32" => ("I32", 4.0),
        "HEAPU32" => ("U32", 4.0),
        "HEAP64" => ("I64", 8.0),
        "HEAPU64" => ("U64", 8.0),
        "HEAPF32" => ("F32", 4.0),
        "HEAPF64" => ("F64", 8.0),
        _ => unreachable!("heap_type_size called with a non-HEAP name"),
    }
}

fn is_skip_fn(idn: &Node, prefixes: &[&str], exact: &[&str]) -> bool {
    if let NodeKind::Identifier { name } = &idn.kind {
        prefixes.iter().any(|p| name.starts_with(p)) || exact.contains(&name.as_str())
    } else {
        false
    }
}

/// `unsign(p)`: `p >> k` becomes `p >>> k` in place; anything else is
/// wrapped as `p >>> 0`.
fn unsign(node: &mut Node) {
    if let NodeKind::BinaryExpression { operator, .. } = &mut node.kind {
        if operator == ">>" {
            *operator = ">>>".to_string();
            return;
        }
    }
    let old = std::mem::replace(node, Node::new(NodeKind::EmptyStatement));
    *node = Node::new(NodeKind::BinaryExpression {
        operator: ">>>".to_string(),
        left: Box::new(old),
        right: Box::new(Node::new(NodeKind::Literal { value: LiteralValue::Number(0.0), raw: Some("0".into()) })),
    });
}

fn scaled_index(idx: Node, bytes: f64) -> Node {
    Node::new(NodeKind::BinaryExpression {
        operator: "*".to_string(),
        left: Box::new(idx),
        right: Box::new(Node::new(NodeKind::Literal { value: LiteralValue::Number(bytes), raw: None })),
    })
}

// --- littleEndianHeap ----------------------------------------------------

fn atomics_method_name(callee: &Node) -> Option<&str> {
    if let NodeKind::MemberExpression { object, property, computed: false } = &callee.kind {
        if is_ident_named(object, "Atomics") {
            if let NodeKind::Identifier { name } = &property.kind {
                return Some(name.as_str());
            }
        }
    }
    None
}

fn is_atomics_call(callee: &Node) -> bool {
    atomics_method_name(callee).is_some()
}

fn le_rewrite_store(node: &mut Node) {
    let NodeKind::AssignmentExpression { left, .. } = &node.kind else { return };
    let Some(heap_name) = heap_access_name(left).map(str::to_string) else { return };
    if heap_name == "HEAP8" || heap_name == "HEAPU8" {
        return;
    }
    let (ty, bytes) = heap_type_size(&heap_name);
    let NodeKind::AssignmentExpression { left, right, .. } = &mut node.kind else { return };
    let NodeKind::MemberExpression { property, .. } = &mut left.kind else { return };
    let idx = std::mem::replace(property.as_mut(), Node::new(NodeKind::EmptyStatement));
    let value = std::mem::replace(right.as_mut(), Node::new(NodeKind::EmptyStatement));
    node.kind = NodeKind::CallExpression {
        callee: Box::new(Node::ident(format!("LE_HEAP_STORE_{ty}"))),
        arguments: vec![scaled_index(idx, bytes), value],
    };
}

fn le_rewrite_load(node: &mut Node) {
    let Some(heap_name) = heap_access_name(node).map(str::to_string) else { return };
    if heap_name == "HEAP8" || heap_name == "HEAPU8" {
        return;
    }
    let (ty, bytes) = heap_type_size(&heap_name);
    let NodeKind::MemberExpression { property, .. } = &mut node.kind else { return };
    let idx = std::mem::replace(property.as_mut(), Node::new(NodeKind::EmptyStatement));
    node.kind = NodeKind::CallExpression {
        callee: Box::new(Node::ident(format!("LE_HEAP_LOAD_{ty}"))),
        arguments: vec![scaled_index(idx, bytes)],
    };
}

fn le_rewrite_atomics(node: &mut Node) {
    if let NodeKind::CallExpression { callee, .. } = &mut node.kind {
        if let Some(x_upper) = atomics_method_name(callee).map(|s| s.to_uppercase()) {
            *callee = Box::new(Node::ident(format!("LE_ATOMICS_{x_upper}")));
        }
    }
}

struct LittleEndianHeapVisitor;

impl RecursiveRewrite for LittleEndianHeapVisitor {
    fn visit(&mut self, node: &mut Node) {
        match &mut node.kind {
            NodeKind::FunctionDeclaration { id: Some(idn), .. } | NodeKind::FunctionExpression { id: Some(idn), .. }
                if is_skip_fn(idn, &["LE_HEAP", "LE_ATOMICS_"], &[]) => {}
            NodeKind::AssignmentExpression { operator, left, right } if operator == "=" && is_heap_member(left) => {
                self.visit(right.as_mut());
                le_rewrite_store(node);
            }
            NodeKind::CallExpression { callee, arguments } if is_atomics_call(callee) => {
                for a in arguments.iter_mut() {
                    self.visit(a);
                }
                le_rewrite_atomics(node);
            }
            NodeKind::MemberExpression { .. } if is_heap_member(node) => {
                le_rewrite_load(node);
            }
            _ => descend_default(self, node),
        }
    }
}

pub fn little_endian_heap(ast: &mut Node) {
    recursive_walk(&mut LittleEndianHeapVisitor, ast);
}

// --- growableHeap ----------------------------------------------------------

fn is_heap_identifier(node: &Node) -> bool {
    matches!(&node.kind, NodeKind::Identifier { name } if HEAP_NAMES.contains(&name.as_str()))
}

fn wrap_grow_mem_views(node: &mut Node) {
    let original = std::mem::replace(node, Node::new(NodeKind::EmptyStatement));
    node.kind = NodeKind::SequenceExpression {
        expressions: vec![
            Node::new(NodeKind::CallExpression { callee: Box::new(Node::ident("growMemViews")), arguments: vec![] }),
            original,
        ],
    };
}

struct GrowableHeapVisitor;

impl RecursiveRewrite for GrowableHeapVisitor {
    fn visit(&mut self, node: &mut Node) {
        match &mut node.kind {
            NodeKind::FunctionDeclaration { id: Some(idn), .. }
                if is_skip_fn(idn, &[], &["growMemViews", "LE_HEAP_UPDATE"]) => {}
            NodeKind::ExportNamedDeclaration { .. } | NodeKind::ExportDefaultDeclaration { .. } => {}
            NodeKind::AssignmentExpression { left, right, .. } => {
                if !is_heap_identifier(left) {
                    self.visit(left.as_mut());
                }
                self.visit(right.as_mut());
            }
            NodeKind::Identifier { name } if HEAP_NAMES.contains(&name.as_str()) => {
                wrap_grow_mem_views(node);
            }
            _ => descend_default(self, node),
        }
    }
}

pub fn growable_heap(ast: &mut Node) {
    recursive_walk(&mut GrowableHeapVisitor, ast);
}

// --- unsignPointers ----------------------------------------------------

const UNSIGN_EXTRA_NAMES: &[&str] = &["heap", "HEAP"];

fn is_unsign_heap_identifier(node: &Node) -> bool {
    matches!(&node.kind, NodeKind::Identifier { name }
        if HEAP_NAMES.contains(&name.as_str()) || UNSIGN_EXTRA_NAMES.contains(&name.as_str()))
}

fn heap_method_name<'a>(callee: &'a Node) -> Option<&'a str> {
    if let NodeKind::MemberExpression { object, property, computed: false } = &callee.kind {
        if is_unsign_heap_identifier(object) {
            if let NodeKind::Identifier { name } = &property.kind {
                return Some(name.as_str());
            }
        }
    }
    None
}

struct UnsignPointersVisitor;

impl RecursiveRewrite for UnsignPointersVisitor {
    fn visit(&mut self, node: &mut Node) {
        match &mut node.kind {
            NodeKind::MemberExpression { object, property, computed: true } if is_unsign_heap_identifier(object) => {
                self.visit(property.as_mut());
                unsign(property.as_mut());
            }
            NodeKind::CallExpression { callee, arguments } if heap_method_name(callee).is_some() => {
                let method = heap_method_name(callee).unwrap().to_string();
                for a in arguments.iter_mut() {
                    self.visit(a);
                }
                match method.as_str() {
                    "set" => {
                        if arguments.len() > 1 {
                            unsign(&mut arguments[1]);
                        }
                    }
                    "subarray" => {
                        for i in 0..arguments.len().min(2) {
                            unsign(&mut arguments[i]);
                        }
                    }
                    "copyWithin" => {
                        for i in 0..arguments.len().min(3) {
                            unsign(&mut arguments[i]);
                        }
                    }
                    _ => {}
                }
            }
            _ => descend_default(self, node),
        }
    }
}

pub fn unsign_pointers(ast: &mut Node) {
    recursive_walk(&mut UnsignPointersVisitor, ast);
}

// --- asanify / safeHeap ----------------------------------------------------

fn rewrite_store_call(node: &mut Node, store_name: &str) {
    let NodeKind::AssignmentExpression { left, right, .. } = &mut node.kind else { return };
    let NodeKind::MemberExpression { object, property, .. } = &mut left.kind else { return };
    let obj = std::mem::replace(object.as_mut(), Node::new(NodeKind::EmptyStatement));
    let prop = std::mem::replace(property.as_mut(), Node::new(NodeKind::EmptyStatement));
    let value = std::mem::replace(right.as_mut(), Node::new(NodeKind::EmptyStatement));
    node.kind = NodeKind::CallExpression {
        callee: Box::new(Node::ident(store_name)),
        arguments: vec![obj, prop, value],
    };
}

fn rewrite_load_call(node: &mut Node, load_name: &str) {
    let NodeKind::MemberExpression { object, property, .. } = &mut node.kind else { return };
    let obj = std::mem::replace(object.as_mut(), Node::new(NodeKind::EmptyStatement));
    let prop = std::mem::replace(property.as_mut(), Node::new(NodeKind::EmptyStatement));
    node.kind = NodeKind::CallExpression {
        callee: Box::new(Node::ident(load_name)),
        arguments: vec![obj, prop],
    };
}

struct AsanifyVisitor;

impl RecursiveRewrite for AsanifyVisitor {
    fn visit(&mut self, node: &mut Node) {
        match &mut node.kind {
            NodeKind::FunctionDeclaration { id: Some(idn), .. }
                if is_skip_fn(idn, &["_asan_js_"], &["establishStackSpace"]) => {}
            NodeKind::AssignmentExpression { operator, left, right } if operator == "=" && is_heap_member(left) => {
                self.visit(right.as_mut());
                rewrite_store_call(node, "_asan_js_store");
            }
            NodeKind::MemberExpression { .. } if is_heap_member(node) => {
                rewrite_load_call(node, "_asan_js_load");
            }
            _ => descend_default(self, node),
        }
    }
}

pub fn asanify(ast: &mut Node) {
    recursive_walk(&mut AsanifyVisitor, ast);
}

struct SafeHeapVisitor;

impl RecursiveRewrite for SafeHeapVisitor {
    fn visit(&mut self, node: &mut Node) {
        match &mut node.kind {
            NodeKind::FunctionDeclaration { id: Some(idn), .. } if is_skip_fn(idn, &["SAFE_HEAP"], &[]) => {}
            NodeKind::AssignmentExpression { operator, left, right } if operator == "=" && is_heap_member(left) => {
                self.visit(right.as_mut());
                rewrite_store_call(node, "SAFE_HEAP_STORE");
            }
            NodeKind::MemberExpression { .. } if is_heap_member(node) => {
                rewrite_load_call(node, "SAFE_HEAP_LOAD");
            }
            _ => descend_default(self, node),
        }
    }
}

pub fn safe_heap(ast: &mut Node) {
    recursive_walk(&mut SafeHeapVisitor, ast);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::printer::print_program;

    fn roundtrip(src: &str, f: impl FnOnce(&mut Node)) -> String {
        let (mut ast, comments) = parse_program(src, false).unwrap();
        f(&mut ast);
        print_program(&ast, true, &comments)
    }

    #[test]
    fn scenario_e_little_endian_heap() {
        let out = roundtrip("HEAP32[p] = v; x = HEAP32[q];", |ast| little_endian_heap(ast));
        assert!(out.contains("LE_HEAP_STORE_I32"));
        assert!(out.contains("LE_HEAP_LOAD_I32"));
        assert!(out.contains('p'));
        assert!(out.contains('q'));
        assert!(out.contains('4'));
    }

    #[test]
    fn little_endian_heap_leaves_byte_accesses_alone() {
        let out = roundtrip("x = HEAP8[p];", |ast| little_endian_heap(ast));
        assert!(!out.contains("LE_HEAP_LOAD"));
        assert!(out.contains("HEAP8[p]") || out.contains("HEAP8[ p ]"));
    }

    #[test]
    fn little_endian_heap_rewrites_atomics_call() {
        let out = roundtrip("x = Atomics.add(HEAP32, p, v);", |ast| little_endian_heap(ast));
        assert!(out.contains("LE_ATOMICS_ADD"));
    }

    #[test]
    fn scenario_f_unsign_pointers() {
        let out = roundtrip("x = HEAP32[n];", |ast| unsign_pointers(ast));
        assert!(out.contains(">>>"));

        let out2 = roundtrip("x = HEAP32[n >> 2];", |ast| unsign_pointers(ast));
        assert!(out2.contains(">>>"));
        assert!(!out2.contains(">> 2"));
    }

    #[test]
    fn growable_heap_wraps_identifier_but_not_assignment_target() {
        let out = roundtrip("x = HEAP32[p];", |ast| growable_heap(ast));
        assert!(out.contains("growMemViews"));

        let out2 = roundtrip("HEAPU8 = newView;", |ast| growable_heap(ast));
        assert!(!out2.contains("growMemViews"));
    }

    #[test]
    fn asanify_rewrites_store_and_load() {
        let out = roundtrip("HEAP32[p] = v;", |ast| asanify(ast));
        assert!(out.contains("_asan_js_store"));

        let out2 = roundtrip("x = HEAP32[p];", |ast| asanify(ast));
        assert!(out2.contains("_asan_js_load"));
    }

    #[test]
    fn safe_heap_rewrites_store_and_load() {
        let out = roundtrip("HEAP32[p] = v;", |ast| safe_heap(ast));
        assert!(out.contains("SAFE_HEAP_STORE"));

        let out2 = roundtrip("x = HEAP32[p];", |ast| safe_heap(ast));
        assert!(out2.contains("SAFE_HEAP_LOAD"));
    }
}
