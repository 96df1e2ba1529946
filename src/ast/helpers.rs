//! AST helper primitives shared across the transformation passes.

use super::node::{LiteralValue, Node, NodeKind};

/// `emptyOut` — the erasure primitive. Idempotent: applying it twice is
/// equivalent to once, since the second application just overwrites an
/// already-empty node with the same tombstone.
pub fn empty_out(node: &mut Node) {
    node.kind = NodeKind::EmptyStatement;
}

pub fn set_literal_value(item: &mut Node, value: LiteralValue) {
    if let NodeKind::Literal { value: v, raw } = &mut item.kind {
        *v = value;
        *raw = None;
    }
}

pub fn is_literal_string(n: &Node) -> bool {
    matches!(
        &n.kind,
        NodeKind::Literal {
            value: LiteralValue::String(_),
            ..
        }
    )
}

pub fn literal_string<'a>(n: &'a Node) -> Option<&'a str> {
    match &n.kind {
        NodeKind::Literal {
            value: LiteralValue::String(s),
            ..
        } => Some(s.as_str()),
        _ => None,
    }
}

/// `makeCallExpression` — overwrite `node` in place as a plain call. Because
/// the parent already owns `node` by value, overwriting through `&mut Node`
/// is exactly "overwrite, don't replace": no parent link exists separately
/// to preserve.
pub fn make_call_expression(node: &mut Node, name: &str, args: Vec<Node>) {
    node.kind = NodeKind::CallExpression {
        callee: Box::new(Node::ident(name)),
        arguments: args,
    };
}

/// `walkPattern` — recursive descent over a destructuring pattern.
/// `on_expr` receives every nested expression that isn't itself a binding
/// (default values, computed keys); `on_bound_ident` receives every name
/// that the pattern actually binds.
pub fn walk_pattern(
    node: &Node,
    on_expr: &mut impl FnMut(&Node),
    on_bound_ident: &mut impl FnMut(&str),
) {
    match &node.kind {
        NodeKind::Identifier { name } => on_bound_ident(name),
        NodeKind::AssignmentPattern { left, right } => {
            walk_pattern(left, on_expr, on_bound_ident);
            on_expr(right);
        }
        NodeKind::ObjectPattern { properties } => {
            for p in properties {
                match &p.kind {
                    NodeKind::Property {
                        key,
                        value,
                        computed,
                        ..
                    } => {
                        if *computed {
                            on_expr(key);
                        }
                        walk_pattern(value, on_expr, on_bound_ident);
                    }
                    NodeKind::RestElement { argument } => {
                        walk_pattern(argument, on_expr, on_bound_ident);
                    }
                    _ => {}
                }
            }
        }
        NodeKind::ArrayPattern { elements } => {
            for el in elements.iter().flatten() {
                walk_pattern(el, on_expr, on_bound_ident);
            }
        }
        NodeKind::RestElement { argument } => walk_pattern(argument, on_expr, on_bound_ident),
        // A pattern position that is actually a plain assignment target
        // (e.g. `[obj.prop] = x`) — not a binding, route to on_expr.
        _ => on_expr(node),
    }
}

const SIDE_EFFECT_FREE_NEW_CTORS: &[&str] = &[
    "TextDecoder",
    "ArrayBuffer",
    "Int8Array",
    "Uint8Array",
    "Uint8ClampedArray",
    "Int16Array",
    "Uint16Array",
    "Int32Array",
    "Uint32Array",
    "Float32Array",
    "Float64Array",
];

/// `hasSideEffects` — conservative oracle. Anything not on the safelist is
/// treated as side-effectful; nested function bodies are never inspected
/// (defining a closure is not itself an effect, and what it might do when
/// later called is irrelevant here).
pub fn has_side_effects(node: &Node) -> bool {
    match &node.kind {
        NodeKind::FunctionExpression { .. }
        | NodeKind::FunctionDeclaration { .. }
        | NodeKind::ArrowFunctionExpression { .. } => false,

        NodeKind::Literal { .. }
        | NodeKind::Identifier { .. }
        | NodeKind::ThisExpression
        | NodeKind::Super
        | NodeKind::EmptyStatement => false,

        NodeKind::UnaryExpression { argument, .. }
        | NodeKind::UpdateExpression { argument, .. }
        | NodeKind::SpreadElement { argument }
        | NodeKind::RestElement { argument } => has_side_effects(argument),

        NodeKind::BinaryExpression { left, right, .. }
        | NodeKind::LogicalExpression { left, right, .. } => {
            has_side_effects(left) || has_side_effects(right)
        }

        NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => has_side_effects(test) || has_side_effects(consequent) || has_side_effects(alternate),

        NodeKind::VariableDeclaration { declarations, .. } => {
            declarations.iter().any(has_side_effects)
        }
        NodeKind::VariableDeclarator { id, init } => {
            has_side_effects(id) || init.as_deref().is_some_and(has_side_effects)
        }

        NodeKind::ObjectExpression { properties } => properties.iter().any(has_side_effects),
        NodeKind::Property {
            key,
            value,
            computed,
            ..
        } => (*computed && has_side_effects(key)) || has_side_effects(value),
        NodeKind::ArrayExpression { elements } => {
            elements.iter().flatten().any(has_side_effects)
        }

        NodeKind::BlockStatement { body } => body.iter().any(has_side_effects),

        // A directive prologue entry (e.g. `"use strict"`) always counts as
        // an effect; any other bare expression defers to its own kind.
        NodeKind::ExpressionStatement {
            expression,
            directive,
        } => directive.is_some() || has_side_effects(expression),

        NodeKind::MemberExpression {
            object,
            property,
            computed,
        } => match &object.kind {
            NodeKind::Identifier { name } if name == "Math" => {
                *computed && has_side_effects(property)
            }
            _ => true,
        },

        NodeKind::NewExpression { callee, arguments } => match &callee.kind {
            NodeKind::Identifier { name }
                if SIDE_EFFECT_FREE_NEW_CTORS.contains(&name.as_str()) =>
            {
                arguments.iter().any(has_side_effects)
            }
            _ => true,
        },

        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::VarKind;

    #[test]
    fn empty_out_is_idempotent() {
        let mut n = Node::ident("x");
        empty_out(&mut n);
        empty_out(&mut n);
        assert!(n.is_empty_statement());
    }

    #[test]
    fn literals_and_math_member_are_safe() {
        let lit = Node::new(NodeKind::Literal {
            value: LiteralValue::Number(1.0),
            raw: Some("1".into()),
        });
        assert!(!has_side_effects(&lit));

        let math_abs = Node::new(NodeKind::MemberExpression {
            object: Box::new(Node::ident("Math")),
            property: Box::new(Node::ident("abs")),
            computed: false,
        });
        assert!(!has_side_effects(&math_abs));
    }

    #[test]
    fn arbitrary_call_is_unsafe() {
        let call = Node::new(NodeKind::CallExpression {
            callee: Box::new(Node::ident("sideEffect")),
            arguments: vec![],
        });
        assert!(has_side_effects(&call));
    }

    #[test]
    fn var_decl_with_call_init_is_unsafe_but_bare_decl_is_safe() {
        let bare = Node::new(NodeKind::VariableDeclaration {
            kind: VarKind::Var,
            declarations: vec![Node::new(NodeKind::VariableDeclarator {
                id: Box::new(Node::ident("x")),
                init: None,
            })],
        });
        assert!(!has_side_effects(&bare));

        let effectful = Node::new(NodeKind::VariableDeclaration {
            kind: VarKind::Var,
            declarations: vec![Node::new(NodeKind::VariableDeclarator {
                id: Box::new(Node::ident("x")),
                init: Some(Box::new(Node::new(NodeKind::CallExpression {
                    callee: Box::new(Node::ident("sideEffect")),
                    arguments: vec![],
                }))),
            })],
        });
        assert!(has_side_effects(&effectful));
    }

    #[test]
    fn walk_pattern_separates_bindings_from_expressions() {
        let pattern = Node::new(NodeKind::ObjectPattern {
            properties: vec![Node::new(NodeKind::Property {
                key: Box::new(Node::ident("a")),
                value: Box::new(Node::new(NodeKind::AssignmentPattern {
                    left: Box::new(Node::ident("b")),
                    right: Box::new(Node::ident("dflt")),
                })),
                computed: false,
                shorthand: false,
                kind: super::super::node::PropKind::Init,
            })],
        });
        let mut idents = Vec::new();
        let mut exprs = Vec::new();
        walk_pattern(&pattern, &mut |e| exprs.push(e.type_name()), &mut |n| {
            idents.push(n.to_string())
        });
        assert_eq!(idents, vec!["b"]);
        assert_eq!(exprs, vec!["Identifier"]);
    }
}
