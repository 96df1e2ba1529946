//! The four traversal disciplines used by the transformation passes.
//!
//! `children`/`children_mut` enumerate a node's own node-valued fields in
//! declaration order — the Rust stand-in for "reflection over own
//! properties" (there is no runtime reflection here; the order is fixed at
//! compile time by the match arm below, which mirrors the field order each
//! `NodeKind` variant declares in `ast::node`). Every walker is built on top
//! of these two functions, so totality and ordering only have to be right
//! in one place (Testable Property 1).

use super::node::{Node, NodeKind};

/// Own node-valued children of `node`, in declaration order. `EmptyStatement`
/// always yields no children, even though in this representation it never
/// retains a stale payload to begin with.
pub fn children(node: &Node) -> Vec<&Node> {
    let mut out = Vec::new();
    match &node.kind {
        NodeKind::Program { body } => out.extend(body.iter()),
        NodeKind::Identifier { .. }
        | NodeKind::Literal { .. }
        | NodeKind::TemplateElement { .. }
        | NodeKind::ThisExpression
        | NodeKind::Super
        | NodeKind::EmptyStatement => {}
        NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } => {
            out.extend(quasis.iter());
            out.extend(expressions.iter());
        }
        NodeKind::VariableDeclaration { declarations, .. } => out.extend(declarations.iter()),
        NodeKind::VariableDeclarator { id, init } => {
            out.push(id.as_ref());
            if let Some(i) = init {
                out.push(i.as_ref());
            }
        }
        NodeKind::FunctionDeclaration { id, params, body }
        | NodeKind::FunctionExpression { id, params, body } => {
            if let Some(i) = id {
                out.push(i.as_ref());
            }
            out.extend(params.iter());
            out.push(body.as_ref());
        }
        NodeKind::ArrowFunctionExpression { params, body, .. } => {
            out.extend(params.iter());
            out.push(body.as_ref());
        }
        NodeKind::BlockStatement { body } => out.extend(body.iter()),
        NodeKind::ExpressionStatement { expression, .. } => out.push(expression.as_ref()),
        NodeKind::ReturnStatement { argument } => {
            if let Some(a) = argument {
                out.push(a.as_ref());
            }
        }
        NodeKind::IfStatement {
            test,
            consequent,
            alternate,
        } => {
            out.push(test.as_ref());
            out.push(consequent.as_ref());
            if let Some(a) = alternate {
                out.push(a.as_ref());
            }
        }
        NodeKind::ForStatement {
            init,
            test,
            update,
            body,
        } => {
            if let Some(n) = init {
                out.push(n.as_ref());
            }
            if let Some(n) = test {
                out.push(n.as_ref());
            }
            if let Some(n) = update {
                out.push(n.as_ref());
            }
            out.push(body.as_ref());
        }
        NodeKind::ForInStatement { left, right, body }
        | NodeKind::ForOfStatement { left, right, body } => {
            out.push(left.as_ref());
            out.push(right.as_ref());
            out.push(body.as_ref());
        }
        NodeKind::WhileStatement { test, body } => {
            out.push(test.as_ref());
            out.push(body.as_ref());
        }
        NodeKind::DoWhileStatement { body, test } => {
            out.push(body.as_ref());
            out.push(test.as_ref());
        }
        NodeKind::BreakStatement { label } | NodeKind::ContinueStatement { label } => {
            if let Some(l) = label {
                out.push(l.as_ref());
            }
        }
        NodeKind::LabeledStatement { label, body } => {
            out.push(label.as_ref());
            out.push(body.as_ref());
        }
        NodeKind::ThrowStatement { argument } => out.push(argument.as_ref()),
        NodeKind::TryStatement {
            block,
            handler,
            finalizer,
        } => {
            out.push(block.as_ref());
            if let Some(h) = handler {
                out.push(h.as_ref());
            }
            if let Some(f) = finalizer {
                out.push(f.as_ref());
            }
        }
        NodeKind::CatchClause { param, body } => {
            if let Some(p) = param {
                out.push(p.as_ref());
            }
            out.push(body.as_ref());
        }
        NodeKind::SwitchStatement {
            discriminant,
            cases,
        } => {
            out.push(discriminant.as_ref());
            out.extend(cases.iter());
        }
        NodeKind::SwitchCase { test, consequent } => {
            if let Some(t) = test {
                out.push(t.as_ref());
            }
            out.extend(consequent.iter());
        }
        NodeKind::AssignmentExpression { left, right, .. }
        | NodeKind::BinaryExpression { left, right, .. }
        | NodeKind::LogicalExpression { left, right, .. }
        | NodeKind::AssignmentPattern { left, right } => {
            out.push(left.as_ref());
            out.push(right.as_ref());
        }
        NodeKind::UnaryExpression { argument, .. } | NodeKind::UpdateExpression { argument, .. } => {
            out.push(argument.as_ref());
        }
        NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => {
            out.push(test.as_ref());
            out.push(consequent.as_ref());
            out.push(alternate.as_ref());
        }
        NodeKind::SequenceExpression { expressions } => out.extend(expressions.iter()),
        NodeKind::CallExpression { callee, arguments }
        | NodeKind::NewExpression { callee, arguments } => {
            out.push(callee.as_ref());
            out.extend(arguments.iter());
        }
        NodeKind::MemberExpression {
            object, property, ..
        } => {
            out.push(object.as_ref());
            out.push(property.as_ref());
        }
        NodeKind::ObjectExpression { properties } | NodeKind::ObjectPattern { properties } => {
            out.extend(properties.iter());
        }
        NodeKind::Property { key, value, .. } => {
            out.push(key.as_ref());
            out.push(value.as_ref());
        }
        NodeKind::SpreadElement { argument } | NodeKind::RestElement { argument } => {
            out.push(argument.as_ref());
        }
        NodeKind::ArrayExpression { elements } | NodeKind::ArrayPattern { elements } => {
            out.extend(elements.iter().filter_map(|e| e.as_ref()));
        }
        NodeKind::ExportNamedDeclaration {
            declaration,
            specifiers,
        } => {
            if let Some(d) = declaration {
                out.push(d.as_ref());
            }
            out.extend(specifiers.iter());
        }
        NodeKind::ExportDefaultDeclaration { declaration } => out.push(declaration.as_ref()),
        NodeKind::ExportSpecifier { local, exported } => {
            out.push(local.as_ref());
            out.push(exported.as_ref());
        }
        NodeKind::ImportDeclaration { specifiers, source } => {
            out.extend(specifiers.iter());
            out.push(source.as_ref());
        }
    }
    out
}

/// Mutable counterpart of `children`. Field order matches `children` exactly.
pub fn children_mut(node: &mut Node) -> Vec<&mut Node> {
    let mut out = Vec::new();
    match &mut node.kind {
        NodeKind::Program { body } => out.extend(body.iter_mut()),
        NodeKind::Identifier { .. }
        | NodeKind::Literal { .. }
        | NodeKind::TemplateElement { .. }
        | NodeKind::ThisExpression
        | NodeKind::Super
        | NodeKind::EmptyStatement => {}
        NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } => {
            out.extend(quasis.iter_mut());
            out.extend(expressions.iter_mut());
        }
        NodeKind::VariableDeclaration { declarations, .. } => out.extend(declarations.iter_mut()),
        NodeKind::VariableDeclarator { id, init } => {
            out.push(id.as_mut());
            if let Some(i) = init {
                out.push(i.as_mut());
            }
        }
        NodeKind::FunctionDeclaration { id, params, body }
        | NodeKind::FunctionExpression { id, params, body } => {
            if let Some(i) = id {
                out.push(i.as_mut());
            }
            out.extend(params.iter_mut());
            out.push(body.as_mut());
        }
        NodeKind::ArrowFunctionExpression { params, body, .. } => {
            out.extend(params.iter_mut());
            out.push(body.as_mut());
        }
        NodeKind::BlockStatement { body } => out.extend(body.iter_mut()),
        NodeKind::ExpressionStatement { expression, .. } => out.push(expression.as_mut()),
        NodeKind::ReturnStatement { argument } => {
            if let Some(a) = argument {
                out.push(a.as_mut());
            }
        }
        NodeKind::IfStatement {
            test,
            consequent,
            alternate,
        } => {
            out.push(test.as_mut());
            out.push(consequent.as_mut());
            if let Some(a) = alternate {
                out.push(a.as_mut());
            }
        }
        NodeKind::ForStatement {
            init,
            test,
            update,
            body,
        } => {
            if let Some(n) = init {
                out.push(n.as_mut());
            }
            if let Some(n) = test {
                out.push(n.as_mut());
            }
            if let Some(n) = update {
                out.push(n.as_mut());
            }
            out.push(body.as_mut());
        }
        NodeKind::ForInStatement { left, right, body }
        | NodeKind::ForOfStatement { left, right, body } => {
            out.push(left.as_mut());
            out.push(right.as_mut());
            out.push(body.as_mut());
        }
        NodeKind::WhileStatement { test, body } => {
            out.push(test.as_mut());
            out.push(body.as_mut());
        }
        NodeKind::DoWhileStatement { body, test } => {
            out.push(body.as_mut());
            out.push(test.as_mut());
        }
        NodeKind::BreakStatement { label } | NodeKind::ContinueStatement { label } => {
            if let Some(l) = label {
                out.push(l.as_mut());
            }
        }
        NodeKind::LabeledStatement { label, body } => {
            out.push(label.as_mut());
            out.push(body.as_mut());
        }
        NodeKind::ThrowStatement { argument } => out.push(argument.as_mut()),
        NodeKind::TryStatement {
            block,
            handler,
            finalizer,
        } => {
            out.push(block.as_mut());
            if let Some(h) = handler {
                out.push(h.as_mut());
            }
            if let Some(f) = finalizer {
                out.push(f.as_mut());
            }
        }
        NodeKind::CatchClause { param, body } => {
            if let Some(p) = param {
                out.push(p.as_mut());
            }
            out.push(body.as_mut());
        }
        NodeKind::SwitchStatement {
            discriminant,
            cases,
        } => {
            out.push(discriminant.as_mut());
            out.extend(cases.iter_mut());
        }
        NodeKind::SwitchCase { test, consequent } => {
            if let Some(t) = test {
                out.push(t.as_mut());
            }
            out.extend(consequent.iter_mut());
        }
        NodeKind::AssignmentExpression { left, right, .. }
        | NodeKind::BinaryExpression { left, right, .. }
        | NodeKind::LogicalExpression { left, right, .. }
        | NodeKind::AssignmentPattern { left, right } => {
            out.push(left.as_mut());
            out.push(right.as_mut());
        }
        NodeKind::UnaryExpression { argument, .. } | NodeKind::UpdateExpression { argument, .. } => {
            out.push(argument.as_mut());
        }
        NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => {
            out.push(test.as_mut());
            out.push(consequent.as_mut());
            out.push(alternate.as_mut());
        }
        NodeKind::SequenceExpression { expressions } => out.extend(expressions.iter_mut()),
        NodeKind::CallExpression { callee, arguments }
        | NodeKind::NewExpression { callee, arguments } => {
            out.push(callee.as_mut());
            out.extend(arguments.iter_mut());
        }
        NodeKind::MemberExpression {
            object, property, ..
        } => {
            out.push(object.as_mut());
            out.push(property.as_mut());
        }
        NodeKind::ObjectExpression { properties } | NodeKind::ObjectPattern { properties } => {
            out.extend(properties.iter_mut());
        }
        NodeKind::Property { key, value, .. } => {
            out.push(key.as_mut());
            out.push(value.as_mut());
        }
        NodeKind::SpreadElement { argument } | NodeKind::RestElement { argument } => {
            out.push(argument.as_mut());
        }
        NodeKind::ArrayExpression { elements } | NodeKind::ArrayPattern { elements } => {
            out.extend(elements.iter_mut().filter_map(|e| e.as_mut()));
        }
        NodeKind::ExportNamedDeclaration {
            declaration,
            specifiers,
        } => {
            if let Some(d) = declaration {
                out.push(d.as_mut());
            }
            out.extend(specifiers.iter_mut());
        }
        NodeKind::ExportDefaultDeclaration { declaration } => out.push(declaration.as_mut()),
        NodeKind::ExportSpecifier { local, exported } => {
            out.push(local.as_mut());
            out.push(exported.as_mut());
        }
        NodeKind::ImportDeclaration { specifiers, source } => {
            out.extend(specifiers.iter_mut());
            out.push(source.as_mut());
        }
    }
    out
}

/// `visitChildren` — invoke `f` on every own node-valued child, in order.
pub fn visit_children<'a>(node: &'a Node, f: &mut impl FnMut(&'a Node)) {
    for child in children(node) {
        f(child);
    }
}

pub fn visit_children_mut(node: &mut Node, f: &mut impl FnMut(&mut Node)) {
    for child in children_mut(node) {
        f(child);
    }
}

/// `simpleWalk` — post-order: children first, then `post(node)` if it
/// matches (the handler itself inspects `node.type_name()`; there is no
/// separate dispatch table, since a closure doing its own `match` is the
/// idiomatic Rust equivalent of a type-keyed handler map).
pub fn simple_walk(node: &mut Node, post: &mut impl FnMut(&mut Node)) {
    for child in children_mut(node) {
        simple_walk(child, post);
    }
    post(node);
}

/// `fullWalk` — hybrid prune-and-collect. If `pre` returns `false` the whole
/// subtree (including `node` itself) is skipped; otherwise children are
/// visited first, then `post(node)`.
pub fn full_walk(
    node: &mut Node,
    post: &mut impl FnMut(&mut Node),
    pre: &mut Option<&mut dyn FnMut(&mut Node) -> bool>,
) {
    if let Some(pre_fn) = pre.as_deref_mut() {
        if !pre_fn(node) {
            return;
        }
    }
    for child in children_mut(node) {
        full_walk(child, post, pre);
    }
    post(node);
}

/// `recursiveWalk` — user-controlled recursion. A type implementing this
/// trait provides a `(node, continue)` handler: `visit` receives the whole
/// node and chooses which children to hand to `descend_default` (or to
/// `self.visit` directly); a node kind the implementor doesn't special-case
/// should fall through to `descend_default(self, node)` for default child
/// recursion.
pub trait RecursiveRewrite {
    fn visit(&mut self, node: &mut Node);
}

/// Default child recursion for the current node: visit every child with the
/// same visitor. Implementors call this on exactly the children they choose
/// to descend into.
pub fn descend_default<V: RecursiveRewrite + ?Sized>(visitor: &mut V, node: &mut Node) {
    for child in children_mut(node) {
        visitor.visit(child);
    }
}

/// Entry point: run a `RecursiveRewrite` visitor over a tree starting at `node`.
pub fn recursive_walk<V: RecursiveRewrite + ?Sized>(visitor: &mut V, node: &mut Node) {
    visitor.visit(node);
}
