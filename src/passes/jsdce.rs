//! JSDCE / AJSDCE: erase variable declarators, function declarations, and
//! (aggressively) no-effect expression statements whose bound names are
//! never used.

use std::collections::{HashMap, HashSet};

use crate::ast::helpers::{empty_out, has_side_effects, walk_pattern};
use crate::ast::walk::{descend_default, visit_children, RecursiveRewrite};
use crate::ast::{Node, NodeKind};

#[derive(Default, Clone)]
struct Binding {
    def: bool,
    used: bool,
    /// Protected from removal: a real parameter, a catch binding, or a
    /// for-in/for-of loop variable (never eligible for removal regardless
    /// of use).
    param: bool,
}

type ScopeFrame = HashMap<String, Binding>;

fn bind_def(stack: &mut [ScopeFrame], name: &str, param: bool) {
    let b = stack.last_mut().unwrap().entry(name.to_string()).or_default();
    b.def = true;
    if param {
        b.param = true;
    }
}

fn mark_use(stack: &mut [ScopeFrame], name: &str) {
    let b = stack.last_mut().unwrap().entry(name.to_string()).or_default();
    b.used = true;
}

/// Finish a function/program frame: propagate free uses to the enclosing
/// frame, and return the set of own names eligible for removal.
fn pop_and_process(stack: &mut Vec<ScopeFrame>) -> HashSet<String> {
    let frame = stack.pop().unwrap();
    let mut removal = HashSet::new();
    for (name, b) in frame {
        if b.used && !b.def {
            if !stack.is_empty() {
                mark_use(stack, &name);
            }
        } else if b.def && !b.used && !b.param {
            removal.insert(name);
        }
    }
    removal
}

fn mark_uses_readonly(node: &Node, stack: &mut Vec<ScopeFrame>) {
    if let NodeKind::Identifier { name } = &node.kind {
        mark_use(stack, name);
    }
    visit_children(node, &mut |child| mark_uses_readonly(child, stack));
}

fn bind_params(params: &[Node], stack: &mut Vec<ScopeFrame>) {
    for p in params {
        walk_pattern(
            p,
            &mut |expr| mark_uses_readonly(expr, stack),
            &mut |name| bind_def(stack, name, true),
        );
    }
}

/// Runs the nested function's own collection + immediate cleanup: push
/// frame, collect the body, pop and compute the removal set, then erase
/// against it right away.
fn run_function_scope(
    params: &[Node],
    body: &mut Node,
    stack: &mut Vec<ScopeFrame>,
    aggressive: bool,
    removed: &mut usize,
) {
    stack.push(ScopeFrame::default());
    bind_params(params, stack);
    let NodeKind::BlockStatement { body: stmts } = &mut body.kind else {
        stack.pop();
        return;
    };
    for s in stmts.iter_mut() {
        collect_stmt(s, stack, aggressive, removed);
    }
    let removal = pop_and_process(stack);
    let mut cleanup = JsdceCleanup { removal: &removal, aggressive, removed: 0 };
    for s in stmts.iter_mut() {
        cleanup.visit(s);
    }
    *removed += cleanup.removed;
}

fn collect_stmt(node: &mut Node, stack: &mut Vec<ScopeFrame>, aggressive: bool, removed: &mut usize) {
    match &mut node.kind {
        NodeKind::FunctionDeclaration { id, params, body } => {
            if let Some(idn) = id {
                if let NodeKind::Identifier { name } = &idn.kind {
                    bind_def(stack, name, false);
                }
            }
            run_function_scope(params.as_slice(), body.as_mut(), stack, aggressive, removed);
        }
        NodeKind::VariableDeclaration { declarations, .. } => {
            for d in declarations.iter_mut() {
                collect_stmt(d, stack, aggressive, removed);
            }
        }
        NodeKind::VariableDeclarator { id, init } => {
            walk_pattern(
                id.as_ref(),
                &mut |expr| mark_uses_readonly(expr, stack),
                &mut |name| bind_def(stack, name, false),
            );
            if let Some(i) = init {
                collect_expr(i.as_mut(), stack, aggressive, removed);
            }
        }
        NodeKind::BlockStatement { body } => {
            for s in body.iter_mut() {
                collect_stmt(s, stack, aggressive, removed);
            }
        }
        NodeKind::ExpressionStatement { expression, .. } => {
            collect_expr(expression.as_mut(), stack, aggressive, removed);
        }
        NodeKind::IfStatement { test, consequent, alternate } => {
            collect_expr(test.as_mut(), stack, aggressive, removed);
            collect_stmt(consequent.as_mut(), stack, aggressive, removed);
            if let Some(a) = alternate {
                collect_stmt(a.as_mut(), stack, aggressive, removed);
            }
        }
        NodeKind::ForStatement { init, test, update, body } => {
            if let Some(i) = init {
                collect_stmt(i.as_mut(), stack, aggressive, removed);
            }
            if let Some(t) = test {
                collect_expr(t.as_mut(), stack, aggressive, removed);
            }
            if let Some(u) = update {
                collect_expr(u.as_mut(), stack, aggressive, removed);
            }
            collect_stmt(body.as_mut(), stack, aggressive, removed);
        }
        NodeKind::ForInStatement { left, right, body } | NodeKind::ForOfStatement { left, right, body } => {
            bind_for_head(left.as_ref(), stack);
            collect_expr(right.as_mut(), stack, aggressive, removed);
            collect_stmt(body.as_mut(), stack, aggressive, removed);
        }
        NodeKind::WhileStatement { test, body } => {
            collect_expr(test.as_mut(), stack, aggressive, removed);
            collect_stmt(body.as_mut(), stack, aggressive, removed);
        }
        NodeKind::DoWhileStatement { body, test } => {
            collect_stmt(body.as_mut(), stack, aggressive, removed);
            collect_expr(test.as_mut(), stack, aggressive, removed);
        }
        NodeKind::LabeledStatement { body, .. } => {
            collect_stmt(body.as_mut(), stack, aggressive, removed);
        }
        NodeKind::ThrowStatement { argument } => collect_expr(argument.as_mut(), stack, aggressive, removed),
        NodeKind::ReturnStatement { argument } => {
            if let Some(a) = argument {
                collect_expr(a.as_mut(), stack, aggressive, removed);
            }
        }
        NodeKind::TryStatement { block, handler, finalizer } => {
            collect_stmt(block.as_mut(), stack, aggressive, removed);
            if let Some(h) = handler {
                if let NodeKind::CatchClause { param, body } = &mut h.kind {
                    if let Some(p) = param {
                        walk_pattern(p.as_ref(), &mut |_| {}, &mut |name| bind_def(stack, name, true));
                    }
                    collect_stmt(body.as_mut(), stack, aggressive, removed);
                }
            }
            if let Some(f) = finalizer {
                collect_stmt(f.as_mut(), stack, aggressive, removed);
            }
        }
        NodeKind::SwitchStatement { discriminant, cases } => {
            collect_expr(discriminant.as_mut(), stack, aggressive, removed);
            for c in cases.iter_mut() {
                if let NodeKind::SwitchCase { test, consequent } = &mut c.kind {
                    if let Some(t) = test {
                        collect_expr(t.as_mut(), stack, aggressive, removed);
                    }
                    for s in consequent.iter_mut() {
                        collect_stmt(s, stack, aggressive, removed);
                    }
                }
            }
        }
        NodeKind::ExportNamedDeclaration { declaration, specifiers } => {
            if let Some(d) = declaration {
                collect_stmt(d.as_mut(), stack, aggressive, removed);
                mark_declaration_names_used(d.as_ref(), stack);
            }
            for s in specifiers.iter() {
                if let NodeKind::ExportSpecifier { local, .. } = &s.kind {
                    if let NodeKind::Identifier { name } = &local.kind {
                        mark_use(stack, name);
                    }
                }
            }
        }
        NodeKind::ExportDefaultDeclaration { declaration } => {
            if let NodeKind::FunctionDeclaration { id: Some(idn), .. } = &declaration.kind {
                if let NodeKind::Identifier { name } = &idn.kind {
                    mark_use(stack, name);
                }
            }
            collect_stmt(declaration.as_mut(), stack, aggressive, removed);
        }
        NodeKind::BreakStatement { .. } | NodeKind::ContinueStatement { .. } | NodeKind::EmptyStatement => {}
        _ => collect_expr(node, stack, aggressive, removed),
    }
}

fn bind_for_head(left: &Node, stack: &mut Vec<ScopeFrame>) {
    match &left.kind {
        NodeKind::VariableDeclaration { declarations, .. } => {
            for d in declarations {
                if let NodeKind::VariableDeclarator { id, .. } = &d.kind {
                    walk_pattern(id.as_ref(), &mut |_| {}, &mut |name| bind_def(stack, name, true));
                }
            }
        }
        _ => {
            // Plain assignment target (`for (x in obj)`): not a binding,
            // just a use.
            mark_uses_readonly(left, stack);
        }
    }
}

fn mark_declaration_names_used(decl: &Node, stack: &mut Vec<ScopeFrame>) {
    match &decl.kind {
        NodeKind::VariableDeclaration { declarations, .. } => {
            for d in declarations {
                if let NodeKind::VariableDeclarator { id, .. } = &d.kind {
                    walk_pattern(id.as_ref(), &mut |_| {}, &mut |name| mark_use(stack, name));
                }
            }
        }
        NodeKind::FunctionDeclaration { id: Some(idn), .. } => {
            if let NodeKind::Identifier { name } = &idn.kind {
                mark_use(stack, name);
            }
        }
        _ => {}
    }
}

fn collect_expr(node: &mut Node, stack: &mut Vec<ScopeFrame>, aggressive: bool, removed: &mut usize) {
    match &mut node.kind {
        NodeKind::Identifier { name } => mark_use(stack, name),
        NodeKind::FunctionExpression { params, body, .. } => {
            run_function_scope(params.as_slice(), body.as_mut(), stack, aggressive, removed);
        }
        NodeKind::ArrowFunctionExpression { params, body, expression } => {
            stack.push(ScopeFrame::default());
            bind_params(params.as_slice(), stack);
            if *expression {
                collect_expr(body.as_mut(), stack, aggressive, removed);
                let _ = pop_and_process(stack);
            } else if let NodeKind::BlockStatement { body: stmts } = &mut body.kind {
                for s in stmts.iter_mut() {
                    collect_stmt(s, stack, aggressive, removed);
                }
                let removal = pop_and_process(stack);
                let mut cleanup = JsdceCleanup { removal: &removal, aggressive, removed: 0 };
                for s in stmts.iter_mut() {
                    cleanup.visit(s);
                }
                *removed += cleanup.removed;
            } else {
                stack.pop();
            }
        }
        NodeKind::MemberExpression { object, property, computed } => {
            collect_expr(object.as_mut(), stack, aggressive, removed);
            if *computed {
                collect_expr(property.as_mut(), stack, aggressive, removed);
            }
        }
        NodeKind::ObjectExpression { properties } => {
            for p in properties.iter_mut() {
                match &mut p.kind {
                    NodeKind::Property { key, value, computed, .. } => {
                        if *computed {
                            collect_expr(key.as_mut(), stack, aggressive, removed);
                        }
                        collect_expr(value.as_mut(), stack, aggressive, removed);
                    }
                    NodeKind::SpreadElement { argument } => {
                        collect_expr(argument.as_mut(), stack, aggressive, removed)
                    }
                    _ => {}
                }
            }
        }
        NodeKind::ArrayExpression { elements } => {
            for el in elements.iter_mut().filter_map(|e| e.as_mut()) {
                collect_expr(el, stack, aggressive, removed);
            }
        }
        NodeKind::AssignmentExpression { left, right, .. } => {
            collect_expr(left.as_mut(), stack, aggressive, removed);
            collect_expr(right.as_mut(), stack, aggressive, removed);
        }
        NodeKind::BinaryExpression { left, right, .. } | NodeKind::LogicalExpression { left, right, .. } => {
            collect_expr(left.as_mut(), stack, aggressive, removed);
            collect_expr(right.as_mut(), stack, aggressive, removed);
        }
        NodeKind::ConditionalExpression { test, consequent, alternate } => {
            collect_expr(test.as_mut(), stack, aggressive, removed);
            collect_expr(consequent.as_mut(), stack, aggressive, removed);
            collect_expr(alternate.as_mut(), stack, aggressive, removed);
        }
        NodeKind::UnaryExpression { argument, .. } | NodeKind::UpdateExpression { argument, .. } => {
            collect_expr(argument.as_mut(), stack, aggressive, removed);
        }
        NodeKind::SequenceExpression { expressions } => {
            for e in expressions.iter_mut() {
                collect_expr(e, stack, aggressive, removed);
            }
        }
        NodeKind::CallExpression { callee, arguments } | NodeKind::NewExpression { callee, arguments } => {
            collect_expr(callee.as_mut(), stack, aggressive, removed);
            for a in arguments.iter_mut() {
                collect_expr(a, stack, aggressive, removed);
            }
        }
        NodeKind::SpreadElement { argument } => collect_expr(argument.as_mut(), stack, aggressive, removed),
        NodeKind::TemplateLiteral { expressions, .. } => {
            for e in expressions.iter_mut() {
                collect_expr(e, stack, aggressive, removed);
            }
        }
        _ => {}
    }
}

struct JsdceCleanup<'a> {
    removal: &'a HashSet<String>,
    aggressive: bool,
    removed: usize,
}

impl RecursiveRewrite for JsdceCleanup<'_> {
    fn visit(&mut self, node: &mut Node) {
        match &mut node.kind {
            NodeKind::VariableDeclaration { declarations, .. } => {
                let removal = self.removal;
                let mut erased = 0usize;
                declarations.retain(|d| {
                    let any_kept_name = {
                        let mut kept = false;
                        if let NodeKind::VariableDeclarator { id, .. } = &d.kind {
                            walk_pattern(id.as_ref(), &mut |_| {}, &mut |name| {
                                if !removal.contains(name) {
                                    kept = true;
                                }
                            });
                        }
                        kept
                    };
                    let keep = has_side_effects(d) || any_kept_name;
                    if !keep {
                        erased += 1;
                    }
                    keep
                });
                self.removed += erased;
                if declarations.is_empty() {
                    empty_out(node);
                }
            }
            NodeKind::FunctionDeclaration { id, .. } => {
                let erase = id
                    .as_ref()
                    .and_then(|idn| match &idn.kind {
                        NodeKind::Identifier { name } => Some(self.removal.contains(name)),
                        _ => None,
                    })
                    .unwrap_or(false);
                if erase {
                    empty_out(node);
                    self.removed += 1;
                }
                // Otherwise: do not descend, its body was already cleaned
                // when its own frame popped.
            }
            NodeKind::FunctionExpression { .. } | NodeKind::ArrowFunctionExpression { .. } => {
                // Already cleaned in its own frame; never descended into here.
            }
            NodeKind::ForStatement { init, test, update, body } => {
                if let Some(i) = init.as_deref_mut() {
                    self.visit(i);
                }
                if init.as_deref().is_some_and(Node::is_empty_statement) {
                    *init = None;
                }
                if let Some(t) = test.as_deref_mut() {
                    self.visit(t);
                }
                if let Some(u) = update.as_deref_mut() {
                    self.visit(u);
                }
                self.visit(body.as_mut());
            }
            NodeKind::ForInStatement { right, body, .. } | NodeKind::ForOfStatement { right, body, .. } => {
                self.visit(right.as_mut());
                self.visit(body.as_mut());
            }
            NodeKind::ExpressionStatement { expression, .. } => {
                self.visit(expression.as_mut());
                if self.aggressive && !has_side_effects(expression.as_ref()) {
                    empty_out(node);
                    self.removed += 1;
                }
            }
            _ => descend_default(self, node),
        }
    }
}

/// One JSDCE iteration. Returns the number of nodes erased.
pub fn jsdce(ast: &mut Node, aggressive: bool) -> usize {
    let NodeKind::Program { body } = &mut ast.kind else {
        return 0;
    };
    let mut stack = vec![ScopeFrame::default()];
    let mut removed = 0usize;
    for s in body.iter_mut() {
        collect_stmt(s, &mut stack, aggressive, &mut removed);
    }
    let removal = pop_and_process(&mut stack);
    let mut cleanup = JsdceCleanup { removal: &removal, aggressive, removed: 0 };
    for s in body.iter_mut() {
        cleanup.visit(s);
    }
    removed + cleanup.removed
}

/// Fixed-point aggressive DCE: repeats `jsdce(ast, true)` until an iteration
/// removes nothing.
pub fn ajsdce(ast: &mut Node) -> usize {
    let mut total = 0;
    loop {
        let n = jsdce(ast, true);
        total += n;
        if n == 0 {
            break;
        }
    }
    total
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
    fn scenario_a_basic_jsdce() {
        let out = roundtrip("function f(){} var x=1; var y=2; use(y);", |ast| {
            jsdce(ast, false);
        });
        assert!(!out.contains("function f"));
        assert!(!out.contains("x=1"));
        assert!(out.contains("y=2"));
        assert!(out.contains("use(y)"));
    }

    #[test]
    fn scenario_b_side_effects_preserved() {
        let out = roundtrip("var x = sideEffect();", |ast| {
            jsdce(ast, false);
        });
        assert!(out.contains("sideEffect()"));

        let out2 = roundtrip("var x = sideEffect();", |ast| {
            ajsdce(ast);
        });
        assert!(out2.contains("sideEffect()"));
    }

    #[test]
    fn ajsdce_reaches_fixed_point() {
        let (mut ast, _) = parse_program("var x=1; var y = x; function f(){ var z = 1; }", false).unwrap();
        ajsdce(&mut ast);
        let second_pass_removed = jsdce(&mut ast, true);
        assert_eq!(second_pass_removed, 0);
    }
}
