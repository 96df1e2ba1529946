//! minifyGlobals / minifyLocals: shorten every declared name
//! to the shortest available identifier, skipping JS reserved words and
//! anything the structure marks as not renameable (non-computed member
//! properties, function parameters that must line up with a caller).

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::ast::walk::{children_mut, descend_default, recursive_walk, RecursiveRewrite};
use crate::ast::{Node, NodeKind};
use crate::errors::{GlueError, GlueResult};

const INITS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$";
const LATERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$0123456789";

static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "do", "if", "in", "for", "new", "try", "var", "env", "let", "case", "else", "enum",
        "void", "this", "with",
    ]
    .into_iter()
    .collect()
});

fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(name)
}

/// A mixed-radix odometer over `INITS` (first digit) x `LATERS` (later
/// digits), append-only and skipping names that land on a reserved word.
pub struct NameGenerator {
    produced: Vec<String>,
    digits: Vec<usize>,
}

impl Default for NameGenerator {
    fn default() -> Self {
        NameGenerator {
            produced: Vec::new(),
            digits: vec![0],
        }
    }
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn assemble(digits: &[usize]) -> String {
        let mut s = String::with_capacity(digits.len());
        let mut chars = digits.iter();
        let first = *chars.next().unwrap();
        s.push(INITS.as_bytes()[first] as char);
        for &d in chars {
            s.push(LATERS.as_bytes()[d] as char);
        }
        s
    }

    fn advance(&mut self) {
        let mut i = self.digits.len() - 1;
        loop {
            let radix = if i == 0 { INITS.len() } else { LATERS.len() };
            self.digits[i] += 1;
            if self.digits[i] < radix {
                return;
            }
            self.digits[i] = 0;
            if i == 0 {
                self.digits.push(0);
                return;
            }
            i -= 1;
        }
    }

    /// Extends the produced list until it holds at least `n + 1` names,
    /// then returns the `n`-th one.
    pub fn ensure_minified_names(&mut self, n: usize) -> &str {
        while self.produced.len() <= n {
            let name = Self::assemble(&self.digits);
            self.advance();
            if is_reserved(&name) {
                continue;
            }
            self.produced.push(name);
        }
        &self.produced[n]
    }

    fn next_name(&mut self) -> String {
        let idx = self.produced.len();
        self.ensure_minified_names(idx).to_string()
    }
}

fn is_ident_named(node: &Node, name: &str) -> bool {
    matches!(&node.kind, NodeKind::Identifier { name: n } if n == name)
}

// --- shared declared-name collection ---------------------------------------

fn collect_pattern_names(node: &Node, out: &mut Vec<String>) {
    match &node.kind {
        NodeKind::Identifier { name } => out.push(name.clone()),
        NodeKind::AssignmentPattern { left, .. } => collect_pattern_names(left, out),
        NodeKind::ObjectPattern { properties } => {
            for p in properties {
                match &p.kind {
                    NodeKind::Property { value, .. } => collect_pattern_names(value, out),
                    NodeKind::RestElement { argument } => collect_pattern_names(argument, out),
                    _ => {}
                }
            }
        }
        NodeKind::ArrayPattern { elements } => {
            for slot in elements.iter().flatten() {
                collect_pattern_names(slot, out);
            }
        }
        NodeKind::RestElement { argument } => collect_pattern_names(argument, out),
        _ => {}
    }
}

fn collect_declared_names(node: &Node, out: &mut Vec<String>) {
    match &node.kind {
        NodeKind::FunctionDeclaration { id, params, body } => {
            if let Some(id) = id {
                collect_pattern_names(id, out);
            }
            for p in params {
                collect_pattern_names(p, out);
            }
            collect_declared_names(body, out);
        }
        NodeKind::FunctionExpression { params, body, .. } => {
            for p in params {
                collect_pattern_names(p, out);
            }
            collect_declared_names(body, out);
        }
        NodeKind::ArrowFunctionExpression { params, body, .. } => {
            for p in params {
                collect_pattern_names(p, out);
            }
            collect_declared_names(body, out);
        }
        NodeKind::VariableDeclarator { id, init } => {
            collect_pattern_names(id, out);
            if let Some(init) = init {
                collect_declared_names(init, out);
            }
        }
        _ => {
            for c in crate::ast::walk::children(node) {
                collect_declared_names(c, out);
            }
        }
    }
}

/// Non-computed member-expression property identifiers: `x.foo` must never
/// be renamed even if `foo` happens to match a declared local name.
fn collect_ignore_nodes(node: &Node, out: &mut HashSet<*const Node>) {
    if let NodeKind::MemberExpression {
        object,
        property,
        computed: false,
    } = &node.kind
    {
        out.insert(property.as_ref() as *const Node);
        collect_ignore_nodes(object, out);
        return;
    }
    if let NodeKind::Property {
        key,
        computed: false,
        shorthand: false,
        ..
    } = &node.kind
    {
        out.insert(key.as_ref() as *const Node);
    }
    for c in crate::ast::walk::children(node) {
        collect_ignore_nodes(c, out);
    }
}

struct RenameVisitor<'a> {
    mapping: &'a HashMap<String, String>,
    ignore: &'a HashSet<*const Node>,
}

impl RecursiveRewrite for RenameVisitor<'_> {
    fn visit(&mut self, node: &mut Node) {
        let ptr = node as *const Node;
        if let NodeKind::Identifier { name } = &mut node.kind {
            if !self.ignore.contains(&ptr) {
                if let Some(new_name) = self.mapping.get(name) {
                    *name = new_name.clone();
                }
            }
        }
        descend_default(self, node);
    }
}

/// Renames every function body and global variable declared at the top
/// level of the single `function instantiate(...) { ... }` wrapper this
/// pass assumes the whole program is. Mints new names in declaration order,
/// then for every pre-assigned `extraInfo.globals` entry, and finally
/// renames every free occurrence of a declared name (skipping member
/// property positions). Returns the `oldName -> newName` mapping and
/// restores the wrapper's own identifier, which is never renamed.
pub fn minify_globals(
    ast: &mut Node,
    extra_globals: &HashMap<String, String>,
    gen: &mut NameGenerator,
) -> HashMap<String, String> {
    let NodeKind::Program { body } = &mut ast.kind else {
        return HashMap::new();
    };
    let Some(wrapper) = body.iter_mut().find(|s| {
        matches!(&s.kind, NodeKind::FunctionDeclaration { id: Some(idn), .. }
            if is_ident_named(idn, "instantiate"))
    }) else {
        return HashMap::new();
    };
    let NodeKind::FunctionDeclaration { body: fn_body, .. } = &mut wrapper.kind else {
        return HashMap::new();
    };

    let mut declared = Vec::new();
    collect_declared_names(fn_body, &mut declared);
    let mut seen = HashSet::new();
    declared.retain(|n| seen.insert(n.clone()));

    let mut ignore = HashSet::new();
    collect_ignore_nodes(fn_body, &mut ignore);

    let mut mapping: HashMap<String, String> = HashMap::new();
    for name in &declared {
        if !mapping.contains_key(name) {
            mapping.insert(name.clone(), gen.next_name());
        }
    }
    for old in extra_globals.keys() {
        if !mapping.contains_key(old) {
            mapping.insert(old.clone(), gen.next_name());
        }
    }

    {
        let mut visitor = RenameVisitor {
            mapping: &mapping,
            ignore: &ignore,
        };
        recursive_walk(&mut visitor, fn_body);
    }

    mapping
}

// --- minifyLocals ------------------------------------------------------------

struct LabelScope {
    mapping: HashMap<String, String>,
    gen_counter: usize,
}

fn rename_labels(node: &mut Node, scope: &mut LabelScope) {
    match &mut node.kind {
        NodeKind::LabeledStatement { label, body } => {
            let NodeKind::Identifier { name } = &label.kind else {
                return;
            };
            let new_name = scope
                .mapping
                .entry(name.clone())
                .or_insert_with(|| {
                    let n = format!("L{}", scope.gen_counter);
                    scope.gen_counter += 1;
                    n
                })
                .clone();
            if let NodeKind::Identifier { name } = &mut label.kind {
                *name = new_name;
            }
            rename_labels(body, scope);
        }
        NodeKind::BreakStatement { label: Some(l) } | NodeKind::ContinueStatement { label: Some(l) } => {
            if let NodeKind::Identifier { name } = &mut l.kind {
                if let Some(new_name) = scope.mapping.get(name) {
                    *name = new_name.clone();
                }
            }
        }
        _ => {
            for c in children_mut(node) {
                rename_labels(c, scope);
            }
        }
    }
}

fn find_callee_names(node: &Node, out: &mut HashSet<String>) {
    if let NodeKind::CallExpression { callee, arguments } = &node.kind {
        if let NodeKind::Identifier { name } = &callee.kind {
            out.insert(name.clone());
        }
        find_callee_names(callee, out);
        for a in arguments {
            find_callee_names(a, out);
        }
        return;
    }
    for c in crate::ast::walk::children(node) {
        find_callee_names(c, out);
    }
}

struct LocalRenameVisitor<'a> {
    locals: &'a HashSet<String>,
    extra_globals: &'a HashMap<String, String>,
    mapping: &'a mut HashMap<String, String>,
    used: &'a mut HashSet<String>,
    gen: &'a mut NameGenerator,
}

impl LocalRenameVisitor<'_> {
    fn mint_for(&mut self) -> String {
        loop {
            let candidate = self.gen.next_name();
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

impl RecursiveRewrite for LocalRenameVisitor<'_> {
    fn visit(&mut self, node: &mut Node) {
        if let NodeKind::Identifier { name } = &node.kind {
            if self.locals.contains(name) {
                let new_name = match self.mapping.get(name) {
                    Some(n) => n.clone(),
                    None => {
                        let n = self.mint_for();
                        self.mapping.insert(name.clone(), n.clone());
                        n
                    }
                };
                if let NodeKind::Identifier { name } = &mut node.kind {
                    *name = new_name;
                }
                return;
            }
            // Not a local: a free reference to an already-minified global
            // still needs patching up to its minified form.
            if let Some(new_name) = self.extra_globals.get(name).cloned() {
                if let NodeKind::Identifier { name } = &mut node.kind {
                    *name = new_name;
                }
                return;
            }
        }
        descend_default(self, node);
    }
}

/// Renames parameters and locally-declared variables of each top-level
/// function declaration independently. Non-local identifiers matching an
/// `extraInfo.globals` entry are treated as pre-assigned and reserved so a
/// freshly minted local name never collides with one.
pub fn minify_locals(
    ast: &mut Node,
    extra_globals: &HashMap<String, String>,
    gen: &mut NameGenerator,
) -> GlueResult<()> {
    let NodeKind::Program { body } = &mut ast.kind else {
        return Ok(());
    };
    for stmt in body.iter_mut() {
        let NodeKind::FunctionDeclaration {
            id,
            params,
            body: fn_body,
        } = &mut stmt.kind
        else {
            continue;
        };

        let mut locals = HashSet::new();
        for p in params.iter() {
            let mut names = Vec::new();
            collect_pattern_names(p, &mut names);
            locals.extend(names);
        }
        collect_local_declarations(fn_body, &mut locals);

        let mut callee_names = HashSet::new();
        find_callee_names(fn_body, &mut callee_names);
        if let Some(offender) = locals.intersection(&callee_names).next() {
            return Err(GlueError::ShapeViolation(format!(
                "minifyLocals: local variable '{offender}' is also called as a function"
            )));
        }

        let mut used_names: HashSet<String> = extra_globals.values().cloned().collect();
        let mut mapping: HashMap<String, String> = HashMap::new();

        {
            let mut visitor = LocalRenameVisitor {
                locals: &locals,
                extra_globals,
                mapping: &mut mapping,
                used: &mut used_names,
                gen,
            };
            for p in params.iter_mut() {
                recursive_walk(&mut visitor, p);
            }
            recursive_walk(&mut visitor, fn_body);
        }

        let mut label_scope = LabelScope {
            mapping: HashMap::new(),
            gen_counter: 0,
        };
        rename_labels(fn_body, &mut label_scope);

        if let Some(id) = id {
            let renamed = match &id.kind {
                NodeKind::Identifier { name } => extra_globals.get(name).cloned(),
                _ => None,
            };
            if let Some(new_name) = renamed {
                if let NodeKind::Identifier { name } = &mut id.kind {
                    *name = new_name;
                }
            }
        }
    }
    Ok(())
}

fn collect_local_declarations(node: &Node, out: &mut HashSet<String>) {
    match &node.kind {
        NodeKind::FunctionDeclaration { .. } | NodeKind::FunctionExpression { .. } | NodeKind::ArrowFunctionExpression { .. } => {}
        NodeKind::VariableDeclarator { id, init } => {
            let mut names = Vec::new();
            collect_pattern_names(id, &mut names);
            out.extend(names);
            if let Some(init) = init {
                collect_local_declarations(init, out);
            }
        }
        _ => {
            for c in crate::ast::walk::children(node) {
                collect_local_declarations(c, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_g_first_names_skip_reserved() {
        let mut gen = NameGenerator::new();
        let names: Vec<String> = (0..4).map(|i| gen.ensure_minified_names(i).to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn reserved_words_never_produced() {
        let mut gen = NameGenerator::new();
        for i in 0..200 {
            let name = gen.ensure_minified_names(i).to_string();
            assert!(!is_reserved(&name), "produced reserved word {name}");
        }
    }

    #[test]
    fn produced_names_are_unique_and_start_with_inits_char() {
        let mut gen = NameGenerator::new();
        let mut seen = HashSet::new();
        for i in 0..300 {
            let name = gen.ensure_minified_names(i).to_string();
            assert!(seen.insert(name.clone()), "duplicate name {name}");
            let first = name.chars().next().unwrap();
            assert!(INITS.contains(first));
        }
    }

    #[test]
    fn minify_globals_renames_wrapper_body_and_keeps_member_props() {
        use crate::parser::parse_program;
        let src = "function instantiate(x) { var foo = 1; return x.foo + foo; }";
        let (mut ast, _) = parse_program(src, false).unwrap();
        let mut gen = NameGenerator::new();
        let mapping = minify_globals(&mut ast, &HashMap::new(), &mut gen);
        assert!(mapping.contains_key("foo"));
        assert!(mapping.contains_key("x"));
        let NodeKind::Program { body } = &ast.kind else { unreachable!() };
        let NodeKind::FunctionDeclaration { id, .. } = &body[0].kind else { unreachable!() };
        assert!(is_ident_named(id.as_ref().unwrap(), "instantiate"));
    }

    #[test]
    fn minify_locals_renames_params_and_locals_independently_per_function() {
        use crate::parser::parse_program;
        let src = "function f(a){ var b = a; return b; } function g(a){ var c = a; return c; }";
        let (mut ast, _) = parse_program(src, false).unwrap();
        let mut gen = NameGenerator::new();
        minify_locals(&mut ast, &HashMap::new(), &mut gen).unwrap();
        let NodeKind::Program { body } = &ast.kind else { unreachable!() };
        for stmt in body {
            let NodeKind::FunctionDeclaration { params, .. } = &stmt.kind else { unreachable!() };
            assert!(!is_ident_named(&params[0], "a"));
        }
    }
}
