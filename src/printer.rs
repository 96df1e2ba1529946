//! Re-emits a `Node` tree as JavaScript text: either 2-space-indented or
//! whitespace-minified, always trailed by a newline and the optional
//! `// EXTRA_INFO:` suffix.

use crate::ast::{LiteralValue, Node, NodeKind};
use crate::parser::lexer::Comment;

pub struct Printer<'c> {
    minify: bool,
    indent: usize,
    buf: String,
    comments: &'c [Comment],
    emitted_comment_lines: std::collections::HashSet<u32>,
}

pub fn print_program(program: &Node, minify_whitespace: bool, comments: &[Comment]) -> String {
    let mut p = Printer {
        minify: minify_whitespace,
        indent: 0,
        buf: String::new(),
        comments,
        emitted_comment_lines: std::collections::HashSet::new(),
    };
    let NodeKind::Program { body } = &program.kind else {
        panic!("print_program called on a non-Program node");
    };
    for stmt in body {
        p.print_statement(stmt);
    }
    p.buf
}

impl<'c> Printer<'c> {
    fn nl(&mut self) {
        if !self.minify {
            self.buf.push('\n');
        }
    }

    fn write_indent(&mut self) {
        if !self.minify {
            for _ in 0..self.indent {
                self.buf.push_str("  ");
            }
        }
    }

    fn space(&mut self) {
        if !self.minify {
            self.buf.push(' ');
        }
    }

    /// Emit, as leading line comments, any collected comment whose source
    /// line falls on or just before this statement's recorded start line.
    /// Comments anchored to an erased node (no statement ever claims their
    /// line) are silently dropped — best-effort, as the contract allows.
    fn emit_leading_comments(&mut self, node: &Node) {
        let Some(loc) = node.loc else { return };
        for c in self.comments {
            if c.line <= loc.line && !self.emitted_comment_lines.contains(&c.line) {
                self.emitted_comment_lines.insert(c.line);
                self.write_indent();
                if c.block {
                    self.buf.push_str("/*");
                    self.buf.push_str(&c.text);
                    self.buf.push_str("*/");
                } else {
                    self.buf.push_str("//");
                    self.buf.push_str(&c.text);
                }
                self.nl();
            }
        }
    }

    fn print_statement(&mut self, node: &Node) {
        if !matches!(node.kind, NodeKind::EmptyStatement) {
            self.emit_leading_comments(node);
        }
        self.write_indent();
        match &node.kind {
            NodeKind::VariableDeclaration { kind, declarations } => {
                self.buf.push_str(kind.as_str());
                self.buf.push(' ');
                for (i, d) in declarations.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    self.print_declarator(d);
                }
                self.buf.push(';');
                self.nl();
            }
            NodeKind::FunctionDeclaration { id, params, body } => {
                self.print_function(id.as_deref(), params, body, "function");
                self.nl();
            }
            NodeKind::BlockStatement { .. } => {
                self.print_block(node);
                self.nl();
            }
            NodeKind::ExpressionStatement { expression, .. } => {
                let wrap = matches!(
                    &expression.kind,
                    NodeKind::ObjectExpression { .. } | NodeKind::FunctionExpression { .. }
                );
                if wrap {
                    self.buf.push('(');
                }
                self.print_expr(expression, 0);
                if wrap {
                    self.buf.push(')');
                }
                self.buf.push(';');
                self.nl();
            }
            NodeKind::EmptyStatement => {
                self.buf.push(';');
                self.nl();
            }
            NodeKind::ReturnStatement { argument } => {
                self.buf.push_str("return");
                if let Some(a) = argument {
                    self.buf.push(' ');
                    self.print_expr(a, 0);
                }
                self.buf.push(';');
                self.nl();
            }
            NodeKind::IfStatement { test, consequent, alternate } => {
                self.buf.push_str("if");
                self.space();
                self.buf.push('(');
                self.print_expr(test, 0);
                self.buf.push(')');
                self.space();
                self.print_as_block_body(consequent);
                if let Some(alt) = alternate {
                    if !self.minify {
                        self.buf.push(' ');
                    }
                    self.buf.push_str("else ");
                    self.print_as_block_body(alt);
                }
                self.nl();
            }
            NodeKind::ForStatement { init, test, update, body } => {
                self.buf.push_str("for(");
                if let Some(i) = init {
                    self.print_for_head_part(i);
                }
                self.buf.push(';');
                if let Some(t) = test {
                    self.print_expr(t, 0);
                }
                self.buf.push(';');
                if let Some(u) = update {
                    self.print_expr(u, 0);
                }
                self.buf.push(')');
                self.space();
                self.print_as_block_body(body);
                self.nl();
            }
            NodeKind::ForInStatement { left, right, body } => {
                self.buf.push_str("for(");
                self.print_for_head_part(left);
                self.buf.push_str(" in ");
                self.print_expr(right, 0);
                self.buf.push(')');
                self.space();
                self.print_as_block_body(body);
                self.nl();
            }
            NodeKind::ForOfStatement { left, right, body } => {
                self.buf.push_str("for(");
                self.print_for_head_part(left);
                self.buf.push_str(" of ");
                self.print_expr(right, 0);
                self.buf.push(')');
                self.space();
                self.print_as_block_body(body);
                self.nl();
            }
            NodeKind::WhileStatement { test, body } => {
                self.buf.push_str("while(");
                self.print_expr(test, 0);
                self.buf.push(')');
                self.space();
                self.print_as_block_body(body);
                self.nl();
            }
            NodeKind::DoWhileStatement { body, test } => {
                self.buf.push_str("do ");
                self.print_as_block_body(body);
                self.buf.push_str(" while(");
                self.print_expr(test, 0);
                self.buf.push_str(");");
                self.nl();
            }
            NodeKind::BreakStatement { label } => {
                self.buf.push_str("break");
                if let Some(l) = label {
                    self.buf.push(' ');
                    self.print_expr(l, 0);
                }
                self.buf.push(';');
                self.nl();
            }
            NodeKind::ContinueStatement { label } => {
                self.buf.push_str("continue");
                if let Some(l) = label {
                    self.buf.push(' ');
                    self.print_expr(l, 0);
                }
                self.buf.push(';');
                self.nl();
            }
            NodeKind::LabeledStatement { label, body } => {
                self.print_expr(label, 0);
                self.buf.push(':');
                self.space();
                self.print_statement_inline(body);
            }
            NodeKind::ThrowStatement { argument } => {
                self.buf.push_str("throw ");
                self.print_expr(argument, 0);
                self.buf.push(';');
                self.nl();
            }
            NodeKind::TryStatement { block, handler, finalizer } => {
                self.buf.push_str("try ");
                self.print_block(block);
                if let Some(h) = handler {
                    let NodeKind::CatchClause { param, body } = &h.kind else { unreachable!() };
                    self.buf.push_str(" catch");
                    if let Some(p) = param {
                        self.buf.push('(');
                        self.print_expr(p, 0);
                        self.buf.push(')');
                    }
                    self.buf.push(' ');
                    self.print_block(body);
                }
                if let Some(f) = finalizer {
                    self.buf.push_str(" finally ");
                    self.print_block(f);
                }
                self.nl();
            }
            NodeKind::SwitchStatement { discriminant, cases } => {
                self.buf.push_str("switch(");
                self.print_expr(discriminant, 0);
                self.buf.push(')');
                self.space();
                self.buf.push('{');
                self.nl();
                self.indent += 1;
                for case in cases {
                    let NodeKind::SwitchCase { test, consequent } = &case.kind else { unreachable!() };
                    self.write_indent();
                    if let Some(t) = test {
                        self.buf.push_str("case ");
                        self.print_expr(t, 0);
                    } else {
                        self.buf.push_str("default");
                    }
                    self.buf.push(':');
                    self.nl();
                    self.indent += 1;
                    for s in consequent {
                        self.print_statement(s);
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.write_indent();
                self.buf.push('}');
                self.nl();
            }
            NodeKind::ExportNamedDeclaration { declaration, specifiers } => {
                self.buf.push_str("export ");
                if let Some(d) = declaration {
                    self.print_statement_inline(d);
                } else {
                    self.buf.push('{');
                    self.space();
                    for (i, s) in specifiers.iter().enumerate() {
                        if i > 0 {
                            self.buf.push(',');
                            self.space();
                        }
                        let NodeKind::ExportSpecifier { local, exported } = &s.kind else { unreachable!() };
                        self.print_expr(local, 0);
                        if local.kind != exported.kind {
                            self.buf.push_str(" as ");
                            self.print_expr(exported, 0);
                        }
                    }
                    self.space();
                    self.buf.push_str("};");
                    self.nl();
                }
            }
            NodeKind::ExportDefaultDeclaration { declaration } => {
                self.buf.push_str("export default ");
                self.print_statement_inline(declaration);
            }
            NodeKind::ImportDeclaration { specifiers, source } => {
                self.buf.push_str("import ");
                for (i, s) in specifiers.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    self.print_expr(s, 0);
                }
                self.buf.push_str(" from ");
                self.print_expr(source, 0);
                self.buf.push(';');
                self.nl();
            }
            _ => {
                // Expression node erroneously reaching statement position
                // (e.g. leftover from a rewrite); emit it bare.
                self.print_expr(node, 0);
                self.buf.push(';');
                self.nl();
            }
        }
    }

    /// For statements that print their own trailing semicolon/newline already
    /// (declarations, blocks) but are reached from a position
    /// (`export ...`, labels) that doesn't want the leading indent repeated.
    fn print_statement_inline(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::FunctionDeclaration { id, params, body } => {
                self.print_function(id.as_deref(), params, body, "function");
                self.nl();
            }
            NodeKind::BlockStatement { .. } => {
                self.print_block(node);
                self.nl();
            }
            _ => {
                let saved = self.indent;
                self.indent = 0;
                self.print_statement(node);
                self.indent = saved;
            }
        }
    }

    fn print_for_head_part(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::VariableDeclaration { kind, declarations } => {
                self.buf.push_str(kind.as_str());
                self.buf.push(' ');
                for (i, d) in declarations.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    self.print_declarator(d);
                }
            }
            _ => self.print_expr(node, 0),
        }
    }

    fn print_as_block_body(&mut self, node: &Node) {
        if matches!(node.kind, NodeKind::BlockStatement { .. }) {
            self.print_block(node);
        } else if matches!(node.kind, NodeKind::EmptyStatement) {
            self.buf.push(';');
        } else {
            self.buf.push('{');
            self.nl();
            self.indent += 1;
            self.print_statement(node);
            self.indent -= 1;
            self.write_indent();
            self.buf.push('}');
        }
    }

    fn print_block(&mut self, node: &Node) {
        let NodeKind::BlockStatement { body } = &node.kind else { unreachable!() };
        self.buf.push('{');
        self.nl();
        self.indent += 1;
        for s in body {
            self.print_statement(s);
        }
        self.indent -= 1;
        self.write_indent();
        self.buf.push('}');
    }

    fn print_declarator(&mut self, node: &Node) {
        let NodeKind::VariableDeclarator { id, init } = &node.kind else { unreachable!() };
        self.print_expr(id, 0);
        if let Some(i) = init {
            self.buf.push('=');
            self.print_expr(i, 0);
        }
    }

    fn print_function(&mut self, id: Option<&Node>, params: &[Node], body: &Node, keyword: &str) {
        self.buf.push_str(keyword);
        if let Some(id) = id {
            self.buf.push(' ');
            self.print_expr(id, 0);
        } else {
            self.space();
        }
        self.buf.push('(');
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
                self.space();
            }
            self.print_expr(p, 0);
        }
        self.buf.push(')');
        self.space();
        self.print_block(body);
    }

    /// `prec` is the binding power of the enclosing context; an operand
    /// whose own precedence is lower gets parenthesized. Conservative:
    /// ties around non-associative constructs are always parenthesized.
    fn print_expr(&mut self, node: &Node, prec: u8) {
        let my_prec = expr_precedence(&node.kind);
        let needs_parens = my_prec < prec;
        if needs_parens {
            self.buf.push('(');
        }
        self.print_expr_inner(node, my_prec);
        if needs_parens {
            self.buf.push(')');
        }
    }

    fn print_expr_inner(&mut self, node: &Node, my_prec: u8) {
        match &node.kind {
            NodeKind::Identifier { name } => self.buf.push_str(name),
            NodeKind::ThisExpression => self.buf.push_str("this"),
            NodeKind::Super => self.buf.push_str("super"),
            NodeKind::Literal { value, raw } => self.print_literal(value, raw.as_deref()),
            NodeKind::TemplateLiteral { quasis, expressions } => {
                self.buf.push('`');
                for (i, q) in quasis.iter().enumerate() {
                    let NodeKind::TemplateElement { raw, .. } = &q.kind else { unreachable!() };
                    self.buf.push_str(raw);
                    if let Some(e) = expressions.get(i) {
                        self.buf.push_str("${");
                        self.print_expr(e, 0);
                        self.buf.push('}');
                    }
                }
                self.buf.push('`');
            }
            NodeKind::ArrayExpression { elements } => {
                self.buf.push('[');
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    if let Some(e) = el {
                        self.print_expr(e, 2);
                    }
                }
                self.buf.push(']');
            }
            NodeKind::ArrayPattern { elements } => {
                self.buf.push('[');
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    if let Some(e) = el {
                        self.print_expr(e, 2);
                    }
                }
                self.buf.push(']');
            }
            NodeKind::ObjectExpression { properties } => {
                self.buf.push('{');
                self.space();
                for (i, p) in properties.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    self.print_property(p);
                }
                self.space();
                self.buf.push('}');
            }
            NodeKind::ObjectPattern { properties } => {
                self.buf.push('{');
                self.space();
                for (i, p) in properties.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    match &p.kind {
                        NodeKind::RestElement { .. } => self.print_expr(p, 0),
                        _ => self.print_property(p),
                    }
                }
                self.space();
                self.buf.push('}');
            }
            NodeKind::Property { key, value, computed, shorthand, kind } => {
                let _ = kind;
                if *shorthand {
                    self.print_expr(value, 0);
                } else {
                    if *computed {
                        self.buf.push('[');
                        self.print_expr(key, 0);
                        self.buf.push(']');
                    } else {
                        self.print_expr(key, 0);
                    }
                    self.buf.push(':');
                    self.space();
                    self.print_expr(value, 2);
                }
            }
            NodeKind::SpreadElement { argument } | NodeKind::RestElement { argument } => {
                self.buf.push_str("...");
                self.print_expr(argument, 2);
            }
            NodeKind::AssignmentPattern { left, right } => {
                self.print_expr(left, 0);
                self.buf.push('=');
                self.print_expr(right, 2);
            }
            NodeKind::FunctionExpression { id, params, body } => {
                self.print_function(id.as_deref(), params, body, "function");
            }
            NodeKind::ArrowFunctionExpression { params, body, expression } => {
                if params.len() == 1 && matches!(params[0].kind, NodeKind::Identifier { .. }) {
                    self.print_expr(&params[0], 0);
                } else {
                    self.buf.push('(');
                    for (i, p) in params.iter().enumerate() {
                        if i > 0 {
                            self.buf.push(',');
                            self.space();
                        }
                        self.print_expr(p, 0);
                    }
                    self.buf.push(')');
                }
                self.buf.push_str("=>");
                if *expression {
                    self.print_expr(body, 2);
                } else {
                    self.print_block(body);
                }
            }
            NodeKind::SequenceExpression { expressions } => {
                for (i, e) in expressions.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    self.print_expr(e, my_prec + 1);
                }
            }
            NodeKind::AssignmentExpression { operator, left, right } => {
                self.print_expr(left, my_prec + 1);
                self.buf.push_str(operator);
                self.print_expr(right, my_prec);
            }
            NodeKind::ConditionalExpression { test, consequent, alternate } => {
                self.print_expr(test, my_prec + 1);
                self.buf.push('?');
                self.print_expr(consequent, 2);
                self.buf.push(':');
                self.print_expr(alternate, my_prec);
            }
            NodeKind::LogicalExpression { operator, left, right } | NodeKind::BinaryExpression { operator, left, right } => {
                self.print_expr(left, my_prec);
                self.space();
                self.buf.push_str(operator);
                self.space();
                self.print_expr(right, my_prec + 1);
            }
            NodeKind::UnaryExpression { operator, argument, .. } => {
                self.buf.push_str(operator);
                if operator.chars().next().is_some_and(|c| c.is_alphabetic()) {
                    self.buf.push(' ');
                }
                self.print_expr(argument, my_prec);
            }
            NodeKind::UpdateExpression { operator, argument, prefix } => {
                if *prefix {
                    self.buf.push_str(operator);
                    self.print_expr(argument, my_prec);
                } else {
                    self.print_expr(argument, my_prec);
                    self.buf.push_str(operator);
                }
            }
            NodeKind::CallExpression { callee, arguments } => {
                self.print_expr(callee, my_prec);
                self.buf.push('(');
                for (i, a) in arguments.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    self.print_expr(a, 2);
                }
                self.buf.push(')');
            }
            NodeKind::NewExpression { callee, arguments } => {
                self.buf.push_str("new ");
                self.print_expr(callee, my_prec);
                self.buf.push('(');
                for (i, a) in arguments.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(',');
                        self.space();
                    }
                    self.print_expr(a, 2);
                }
                self.buf.push(')');
            }
            NodeKind::MemberExpression { object, property, computed } => {
                self.print_expr(object, my_prec);
                if *computed {
                    self.buf.push('[');
                    self.print_expr(property, 0);
                    self.buf.push(']');
                } else {
                    self.buf.push('.');
                    self.print_expr(property, 0);
                }
            }
            _ => {
                // Statement-shaped node encountered in expression position
                // (shouldn't happen for a well-formed tree); best effort.
                self.print_statement(node);
            }
        }
    }

    fn print_property(&mut self, node: &Node) {
        self.print_expr(node, 0);
    }

    fn print_literal(&mut self, value: &LiteralValue, raw: Option<&str>) {
        match value {
            LiteralValue::Number(n) => {
                if let Some(r) = raw {
                    self.buf.push_str(r);
                } else {
                    self.buf.push_str(&format_number(*n));
                }
            }
            LiteralValue::String(s) => {
                if let Some(r) = raw {
                    self.buf.push_str(r);
                } else {
                    self.buf.push('"');
                    self.buf.push_str(&s.replace('\\', "\\\\").replace('"', "\\\""));
                    self.buf.push('"');
                }
            }
            LiteralValue::Bool(b) => self.buf.push_str(if *b { "true" } else { "false" }),
            LiteralValue::Null => self.buf.push_str("null"),
            LiteralValue::Regex { pattern, flags } => {
                self.buf.push('/');
                self.buf.push_str(pattern);
                self.buf.push('/');
                self.buf.push_str(flags);
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// A coarse precedence ladder, high binds tighter. Only used to decide
/// where to insert parens; not a full operator-precedence table.
fn expr_precedence(kind: &NodeKind) -> u8 {
    match kind {
        NodeKind::SequenceExpression { .. } => 1,
        NodeKind::AssignmentExpression { .. } | NodeKind::ArrowFunctionExpression { .. } => 2,
        NodeKind::ConditionalExpression { .. } => 3,
        NodeKind::LogicalExpression { operator, .. } if operator == "||" || operator == "??" => 4,
        NodeKind::LogicalExpression { .. } => 5,
        NodeKind::BinaryExpression { operator, .. } => match operator.as_str() {
            "|" => 6,
            "^" => 7,
            "&" => 8,
            "==" | "!=" | "===" | "!==" => 9,
            "<" | ">" | "<=" | ">=" | "instanceof" | "in" => 10,
            "<<" | ">>" | ">>>" => 11,
            "+" | "-" => 12,
            "*" | "/" | "%" => 13,
            "**" => 14,
            _ => 10,
        },
        NodeKind::UnaryExpression { .. } | NodeKind::UpdateExpression { prefix: true, .. } => 15,
        NodeKind::UpdateExpression { prefix: false, .. } => 16,
        NodeKind::NewExpression { .. } | NodeKind::CallExpression { .. } | NodeKind::MemberExpression { .. } => 18,
        _ => 20,
    }
}
