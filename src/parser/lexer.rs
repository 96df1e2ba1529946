//! Hand-written lexer. Tracks byte-accurate line/column so parse errors can
//! point back at the offending source line (spec §7).

use crate::errors::{GlueError, GlueResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Quasi {
        raw: String,
        cooked: String,
        tail: bool,
    },
    /// Raw JS source of one `${...}` interpolation, re-lexed/parsed on demand
    /// by the parser rather than here.
    Expr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    Ident(String),
    Num(f64, String),
    Str(String, String),
    Template(Vec<TemplatePart>),
    Regex { pattern: String, flags: String, raw: String },
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokKind,
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub line: u32,
    pub text: String,
    pub block: bool,
}

// Longest-match first.
const PUNCTS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=",
    "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "++", "--", "**", "<<", ">>",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
    "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*", "/", "%",
    "&", "|", "^", "!", "~", "?", ":", "=", ".",
];

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    /// Whether the previous significant token can end an expression — used
    /// to disambiguate `/` (division) from the start of a regex literal.
    prev_ends_expr: bool,
    pub comments: Vec<Comment>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            prev_ends_expr: false,
            comments: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    let line = self.line;
                    let mut text = String::new();
                    self.bump();
                    self.bump();
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        text.push(c);
                        self.bump();
                    }
                    self.comments.push(Comment { line, text, block: false });
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let line = self.line;
                    let mut text = String::new();
                    self.bump();
                    self.bump();
                    while let Some(c) = self.peek() {
                        if c == '*' && self.peek_at(1) == Some('/') {
                            self.bump();
                            self.bump();
                            break;
                        }
                        text.push(c);
                        self.bump();
                    }
                    self.comments.push(Comment { line, text, block: true });
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> GlueResult<Token> {
        self.skip_trivia();
        let line = self.line;
        let col = self.col;

        let Some(c) = self.peek() else {
            return Ok(Token { kind: TokKind::Eof, line, col });
        };

        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            self.prev_ends_expr = true;
            return Ok(Token { kind: self.lex_number(), line, col });
        }

        if c == '"' || c == '\'' {
            self.prev_ends_expr = true;
            return Ok(Token { kind: self.lex_string(c)?, line, col });
        }

        if c == '`' {
            self.prev_ends_expr = true;
            return Ok(Token { kind: self.lex_template()?, line, col });
        }

        if c == '/' && !self.prev_ends_expr {
            self.prev_ends_expr = true;
            return Ok(Token { kind: self.lex_regex()?, line, col });
        }

        if is_ident_start(c) {
            let mut s = String::new();
            while let Some(c) = self.peek() {
                if is_ident_continue(c) {
                    s.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            // `return`, `typeof`, etc. don't end an expression; most
            // identifiers do (they can be the operand of `/`).
            self.prev_ends_expr = !matches!(
                s.as_str(),
                "return" | "typeof" | "instanceof" | "in" | "of" | "new" | "delete" | "void"
                    | "throw" | "case" | "do" | "else" | "yield"
            );
            return Ok(Token { kind: TokKind::Ident(s), line, col });
        }

        for p in PUNCTS {
            if self.matches_lit(p) {
                for _ in 0..p.chars().count() {
                    self.bump();
                }
                self.prev_ends_expr = matches!(*p, ")" | "]");
                return Ok(Token { kind: TokKind::Punct(p), line, col });
            }
        }

        Err(GlueError::parse(line, col, format!("unexpected character '{c}'"), &self.source_text()))
    }

    fn source_text(&self) -> String {
        self.chars.iter().collect()
    }

    fn matches_lit(&self, lit: &str) -> bool {
        lit.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn lex_number(&mut self) -> TokKind {
        let mut raw = String::new();
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            raw.push(self.bump().unwrap());
            raw.push(self.bump().unwrap());
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    raw.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            let value = i64::from_str_radix(&raw[2..], 16).unwrap_or(0) as f64;
            return TokKind::Num(value, raw);
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                raw.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') {
            raw.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    raw.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            raw.push(self.bump().unwrap());
            if matches!(self.peek(), Some('+') | Some('-')) {
                raw.push(self.bump().unwrap());
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    raw.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        let value: f64 = raw.parse().unwrap_or(0.0);
        TokKind::Num(value, raw)
    }

    fn lex_string(&mut self, quote: char) -> GlueResult<TokKind> {
        let start_line = self.line;
        let start_col = self.col;
        let mut raw = String::new();
        let mut cooked = String::new();
        raw.push(quote);
        self.bump();
        loop {
            match self.peek() {
                None => {
                    return Err(GlueError::parse(
                        start_line,
                        start_col,
                        "unterminated string literal",
                        &self.source_text(),
                    ));
                }
                Some(c) if c == quote => {
                    raw.push(c);
                    self.bump();
                    break;
                }
                Some('\\') => {
                    raw.push('\\');
                    self.bump();
                    if let Some(esc) = self.peek() {
                        raw.push(esc);
                        cooked.push(unescape_char(esc));
                        self.bump();
                    }
                }
                Some(c) => {
                    raw.push(c);
                    cooked.push(c);
                    self.bump();
                }
            }
        }
        Ok(TokKind::Str(cooked, raw))
    }

    fn lex_template(&mut self) -> GlueResult<TokKind> {
        let start_line = self.line;
        let start_col = self.col;
        self.bump(); // opening backtick
        let mut parts = Vec::new();
        let mut raw = String::new();
        let mut cooked = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(GlueError::parse(
                        start_line,
                        start_col,
                        "unterminated template literal",
                        &self.source_text(),
                    ));
                }
                Some('`') => {
                    self.bump();
                    parts.push(TemplatePart::Quasi { raw: raw.clone(), cooked: cooked.clone(), tail: true });
                    break;
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    parts.push(TemplatePart::Quasi { raw: raw.clone(), cooked: cooked.clone(), tail: false });
                    raw.clear();
                    cooked.clear();
                    self.bump();
                    self.bump();
                    let mut depth = 1usize;
                    let mut expr_src = String::new();
                    loop {
                        match self.peek() {
                            None => {
                                return Err(GlueError::parse(
                                    start_line,
                                    start_col,
                                    "unterminated template interpolation",
                                    &self.source_text(),
                                ));
                            }
                            Some('{') => {
                                depth += 1;
                                expr_src.push('{');
                                self.bump();
                            }
                            Some('}') => {
                                depth -= 1;
                                if depth == 0 {
                                    self.bump();
                                    break;
                                }
                                expr_src.push('}');
                                self.bump();
                            }
                            Some(c) => {
                                expr_src.push(c);
                                self.bump();
                            }
                        }
                    }
                    parts.push(TemplatePart::Expr(expr_src));
                }
                Some('\\') => {
                    raw.push('\\');
                    self.bump();
                    if let Some(esc) = self.peek() {
                        raw.push(esc);
                        cooked.push(unescape_char(esc));
                        self.bump();
                    }
                }
                Some(c) => {
                    raw.push(c);
                    cooked.push(c);
                    self.bump();
                }
            }
        }
        Ok(TokKind::Template(parts))
    }

    fn lex_regex(&mut self) -> GlueResult<TokKind> {
        let start_line = self.line;
        let start_col = self.col;
        let mut raw = String::new();
        raw.push('/');
        self.bump();
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.peek() {
                None => {
                    return Err(GlueError::parse(
                        start_line,
                        start_col,
                        "unterminated regex literal",
                        &self.source_text(),
                    ));
                }
                Some('\\') => {
                    raw.push('\\');
                    pattern.push('\\');
                    self.bump();
                    if let Some(c) = self.peek() {
                        raw.push(c);
                        pattern.push(c);
                        self.bump();
                    }
                }
                Some('[') => {
                    in_class = true;
                    raw.push('[');
                    pattern.push('[');
                    self.bump();
                }
                Some(']') => {
                    in_class = false;
                    raw.push(']');
                    pattern.push(']');
                    self.bump();
                }
                Some('/') if !in_class => {
                    raw.push('/');
                    self.bump();
                    break;
                }
                Some(c) => {
                    raw.push(c);
                    pattern.push(c);
                    self.bump();
                }
            }
        }
        let mut flags = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphabetic() {
                flags.push(c);
                raw.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(TokKind::Regex { pattern, flags, raw })
    }
}

fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
