use thiserror::Error;

pub type GlueResult<T, E = GlueError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum GlueError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("parse error at {line}:{col}: {message}\n{source_line}\n{caret}")]
    Parse {
        line: u32,
        col: u32,
        message: String,
        source_line: String,
        caret: String,
    },

    #[error("unknown pass: {0}")]
    UnknownPass(String),

    #[error("shape violation: {0}")]
    ShapeViolation(String),

    #[error("consistency assertion failed: {0}")]
    Consistency(String),

    #[error("{0}")]
    Msg(String),
}

impl GlueError {
    pub fn parse(line: u32, col: u32, message: impl Into<String>, source: &str) -> Self {
        let source_line = source.lines().nth((line.saturating_sub(1)) as usize)
            .unwrap_or("")
            .to_string();
        let caret = format!("{}^", " ".repeat(col.saturating_sub(1) as usize));
        GlueError::Parse {
            line,
            col,
            message: message.into(),
            source_line,
            caret,
        }
    }
}

impl From<&str> for GlueError {
    fn from(s: &str) -> Self {
        GlueError::Msg(s.to_owned())
    }
}

impl From<String> for GlueError {
    fn from(s: String) -> Self {
        GlueError::Msg(s)
    }
}

#[test]
fn io_conversion_retains_message() {
    let e = std::io::Error::other("boom!");
    let n: GlueError = e.into();
    assert!(matches!(n, GlueError::Io(_)));
    assert!(n.to_string().contains("boom"));
}

#[test]
fn parse_error_renders_caret_under_column() {
    let src = "var x = ;\nvar y = 1;";
    let e = GlueError::parse(1, 9, "unexpected token", src);
    let rendered = e.to_string();
    assert!(rendered.contains("var x = ;"));
    assert!(rendered.contains("unexpected token"));
}

#[test]
fn simple_string_into_msg() {
    let n: GlueError = "plain msg".into();
    assert!(matches!(n, GlueError::Msg(s) if s == "plain msg"));
}
