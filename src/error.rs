use thiserror::Error;

use crate::ir::node::NodeId;
use crate::parser::lexer::Span;

/// Top-level error type for the seanode pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", format_error_pretty("syntax error", &format!("{}", _0)))]
    Parse(#[from] ParseError),

    #[error("{}", format_error_pretty("compile error", &format!("{}", _0)))]
    Build(#[from] BuildError),

    #[error("{}", format_error_pretty("runtime error", &format!("{}", _0)))]
    Eval(#[from] EvalError),

    #[error("{}", format_error_pretty("codegen error", &format!("{}", _0)))]
    Codegen(#[from] CodegenError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Formats a compiler error in a human-friendly style.
fn format_error_pretty(category: &str, msg: &str) -> String {
    format!("[{}] {}", category, msg)
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at byte {pos}; it is not valid in source code")]
    UnexpectedChar { ch: char, pos: u32 },

    #[error("invalid integer literal '{text}'; it does not fit in a signed 64-bit integer")]
    InvalidLiteral { text: String, span: Span },

    #[error("expected {expected}, but found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of file while parsing {context}; you may be missing a closing brace '}}' or parenthesis ')'")]
    UnexpectedEof { context: String },
}

// ---------------------------------------------------------------------------
// Graph construction errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("'{name}' is already defined; names cannot be redeclared or shadowed, use '{name} = ...' to assign")]
    Redeclaration { name: String, span: Span },

    #[error("cannot find '{name}'; declare it with '{name} := ...' or '{name}: int = ...' before use")]
    UndeclaredVariable { name: String, span: Span },

    #[error("'{keyword}' outside of a loop")]
    ControlFlow { keyword: &'static str, span: Span },

    #[error("function '{function}' can reach the end of its body without returning a value")]
    MissingReturn { function: String, span: Span },

    #[error("function '{function}' takes {expected} argument(s) but {found} were supplied")]
    Arity {
        function: String,
        expected: u32,
        found: usize,
        span: Span,
    },

    #[error("'{name}' is a variable, not a function, and cannot be called")]
    NotAFunction { name: String, span: Span },

    #[error("'{name}' is a function and can only be used in a call")]
    NotAVariable { name: String, span: Span },

    #[error("unknown type '{name}'; the only type is 'int'")]
    UnknownType { name: String, span: Span },
}

// ---------------------------------------------------------------------------
// Evaluation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("division by zero at node {node}")]
    DivisionByZero { node: NodeId },

    #[error("internal error: malformed graph at node {node}: {detail}; this is a compiler bug, please report it")]
    MalformedGraph { node: NodeId, detail: String },

    #[error("function at {stop} takes {expected} argument(s) but {found} were supplied")]
    Arity {
        stop: NodeId,
        expected: u32,
        found: usize,
    },

    #[error("node {node} does not hold a function value")]
    NotAFunction { node: NodeId },

    #[error("no exported function named '{name}'")]
    UnknownFunction { name: String },

    #[error("evaluation exceeded {limit} control steps; the program may not terminate")]
    StepLimit { limit: u64 },

    #[error("call depth exceeded {limit}; the program may recurse without bound")]
    DepthLimit { limit: usize },
}

// ---------------------------------------------------------------------------
// Codegen errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("the {backend} backend does not support this construct: {detail}")]
    Unsupported { backend: String, detail: String },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::fmt::Error> for CodegenError {
    fn from(e: std::fmt::Error) -> Self {
        CodegenError::Unsupported {
            backend: "codegen".into(),
            detail: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostic codes and locations
// ---------------------------------------------------------------------------

impl Error {
    /// Returns a stable diagnostic code string for this error.
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            Error::Parse(p) => match p {
                ParseError::UnexpectedChar { .. } => "E0001",
                ParseError::InvalidLiteral { .. } => "E0002",
                ParseError::UnexpectedToken { .. } => "E0003",
                ParseError::UnexpectedEof { .. } => "E0004",
            },
            Error::Build(b) => match b {
                BuildError::Redeclaration { .. } => "E0100",
                BuildError::UndeclaredVariable { .. } => "E0101",
                BuildError::ControlFlow { .. } => "E0102",
                BuildError::MissingReturn { .. } => "E0103",
                BuildError::Arity { .. } => "E0104",
                BuildError::NotAFunction { .. } => "E0105",
                BuildError::NotAVariable { .. } => "E0106",
                BuildError::UnknownType { .. } => "E0107",
            },
            Error::Eval(e) => match e {
                EvalError::DivisionByZero { .. } => "E0200",
                EvalError::MalformedGraph { .. } => "E0201",
                EvalError::Arity { .. } => "E0202",
                EvalError::NotAFunction { .. } => "E0203",
                EvalError::UnknownFunction { .. } => "E0204",
                EvalError::StepLimit { .. } => "E0205",
                EvalError::DepthLimit { .. } => "E0206",
            },
            Error::Codegen(_) => "E0300",
            Error::Io(_) => "E0400",
        }
    }

    /// Source span of the offending token, for errors raised before evaluation.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse(p) => match p {
                ParseError::UnexpectedChar { pos, .. } => Some(Span::at(*pos)),
                ParseError::InvalidLiteral { span, .. } => Some(*span),
                ParseError::UnexpectedToken { span, .. } => Some(*span),
                ParseError::UnexpectedEof { .. } => None,
            },
            Error::Build(b) => Some(b.span()),
            _ => None,
        }
    }
}

impl BuildError {
    pub fn span(&self) -> Span {
        match self {
            BuildError::Redeclaration { span, .. }
            | BuildError::UndeclaredVariable { span, .. }
            | BuildError::ControlFlow { span, .. }
            | BuildError::MissingReturn { span, .. }
            | BuildError::Arity { span, .. }
            | BuildError::NotAFunction { span, .. }
            | BuildError::NotAVariable { span, .. }
            | BuildError::UnknownType { span, .. } => *span,
        }
    }
}
