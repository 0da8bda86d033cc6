//! Tacit - compiler and virtual machine for a tacit array language
//!
//! This crate implements the core of an APL-family, point-free expression
//! language: immutable shaped arrays under pervasive broadcasting, and
//! functions composed algebraically (atop, fork, rank, over, under) rather
//! than only called by name.
//!
//! ## Pipeline
//!
//! ```text
//! surface text ──syntax──▶ ast::Block ──compiler──▶ Program ──vm──▶ Value
//!                  json ──▶
//! ```
//!
//! - The front ends ([`syntax`], [`json`]) produce the fixed AST algebra in [`ast`].
//!   Any other producer of that algebra is an equally valid front end.
//! - [`compiler::compile`] lowers the AST into a flat bytecode program with
//!   lexically addressed `(depth, slot)` variables, a constant pool seeded from
//!   the primitive table, and one block-table entry per function literal.
//! - [`vm::run`] translates every block once into a tree of boxed closures and
//!   reuses that compiled form for every call of the block.
//!
//! ```rust
//! # #[cfg(feature = "syntax")] {
//! let value = tacit::evaluate("⟨1, 2, 3⟩ + 10").unwrap();
//! assert_eq!(value, tacit::Value::from(vec![11, 12, 13]));
//! # }
//! ```
//!
//! ## Values
//!
//! - Numbers are `f64`; there is no exact or arbitrary-precision arithmetic.
//! - Characters are single code points; text is an array of characters.
//! - Arrays are immutable and lazily viewed: slicing, gathering, reshaping and
//!   zipping build views over their parents instead of copying data.
//! - Any array with zero elements is the canonical empty value.
//!
//! ## Modules
//!
//! - `array`: shapes, the array contract and its lazy views
//! - `value`: the closed value sum type
//! - `function`: ambivalent function values and combinators
//! - `builtinops`: the pluggable primitive table
//! - `compiler` / `vm`: bytecode generation and closure compilation

use thiserror::Error as ThisError;

/// Maximum nesting accepted by the surface parser
pub const MAX_PARSE_DEPTH: usize = 64;

/// Default bound on nested block invocations during a run.
/// Exceeding it aborts the evaluation with a runtime error rather than
/// overflowing the host stack; the default fits a 2 MiB thread stack.
pub const MAX_CALL_DEPTH: usize = 64;

/// Largest element count an array may have
pub const MAX_ARRAY_COUNT: usize = 1 << 24;

/// Byte range into the source text a statement was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// One-based line and column of the span start within `source`
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for (i, ch) in source.char_indices() {
            if i >= self.start {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

/// Categorizes every failure the crate can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Surface text could not be turned into an AST
    Parse,
    /// Structurally invalid program (bad declaration, trailing guard, unknown glyph)
    Compile,
    /// A name was referenced that no enclosing scope binds
    UndefinedName,
    /// Mismatched or malformed shapes
    Shape,
    /// Operand of the wrong rank
    Rank,
    /// Operand of the wrong kind (character where a number is required, ...)
    Domain,
    /// Index outside the bounds of an array
    Index,
    /// Paired operands of different lengths
    Length,
    /// Failed explicit assertion
    Assertion,
    /// Under or undo requested for a function without a declared inverse
    UndoUnavailable,
    /// VM-level fault: unset variable, call-depth limit, malformed bytecode
    Runtime,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Parse => "Parse",
            ErrorKind::Compile => "Compile",
            ErrorKind::UndefinedName => "Undefined name",
            ErrorKind::Shape => "Shape",
            ErrorKind::Rank => "Rank",
            ErrorKind::Domain => "Domain",
            ErrorKind::Index => "Index",
            ErrorKind::Length => "Length",
            ErrorKind::Assertion => "Assertion",
            ErrorKind::UndoUnavailable => "Undo unavailable",
            ErrorKind::Runtime => "Runtime",
        };
        f.write_str(name)
    }
}

/// Error type for compilation and evaluation
#[derive(Debug, Clone, PartialEq, ThisError)]
#[error("{kind} error: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    /// Span of the statement that was executing, when known
    pub span: Option<Span>,
}

macro_rules! error_constructors {
    ($($name:ident => $kind:ident),+ $(,)?) => {
        $(
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        )+
    };
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            span: None,
        }
    }

    error_constructors! {
        parse => Parse,
        compile => Compile,
        undefined_name => UndefinedName,
        shape => Shape,
        rank => Rank,
        domain => Domain,
        index => Index,
        length => Length,
        assertion => Assertion,
        undo_unavailable => UndoUnavailable,
        runtime => Runtime,
    }

    /// Attach a span unless a more precise one is already present
    pub fn with_span(mut self, span: Option<Span>) -> Self {
        if self.span.is_none() {
            self.span = span;
        }
        self
    }

    /// Format the error with a `line:column` prefix and the offending source line
    pub fn render(&self, source: &str) -> String {
        let Some(span) = self.span else {
            return self.to_string();
        };
        let (line, col) = span.line_col(source);
        let text = source.lines().nth(line - 1).unwrap_or_default();
        format!(
            "{line}:{col}: {self}\n  | {text}\n  | {}^",
            " ".repeat(col.saturating_sub(1))
        )
    }
}

pub mod array;
pub mod ast;
pub mod builtinops;
pub mod compiler;
pub mod function;
pub(crate) mod intooperation;
pub mod value;
pub mod vm;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "syntax")]
pub mod syntax;

pub use array::Array;
pub use builtinops::Primitives;
pub use compiler::{Program, compile};
pub use function::Function;
pub use value::Value;
pub use vm::{RunConfig, run};

/// Parse, compile against the standard primitives, and run `source`.
#[cfg(feature = "syntax")]
pub fn evaluate(source: &str) -> Result<Value, Error> {
    let block = syntax::parse_program(source)?;
    let program = compile(&block, &Primitives::standard(), &[])?;
    let (value, _globals) = run(&program, Vec::new())?;
    Ok(value)
}
