//! The fixed expression/statement algebra the compiler consumes.
//!
//! Front ends ([`crate::syntax`], [`crate::json`], or any host code using the
//! builder helpers below) produce a [`Block`]; the compiler never sees surface
//! text. Names carry no role information here: whether a name holds data or a
//! function is decided by the producer, and the compiler only resolves it.
//!
//! ```rust
//! use tacit::ast::{Block, Expr, Stmt};
//!
//! // a ← 1 ⋄ a + 2
//! let program = Block::new(vec![
//!     Stmt::define("a", Expr::num(1.0)),
//!     Stmt::expr(Expr::call2(Expr::prim("+"), Expr::name("a"), Expr::num(2.0))),
//! ]);
//! assert_eq!(program.stmts.len(), 2);
//! ```

use crate::Span;

/// The implicit names every block can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "json",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Special {
    /// `𝕊`: the enclosing block function itself
    This,
    /// `𝕩`: the right argument
    Right,
    /// `𝕨`: the left argument, unset for a prefix call
    Left,
}

impl Special {
    /// Reserved frame slot holding this name
    pub fn slot(self) -> usize {
        match self {
            Special::This => 0,
            Special::Right => 1,
            Special::Left => 2,
        }
    }
}

/// Expression nodes
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "json",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Expr {
    Number(f64),
    Character(char),
    /// Text literal, a list of characters at run time
    String(String),
    /// Reference to a lexically bound name
    Name(String),
    /// Reference to an entry of the primitive table, by glyph
    Primitive(String),
    Special(Special),
    /// List literal `⟨a, b, c⟩` or strand `a‿b‿c`
    List(Vec<Expr>),
    /// Prefix application `F y`
    Call1 { function: Box<Expr>, y: Box<Expr> },
    /// Infix application `x F y`
    Call2 {
        function: Box<Expr>,
        x: Box<Expr>,
        y: Box<Expr>,
    },
    /// One-modifier application `F op`, with the modifier given by glyph
    Modifier1 { op: char, operand: Box<Expr> },
    /// Two-modifier application `F op G`
    Modifier2 { op: char, f: Box<Expr>, g: Box<Expr> },
    /// Two-function train `F G`
    Atop { f: Box<Expr>, g: Box<Expr> },
    /// Three-function train `F G H`
    Fork {
        f: Box<Expr>,
        g: Box<Expr>,
        h: Box<Expr>,
    },
    /// Function literal `{ … }`
    Block(Block),
}

impl Expr {
    pub fn num(n: f64) -> Expr {
        Expr::Number(n)
    }

    pub fn char(c: char) -> Expr {
        Expr::Character(c)
    }

    pub fn string(s: impl Into<String>) -> Expr {
        Expr::String(s.into())
    }

    pub fn name(name: impl Into<String>) -> Expr {
        Expr::Name(name.into())
    }

    pub fn prim(glyph: impl Into<String>) -> Expr {
        Expr::Primitive(glyph.into())
    }

    pub fn list(items: Vec<Expr>) -> Expr {
        Expr::List(items)
    }

    pub fn call1(function: Expr, y: Expr) -> Expr {
        Expr::Call1 {
            function: Box::new(function),
            y: Box::new(y),
        }
    }

    pub fn call2(function: Expr, x: Expr, y: Expr) -> Expr {
        Expr::Call2 {
            function: Box::new(function),
            x: Box::new(x),
            y: Box::new(y),
        }
    }

    pub fn mod1(op: char, operand: Expr) -> Expr {
        Expr::Modifier1 {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn mod2(op: char, f: Expr, g: Expr) -> Expr {
        Expr::Modifier2 {
            op,
            f: Box::new(f),
            g: Box::new(g),
        }
    }

    pub fn atop(f: Expr, g: Expr) -> Expr {
        Expr::Atop {
            f: Box::new(f),
            g: Box::new(g),
        }
    }

    pub fn fork(f: Expr, g: Expr, h: Expr) -> Expr {
        Expr::Fork {
            f: Box::new(f),
            g: Box::new(g),
            h: Box::new(h),
        }
    }

    pub fn block(stmts: Vec<Stmt>) -> Expr {
        Expr::Block(Block::new(stmts))
    }
}

/// Assignment target: one name, or a list destructuring one array value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "json",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Target {
    Name(String),
    List(Vec<Target>),
}

impl Target {
    /// Every name bound by the target, in order
    pub fn names(&self) -> Vec<&str> {
        match self {
            Target::Name(name) => vec![name.as_str()],
            Target::List(items) => items.iter().flat_map(Target::names).collect(),
        }
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Name(name.to_string())
    }
}

/// Statement forms
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "json",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum StmtKind {
    /// Evaluated for its value; the last statement's value is returned
    Expr(Expr),
    /// `target ← value`: binds new names in the current scope
    Define { target: Target, value: Expr },
    /// `target ↩ value`: rebinds existing names
    Assign { target: Target, value: Expr },
    /// `name F↩ arg` (or `name F↩` without `arg`): apply F and store back
    Modify {
        name: String,
        function: Expr,
        arg: Option<Expr>,
    },
    /// `test ? fallback`: return `fallback` unless `test` holds
    Guard { test: Expr, fallback: Expr },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Stmt {
    pub kind: StmtKind,
    #[cfg_attr(feature = "json", serde(default))]
    pub span: Option<Span>,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Stmt {
        Stmt { kind, span: None }
    }

    pub fn expr(expr: Expr) -> Stmt {
        Stmt::new(StmtKind::Expr(expr))
    }

    pub fn define(target: impl Into<Target>, value: Expr) -> Stmt {
        Stmt::new(StmtKind::Define {
            target: target.into(),
            value,
        })
    }

    pub fn assign(target: impl Into<Target>, value: Expr) -> Stmt {
        Stmt::new(StmtKind::Assign {
            target: target.into(),
            value,
        })
    }

    pub fn modify(name: impl Into<String>, function: Expr, arg: Option<Expr>) -> Stmt {
        Stmt::new(StmtKind::Modify {
            name: name.into(),
            function,
            arg,
        })
    }

    pub fn guard(test: Expr, fallback: Expr) -> Stmt {
        Stmt::new(StmtKind::Guard { test, fallback })
    }

    /// Attach the source span the statement was parsed from
    pub fn at(mut self, span: Span) -> Stmt {
        self.span = Some(span);
        self
    }
}

/// A sequence of statements: the whole program, or a function literal's body
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Block {
        Block { stmts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names() {
        let target = Target::List(vec![
            Target::from("a"),
            Target::List(vec![Target::from("b"), Target::from("c")]),
        ]);
        assert_eq!(target.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_builders() {
        let stmt = Stmt::modify("n", Expr::prim("+"), Some(Expr::num(1.0))).at(Span::new(0, 6));
        assert_eq!(stmt.span, Some(Span::new(0, 6)));
        assert!(matches!(stmt.kind, StmtKind::Modify { ref name, .. } if name == "n"));

        let train = Expr::fork(Expr::prim("+"), Expr::prim("÷"), Expr::prim("≠"));
        assert!(matches!(train, Expr::Fork { .. }));
        assert_eq!(Special::Left.slot(), 2);
    }
}
