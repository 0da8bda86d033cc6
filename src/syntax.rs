//! Reference surface syntax.
//!
//! Text is read in two passes. The nom grammar below only splits the source
//! into statements of atoms (literals, names, glyphs and bracketed groups).
//! A second pass assigns each atom its syntactic role and builds the AST.
//!
//! ## Roles
//!
//! - Roles come from spelling: `name` is data, `Name` is a function, and both
//!   refer to the same variable (names are stored lowercased).
//! - `𝕩 𝕨 𝕤` are data and `𝕏 𝕎 𝕊` functions: the right argument, the left
//!   argument and the enclosing block.
//! - `•name` / `•Name` reference a host-registered entry of the primitive table.
//! - Primitive glyphs are functions; `˙ ˜ ¨ ⌜ ˘ ´ ` ⁼` are one-modifiers and
//!   `∘ ○ ⌾ ⎉ ⊸ ⟜` two-modifiers.
//! - Modifiers bind tightest, left to right. Function application then groups
//!   right to left: `a F b G c` is `a F (b G c)`. An expression ending in a
//!   function is a train: `F G H` a fork, `G H` an atop, longer trains
//!   grouped in forks from the right.
//!
//! ## Statements
//!
//! Statements are separated by `⋄`, `◊`, `,` or a newline. `#` starts a comment.
//!
//! ```text
//! a ← 1           define        a ↩ 2       assign
//! a‿b ← ⟨1, 2⟩    destructure   a +↩ 1      modify with an argument
//! 𝕩 > 0 ? 1       guard         a -↩        modify without one
//! ```

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{anychar, char, digit1, one_of, satisfy},
    combinator::{opt, recognize, value},
    error::ErrorKind,
    multi::many0_count,
    sequence::{delimited, pair, preceded},
};

use crate::ast::{Block, Expr, Special, Stmt, StmtKind, Target};
use crate::builtinops::is_primitive_glyph;
use crate::function::{DyadicOp, MonadicOp};
use crate::{Error, MAX_PARSE_DEPTH, Span};

/// Lexical unit of a statement, before roles are assigned
#[derive(Debug, Clone, PartialEq)]
enum Atom {
    Number(f64),
    Character(char),
    String(String),
    Name(String),
    Special(char),
    System(String),
    Primitive(char),
    Mod1(char),
    Mod2(char),
    Paren(Vec<Atom>),
    List(Vec<Vec<Atom>>),
    Strand(Vec<Atom>),
    Block(Vec<RawStmt>),
    Define,
    Assign,
    Guard,
}

#[derive(Debug, Clone, PartialEq)]
struct RawStmt {
    atoms: Vec<Atom>,
    span: Span,
}

type ParseResult<'s, T> = IResult<&'s str, T>;

fn error(input: &str, kind: ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

fn is_separator(c: char) -> bool {
    matches!(c, '⋄' | '◊' | ',' | '\n')
}

fn is_closer(c: char) -> bool {
    matches!(c, ')' | '⟩' | '}')
}

fn comment(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(char('#'), take_while(|c: char| c != '\n'))).parse(input)
}

/// Spaces and comments, but not newlines
fn ws(input: &str) -> ParseResult<'_, ()> {
    value(
        (),
        many0_count(alt((
            take_while1(|c: char| c == ' ' || c == '\t' || c == '\r'),
            comment,
        ))),
    )
    .parse(input)
}

/// Whitespace, comments and statement separators
fn blank(input: &str) -> ParseResult<'_, ()> {
    value(
        (),
        many0_count(alt((
            take_while1(|c: char| c.is_whitespace() || is_separator(c)),
            comment,
        ))),
    )
    .parse(input)
}

/// `¯`-signed decimal with optional fraction and exponent, `∞` or `π`
fn number(input: &str) -> ParseResult<'_, f64> {
    let (rest, (negative, text)) = pair(
        opt(char('¯')),
        alt((
            tag("∞"),
            tag("π"),
            recognize((
                digit1,
                opt(pair(char('.'), digit1)),
                opt((one_of("eE"), opt(char('¯')), digit1)),
            )),
        )),
    )
    .parse(input)?;
    let magnitude = match text {
        "∞" => f64::INFINITY,
        "π" => std::f64::consts::PI,
        digits => digits
            .replace('¯', "-")
            .parse::<f64>()
            .map_err(|_| error(input, ErrorKind::Float))?,
    };
    Ok((rest, if negative.is_some() { -magnitude } else { magnitude }))
}

fn character(input: &str) -> ParseResult<'_, char> {
    delimited(char('\''), anychar, char('\'')).parse(input)
}

/// Double-quoted text; `""` stands for one quote
fn string(input: &str) -> ParseResult<'_, String> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut text = String::new();
    loop {
        let mut chars = remaining.chars();
        match chars.next() {
            Some('"') => {
                if chars.as_str().starts_with('"') {
                    text.push('"');
                    remaining = &chars.as_str()[1..];
                } else {
                    return Ok((chars.as_str(), text));
                }
            }
            Some(c) => {
                text.push(c);
                remaining = chars.as_str();
            }
            None => return Err(error(input, ErrorKind::Char)),
        }
    }
}

fn identifier(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic()),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

struct SourceParser<'s> {
    source: &'s str,
}

impl<'s> SourceParser<'s> {
    fn offset(&self, rest: &str) -> usize {
        self.source.len() - rest.len()
    }

    fn statements(&self, mut input: &'s str, depth: usize) -> ParseResult<'s, Vec<RawStmt>> {
        let mut stmts = Vec::new();
        loop {
            (input, _) = blank(input)?;
            match input.chars().next() {
                None => break,
                Some(c) if is_closer(c) => break,
                Some(_) => {}
            }
            let start = self.offset(input);
            let (rest, atoms) = self.atoms(input, depth)?;
            let consumed = &input[..input.len() - rest.len()];
            let span = Span::new(start, start + consumed.trim_end().len());
            stmts.push(RawStmt { atoms, span });
            input = rest;
        }
        Ok((input, stmts))
    }

    fn atoms(&self, mut input: &'s str, depth: usize) -> ParseResult<'s, Vec<Atom>> {
        let mut atoms = Vec::new();
        loop {
            (input, _) = ws(input)?;
            match input.chars().next() {
                None => break,
                Some(c) if is_separator(c) || is_closer(c) => break,
                Some(_) => {}
            }
            let (rest, atom) = self.strand(input, depth)?;
            atoms.push(atom);
            input = rest;
        }
        Ok((input, atoms))
    }

    fn strand(&self, input: &'s str, depth: usize) -> ParseResult<'s, Atom> {
        let (mut input, first) = self.term(input, depth)?;
        let mut items = vec![first];
        while let Ok((rest, _)) = preceded(ws, char('‿')).parse(input) {
            let (rest, _) = ws(rest)?;
            let (rest, item) = self.term(rest, depth)?;
            items.push(item);
            input = rest;
        }
        if items.len() == 1 {
            Ok((input, items.remove(0)))
        } else {
            Ok((input, Atom::Strand(items)))
        }
    }

    fn enter(&self, input: &'s str, depth: usize) -> Result<usize, nom::Err<nom::error::Error<&'s str>>> {
        if depth + 1 >= MAX_PARSE_DEPTH {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                ErrorKind::TooLarge,
            )));
        }
        Ok(depth + 1)
    }

    fn term(&self, input: &'s str, depth: usize) -> ParseResult<'s, Atom> {
        let Some(c) = input.chars().next() else {
            return Err(error(input, ErrorKind::Eof));
        };
        let after = &input[c.len_utf8()..];
        match c {
            '(' => {
                let inner = self.enter(input, depth)?;
                let (rest, atoms) = self.atoms(after, inner)?;
                if atoms.is_empty() {
                    return Err(error(rest, ErrorKind::Verify));
                }
                let (rest, _) = char(')').parse(rest)?;
                Ok((rest, Atom::Paren(atoms)))
            }
            '⟨' => {
                let inner = self.enter(input, depth)?;
                let mut elements = Vec::new();
                let mut rest = after;
                loop {
                    (rest, _) = blank(rest)?;
                    if let Some(rest) = rest.strip_prefix('⟩') {
                        return Ok((rest, Atom::List(elements)));
                    }
                    let element;
                    (rest, element) = self.atoms(rest, inner)?;
                    if element.is_empty() {
                        return Err(error(rest, ErrorKind::Char));
                    }
                    elements.push(element);
                }
            }
            '{' => {
                let inner = self.enter(input, depth)?;
                let (rest, stmts) = self.statements(after, inner)?;
                let (rest, _) = char('}').parse(rest)?;
                Ok((rest, Atom::Block(stmts)))
            }
            '\'' => character(input).map(|(rest, c)| (rest, Atom::Character(c))),
            '"' => string(input).map(|(rest, s)| (rest, Atom::String(s))),
            '𝕩' | '𝕨' | '𝕊' | '𝕤' | '𝕏' | '𝕎' => Ok((after, Atom::Special(c))),
            '•' => identifier(after).map(|(rest, name)| (rest, Atom::System(name.to_string()))),
            '←' => Ok((after, Atom::Define)),
            '↩' => Ok((after, Atom::Assign)),
            '?' => Ok((after, Atom::Guard)),
            '¯' | '∞' | 'π' | '0'..='9' => number(input).map(|(rest, n)| (rest, Atom::Number(n))),
            c if c.is_alphabetic() => {
                identifier(input).map(|(rest, name)| (rest, Atom::Name(name.to_string())))
            }
            c if MonadicOp::from_glyph(c).is_some() => Ok((after, Atom::Mod1(c))),
            c if DyadicOp::from_glyph(c).is_some() => Ok((after, Atom::Mod2(c))),
            c if is_primitive_glyph(c) => Ok((after, Atom::Primitive(c))),
            _ => Err(error(input, ErrorKind::Char)),
        }
    }

    fn error_at(&self, err: nom::Err<nom::error::Error<&str>>) -> Error {
        match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let position = self.offset(e.input);
                let span = Some(Span::new(position, position + 1));
                let message = match (e.code, e.input.chars().next()) {
                    (ErrorKind::TooLarge, _) => {
                        format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})")
                    }
                    (_, None) => "unexpected end of input".to_string(),
                    (_, Some(c)) => format!("unexpected '{c}'"),
                };
                Error::parse(message).with_span(span)
            }
            nom::Err::Incomplete(_) => Error::parse("incomplete input"),
        }
    }
}

/// Parse a whole program into a block of statements.
pub fn parse_program(source: &str) -> Result<Block, Error> {
    let parser = SourceParser { source };
    let stmts = match parser.statements(source, 0) {
        Ok(("", stmts)) => stmts,
        Ok((rest, _)) => return Err(parser.error_at(error(rest, ErrorKind::Eof))),
        Err(e) => return Err(parser.error_at(e)),
    };
    block(stmts)
}

// =====================================================================
// Role resolution
// =====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Subject,
    Function,
}

enum Item {
    Value(Expr, Role),
    Mod1(char),
    Mod2(char),
}

fn block(stmts: Vec<RawStmt>) -> Result<Block, Error> {
    stmts
        .into_iter()
        .map(|raw| {
            let span = Some(raw.span);
            statement(raw.atoms)
                .map(|kind| Stmt { kind, span })
                .map_err(|e| e.with_span(span))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Block::new)
}

fn statement(mut atoms: Vec<Atom>) -> Result<StmtKind, Error> {
    if let Some(at) = atoms.iter().position(|a| *a == Atom::Guard) {
        let fallback = atoms.split_off(at + 1);
        atoms.pop();
        return Ok(StmtKind::Guard {
            test: expression(atoms)?.0,
            fallback: expression(fallback)?.0,
        });
    }
    let Some(at) = atoms
        .iter()
        .position(|a| matches!(a, Atom::Define | Atom::Assign))
    else {
        return Ok(StmtKind::Expr(expression(atoms)?.0));
    };
    let rest = atoms.split_off(at + 1);
    let arrow = atoms.pop();
    match (atoms.len(), arrow) {
        (1, Some(Atom::Define)) => Ok(StmtKind::Define {
            target: target(&atoms[0])?,
            value: expression(rest)?.0,
        }),
        (1, Some(Atom::Assign)) => Ok(StmtKind::Assign {
            target: target(&atoms[0])?,
            value: expression(rest)?.0,
        }),
        (n, Some(Atom::Assign)) if n > 1 => {
            let Atom::Name(name) = atoms.remove(0) else {
                return Err(Error::parse("only a name can be modified in place"));
            };
            let (function, role) = expression(atoms)?;
            if role != Role::Function {
                return Err(Error::parse(format!("{name} must be modified by a function")));
            }
            let arg = if rest.is_empty() {
                None
            } else {
                Some(expression(rest)?.0)
            };
            Ok(StmtKind::Modify {
                name: name.to_lowercase(),
                function,
                arg,
            })
        }
        _ => Err(Error::parse("malformed assignment")),
    }
}

fn target(atom: &Atom) -> Result<Target, Error> {
    match atom {
        Atom::Name(name) => Ok(Target::Name(name.to_lowercase())),
        Atom::Strand(items) => items.iter().map(target).collect::<Result<_, _>>().map(Target::List),
        Atom::List(elements) => elements
            .iter()
            .map(|element| match element.as_slice() {
                [single] => target(single),
                _ => Err(Error::parse("each destructuring element must be one name")),
            })
            .collect::<Result<_, _>>()
            .map(Target::List),
        _ => Err(Error::parse("cannot assign to this expression")),
    }
}

fn item(atom: Atom) -> Result<Item, Error> {
    let subject = |expr| Ok(Item::Value(expr, Role::Subject));
    let function = |expr| Ok(Item::Value(expr, Role::Function));
    match atom {
        Atom::Number(n) => subject(Expr::num(n)),
        Atom::Character(c) => subject(Expr::char(c)),
        Atom::String(s) => subject(Expr::string(s)),
        Atom::Name(name) => {
            let expr = Expr::name(name.to_lowercase());
            if name.starts_with(char::is_uppercase) {
                function(expr)
            } else {
                subject(expr)
            }
        }
        Atom::System(name) => {
            let expr = Expr::prim(name.to_lowercase());
            if name.starts_with(char::is_uppercase) {
                function(expr)
            } else {
                subject(expr)
            }
        }
        Atom::Special(c) => match c {
            '𝕩' => subject(Expr::Special(Special::Right)),
            '𝕏' => function(Expr::Special(Special::Right)),
            '𝕨' => subject(Expr::Special(Special::Left)),
            '𝕎' => function(Expr::Special(Special::Left)),
            '𝕤' => subject(Expr::Special(Special::This)),
            _ => function(Expr::Special(Special::This)),
        },
        Atom::Primitive(c) => function(Expr::prim(c.to_string())),
        Atom::Mod1(c) => Ok(Item::Mod1(c)),
        Atom::Mod2(c) => Ok(Item::Mod2(c)),
        Atom::Paren(atoms) => {
            let (expr, role) = expression(atoms)?;
            Ok(Item::Value(expr, role))
        }
        Atom::List(elements) => {
            let items = elements
                .into_iter()
                .map(|element| expression(element).map(|(expr, _)| expr))
                .collect::<Result<_, _>>()?;
            subject(Expr::list(items))
        }
        Atom::Strand(atoms) => {
            let items = atoms
                .into_iter()
                .map(|atom| match item(atom)? {
                    Item::Value(expr, _) => Ok(expr),
                    Item::Mod1(c) | Item::Mod2(c) => {
                        Err(Error::parse(format!("modifier {c} cannot be stranded")))
                    }
                })
                .collect::<Result<_, _>>()?;
            subject(Expr::list(items))
        }
        Atom::Block(stmts) => function(Expr::Block(block(stmts)?)),
        Atom::Define | Atom::Assign => {
            Err(Error::parse("assignment must start a statement"))
        }
        Atom::Guard => Err(Error::parse("a guard cannot appear inside an expression")),
    }
}

/// Resolve a sequence of atoms into one expression and its role
fn expression(atoms: Vec<Atom>) -> Result<(Expr, Role), Error> {
    let items = atoms.into_iter().map(item).collect::<Result<Vec<_>, _>>()?;

    // modifiers first
    let mut terms: Vec<(Expr, Role)> = Vec::new();
    let mut items = items.into_iter().peekable();
    while let Some(item) = items.next() {
        let (mut expr, mut role) = match item {
            Item::Value(expr, role) => (expr, role),
            Item::Mod1(c) | Item::Mod2(c) => {
                return Err(Error::parse(format!("modifier {c} has no operand")));
            }
        };
        loop {
            match items.peek() {
                Some(&Item::Mod1(op)) => {
                    items.next();
                    expr = Expr::mod1(op, expr);
                }
                Some(&Item::Mod2(op)) => {
                    items.next();
                    let Some(Item::Value(g, _)) = items.next() else {
                        return Err(Error::parse(format!("modifier {op} needs a right operand")));
                    };
                    expr = Expr::mod2(op, expr, g);
                }
                _ => break,
            }
            role = Role::Function;
        }
        terms.push((expr, role));
    }

    match terms.last() {
        None => Err(Error::parse("empty expression")),
        Some((_, Role::Subject)) => application(terms).map(|expr| (expr, Role::Subject)),
        Some((_, Role::Function)) => train(terms).map(|expr| (expr, Role::Function)),
    }
}

/// `… x F y`, grouped right to left
fn application(mut terms: Vec<(Expr, Role)>) -> Result<Expr, Error> {
    let Some((mut y, _)) = terms.pop() else {
        return Err(Error::parse("empty expression"));
    };
    while let Some((f, role)) = terms.pop() {
        if role == Role::Subject {
            return Err(Error::parse("two values with no function between them"));
        }
        y = match terms.last() {
            Some((_, Role::Subject)) => {
                let Some((x, _)) = terms.pop() else {
                    return Err(Error::parse("empty expression"));
                };
                Expr::call2(f, x, y)
            }
            _ => Expr::call1(f, y),
        };
    }
    Ok(y)
}

/// Forks from the right; an even count leaves an atop at the front
fn train(mut terms: Vec<(Expr, Role)>) -> Result<Expr, Error> {
    let Some((mut h, _)) = terms.pop() else {
        return Err(Error::parse("empty expression"));
    };
    while let Some((g, role)) = terms.pop() {
        if role == Role::Subject {
            return Err(Error::parse("a train needs a function in this position"));
        }
        h = match terms.pop() {
            Some((f, _)) => Expr::fork(f, g, h),
            None => Expr::atop(g, h),
        };
    }
    Ok(h)
}
