//! Lowering of the AST into a flat bytecode [`Program`].
//!
//! ## Layout
//!
//! - `code` is one instruction stream for every block, operands inline.
//! - `constants` starts with the primitive table, in table order, so a
//!   primitive glyph compiles to a fixed `PUSH` index; literals follow.
//! - `blocks` has one `(start, frame_size)` entry per function literal, with
//!   the whole program at index 0. A literal's index is reserved when the
//!   compiler first meets it, and its body is compiled later from a work
//!   queue, so a body can refer to itself before it has been compiled.
//! - `locations` runs parallel to `code` and holds the span of the statement
//!   each word was emitted for.
//!
//! ## Frames
//!
//! Slot 0 of every frame holds the block function itself, slot 1 the right
//! argument and slot 2 the left. Locals follow in declaration order. In block
//! 0, the host's external names take the slots after 2.
//!
//! Names resolve at compile time to `(depth, slot)`: the number of scope hops
//! outward and the slot within that frame. An unresolvable name is an error
//! here, never at run time.

use crate::ast::{Block, Expr, Stmt, StmtKind, Target};
use crate::builtinops::Primitives;
use crate::function::{DyadicOp, MonadicOp};
use crate::value::Value;
use crate::{Error, Span};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tracing::debug;

/// Slots reserved at the start of every frame: self, right argument, left argument
pub const RESERVED_SLOTS: usize = 3;

/// Instruction set. Stack effects list the operands in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Op {
    /// `PUSH k`: push constant k
    Push,
    /// `DFND b`: push a function for block b closing over the current frame
    Dfnd,
    /// `VARO d s`: push the value of a variable
    Varo,
    /// `VARM d s`: push a variable as an assignment target
    Varm,
    /// `ARRO n`: n values → list
    Arro,
    /// `ARRM n`: n targets → destructuring target
    Arrm,
    /// y, F → F y
    Fn1c,
    /// y, F, x → x F y
    Fn2c,
    /// H, G → G∘H
    Tr2d,
    /// H, G, F → fork F G H
    Tr3d,
    /// `MD1C k`: F → F modified by one-modifier k
    Md1c,
    /// `MD2C k`: G, F → F modified by two-modifier k with G
    Md2c,
    /// value, target → value, binding new slots
    Setn,
    /// value, target → value, rebinding existing slots
    Setu,
    /// y, F, target → target F y, stored back
    Setm,
    /// F, target → F target, stored back
    Setc,
    /// discard the top of the stack
    Pops,
    /// return the top of the stack from the block
    Retn,
    /// guard test: continue when it holds, else run the fallback up to `GRET`
    Pred,
    /// return the guard fallback
    Gret,
}

impl Op {
    pub const ALL: [Op; 20] = [
        Op::Push,
        Op::Dfnd,
        Op::Varo,
        Op::Varm,
        Op::Arro,
        Op::Arrm,
        Op::Fn1c,
        Op::Fn2c,
        Op::Tr2d,
        Op::Tr3d,
        Op::Md1c,
        Op::Md2c,
        Op::Setn,
        Op::Setu,
        Op::Setm,
        Op::Setc,
        Op::Pops,
        Op::Retn,
        Op::Pred,
        Op::Gret,
    ];

    pub fn decode(word: u32) -> Option<Op> {
        Op::ALL.get(word as usize).copied()
    }

    /// Number of inline operand words following the opcode
    pub fn operand_count(self) -> usize {
        match self {
            Op::Push | Op::Dfnd | Op::Arro | Op::Arrm | Op::Md1c | Op::Md2c => 1,
            Op::Varo | Op::Varm => 2,
            _ => 0,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Push => "PUSH",
            Op::Dfnd => "DFND",
            Op::Varo => "VARO",
            Op::Varm => "VARM",
            Op::Arro => "ARRO",
            Op::Arrm => "ARRM",
            Op::Fn1c => "FN1C",
            Op::Fn2c => "FN2C",
            Op::Tr2d => "TR2D",
            Op::Tr3d => "TR3D",
            Op::Md1c => "MD1C",
            Op::Md2c => "MD2C",
            Op::Setn => "SETN",
            Op::Setu => "SETU",
            Op::Setm => "SETM",
            Op::Setc => "SETC",
            Op::Pops => "POPS",
            Op::Retn => "RETN",
            Op::Pred => "PRED",
            Op::Gret => "GRET",
        }
    }
}

/// Block table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block's first instruction in `code`
    pub start: usize,
    /// Slots a frame for this block needs
    pub frame_size: usize,
}

/// A compiled program, ready for [`crate::vm::run`]
#[derive(Clone)]
pub struct Program {
    pub code: Vec<u32>,
    pub constants: Vec<Value>,
    pub blocks: Vec<BlockInfo>,
    pub locations: Vec<Option<Span>>,
    externals: usize,
    globals: Vec<(String, usize)>,
}

impl Program {
    /// Number of external names the program expects initial values for
    pub fn external_count(&self) -> usize {
        self.externals
    }

    /// Top-level names and their slots in the global frame, in slot order
    pub fn globals(&self) -> &[(String, usize)] {
        &self.globals
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("code", &self.code.len())
            .field("constants", &self.constants.len())
            .field("blocks", &self.blocks)
            .finish()
    }
}

/// Disassembly listing, one instruction per line
impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut starts: Vec<(usize, usize)> = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.start, i))
            .collect();
        starts.sort_unstable();
        let mut next_start = starts.into_iter().peekable();
        let mut pc = 0;
        while pc < self.code.len() {
            while let Some(&(start, index)) = next_start.peek() {
                if start > pc {
                    break;
                }
                let size = self.blocks[index].frame_size;
                writeln!(f, "block {index} (frame {size}):")?;
                next_start.next();
            }
            let Some(op) = Op::decode(self.code[pc]) else {
                writeln!(f, "{pc:>5}  ??? {}", self.code[pc])?;
                pc += 1;
                continue;
            };
            write!(f, "{pc:>5}  {}", op.mnemonic())?;
            let operands = &self.code[pc + 1..(pc + 1 + op.operand_count()).min(self.code.len())];
            for word in operands {
                write!(f, " {word}")?;
            }
            if op == Op::Push
                && let Some(k) = operands.first()
                && let Some(value) = self.constants.get(*k as usize)
            {
                write!(f, "  ; {value}")?;
            }
            writeln!(f)?;
            pc += 1 + op.operand_count();
        }
        Ok(())
    }
}

type ScopeRef = Rc<RefCell<Scope>>;

/// Compile-time scope: one per block, chained to the scope of its definition site
struct Scope {
    names: HashMap<String, usize>,
    next_slot: usize,
    parent: Option<ScopeRef>,
}

impl Scope {
    fn new(parent: Option<ScopeRef>) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            names: HashMap::new(),
            next_slot: RESERVED_SLOTS,
            parent,
        }))
    }

    fn declare(scope: &ScopeRef, name: &str) -> Result<usize, Error> {
        let mut scope = scope.borrow_mut();
        if scope.names.contains_key(name) {
            return Err(Error::compile(format!(
                "{name} is already defined in this scope"
            )));
        }
        let slot = scope.next_slot;
        scope.names.insert(name.to_string(), slot);
        scope.next_slot += 1;
        Ok(slot)
    }

    /// Walk outward counting hops until `name` is bound
    fn resolve(scope: &ScopeRef, name: &str) -> Option<(usize, usize)> {
        let mut current = Rc::clone(scope);
        let mut depth = 0;
        loop {
            if let Some(&slot) = current.borrow().names.get(name) {
                return Some((depth, slot));
            }
            let parent = current.borrow().parent.clone()?;
            current = parent;
            depth += 1;
        }
    }
}

struct Pending<'a> {
    index: usize,
    block: &'a Block,
    scope: ScopeRef,
}

struct Compiler<'a> {
    primitives: &'a Primitives,
    code: Vec<u32>,
    locations: Vec<Option<Span>>,
    constants: Vec<Value>,
    blocks: Vec<BlockInfo>,
    queue: VecDeque<Pending<'a>>,
    span: Option<Span>,
}

/// Compile `block` as a whole program.
///
/// `externals` names values the host will pass to [`crate::vm::run`] as
/// initial globals, in the same order; they are visible to the program as
/// ordinary top-level names.
pub fn compile(block: &Block, primitives: &Primitives, externals: &[&str]) -> Result<Program, Error> {
    let mut compiler = Compiler {
        primitives,
        code: Vec::new(),
        locations: Vec::new(),
        constants: primitives.values().to_vec(),
        blocks: Vec::new(),
        queue: VecDeque::new(),
        span: None,
    };

    let root = Scope::new(None);
    for name in externals {
        Scope::declare(&root, name)?;
    }
    compiler.reserve_block(block, Rc::clone(&root));
    while let Some(pending) = compiler.queue.pop_front() {
        compiler.compile_block(pending)?;
    }

    let mut globals: Vec<(String, usize)> = root
        .borrow()
        .names
        .iter()
        .map(|(name, &slot)| (name.clone(), slot))
        .collect();
    globals.sort_by_key(|&(_, slot)| slot);

    Ok(Program {
        code: compiler.code,
        constants: compiler.constants,
        blocks: compiler.blocks,
        locations: compiler.locations,
        externals: externals.len(),
        globals,
    })
}

impl<'a> Compiler<'a> {
    fn reserve_block(&mut self, block: &'a Block, scope: ScopeRef) -> usize {
        let index = self.blocks.len();
        self.blocks.push(BlockInfo {
            start: 0,
            frame_size: RESERVED_SLOTS,
        });
        self.queue.push_back(Pending {
            index,
            block,
            scope,
        });
        index
    }

    fn emit(&mut self, op: Op, operands: &[usize]) -> Result<(), Error> {
        self.code.push(op as u32);
        self.locations.push(self.span);
        for &operand in operands {
            let word = u32::try_from(operand)
                .map_err(|_| Error::compile(format!("operand {operand} too large")))?;
            self.code.push(word);
            self.locations.push(self.span);
        }
        Ok(())
    }

    fn constant(&mut self, value: Value) -> Result<(), Error> {
        let k = self.constants.len();
        self.constants.push(value);
        self.emit(Op::Push, &[k])
    }

    fn compile_block(&mut self, pending: Pending<'a>) -> Result<(), Error> {
        let Pending {
            index,
            block,
            scope,
        } = pending;
        let start = self.code.len();

        if block.stmts.is_empty() {
            self.span = None;
            self.constant(Value::nil())?;
            self.emit(Op::Retn, &[])?;
        }
        let last = block.stmts.len().saturating_sub(1);
        for (i, stmt) in block.stmts.iter().enumerate() {
            self.span = stmt.span;
            self.statement(stmt, &scope, i == last)
                .map_err(|e| e.with_span(stmt.span))?;
        }

        let frame_size = scope.borrow().next_slot;
        self.blocks[index] = BlockInfo { start, frame_size };
        debug!(
            target: "tacit::compiler",
            block = index,
            start,
            frame_size,
            words = self.code.len() - start,
            "compiled block"
        );
        Ok(())
    }

    fn finish_statement(&mut self, last: bool) -> Result<(), Error> {
        self.emit(if last { Op::Retn } else { Op::Pops }, &[])
    }

    fn statement(&mut self, stmt: &'a Stmt, scope: &ScopeRef, last: bool) -> Result<(), Error> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.expr(expr, scope)?;
                self.finish_statement(last)
            }
            StmtKind::Define { target, value } => {
                check_target(target)?;
                // the right-hand side sees only earlier bindings
                self.expr(value, scope)?;
                for name in target.names() {
                    Scope::declare(scope, name)?;
                }
                self.target(target, scope)?;
                self.emit(Op::Setn, &[])?;
                self.finish_statement(last)
            }
            StmtKind::Assign { target, value } => {
                check_target(target)?;
                self.expr(value, scope)?;
                self.target(target, scope)?;
                self.emit(Op::Setu, &[])?;
                self.finish_statement(last)
            }
            StmtKind::Modify {
                name,
                function,
                arg,
            } => {
                if let Some(arg) = arg {
                    self.expr(arg, scope)?;
                }
                self.expr(function, scope)?;
                self.target(&Target::Name(name.clone()), scope)?;
                self.emit(if arg.is_some() { Op::Setm } else { Op::Setc }, &[])?;
                self.finish_statement(last)
            }
            StmtKind::Guard { test, fallback } => {
                if last {
                    return Err(Error::compile(
                        "a guard cannot be the last statement of a block",
                    )
                    .with_span(stmt.span));
                }
                self.expr(test, scope)?;
                self.emit(Op::Pred, &[])?;
                self.expr(fallback, scope)?;
                self.emit(Op::Gret, &[])
            }
        }
    }

    fn target(&mut self, target: &Target, scope: &ScopeRef) -> Result<(), Error> {
        match target {
            Target::Name(name) => {
                let (depth, slot) = Scope::resolve(scope, name)
                    .ok_or_else(|| undefined(name).with_span(self.span))?;
                self.emit(Op::Varm, &[depth, slot])
            }
            Target::List(items) => {
                for item in items {
                    self.target(item, scope)?;
                }
                self.emit(Op::Arrm, &[items.len()])
            }
        }
    }

    fn expr(&mut self, expr: &'a Expr, scope: &ScopeRef) -> Result<(), Error> {
        match expr {
            Expr::Number(n) => self.constant(Value::Number(*n)),
            Expr::Character(c) => self.constant(Value::Character(*c)),
            Expr::String(s) => self.constant(Value::string(s)),
            Expr::Name(name) => {
                let (depth, slot) = Scope::resolve(scope, name)
                    .ok_or_else(|| undefined(name).with_span(self.span))?;
                self.emit(Op::Varo, &[depth, slot])
            }
            Expr::Primitive(glyph) => {
                let k = self.primitives.lookup(glyph).ok_or_else(|| {
                    Error::compile(format!("unknown primitive {glyph}")).with_span(self.span)
                })?;
                self.emit(Op::Push, &[k])
            }
            Expr::Special(special) => self.emit(Op::Varo, &[0, special.slot()]),
            Expr::List(items) => {
                for item in items {
                    self.expr(item, scope)?;
                }
                self.emit(Op::Arro, &[items.len()])
            }
            Expr::Call1 { function, y } => {
                self.expr(y, scope)?;
                self.expr(function, scope)?;
                self.emit(Op::Fn1c, &[])
            }
            Expr::Call2 { function, x, y } => {
                self.expr(y, scope)?;
                self.expr(function, scope)?;
                self.expr(x, scope)?;
                self.emit(Op::Fn2c, &[])
            }
            Expr::Modifier1 { op, operand } => {
                let modifier = MonadicOp::from_glyph(*op).ok_or_else(|| {
                    Error::compile(format!("unknown one-modifier {op}")).with_span(self.span)
                })?;
                self.expr(operand, scope)?;
                self.emit(Op::Md1c, &[modifier as usize])
            }
            Expr::Modifier2 { op, f, g } => {
                let modifier = DyadicOp::from_glyph(*op).ok_or_else(|| {
                    Error::compile(format!("unknown two-modifier {op}")).with_span(self.span)
                })?;
                self.expr(g, scope)?;
                self.expr(f, scope)?;
                self.emit(Op::Md2c, &[modifier as usize])
            }
            Expr::Atop { f, g } => {
                self.expr(g, scope)?;
                self.expr(f, scope)?;
                self.emit(Op::Tr2d, &[])
            }
            Expr::Fork { f, g, h } => {
                self.expr(h, scope)?;
                self.expr(g, scope)?;
                self.expr(f, scope)?;
                self.emit(Op::Tr3d, &[])
            }
            Expr::Block(block) => {
                let index = self.reserve_block(block, Scope::new(Some(Rc::clone(scope))));
                self.emit(Op::Dfnd, &[index])
            }
        }
    }
}

fn undefined(name: &str) -> Error {
    Error::undefined_name(format!("{name} is not defined"))
}

/// Reject empty destructuring lists and names bound twice by one target
fn check_target(target: &Target) -> Result<(), Error> {
    fn non_empty(target: &Target) -> bool {
        match target {
            Target::Name(_) => true,
            Target::List(items) => !items.is_empty() && items.iter().all(non_empty),
        }
    }
    if !non_empty(target) {
        return Err(Error::compile("cannot assign to an empty list"));
    }
    let names = target.names();
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(Error::compile(format!("{name} appears twice in one target")));
        }
    }
    Ok(())
}
