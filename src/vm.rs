//! Execution of compiled programs.
//!
//! The VM never interprets bytecode at call time. [`Machine::new`] walks each
//! block's instruction slice once, replaying the stack effects on a symbolic
//! stack whose entries are boxed closures, and keeps the resulting statement
//! list as that block's compiled form. Every call of the block, recursive or
//! not, reuses it; a call only allocates a fresh [`Frame`].
//!
//! Blocks are lowered from the highest index down. A literal's index is always
//! greater than that of the block defining it, so by the time a `DFND` is
//! lowered its target block is already compiled.

use crate::compiler::{Op, Program};
use crate::function::{DyadicOp, Function, MonadicOp, OperationFn, WeakFunction};
use crate::value::Value;
use crate::{Error, MAX_CALL_DEPTH, Span};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, trace};

/// Runtime options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Bound on nested block invocations; exceeding it is a Runtime error
    pub max_call_depth: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            max_call_depth: MAX_CALL_DEPTH,
        }
    }
}

/// One activation of a block: its slots and the frame it was defined in
pub struct Frame {
    slots: RefCell<Vec<Option<Value>>>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    fn new(size: usize, parent: Option<Rc<Frame>>) -> Rc<Frame> {
        Rc::new(Frame {
            slots: RefCell::new(vec![None; size]),
            parent,
        })
    }

    /// Value of `slot`, or `None` if out of range or never set
    pub fn get(&self, slot: usize) -> Option<Value> {
        self.slots.borrow().get(slot).cloned().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ancestor(&self, depth: usize) -> Result<&Frame, Error> {
        let mut frame = self;
        for _ in 0..depth {
            frame = frame
                .parent
                .as_deref()
                .ok_or_else(|| Error::runtime(format!("no frame {depth} levels out")))?;
        }
        Ok(frame)
    }

    fn read(&self, depth: usize, slot: usize) -> Result<Value, Error> {
        self.ancestor(depth)?
            .get(slot)
            .ok_or_else(|| Error::runtime(format!("variable {depth}:{slot} read before it was set")))
    }

    fn write(&self, depth: usize, slot: usize, value: Value, fresh: bool) -> Result<(), Error> {
        let frame = self.ancestor(depth)?;
        let mut slots = frame.slots.borrow_mut();
        let cell = slots
            .get_mut(slot)
            .ok_or_else(|| Error::runtime(format!("slot {slot} outside its frame")))?;
        if !fresh && cell.is_none() {
            return Err(Error::runtime(format!(
                "variable {depth}:{slot} updated before it was defined"
            )));
        }
        *cell = Some(value);
        Ok(())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("slots", &self.slots.borrow())
            .field("nested", &self.parent.is_some())
            .finish()
    }
}

/// Closure computing one value in a frame
type Node = Box<dyn Fn(&Rc<Frame>) -> Result<Value, Error>>;

enum TargetRef {
    Slot { depth: usize, slot: usize },
    List(Vec<TargetRef>),
}

impl TargetRef {
    fn store(&self, frame: &Frame, value: Value, fresh: bool) -> Result<(), Error> {
        match self {
            TargetRef::Slot { depth, slot } => frame.write(*depth, *slot, value, fresh),
            TargetRef::List(targets) => {
                let Value::Array(array) = &value else {
                    return Err(Error::length(format!(
                        "cannot destructure a {} into {} names",
                        value.type_name(),
                        targets.len()
                    )));
                };
                let cells = array.major_cells()?;
                if cells.len() != targets.len() {
                    return Err(Error::length(format!(
                        "cannot destructure {} cells into {} names",
                        cells.len(),
                        targets.len()
                    )));
                }
                for (target, cell) in targets.iter().zip(cells) {
                    target.store(frame, cell, fresh)?;
                }
                Ok(())
            }
        }
    }

    fn load(&self, frame: &Frame) -> Result<Value, Error> {
        match self {
            TargetRef::Slot { depth, slot } => frame.read(*depth, *slot),
            TargetRef::List(_) => Err(Error::runtime("cannot modify a destructuring target")),
        }
    }
}

enum Sym {
    Value(Node),
    Target(TargetRef),
}

enum Step {
    Eval(Node, Option<Span>),
    /// Continue when `test` is non-zero, otherwise return `fallback`
    Guard {
        test: Node,
        fallback: Node,
        span: Option<Span>,
    },
    Return(Node, Option<Span>),
}

/// A block lowered into closures, shared by every function value created from it
pub struct CompiledBlock {
    index: usize,
    frame_size: usize,
    max_call_depth: usize,
    steps: Vec<Step>,
}

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of call depth for the duration of an invocation
struct DepthGuard;

impl DepthGuard {
    fn enter(limit: usize) -> Result<DepthGuard, Error> {
        CALL_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= limit {
                return Err(Error::runtime(format!(
                    "call depth limit exceeded (max: {limit})"
                )));
            }
            depth.set(current + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

impl CompiledBlock {
    fn execute(&self, frame: &Rc<Frame>) -> Result<Value, Error> {
        for step in &self.steps {
            match step {
                Step::Eval(node, span) => {
                    node(frame).map_err(|e| e.with_span(*span))?;
                }
                Step::Guard {
                    test,
                    fallback,
                    span,
                } => {
                    let holds = test(frame)
                        .and_then(|v| {
                            v.as_number().map_err(|_| {
                                Error::domain(format!(
                                    "guard test must be a number, got {}",
                                    v.type_name()
                                ))
                            })
                        })
                        .map_err(|e| e.with_span(*span))?;
                    if holds == 0.0 {
                        return fallback(frame).map_err(|e| e.with_span(*span));
                    }
                }
                Step::Return(node, span) => return node(frame).map_err(|e| e.with_span(*span)),
            }
        }
        Err(Error::runtime(format!("block {} has no return", self.index)))
    }

    fn invoke(
        &self,
        this: Function,
        y: Value,
        x: Option<Value>,
        parent: &Rc<Frame>,
    ) -> Result<Value, Error> {
        let _depth = DepthGuard::enter(self.max_call_depth)?;
        trace!(target: "tacit::vm", block = self.index, dyadic = x.is_some(), "invoke");
        let frame = Frame::new(self.frame_size, Some(Rc::clone(parent)));
        {
            let mut slots = frame.slots.borrow_mut();
            slots[0] = Some(Value::Function(this));
            slots[1] = Some(y);
            slots[2] = x;
        }
        self.execute(&frame)
    }
}

/// A function value for `block`, closing over `parent`
fn instantiate(block: &Rc<CompiledBlock>, parent: &Rc<Frame>) -> Function {
    let block = Rc::clone(block);
    let parent = Rc::clone(parent);
    let name = format!("{{block {}}}", block.index);
    Function::new_cyclic(name, move |this: WeakFunction| {
        let main: Rc<OperationFn> = Rc::new(move |y: Value, x: Option<Value>| {
            let this = this
                .upgrade()
                .ok_or_else(|| Error::runtime("block function called after release"))?;
            block.invoke(this, y, x, &parent)
        });
        main
    })
}

/// Calling data returns the data itself
fn call_value(f: Value, y: Value, x: Option<Value>) -> Result<Value, Error> {
    match f {
        Value::Function(f) => f.call(y, x),
        data => Ok(data),
    }
}

fn malformed(pc: usize, what: &str) -> Error {
    Error::runtime(format!("malformed bytecode at {pc}: {what}"))
}

struct Lowering<'a> {
    program: &'a Program,
    stack: Vec<Sym>,
    pc: usize,
}

impl Lowering<'_> {
    fn word(&mut self) -> Result<usize, Error> {
        let word = self
            .program
            .code
            .get(self.pc)
            .ok_or_else(|| malformed(self.pc, "truncated instruction"))?;
        self.pc += 1;
        Ok(*word as usize)
    }

    fn pop_value(&mut self) -> Result<Node, Error> {
        match self.stack.pop() {
            Some(Sym::Value(node)) => Ok(node),
            Some(Sym::Target(_)) => Err(malformed(self.pc, "expected a value, found a target")),
            None => Err(malformed(self.pc, "stack underflow")),
        }
    }

    fn pop_target(&mut self) -> Result<TargetRef, Error> {
        match self.stack.pop() {
            Some(Sym::Target(target)) => Ok(target),
            Some(Sym::Value(_)) => Err(malformed(self.pc, "expected a target, found a value")),
            None => Err(malformed(self.pc, "stack underflow")),
        }
    }

    fn push(&mut self, node: Node) {
        self.stack.push(Sym::Value(node));
    }
}

/// Lower block `index` into closures; blocks it defines must be in `compiled`
fn lower_block(
    program: &Program,
    index: usize,
    compiled: &[Option<Rc<CompiledBlock>>],
    config: RunConfig,
) -> Result<CompiledBlock, Error> {
    let info = program.blocks[index];
    let mut lowering = Lowering {
        program,
        stack: Vec::new(),
        pc: info.start,
    };
    let mut steps = Vec::new();
    let mut guard_test: Option<Node> = None;

    loop {
        let at = lowering.pc;
        let span = program.locations.get(at).copied().flatten();
        let word = lowering.word()?;
        let op = Op::decode(word as u32).ok_or_else(|| malformed(at, "unknown opcode"))?;
        match op {
            Op::Push => {
                let k = lowering.word()?;
                let value = program
                    .constants
                    .get(k)
                    .cloned()
                    .ok_or_else(|| malformed(at, "constant out of range"))?;
                lowering.push(Box::new(move |_| Ok(value.clone())));
            }
            Op::Dfnd => {
                let b = lowering.word()?;
                let child = compiled
                    .get(b)
                    .and_then(Option::clone)
                    .filter(|_| b > index)
                    .ok_or_else(|| malformed(at, "block defined out of order"))?;
                lowering.push(Box::new(move |frame| {
                    Ok(Value::Function(instantiate(&child, frame)))
                }));
            }
            Op::Varo => {
                let depth = lowering.word()?;
                let slot = lowering.word()?;
                lowering.push(Box::new(move |frame| frame.read(depth, slot)));
            }
            Op::Varm => {
                let depth = lowering.word()?;
                let slot = lowering.word()?;
                lowering.stack.push(Sym::Target(TargetRef::Slot { depth, slot }));
            }
            Op::Arro => {
                let n = lowering.word()?;
                let mut items = (0..n)
                    .map(|_| lowering.pop_value())
                    .collect::<Result<Vec<_>, _>>()?;
                items.reverse();
                lowering.push(Box::new(move |frame| {
                    let values = items
                        .iter()
                        .map(|item| item(frame))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Value::from(values))
                }));
            }
            Op::Arrm => {
                let n = lowering.word()?;
                let mut targets = (0..n)
                    .map(|_| lowering.pop_target())
                    .collect::<Result<Vec<_>, _>>()?;
                targets.reverse();
                lowering.stack.push(Sym::Target(TargetRef::List(targets)));
            }
            Op::Fn1c => {
                let f = lowering.pop_value()?;
                let y = lowering.pop_value()?;
                lowering.push(Box::new(move |frame| {
                    let y = y(frame)?;
                    call_value(f(frame)?, y, None)
                }));
            }
            Op::Fn2c => {
                let x = lowering.pop_value()?;
                let f = lowering.pop_value()?;
                let y = lowering.pop_value()?;
                lowering.push(Box::new(move |frame| {
                    let y = y(frame)?;
                    let f = f(frame)?;
                    call_value(f, y, Some(x(frame)?))
                }));
            }
            Op::Tr2d => {
                let f = lowering.pop_value()?;
                let g = lowering.pop_value()?;
                lowering.push(Box::new(move |frame| {
                    let g = g(frame)?.to_function();
                    let f = f(frame)?.to_function();
                    Ok(Value::Function(Function::atop(&f, &g)))
                }));
            }
            Op::Tr3d => {
                let f = lowering.pop_value()?;
                let g = lowering.pop_value()?;
                let h = lowering.pop_value()?;
                lowering.push(Box::new(move |frame| {
                    let h = h(frame)?.to_function();
                    let g = g(frame)?.to_function();
                    let f = f(frame)?.to_function();
                    Ok(Value::Function(Function::fork(&f, &g, &h)))
                }));
            }
            Op::Md1c => {
                let k = lowering.word()?;
                let modifier = MonadicOp::from_index(k as u32)
                    .ok_or_else(|| malformed(at, "unknown one-modifier"))?;
                let operand = lowering.pop_value()?;
                lowering.push(Box::new(move |frame| {
                    Ok(Value::Function(modifier.apply(&operand(frame)?)?))
                }));
            }
            Op::Md2c => {
                let k = lowering.word()?;
                let modifier = DyadicOp::from_index(k as u32)
                    .ok_or_else(|| malformed(at, "unknown two-modifier"))?;
                let f = lowering.pop_value()?;
                let g = lowering.pop_value()?;
                lowering.push(Box::new(move |frame| {
                    let g = g(frame)?;
                    let f = f(frame)?;
                    Ok(Value::Function(modifier.apply(&f, &g)?))
                }));
            }
            Op::Setn | Op::Setu => {
                let fresh = op == Op::Setn;
                let target = lowering.pop_target()?;
                let value = lowering.pop_value()?;
                lowering.push(Box::new(move |frame| {
                    let value = value(frame)?;
                    target.store(frame, value.clone(), fresh)?;
                    Ok(value)
                }));
            }
            Op::Setm => {
                let target = lowering.pop_target()?;
                let f = lowering.pop_value()?;
                let arg = lowering.pop_value()?;
                lowering.push(Box::new(move |frame| {
                    let arg = arg(frame)?;
                    let f = f(frame)?;
                    let current = target.load(frame)?;
                    let value = call_value(f, arg, Some(current))?;
                    target.store(frame, value.clone(), false)?;
                    Ok(value)
                }));
            }
            Op::Setc => {
                let target = lowering.pop_target()?;
                let f = lowering.pop_value()?;
                lowering.push(Box::new(move |frame| {
                    let f = f(frame)?;
                    let current = target.load(frame)?;
                    let value = call_value(f, current, None)?;
                    target.store(frame, value.clone(), false)?;
                    Ok(value)
                }));
            }
            Op::Pops => {
                let node = lowering.pop_value()?;
                steps.push(Step::Eval(node, span));
            }
            Op::Retn => {
                let node = lowering.pop_value()?;
                steps.push(Step::Return(node, span));
                break;
            }
            Op::Pred => {
                if guard_test.is_some() {
                    return Err(malformed(at, "nested guard"));
                }
                guard_test = Some(lowering.pop_value()?);
            }
            Op::Gret => {
                let fallback = lowering.pop_value()?;
                let test = guard_test
                    .take()
                    .ok_or_else(|| malformed(at, "guard return without a test"))?;
                steps.push(Step::Guard {
                    test,
                    fallback,
                    span,
                });
            }
        }
    }

    if !lowering.stack.is_empty() || guard_test.is_some() {
        return Err(malformed(lowering.pc, "block left values on the stack"));
    }
    debug!(target: "tacit::vm", block = index, steps = steps.len(), "lowered block");
    Ok(CompiledBlock {
        index,
        frame_size: info.frame_size,
        max_call_depth: config.max_call_depth,
        steps,
    })
}

/// A program with every block lowered, runnable any number of times
pub struct Machine {
    blocks: Vec<Rc<CompiledBlock>>,
    externals: usize,
}

impl Machine {
    pub fn new(program: &Program, config: RunConfig) -> Result<Machine, Error> {
        let count = program.blocks.len();
        if count == 0 {
            return Err(Error::runtime("program has no blocks"));
        }
        let mut compiled: Vec<Option<Rc<CompiledBlock>>> = vec![None; count];
        for index in (0..count).rev() {
            compiled[index] = Some(Rc::new(lower_block(program, index, &compiled, config)?));
        }
        let blocks = compiled.into_iter().flatten().collect();
        Ok(Machine {
            blocks,
            externals: program.external_count(),
        })
    }

    /// Number of blocks lowered into closures; fixed once the machine exists
    pub fn compiled_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Run the top-level block with `globals` bound to the program's external names.
    ///
    /// Returns the program's value and the global frame, whose slots hold the
    /// top-level bindings listed by [`Program::globals`].
    pub fn run(&self, globals: Vec<Value>) -> Result<(Value, Rc<Frame>), Error> {
        if globals.len() != self.externals {
            return Err(Error::runtime(format!(
                "program expects {} initial globals, got {}",
                self.externals,
                globals.len()
            )));
        }
        let top = &self.blocks[0];
        let frame = Frame::new(top.frame_size, None);
        {
            let mut slots = frame.slots.borrow_mut();
            for (slot, value) in slots.iter_mut().skip(crate::compiler::RESERVED_SLOTS).zip(globals) {
                *slot = Some(value);
            }
        }
        debug!(target: "tacit::vm", blocks = self.blocks.len(), "run start");
        let value = top.execute(&frame)?;
        debug!(target: "tacit::vm", "run finished");
        Ok((value, frame))
    }
}

/// Run `program` with the default [`RunConfig`]
pub fn run(program: &Program, globals: Vec<Value>) -> Result<(Value, Rc<Frame>), Error> {
    run_with_config(program, globals, RunConfig::default())
}

pub fn run_with_config(
    program: &Program,
    globals: Vec<Value>,
    config: RunConfig,
) -> Result<(Value, Rc<Frame>), Error> {
    Machine::new(program, config)?.run(globals)
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::ast::{Block, Expr, Special, Stmt, Target};
    use crate::builtinops::Primitives;
    use crate::compiler::compile;
    use crate::value::val;

    fn y() -> Expr {
        Expr::Special(Special::Right)
    }

    fn this() -> Expr {
        Expr::Special(Special::This)
    }

    fn plus(x: Expr, y: Expr) -> Expr {
        Expr::call2(Expr::prim("+"), x, y)
    }

    fn minus(x: Expr, y: Expr) -> Expr {
        Expr::call2(Expr::prim("-"), x, y)
    }

    fn eval(stmts: Vec<Stmt>) -> Result<Value, Error> {
        let program = compile(&Block::new(stmts), &Primitives::standard(), &[])?;
        run(&program, Vec::new()).map(|(value, _)| value)
    }

    /// {𝕩 = 0 ? acc ⋄ 𝕊 𝕩 - 1} style countdown summing 1..n
    fn sum_to() -> Expr {
        Expr::block(vec![
            Stmt::guard(Expr::call2(Expr::prim("≠"), y(), Expr::num(0.0)), Expr::num(0.0)),
            Stmt::expr(plus(y(), Expr::call1(this(), minus(y(), Expr::num(1.0))))),
        ])
    }

    #[test]
    fn test_arithmetic_and_lists() {
        let value = eval(vec![Stmt::expr(plus(
            Expr::list(vec![Expr::num(1.0), Expr::num(2.0), Expr::num(3.0)]),
            Expr::num(10.0),
        ))])
        .unwrap();
        assert_eq!(value, val(vec![11, 12, 13]));
        assert_eq!(eval(vec![]).unwrap(), Value::nil());
    }

    #[test]
    fn test_recursion_reuses_compiled_block() {
        let program = compile(
            &Block::new(vec![
                Stmt::define("sum", sum_to()),
                Stmt::expr(Expr::call1(Expr::name("sum"), Expr::num(20.0))),
            ]),
            &Primitives::standard(),
            &[],
        )
        .unwrap();
        let machine = Machine::new(&program, RunConfig::default()).unwrap();
        assert_eq!(machine.compiled_blocks(), 2);
        let (value, _) = machine.run(Vec::new()).unwrap();
        assert_eq!(value, val(210));
        // twenty self-calls later, still only the blocks lowered up front
        assert_eq!(machine.compiled_blocks(), 2);
        let (again, _) = machine.run(Vec::new()).unwrap();
        assert_eq!(again, val(210));
    }

    #[test]
    fn test_guard_polarity() {
        let guarded = |test: Expr| {
            eval(vec![
                Stmt::guard(test, Expr::string("fallback")),
                Stmt::expr(Expr::string("main")),
            ])
        };
        assert_eq!(guarded(Expr::num(0.0)).unwrap(), Value::string("fallback"));
        assert_eq!(guarded(Expr::num(1.0)).unwrap(), Value::string("main"));
        assert_eq!(guarded(Expr::num(-2.5)).unwrap(), Value::string("main"));
        let err = guarded(Expr::char('a')).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Domain);
    }

    #[test]
    fn test_guard_skips_remaining_statements() {
        // n ← 1 ⋄ {0 ? 5 ⋄ n ↩ 2} 0 ⋄ n
        let block = Expr::block(vec![
            Stmt::guard(Expr::num(0.0), Expr::num(5.0)),
            Stmt::assign("n", Expr::num(2.0)),
        ]);
        let value = eval(vec![
            Stmt::define("n", Expr::num(1.0)),
            Stmt::expr(Expr::call1(block, Expr::num(0.0))),
            Stmt::expr(Expr::name("n")),
        ])
        .unwrap();
        assert_eq!(value, val(1));
    }

    #[test]
    fn test_call_depth_limit() {
        // {𝕊 𝕩}: never terminates
        let program = compile(
            &Block::new(vec![Stmt::expr(Expr::call1(
                Expr::block(vec![Stmt::expr(Expr::call1(this(), y()))]),
                Expr::num(1.0),
            ))]),
            &Primitives::standard(),
            &[],
        )
        .unwrap();
        let config = RunConfig { max_call_depth: 40 };
        let err = run_with_config(&program, Vec::new(), config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert!(err.message.contains("depth"), "{err}");

        // the counter unwinds with the error
        let program = compile(
            &Block::new(vec![
                Stmt::define("sum", sum_to()),
                Stmt::expr(Expr::call1(Expr::name("sum"), Expr::num(30.0))),
            ]),
            &Primitives::standard(),
            &[],
        )
        .unwrap();
        let (value, _) = run_with_config(&program, Vec::new(), config).unwrap();
        assert_eq!(value, val(465));
    }

    #[test]
    fn test_default_depth_limit_on_test_thread() {
        let sum = |n: f64| {
            eval(vec![
                Stmt::define("sum", sum_to()),
                Stmt::expr(Expr::call1(Expr::name("sum"), Expr::num(n))),
            ])
        };
        // n + 1 nested invocations, just under the default bound
        let n = (MAX_CALL_DEPTH - 1) as f64;
        assert_eq!(sum(n).unwrap(), val(n * (n + 1.0) / 2.0));

        // past the default bound: an error value, not a stack overflow
        let err = sum(10.0 * MAX_CALL_DEPTH as f64).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert!(err.message.contains(&format!("max: {MAX_CALL_DEPTH}")), "{err}");

        let err = eval(vec![Stmt::expr(Expr::call1(
            Expr::block(vec![Stmt::expr(Expr::call1(this(), y()))]),
            Expr::num(1.0),
        ))])
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
    }

    #[test]
    fn test_closures_capture_defining_frame() {
        // Adder ← {n ← 𝕩 ⋄ {n + 𝕩}} ⋄ add3 ← Adder 3 ⋄ (Adder 10) (add3 1)
        let adder = Expr::block(vec![
            Stmt::define("n", y()),
            Stmt::expr(Expr::block(vec![Stmt::expr(plus(Expr::name("n"), y()))])),
        ]);
        let value = eval(vec![
            Stmt::define("adder", adder),
            Stmt::define("add3", Expr::call1(Expr::name("adder"), Expr::num(3.0))),
            Stmt::expr(Expr::call1(
                Expr::call1(Expr::name("adder"), Expr::num(10.0)),
                Expr::call1(Expr::name("add3"), Expr::num(1.0)),
            )),
        ])
        .unwrap();
        assert_eq!(value, val(14));
    }

    #[test]
    fn test_destructuring_and_modify() {
        let pair = || Expr::list(vec![Expr::num(1.0), Expr::num(2.0)]);
        let target = || Target::List(vec![Target::from("a"), Target::from("b")]);
        let value = eval(vec![
            Stmt::define(target(), pair()),
            Stmt::modify("a", Expr::prim("+"), Some(Expr::num(10.0))),
            Stmt::modify("b", Expr::prim("-"), None),
            Stmt::expr(Expr::list(vec![Expr::name("a"), Expr::name("b")])),
        ])
        .unwrap();
        assert_eq!(value, val(vec![11, -2]));

        // modify passes the current value as the left argument
        let value = eval(vec![
            Stmt::define("n", Expr::num(10.0)),
            Stmt::modify("n", Expr::prim("-"), Some(Expr::num(3.0))),
            Stmt::expr(Expr::name("n")),
        ])
        .unwrap();
        assert_eq!(value, val(7));

        let err = eval(vec![Stmt::define(
            target(),
            Expr::list(vec![Expr::num(1.0), Expr::num(2.0), Expr::num(3.0)]),
        )])
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Length);
        let err = eval(vec![Stmt::define(target(), Expr::num(1.0))]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Length);
    }

    #[test]
    fn test_assignment_in_outer_frame() {
        // n ← 0 ⋄ Inc ← {n ↩ n + 𝕩} ⋄ Inc 2 ⋄ Inc 3 ⋄ n
        let value = eval(vec![
            Stmt::define("n", Expr::num(0.0)),
            Stmt::define(
                "inc",
                Expr::block(vec![Stmt::assign("n", plus(Expr::name("n"), y()))]),
            ),
            Stmt::expr(Expr::call1(Expr::name("inc"), Expr::num(2.0))),
            Stmt::expr(Expr::call1(Expr::name("inc"), Expr::num(3.0))),
            Stmt::expr(Expr::name("n")),
        ])
        .unwrap();
        assert_eq!(value, val(5));
    }

    #[test]
    fn test_runtime_errors_carry_statement_span() {
        let program = compile(
            &Block::new(vec![
                Stmt::define("a", Expr::num(1.0)).at(Span::new(0, 5)),
                Stmt::expr(Expr::call2(
                    Expr::prim("⊑"),
                    Expr::num(9.0),
                    Expr::list(vec![Expr::num(1.0), Expr::num(2.0)]),
                ))
                .at(Span::new(6, 14)),
            ]),
            &Primitives::standard(),
            &[],
        )
        .unwrap();
        let err = run(&program, Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Index);
        assert_eq!(err.span, Some(Span::new(6, 14)));
    }

    #[test]
    fn test_left_argument_unset_in_prefix_call() {
        let block = Expr::block(vec![Stmt::expr(Expr::Special(Special::Left))]);
        let err = eval(vec![Stmt::expr(Expr::call1(block.clone(), Expr::num(1.0)))]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        let value = eval(vec![Stmt::expr(Expr::call2(block, Expr::num(4.0), Expr::num(1.0)))]).unwrap();
        assert_eq!(value, val(4));
    }

    #[test]
    fn test_data_called_as_function_is_constant() {
        let value = eval(vec![Stmt::expr(Expr::call1(Expr::num(7.0), Expr::num(1.0)))]).unwrap();
        assert_eq!(value, val(7));
    }

    #[test]
    fn test_initial_globals() {
        let program = compile(
            &Block::new(vec![
                Stmt::define("c", plus(Expr::name("a"), Expr::name("b"))),
                Stmt::expr(Expr::name("c")),
            ]),
            &Primitives::standard(),
            &["a", "b"],
        )
        .unwrap();
        let (value, globals) = run(&program, vec![val(2), val(5)]).unwrap();
        assert_eq!(value, val(7));
        let slots: Vec<Option<Value>> = program
            .globals()
            .iter()
            .map(|(_, slot)| globals.get(*slot))
            .collect();
        assert_eq!(slots, vec![Some(val(2)), Some(val(5)), Some(val(7))]);

        let err = run(&program, vec![val(1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
    }

    #[test]
    fn test_trains_and_modifiers() {
        // (+´ ÷ ≠) ⟨2, 4, 6⟩
        let mean = Expr::fork(
            Expr::mod1('´', Expr::prim("+")),
            Expr::prim("÷"),
            Expr::prim("≠"),
        );
        let value = eval(vec![Stmt::expr(Expr::call1(
            mean,
            Expr::list(vec![Expr::num(2.0), Expr::num(4.0), Expr::num(6.0)]),
        ))])
        .unwrap();
        assert_eq!(value, val(4));

        // -∘⌽ ⟨1, 2⟩
        let value = eval(vec![Stmt::expr(Expr::call1(
            Expr::mod2('∘', Expr::prim("-"), Expr::prim("⌽")),
            Expr::list(vec![Expr::num(1.0), Expr::num(2.0)]),
        ))])
        .unwrap();
        assert_eq!(value, val(vec![-2, -1]));

        let err = eval(vec![Stmt::expr(Expr::mod2('⌾', Expr::prim("-"), Expr::prim("⊣")))])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndoUnavailable);
    }
}
