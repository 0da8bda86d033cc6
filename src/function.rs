//! Ambivalent function values and the combinators that build new ones.
//!
//! Every callable in a running program is a [`Function`]: a named pair of
//! `main` and optional `undo` callables sharing one calling convention,
//! `call(y, x?)`. `y` is the right argument, `x` the optional left one; a call
//! without `x` is a prefix call. Primitives, block literals and the results of
//! combinators are indistinguishable to callers.
//!
//! Modifiers are dispatched through two fixed operator tables,
//! [`MonadicOp`] and [`DyadicOp`], whose discriminants are the operands of
//! the `MD1C` / `MD2C` instructions.

use crate::Error;
use crate::array::{Array, Shape, checked_count};
use crate::value::Value;
use std::rc::{Rc, Weak};

/// Erased ambivalent callable: `(y, x?) -> result`
pub type OperationFn = dyn Fn(Value, Option<Value>) -> Result<Value, Error>;

struct FunctionInner {
    name: String,
    main: Rc<OperationFn>,
    undo: Option<Rc<OperationFn>>,
}

/// Shared handle to a function value
#[derive(Clone)]
pub struct Function(Rc<FunctionInner>);

/// Non-owning handle a block function keeps to itself for its self slot
#[derive(Clone)]
pub struct WeakFunction(Weak<FunctionInner>);

impl WeakFunction {
    pub fn upgrade(&self) -> Option<Function> {
        self.0.upgrade().map(Function)
    }
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        main: impl Fn(Value, Option<Value>) -> Result<Value, Error> + 'static,
    ) -> Function {
        Function::from_parts(name, Rc::new(main), None)
    }

    pub fn with_undo(
        name: impl Into<String>,
        main: impl Fn(Value, Option<Value>) -> Result<Value, Error> + 'static,
        undo: impl Fn(Value, Option<Value>) -> Result<Value, Error> + 'static,
    ) -> Function {
        Function::from_parts(name, Rc::new(main), Some(Rc::new(undo)))
    }

    pub fn from_parts(
        name: impl Into<String>,
        main: Rc<OperationFn>,
        undo: Option<Rc<OperationFn>>,
    ) -> Function {
        Function(Rc::new(FunctionInner {
            name: name.into(),
            main,
            undo,
        }))
    }

    /// Build a function whose body can reach the function itself
    pub fn new_cyclic<B>(name: impl Into<String>, build: B) -> Function
    where
        B: FnOnce(WeakFunction) -> Rc<OperationFn>,
    {
        let name = name.into();
        Function(Rc::new_cyclic(|weak| FunctionInner {
            name,
            main: build(WeakFunction(weak.clone())),
            undo: None,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn call(&self, y: Value, x: Option<Value>) -> Result<Value, Error> {
        (self.0.main)(y, x)
    }

    pub fn has_undo(&self) -> bool {
        self.0.undo.is_some()
    }

    pub fn call_undo(&self, y: Value, x: Option<Value>) -> Result<Value, Error> {
        match &self.0.undo {
            Some(undo) => undo(y, x),
            None => Err(self.undo_unavailable()),
        }
    }

    /// The inverse as a function of its own, whose inverse is `self`
    pub fn inverse(&self) -> Result<Function, Error> {
        let undo = self.0.undo.clone().ok_or_else(|| self.undo_unavailable())?;
        Ok(Function::from_parts(
            format!("{}⁼", self.name()),
            undo,
            Some(Rc::clone(&self.0.main)),
        ))
    }

    fn undo_unavailable(&self) -> Error {
        Error::undo_unavailable(format!("{} has no declared inverse", self.name()))
    }

    /// Identity of the underlying function object
    pub fn same(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Ignore both arguments and return `value`
    pub fn constant(value: Value) -> Function {
        let name = format!("{value}˙");
        Function::new(name, move |_, _| Ok(value.clone()))
    }

    /// `F∘G`: `F(G(y, x))`, inverse `G⁻¹(F⁻¹(y), x)` when both invert
    pub fn atop(f: &Function, g: &Function) -> Function {
        let name = format!("({}{})", f.name(), g.name());
        let (mf, mg) = (f.clone(), g.clone());
        let main = move |y, x| mf.call(mg.call(y, x)?, None);
        if f.has_undo() && g.has_undo() {
            let (uf, ug) = (f.clone(), g.clone());
            let undo = move |y, x| ug.call_undo(uf.call_undo(y, None)?, x);
            Function::with_undo(name, main, undo)
        } else {
            Function::new(name, main)
        }
    }

    /// Three-function train: `G(F(y, x), H(y, x))`, F's result on the left
    pub fn fork(f: &Function, g: &Function, h: &Function) -> Function {
        let name = format!("({}{}{})", f.name(), g.name(), h.name());
        let (f, g, h) = (f.clone(), g.clone(), h.clone());
        Function::new(name, move |y: Value, x: Option<Value>| {
            let right = h.call(y.clone(), x.clone())?;
            let left = f.call(y, x)?;
            g.call(right, Some(left))
        })
    }

    /// `F○G`: `F(G(y), G(x))`
    pub fn over(f: &Function, g: &Function) -> Function {
        let name = format!("({}○{})", f.name(), g.name());
        let (f, g) = (f.clone(), g.clone());
        Function::new(name, move |y, x: Option<Value>| {
            let gy = g.call(y, None)?;
            let gx = x.map(|x| g.call(x, None)).transpose()?;
            f.call(gy, gx)
        })
    }

    /// `F⌾G`: `G⁻¹(F(G(y, x)))`; fails here if G has no inverse
    pub fn under(f: &Function, g: &Function) -> Result<Function, Error> {
        if !g.has_undo() {
            return Err(g.undo_unavailable());
        }
        let name = format!("({}⌾{})", f.name(), g.name());
        let (mf, mg) = (f.clone(), g.clone());
        let main = move |y, x| mg.call_undo(mf.call(mg.call(y, x)?, None)?, None);
        if f.has_undo() {
            let (uf, ug) = (f.clone(), g.clone());
            let undo = move |y, x| ug.call_undo(uf.call_undo(ug.call(y, x)?, None)?, None);
            Ok(Function::with_undo(name, main, undo))
        } else {
            Ok(Function::new(name, main))
        }
    }

    /// `F⎉G`: apply F to the rank-r cells of y (and the matching cells of x),
    /// where r is the integer G returns. Negative r counts from the
    /// argument's rank.
    pub fn rank(f: &Function, g: &Function) -> Function {
        let name = format!("({}⎉{})", f.name(), g.name());
        let (f, g) = (f.clone(), g.clone());
        Function::new(name, move |y: Value, x: Option<Value>| {
            let r = g.call(y.clone(), x.clone())?.as_integer()?;
            apply_at_rank(&f, y, x, r)
        })
    }

    /// `F⊸G`: `G(y, F(x))`, with `x` defaulting to `y`
    pub fn before(f: &Function, g: &Function) -> Function {
        let name = format!("({}⊸{})", f.name(), g.name());
        let (f, g) = (f.clone(), g.clone());
        Function::new(name, move |y: Value, x: Option<Value>| {
            let left = f.call(x.unwrap_or_else(|| y.clone()), None)?;
            g.call(y, Some(left))
        })
    }

    /// `F⟜G`: `F(G(y), x)`, with `x` defaulting to `y`
    pub fn after(f: &Function, g: &Function) -> Function {
        let name = format!("({}⟜{})", f.name(), g.name());
        let (f, g) = (f.clone(), g.clone());
        Function::new(name, move |y: Value, x: Option<Value>| {
            let left = x.unwrap_or_else(|| y.clone());
            f.call(g.call(y, None)?, Some(left))
        })
    }

    /// `F˜`: prefix call is `F(y, y)`, infix call swaps the arguments
    pub fn swap(f: &Function) -> Function {
        let name = format!("{}˜", f.name());
        let f = f.clone();
        Function::new(name, move |y: Value, x: Option<Value>| match x {
            Some(x) => f.call(x, Some(y)),
            None => f.call(y.clone(), Some(y)),
        })
    }

    /// `F¨`: map over the elements of y, or pairs of elements under broadcasting
    pub fn each(f: &Function) -> Function {
        let name = format!("{}¨", f.name());
        let mf = f.clone();
        let main = move |y, x| each_apply(&mf, y, x);
        if f.has_undo() {
            let inverse = f.clone();
            let undo = move |y, x| each_apply(&inverse.inverse()?, y, x);
            Function::with_undo(name, main, undo)
        } else {
            Function::new(name, main)
        }
    }

    /// `F⌜`: every pairing of an element of x with an element of y
    pub fn table(f: &Function) -> Function {
        let name = format!("{}⌜", f.name());
        let f = f.clone();
        Function::new(name, move |y: Value, x: Option<Value>| {
            let Some(x) = x else {
                return each_apply(&f, y, None);
            };
            let (xa, ya) = (x.into_array(), y.into_array());
            let mut shape = Shape::from_slice(xa.shape());
            shape.extend_from_slice(ya.shape());
            let mut results = Vec::with_capacity(checked_count(&shape)?);
            for i in 0..xa.count() {
                let left = xa.pick(i)?;
                for j in 0..ya.count() {
                    results.push(f.call(ya.pick(j)?, Some(left.clone()))?);
                }
            }
            Ok(Value::Array(Array::new(shape, results)?))
        })
    }

    /// `F˘`: apply F to each major cell and merge the results
    pub fn cells(f: &Function) -> Function {
        let name = format!("{}˘", f.name());
        let f = f.clone();
        Function::new(name, move |y: Value, x: Option<Value>| {
            if y.rank() == 0 {
                return Err(Error::rank("cells requires an argument of rank 1 or more"));
            }
            apply_at_rank(&f, y, x, -1)
        })
    }

    /// `F´`: right-to-left reduction over major cells, seeded by x when given
    pub fn fold(f: &Function) -> Function {
        let name = format!("{}´", f.name());
        let f = f.clone();
        Function::new(name, move |y: Value, x: Option<Value>| {
            let Value::Array(ya) = &y else {
                return Err(Error::rank("fold requires an array argument"));
            };
            let mut cells = ya.major_cells()?;
            let mut acc = match x {
                Some(seed) => seed,
                None => cells
                    .pop()
                    .ok_or_else(|| Error::domain("fold of an empty array needs a seed"))?,
            };
            for cell in cells.into_iter().rev() {
                acc = f.call(acc, Some(cell))?;
            }
            Ok(acc)
        })
    }

    /// F`: left-to-right prefix reductions over major cells
    pub fn scan(f: &Function) -> Function {
        let name = format!("{}`", f.name());
        let f = f.clone();
        Function::new(name, move |y: Value, x: Option<Value>| {
            let Value::Array(ya) = &y else {
                return Err(Error::rank("scan requires an array argument"));
            };
            let mut results = Vec::with_capacity(ya.length());
            let mut acc = x;
            for cell in ya.major_cells()? {
                let next = match acc {
                    Some(prev) => f.call(cell, Some(prev))?,
                    None => cell,
                };
                results.push(next.clone());
                acc = Some(next);
            }
            Ok(Value::Array(Array::merge(results, ya.fill(), None)?))
        })
    }
}

fn each_apply(f: &Function, y: Value, x: Option<Value>) -> Result<Value, Error> {
    match x {
        None => {
            let Value::Array(ya) = y else {
                return f.call(y, None);
            };
            let results = (0..ya.count())
                .map(|i| f.call(ya.pick(i)?, None))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(Array::new(Shape::from_slice(ya.shape()), results)?))
        }
        Some(x) => {
            if !x.is_array() && !y.is_array() {
                return f.call(y, Some(x));
            }
            let g = f.clone();
            let zipped = Array::zip(
                &x.into_array(),
                &y.into_array(),
                Rc::new(move |l, r| g.call(r, Some(l))),
            )?;
            Ok(Value::Array(zipped.materialize()?))
        }
    }
}

/// Row-major enumeration of every index tuple within `frame`
fn frame_indices(frame: &[usize]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::with_capacity(frame.len())];
    for &len in frame {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..len).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    out
}

fn apply_at_rank(f: &Function, y: Value, x: Option<Value>, r: i64) -> Result<Value, Error> {
    let ya = y.to_array();
    let rank = ya.rank() as i64;
    let cell_rank = if r < 0 { (rank + r).max(0) } else { r.min(rank) };
    let frame_len = (rank - cell_rank) as usize;
    if frame_len == 0 {
        return f.call(y, x);
    }
    let frame = Shape::from_slice(&ya.shape()[..frame_len]);
    let xa = match &x {
        Some(Value::Array(xa)) if xa.rank() > 0 => {
            if xa.rank() < frame_len || xa.shape()[..frame_len] != frame[..] {
                return Err(Error::length(format!(
                    "left argument shape {:?} does not match the frame {:?}",
                    xa.shape(),
                    frame.as_slice()
                )));
            }
            Some(xa.clone())
        }
        _ => None,
    };
    let mut results = Vec::with_capacity(frame.iter().product());
    for prefix in frame_indices(&frame) {
        let cell = Value::from_cell(ya.select_rank(&prefix)?)?;
        let left = match &xa {
            Some(xa) => Some(Value::from_cell(xa.select_rank(&prefix)?)?),
            None => x.clone(),
        };
        results.push(f.call(cell, left)?);
    }
    Ok(Value::Array(Array::merge(results, None, Some(frame))?))
}

/// One-modifier table; the discriminant is the `MD1C` operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonadicOp {
    Const,
    Swap,
    Each,
    Table,
    Cells,
    Fold,
    Scan,
    Undo,
}

impl MonadicOp {
    pub const ALL: [MonadicOp; 8] = [
        MonadicOp::Const,
        MonadicOp::Swap,
        MonadicOp::Each,
        MonadicOp::Table,
        MonadicOp::Cells,
        MonadicOp::Fold,
        MonadicOp::Scan,
        MonadicOp::Undo,
    ];

    pub fn glyph(self) -> char {
        match self {
            MonadicOp::Const => '˙',
            MonadicOp::Swap => '˜',
            MonadicOp::Each => '¨',
            MonadicOp::Table => '⌜',
            MonadicOp::Cells => '˘',
            MonadicOp::Fold => '´',
            MonadicOp::Scan => '`',
            MonadicOp::Undo => '⁼',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<MonadicOp> {
        MonadicOp::ALL.into_iter().find(|op| op.glyph() == glyph)
    }

    pub fn from_index(index: u32) -> Option<MonadicOp> {
        MonadicOp::ALL.get(index as usize).copied()
    }

    /// Derive a function from the operand; data operands are frozen with const
    pub fn apply(self, operand: &Value) -> Result<Function, Error> {
        let f = operand.to_function();
        Ok(match self {
            MonadicOp::Const => Function::constant(operand.clone()),
            MonadicOp::Swap => Function::swap(&f),
            MonadicOp::Each => Function::each(&f),
            MonadicOp::Table => Function::table(&f),
            MonadicOp::Cells => Function::cells(&f),
            MonadicOp::Fold => Function::fold(&f),
            MonadicOp::Scan => Function::scan(&f),
            MonadicOp::Undo => f.inverse()?,
        })
    }
}

/// Two-modifier table; the discriminant is the `MD2C` operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DyadicOp {
    Atop,
    Over,
    Under,
    Rank,
    Before,
    After,
}

impl DyadicOp {
    pub const ALL: [DyadicOp; 6] = [
        DyadicOp::Atop,
        DyadicOp::Over,
        DyadicOp::Under,
        DyadicOp::Rank,
        DyadicOp::Before,
        DyadicOp::After,
    ];

    pub fn glyph(self) -> char {
        match self {
            DyadicOp::Atop => '∘',
            DyadicOp::Over => '○',
            DyadicOp::Under => '⌾',
            DyadicOp::Rank => '⎉',
            DyadicOp::Before => '⊸',
            DyadicOp::After => '⟜',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<DyadicOp> {
        DyadicOp::ALL.into_iter().find(|op| op.glyph() == glyph)
    }

    pub fn from_index(index: u32) -> Option<DyadicOp> {
        DyadicOp::ALL.get(index as usize).copied()
    }

    pub fn apply(self, f: &Value, g: &Value) -> Result<Function, Error> {
        let (f, g) = (f.to_function(), g.to_function());
        Ok(match self {
            DyadicOp::Atop => Function::atop(&f, &g),
            DyadicOp::Over => Function::over(&f, &g),
            DyadicOp::Under => Function::under(&f, &g)?,
            DyadicOp::Rank => Function::rank(&f, &g),
            DyadicOp::Before => Function::before(&f, &g),
            DyadicOp::After => Function::after(&f, &g),
        })
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Function({})", self.name())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::value::val;
    use smallvec::smallvec;

    fn identity() -> Function {
        Function::with_undo("⊢", |y, _| Ok(y), |y, _| Ok(y))
    }

    fn num_fn(name: &str, op: fn(f64, Option<f64>) -> f64) -> Function {
        Function::new(name, move |y: Value, x: Option<Value>| {
            let x = x.map(|x| x.as_number()).transpose()?;
            Ok(Value::Number(op(y.as_number()?, x)))
        })
    }

    fn plus() -> Function {
        num_fn("+", |y, x| x.unwrap_or(0.0) + y)
    }

    fn minus() -> Function {
        Function::with_undo(
            "-",
            |y: Value, x: Option<Value>| {
                let y = y.as_number()?;
                Ok(Value::Number(match x {
                    Some(x) => x.as_number()? - y,
                    None => -y,
                }))
            },
            |y: Value, _| Ok(Value::Number(-y.as_number()?)),
        )
    }

    fn times() -> Function {
        num_fn("×", |y, x| x.unwrap_or(1.0) * y)
    }

    fn double() -> Function {
        Function::with_undo(
            "double",
            |y: Value, _| Ok(Value::Number(y.as_number()? * 2.0)),
            |y: Value, _| Ok(Value::Number(y.as_number()? / 2.0)),
        )
    }

    fn list_fn() -> Function {
        Function::new("pair", |y, x: Option<Value>| {
            Ok(match x {
                Some(x) => val(vec![x, y]),
                None => val(vec![y]),
            })
        })
    }

    fn call(f: &Function, y: impl Into<Value>, x: Option<Value>) -> Result<Value, Error> {
        f.call(y.into(), x)
    }

    #[test]
    fn test_atop_identity_both_arities() {
        let id2 = Function::atop(&identity(), &identity());
        assert_eq!(call(&id2, 7, None).unwrap(), val(7));
        assert_eq!(call(&id2, 7, Some(val(3))).unwrap(), val(7));
        assert!(id2.has_undo());
        assert_eq!(id2.call_undo(val(7), None).unwrap(), val(7));

        let neg_plus = Function::atop(&minus(), &plus());
        assert_eq!(call(&neg_plus, 2, Some(val(3))).unwrap(), val(-5));
        assert!(!neg_plus.has_undo());
    }

    #[test]
    fn test_fork_law() {
        let fork = Function::fork(&double(), &list_fn(), &minus());
        assert_eq!(call(&fork, 4, None).unwrap(), val(vec![8, -4]));
        assert_eq!(
            call(&fork, 4, Some(val(10))).unwrap(),
            val(vec![val(8), val(6)])
        );
    }

    #[test]
    fn test_over() {
        let over = Function::over(&plus(), &double());
        assert_eq!(call(&over, 3, Some(val(4))).unwrap(), val(14));
        assert_eq!(call(&over, 3, None).unwrap(), val(6));
    }

    #[test]
    fn test_under_law_and_fail_fast() {
        let under = Function::under(&minus(), &double()).unwrap();
        // double⁻¹(-(double 5)) = -5
        assert_eq!(call(&under, 5, None).unwrap(), val(-5));
        assert!(under.has_undo());

        let err = Function::under(&identity(), &plus()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndoUnavailable);
    }

    #[test]
    fn test_swap_and_const() {
        let swapped = Function::swap(&minus());
        assert_eq!(call(&swapped, 10, Some(val(3))).unwrap(), val(7));
        assert_eq!(call(&Function::swap(&times()), 6, None).unwrap(), val(36));

        let k = Function::constant(val('k'));
        assert_eq!(call(&k, 1, Some(val(2))).unwrap(), val('k'));
        assert_eq!(call(&k, 1, None).unwrap(), val('k'));
    }

    #[test]
    fn test_fold_and_scan() {
        let list = val(vec![1, 2, 3, 4]);
        // right to left: 1-(2-(3-4)) = -2
        let fold = Function::fold(&minus());
        assert_eq!(fold.call(list.clone(), None).unwrap(), val(-2));
        assert_eq!(fold.call(list.clone(), Some(val(10))).unwrap(), val(8));
        let err = fold.call(Value::nil(), None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Domain);
        assert_eq!(fold.call(val(3), None).unwrap_err().kind, ErrorKind::Rank);

        let scan = Function::scan(&plus());
        assert_eq!(scan.call(list.clone(), None).unwrap(), val(vec![1, 3, 6, 10]));
        assert_eq!(scan.call(list, Some(val(100))).unwrap(), val(vec![101, 103, 106, 110]));
        assert_eq!(scan.call(Value::nil(), None).unwrap(), Value::nil());
    }

    #[test]
    fn test_each_and_table() {
        let each = Function::each(&double());
        assert_eq!(each.call(val(vec![1, 2]), None).unwrap(), val(vec![2, 4]));
        assert_eq!(each.call(val(5), None).unwrap(), val(10));
        assert_eq!(each.call_undo(val(vec![2, 4]), None).unwrap(), val(vec![1, 2]));

        let pairs = Function::each(&list_fn());
        let result = pairs.call(val(vec![1, 2]), Some(val(0))).unwrap();
        assert_eq!(result, val(vec![val(vec![0, 1]), val(vec![0, 2])]));

        let table = Function::table(&times());
        let result = table
            .call(val(vec![1, 2, 3]), Some(val(vec![10, 20])))
            .unwrap();
        let expected = Array::new(
            smallvec![2, 3],
            vec![val(10), val(20), val(30), val(20), val(40), val(60)],
        )
        .unwrap();
        assert_eq!(result, Value::Array(expected));

        // 8192 × 8192 pairings exceed the element limit before anything runs
        let wide = Array::reshape(smallvec![8192], &Array::scalar(val(1))).unwrap();
        let err = table
            .call(Value::Array(wide.clone()), Some(Value::Array(wide)))
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Shape);
    }

    #[test]
    fn test_cells_and_rank() {
        let matrix = Value::Array(
            Array::reshape(smallvec![2, 3], &Array::list((1..=6).map(val).collect())).unwrap(),
        );
        let sums = Function::cells(&Function::fold(&plus()));
        assert_eq!(sums.call(matrix.clone(), None).unwrap(), val(vec![6, 15]));
        assert_eq!(sums.call(val(1), None).unwrap_err().kind, ErrorKind::Rank);

        let rank0 = Function::rank(&double(), &Function::constant(val(0)));
        let doubled = rank0.call(matrix.clone(), None).unwrap();
        assert_eq!(doubled.shape().as_slice(), &[2, 3]);
        assert_eq!(doubled.to_array().pick(5).unwrap(), val(12));

        let rank1 = Function::rank(&Function::fold(&plus()), &Function::constant(val(1)));
        assert_eq!(rank1.call(matrix.clone(), None).unwrap(), val(vec![6, 15]));

        // left cells correspond to right cells
        let paired = Function::rank(&Function::each(&plus()), &Function::constant(val(-1)));
        let result = paired.call(matrix, Some(val(vec![100, 200]))).unwrap();
        assert_eq!(result.to_array().pick(3).unwrap(), val(204));
    }

    #[test]
    fn test_before_after() {
        let before = Function::before(&double(), &list_fn());
        assert_eq!(call(&before, 1, Some(val(5))).unwrap(), val(vec![10, 1]));
        assert_eq!(call(&before, 1, None).unwrap(), val(vec![2, 1]));

        let after = Function::after(&list_fn(), &double());
        assert_eq!(call(&after, 1, Some(val(5))).unwrap(), val(vec![5, 2]));
        assert_eq!(call(&after, 1, None).unwrap(), val(vec![1, 2]));
    }

    #[test]
    fn test_operator_tables() {
        for (i, op) in MonadicOp::ALL.into_iter().enumerate() {
            assert_eq!(MonadicOp::from_index(i as u32), Some(op));
            assert_eq!(MonadicOp::from_glyph(op.glyph()), Some(op));
        }
        for (i, op) in DyadicOp::ALL.into_iter().enumerate() {
            assert_eq!(DyadicOp::from_index(i as u32), Some(op));
            assert_eq!(DyadicOp::from_glyph(op.glyph()), Some(op));
        }
        assert_eq!(MonadicOp::from_index(99), None);

        let f = Value::Function(plus());
        let err = MonadicOp::Undo.apply(&f).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndoUnavailable);
        let inv = MonadicOp::Undo.apply(&Value::Function(double())).unwrap();
        assert_eq!(inv.call(val(8), None).unwrap(), val(4));

        // data operands are frozen
        let atop = DyadicOp::Atop.apply(&f, &val(3)).unwrap();
        assert_eq!(atop.call(val(100), None).unwrap(), val(3));
    }

    #[test]
    fn test_new_cyclic_reaches_itself() {
        let f = Function::new_cyclic("self", |weak| {
            Rc::new(move |y: Value, _: Option<Value>| {
                let me = weak.upgrade().ok_or_else(|| Error::runtime("gone"))?;
                Ok(Value::Number(if me.name() == "self" { y.as_number()? } else { 0.0 }))
            })
        });
        assert_eq!(f.call(val(3), None).unwrap(), val(3));
    }
}
