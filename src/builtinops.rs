//! Built-in primitive registry and the pluggable primitive table.
//!
//! Every primitive is defined once in a static registry of [`BuiltinOp`]
//! entries: its glyph, a descriptive name, the one-argument and
//! two-argument implementations, and, for invertible primitives, the
//! matching inverses. The compiler never looks inside this registry; it only
//! sees a [`Primitives`] table mapping glyphs to constant-pool indices.
//!
//! ## Pervasive and structural primitives
//!
//! - **Pervasive**: `+ - × ÷ ⋆ √ ⌊ ⌈ | ¬ ∧ ∨ = ≠ < > ≤ ≥` apply to numbers and
//!   characters and map through nested arrays, broadcasting under the zip
//!   alignment law. The one-argument forms of `= ≠ < >` (rank, length,
//!   enclose, merge) are structural instead.
//! - **Structural**: `⊢ ⊣ ≢ ≡ ⥊ ↕ ⌽ ⊑ ⊏ ↑ ↓ ∾ ≍ ⋈ /` work on whole arrays,
//!   preferring lazy views (slice, gather, reshape) over copies.
//! - **Assertion**: `!` fails with an Assertion error unless its argument is 1.
//!
//! ## Adding New Primitives
//!
//! 1. **Implement the function** with typed parameters (`f64`, `char`, `i64`,
//!    `usize`, `Array` or `Value`) returning a value or `Result`
//! 2. **Add to BUILTIN_OPS** with its glyph, wrapping each form with
//!    `pervasive1`/`pervasive2` or `plain1`/`plain2`
//! 3. **Teach the surface parser** the glyph if it should be writable in source
//!
//! Hosts that only need an extra function should call
//! [`Primitives::register`] instead.

use crate::{Error, MAX_ARRAY_COUNT};
use crate::array::{Array, Shape, make_shape};
use crate::function::Function;
use crate::intooperation::{
    DyadFn, IntoDyad, IntoMonad, MonadFn, pervasive_dyad, pervasive_monad,
};
use crate::value::Value;
use smallvec::smallvec;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, LazyLock};

/// Definition of a built-in primitive
#[derive(Clone)]
pub struct BuiltinOp {
    /// The glyph that names this primitive in source and in the primitive table
    pub glyph: char,
    /// Descriptive name, used in diagnostics
    pub name: &'static str,
    /// One-argument form
    pub monad: Option<Arc<MonadFn>>,
    /// Two-argument form, called with the left argument first
    pub dyad: Option<Arc<DyadFn>>,
    /// Declared inverse of the one-argument form
    pub monad_inverse: Option<Arc<MonadFn>>,
    /// Declared inverse of the two-argument form with respect to its right argument
    pub dyad_inverse: Option<Arc<DyadFn>>,
}

impl std::fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinOp")
            .field("glyph", &self.glyph)
            .field("name", &self.name)
            .field("invertible", &self.is_invertible())
            .finish()
    }
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // The glyph uniquely identifies a primitive
        self.glyph == other.glyph
    }
}

fn dispatch(
    glyph: char,
    monad: Option<&Arc<MonadFn>>,
    dyad: Option<&Arc<DyadFn>>,
    y: Value,
    x: Option<Value>,
) -> Result<Value, Error> {
    match x {
        None => match monad {
            Some(monad) => monad(y),
            None => Err(Error::domain(format!("{glyph} has no one-argument form"))),
        },
        Some(x) => match dyad {
            Some(dyad) => dyad(x, y),
            None => Err(Error::domain(format!("{glyph} has no two-argument form"))),
        },
    }
}

impl BuiltinOp {
    pub fn is_invertible(&self) -> bool {
        self.monad_inverse.is_some() || self.dyad_inverse.is_some()
    }

    /// Wrap the registry entry as an ambivalent function value
    pub fn to_function(&self) -> Function {
        let glyph = self.glyph;
        let (monad, dyad) = (self.monad.clone(), self.dyad.clone());
        let main: Rc<crate::function::OperationFn> =
            Rc::new(move |y, x| dispatch(glyph, monad.as_ref(), dyad.as_ref(), y, x));
        let undo: Option<Rc<crate::function::OperationFn>> = if self.is_invertible() {
            let (monad, dyad) = (self.monad_inverse.clone(), self.dyad_inverse.clone());
            Some(Rc::new(move |y, x| {
                dispatch(glyph, monad.as_ref(), dyad.as_ref(), y, x)
            }))
        } else {
            None
        };
        Function::from_parts(glyph.to_string(), main, undo)
    }
}

//
// Pervasive scalar implementations
//

fn conjugate(y: Value) -> Value {
    y
}

fn negate(y: f64) -> f64 {
    -y
}

fn sign(y: f64) -> f64 {
    if y > 0.0 {
        1.0
    } else if y < 0.0 {
        -1.0
    } else {
        y
    }
}

fn reciprocal(y: f64) -> f64 {
    1.0 / y
}

fn not(y: f64) -> f64 {
    1.0 - y
}

fn shift_char(c: char, by: f64) -> Result<Value, Error> {
    if by.fract() != 0.0 {
        return Err(Error::domain(format!("cannot shift a character by {by}")));
    }
    let code = i64::from(u32::from(c)) + by as i64;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(Value::Character)
        .ok_or_else(|| Error::domain(format!("code point {code} is not a character")))
}

fn add(x: Value, y: Value) -> Result<Value, Error> {
    match (x, y) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::Character(c), Value::Number(n)) | (Value::Number(n), Value::Character(c)) => {
            shift_char(c, n)
        }
        (x, y) => Err(Error::domain(format!(
            "cannot add {} and {}",
            x.type_name(),
            y.type_name()
        ))),
    }
}

fn subtract(x: Value, y: Value) -> Result<Value, Error> {
    match (x, y) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
        (Value::Character(c), Value::Number(n)) => shift_char(c, -n),
        (Value::Character(a), Value::Character(b)) => {
            Ok(Value::Number(f64::from(u32::from(a)) - f64::from(u32::from(b))))
        }
        (x, y) => Err(Error::domain(format!(
            "cannot subtract {} from {}",
            y.type_name(),
            x.type_name()
        ))),
    }
}

/// Inverse of `x + y` with respect to `y`
fn unadd(x: Value, y: Value) -> Result<Value, Error> {
    subtract(y, x)
}

fn multiply(x: f64, y: f64) -> f64 {
    x * y
}

fn unmultiply(x: f64, y: f64) -> f64 {
    y / x
}

fn divide(x: f64, y: f64) -> f64 {
    x / y
}

fn power(x: f64, y: f64) -> f64 {
    x.powf(y)
}

fn log(x: f64, y: f64) -> f64 {
    y.ln() / x.ln()
}

fn root(x: f64, y: f64) -> f64 {
    y.powf(1.0 / x)
}

fn unroot(x: f64, y: f64) -> f64 {
    y.powf(x)
}

fn square(y: f64) -> f64 {
    y * y
}

fn modulus(x: f64, y: f64) -> f64 {
    if x == 0.0 { y } else { y - x * (y / x).floor() }
}

fn and(x: f64, y: f64) -> f64 {
    x * y
}

fn or(x: f64, y: f64) -> f64 {
    x + y - x * y
}

fn span(x: f64, y: f64) -> f64 {
    1.0 + x - y
}

/// Numbers sort before characters
fn compare(x: &Value, y: &Value) -> Result<Ordering, Error> {
    match (x, y) {
        (Value::Number(a), Value::Number(b)) => a
            .partial_cmp(b)
            .ok_or_else(|| Error::domain("cannot compare NaN")),
        (Value::Character(a), Value::Character(b)) => Ok(a.cmp(b)),
        (Value::Number(_), Value::Character(_)) => Ok(Ordering::Less),
        (Value::Character(_), Value::Number(_)) => Ok(Ordering::Greater),
        (x, y) => Err(Error::domain(format!(
            "cannot compare {} with {}",
            x.type_name(),
            y.type_name()
        ))),
    }
}

macro_rules! comparison {
    ($name:ident, $($ord:pat_param)|+) => {
        fn $name(x: Value, y: Value) -> Result<bool, Error> {
            Ok(matches!(compare(&x, &y)?, $($ord)|+))
        }
    };
}

comparison!(less, Ordering::Less);
comparison!(greater, Ordering::Greater);
comparison!(less_eq, Ordering::Less | Ordering::Equal);
comparison!(greater_eq, Ordering::Greater | Ordering::Equal);

fn equals(x: Value, y: Value) -> bool {
    x == y
}

fn not_equals(x: Value, y: Value) -> bool {
    x != y
}

//
// Structural implementations
//

fn left(x: Value, _y: Value) -> Value {
    x
}

fn right(_x: Value, y: Value) -> Value {
    y
}

fn rank(y: Array) -> usize {
    y.rank()
}

fn length(y: Array) -> usize {
    y.length()
}

fn enclose(y: Value) -> Array {
    Array::scalar(y)
}

fn merge_elements(y: Value) -> Result<Value, Error> {
    let Value::Array(ya) = y else {
        return Ok(y);
    };
    if ya.is_nil() {
        return Ok(Value::Array(ya));
    }
    let merged = Array::merge(ya.to_vec()?, ya.fill(), Some(Shape::from_slice(ya.shape())))?;
    Value::from_cell(merged)
}

fn shape_of(y: Array) -> Value {
    Value::from(y.shape().to_vec())
}

fn depth(y: Value) -> Result<usize, Error> {
    y.depth()
}

fn not_match(x: Value, y: Value) -> bool {
    x != y
}

fn deshape(y: Array) -> Result<Array, Error> {
    Array::reshape(smallvec![y.count()], &y)
}

fn reshape(x: Value, y: Array) -> Result<Array, Error> {
    let dims = match x {
        Value::Array(xa) => (0..xa.count())
            .map(|i| xa.pick(i)?.as_number())
            .collect::<Result<Vec<_>, _>>()?,
        n => vec![n.as_number()?],
    };
    let (shape, _) = make_shape(&dims)?;
    Array::reshape(shape, &y)
}

/// Length error unless `n` elements fit within [`MAX_ARRAY_COUNT`]
fn ensure_fits(n: usize, glyph: char) -> Result<(), Error> {
    if n > MAX_ARRAY_COUNT {
        return Err(Error::length(format!(
            "{glyph} would build {n} elements, more than the limit of {MAX_ARRAY_COUNT}"
        )));
    }
    Ok(())
}

fn range(n: usize) -> Result<Value, Error> {
    ensure_fits(n, '↕')?;
    Ok(Value::Array(Array::list((0..n).map(Value::from).collect())))
}

/// An array of rank 1 or more, or a Rank error naming the primitive
fn require_cells(y: Value, glyph: char) -> Result<Array, Error> {
    match y {
        Value::Array(a) if a.rank() > 0 => Ok(a),
        other => Err(Error::rank(format!(
            "{glyph} needs an array of rank 1 or more, got {}",
            other.type_name()
        ))),
    }
}

/// Scalars and rank-0 arrays become one-element lists
fn as_list(y: Value) -> Result<Array, Error> {
    let a = y.into_array();
    if a.rank() == 0 {
        Array::reshape(smallvec![1], &a)
    } else {
        Ok(a)
    }
}

fn wrap_index(i: i64, len: usize) -> Result<usize, Error> {
    let at = if i < 0 { i + len as i64 } else { i };
    if at < 0 || at >= len as i64 {
        return Err(Error::index(format!(
            "index {i} out of bounds for length {len}"
        )));
    }
    Ok(at as usize)
}

/// Major cells of `ya` in the given order, through a gather view for lists
fn reorder_cells(ya: &Array, order: Vec<usize>) -> Result<Value, Error> {
    if ya.rank() == 1 {
        let indices = Array::list(order.into_iter().map(Value::from).collect());
        return Ok(Value::Array(Array::gather(ya, &indices)?));
    }
    let cells = order
        .into_iter()
        .map(|i| ya.slice_cell(i).map(Value::Array))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(Array::merge(cells, ya.fill(), None)?))
}

fn reverse(y: Value) -> Result<Value, Error> {
    let ya = require_cells(y, '⌽')?;
    let order = (0..ya.length()).rev().collect();
    reorder_cells(&ya, order)
}

fn rotate(x: i64, y: Value) -> Result<Value, Error> {
    let ya = require_cells(y, '⌽')?;
    let len = ya.length();
    if len == 0 {
        return Ok(Value::Array(ya));
    }
    let shift = x.rem_euclid(len as i64) as usize;
    let order = (0..len).map(|i| (i + shift) % len).collect();
    reorder_cells(&ya, order)
}

fn unrotate(x: i64, y: Value) -> Result<Value, Error> {
    rotate(-x, y)
}

fn first(y: Value) -> Result<Value, Error> {
    match y {
        Value::Array(ya) if ya.is_nil() => Err(Error::index("first of an empty array")),
        Value::Array(ya) => ya.pick(0),
        scalar => Ok(scalar),
    }
}

fn pick(x: Value, y: Value) -> Result<Value, Error> {
    let ya = y.into_array();
    match x {
        Value::Array(xa) => {
            if xa.rank() > 1 || xa.count() != ya.rank() {
                return Err(Error::rank(format!(
                    "{} indices cannot pick from a rank-{} array",
                    xa.count(),
                    ya.rank()
                )));
            }
            let prefix = (0..xa.count())
                .map(|k| wrap_index(xa.pick(k)?.as_integer()?, ya.shape()[k]))
                .collect::<Result<Vec<_>, _>>()?;
            ya.select_rank(&prefix)?.pick(0)
        }
        n => {
            if ya.rank() != 1 {
                return Err(Error::rank(format!(
                    "a single index cannot pick from a rank-{} array",
                    ya.rank()
                )));
            }
            ya.pick(wrap_index(n.as_integer()?, ya.count())?)
        }
    }
}

fn first_cell(y: Value) -> Result<Value, Error> {
    let ya = require_cells(y, '⊏')?;
    if ya.is_nil() {
        return Err(Error::index("first cell of an empty array"));
    }
    Value::from_cell(ya.slice_cell(0)?)
}

fn select(x: Value, y: Value) -> Result<Value, Error> {
    let ya = require_cells(y, '⊏')?;
    let len = ya.length();
    let Value::Array(xa) = x else {
        let at = wrap_index(x.as_integer()?, len)?;
        return Value::from_cell(ya.slice_cell(at)?);
    };
    let indices = (0..xa.count())
        .map(|i| wrap_index(xa.pick(i)?.as_integer()?, len))
        .collect::<Result<Vec<_>, _>>()?;
    let outer = Shape::from_slice(xa.shape());
    if ya.rank() == 1 {
        let indices = Array::new(outer, indices.into_iter().map(Value::from).collect())?;
        return Ok(Value::Array(Array::gather(&ya, &indices)?));
    }
    let cells = indices
        .into_iter()
        .map(|i| ya.slice_cell(i).map(Value::Array))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(Array::merge(cells, ya.fill(), Some(outer))?))
}

/// A cell-shaped block of the fill element
fn fill_cell(ya: &Array) -> Result<Value, Error> {
    let fill = ya.fill_or_default();
    let cell_shape = ya.shape().get(1..).unwrap_or_default();
    if cell_shape.is_empty() {
        Ok(fill)
    } else {
        Ok(Value::Array(Array::reshape(
            Shape::from_slice(cell_shape),
            &Array::scalar(fill),
        )?))
    }
}

fn take(x: i64, y: Value) -> Result<Value, Error> {
    let ya = as_list(y)?;
    let len = ya.length();
    let n = x.unsigned_abs() as usize;
    if n <= len {
        let start = if x >= 0 { 0 } else { len - n };
        return Ok(Value::Array(ya.slice(start, n)?));
    }
    ensure_fits(n.saturating_mul(ya.cell_count()), '↑')?;
    let pad = std::iter::repeat_n(fill_cell(&ya)?, n - len);
    let cells = ya.major_cells()?;
    let padded: Vec<Value> = if x >= 0 {
        cells.into_iter().chain(pad).collect()
    } else {
        pad.chain(cells).collect()
    };
    Ok(Value::Array(Array::merge(padded, ya.fill(), None)?))
}

fn drop_cells(x: i64, y: Value) -> Result<Value, Error> {
    let ya = as_list(y)?;
    let len = ya.length();
    let n = x.unsigned_abs() as usize;
    if n >= len {
        return Ok(Value::nil());
    }
    let start = if x >= 0 { n } else { 0 };
    Ok(Value::Array(ya.slice(start, len - n)?))
}

fn prefixes(y: Value) -> Result<Value, Error> {
    let ya = as_list(y)?;
    let all = (0..=ya.length())
        .map(|i| take(i as i64, Value::Array(ya.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(Array::list(all)))
}

fn suffixes(y: Value) -> Result<Value, Error> {
    let ya = as_list(y)?;
    let all = (0..=ya.length())
        .map(|i| drop_cells(i as i64, Value::Array(ya.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(Array::list(all)))
}

fn join_to(x: Value, y: Value) -> Result<Value, Error> {
    let (xa, ya) = (as_list(x)?, as_list(y)?);
    if xa.is_nil() {
        return Ok(Value::Array(ya));
    }
    if ya.is_nil() {
        return Ok(Value::Array(xa));
    }
    let cells_of = |a: &Array, other: &Array| -> Result<Vec<Value>, Error> {
        if a.rank() + 1 == other.rank() {
            Ok(vec![Value::Array(a.clone())])
        } else {
            a.major_cells()
        }
    };
    let mut cells = cells_of(&xa, &ya)?;
    cells.extend(cells_of(&ya, &xa)?);
    Ok(Value::Array(Array::merge(cells, xa.fill(), None)?))
}

fn join(y: Value) -> Result<Value, Error> {
    let ya = require_cells(y, '∾')?;
    let mut parts = ya.to_vec()?.into_iter();
    let Some(mut acc) = parts.next() else {
        return Ok(Value::nil());
    };
    for part in parts {
        acc = join_to(acc, part)?;
    }
    Ok(acc)
}

fn solo(y: Value) -> Result<Array, Error> {
    Array::merge(vec![y], None, Some(smallvec![1]))
}

fn couple(x: Value, y: Value) -> Result<Array, Error> {
    Array::merge(vec![x, y], None, None)
}

fn enlist(y: Value) -> Array {
    Array::list(vec![y])
}

fn pair(x: Value, y: Value) -> Array {
    Array::list(vec![x, y])
}

fn indices(y: Value) -> Result<Value, Error> {
    let counts = require_cells(y, '/')?;
    let mut out = Vec::new();
    for i in 0..counts.count() {
        let n = counts.pick(i)?.as_index()?;
        out.extend(std::iter::repeat_n(Value::from(i), n));
    }
    Ok(Value::Array(Array::list(out)))
}

fn replicate(x: Value, y: Value) -> Result<Value, Error> {
    let ya = as_list(y)?;
    let cells = ya.major_cells()?;
    let counts = match x {
        Value::Array(xa) => {
            if xa.count() != cells.len() {
                return Err(Error::length(format!(
                    "{} counts for {} cells",
                    xa.count(),
                    cells.len()
                )));
            }
            (0..xa.count())
                .map(|i| xa.pick(i)?.as_index())
                .collect::<Result<Vec<_>, _>>()?
        }
        n => vec![n.as_index()?; cells.len()],
    };
    let mut out = Vec::new();
    for (cell, n) in cells.into_iter().zip(counts) {
        out.extend(std::iter::repeat_n(cell, n));
    }
    Ok(Value::Array(Array::merge(out, ya.fill(), None)?))
}

fn assert_true(y: Value) -> Result<Value, Error> {
    if y == Value::Number(1.0) {
        Ok(y)
    } else {
        Err(Error::assertion("assertion failed"))
    }
}

fn assert_with_message(x: Value, y: Value) -> Result<Value, Error> {
    if y == Value::Number(1.0) {
        Ok(y)
    } else {
        Err(Error::assertion(x.as_string().unwrap_or_else(|| x.to_string())))
    }
}

/// Global registry of all built-in primitives, in constant-pool order.
///
/// Implementations are wired through the adapter layer in
/// `intooperation` once, at initialization time, via a `LazyLock`.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    fn plain1<Args, F: IntoMonad<Args>>(f: F) -> Option<Arc<MonadFn>> {
        Some(f.into_monad())
    }

    fn plain2<Args, F: IntoDyad<Args>>(f: F) -> Option<Arc<DyadFn>> {
        Some(f.into_dyad())
    }

    fn pervasive1<Args, F: IntoMonad<Args>>(f: F) -> Option<Arc<MonadFn>> {
        Some(pervasive_monad(f.into_monad()))
    }

    fn pervasive2<Args, F: IntoDyad<Args>>(f: F) -> Option<Arc<DyadFn>> {
        Some(pervasive_dyad(f.into_dyad()))
    }

    fn op(
        glyph: char,
        name: &'static str,
        monad: Option<Arc<MonadFn>>,
        dyad: Option<Arc<DyadFn>>,
    ) -> BuiltinOp {
        BuiltinOp {
            glyph,
            name,
            monad,
            dyad,
            monad_inverse: None,
            dyad_inverse: None,
        }
    }

    fn invertible(
        base: BuiltinOp,
        monad_inverse: Option<Arc<MonadFn>>,
        dyad_inverse: Option<Arc<DyadFn>>,
    ) -> BuiltinOp {
        BuiltinOp {
            monad_inverse,
            dyad_inverse,
            ..base
        }
    }

    vec![
        // Arithmetic
        invertible(
            op('+', "add", pervasive1(conjugate), pervasive2(add)),
            pervasive1(conjugate),
            pervasive2(unadd),
        ),
        invertible(
            op('-', "subtract", pervasive1(negate), pervasive2(subtract)),
            pervasive1(negate),
            pervasive2(subtract),
        ),
        invertible(
            op('×', "multiply", pervasive1(sign), pervasive2(multiply)),
            None,
            pervasive2(unmultiply),
        ),
        invertible(
            op('÷', "divide", pervasive1(reciprocal), pervasive2(divide)),
            pervasive1(reciprocal),
            pervasive2(divide),
        ),
        invertible(
            op('⋆', "power", pervasive1(f64::exp), pervasive2(power)),
            pervasive1(f64::ln),
            pervasive2(log),
        ),
        invertible(
            op('√', "root", pervasive1(f64::sqrt), pervasive2(root)),
            pervasive1(square),
            pervasive2(unroot),
        ),
        op('⌊', "floor", pervasive1(f64::floor), pervasive2(f64::min)),
        op('⌈', "ceiling", pervasive1(f64::ceil), pervasive2(f64::max)),
        op('|', "modulus", pervasive1(f64::abs), pervasive2(modulus)),
        // Logic
        invertible(
            op('¬', "not", pervasive1(not), pervasive2(span)),
            pervasive1(not),
            pervasive2(span),
        ),
        op('∧', "and", None, pervasive2(and)),
        op('∨', "or", None, pervasive2(or)),
        // Comparison, with structural one-argument forms
        op('=', "equals", plain1(rank), pervasive2(equals)),
        op('≠', "not-equals", plain1(length), pervasive2(not_equals)),
        op('<', "less", plain1(enclose), pervasive2(less)),
        op('>', "greater", plain1(merge_elements), pervasive2(greater)),
        op('≤', "less-or-equal", None, pervasive2(less_eq)),
        op('≥', "greater-or-equal", None, pervasive2(greater_eq)),
        // Identity and matching
        invertible(
            op('⊢', "right", plain1(conjugate), plain2(right)),
            plain1(conjugate),
            plain2(right),
        ),
        op('⊣', "left", plain1(conjugate), plain2(left)),
        op('≢', "shape", plain1(shape_of), plain2(not_match)),
        op('≡', "depth", plain1(depth), plain2(equals)),
        // Structure
        op('⥊', "reshape", plain1(deshape), plain2(reshape)),
        op('↕', "range", plain1(range), None),
        invertible(
            op('⌽', "reverse", plain1(reverse), plain2(rotate)),
            plain1(reverse),
            plain2(unrotate),
        ),
        op('⊑', "pick", plain1(first), plain2(pick)),
        op('⊏', "select", plain1(first_cell), plain2(select)),
        op('↑', "take", plain1(prefixes), plain2(take)),
        op('↓', "drop", plain1(suffixes), plain2(drop_cells)),
        op('∾', "join", plain1(join), plain2(join_to)),
        op('≍', "couple", plain1(solo), plain2(couple)),
        op('⋈', "pair", plain1(enlist), plain2(pair)),
        op('/', "replicate", plain1(indices), plain2(replicate)),
        op('!', "assert", plain1(assert_true), plain2(assert_with_message)),
    ]
});

/// Lazy static map from glyph to BuiltinOp (private - use find_builtin_op)
static BUILTIN_BY_GLYPH: LazyLock<HashMap<char, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.glyph, op)).collect()
});

/// All builtin primitives, in registration order
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin primitive by its glyph
pub fn find_builtin_op(glyph: char) -> Option<&'static BuiltinOp> {
    BUILTIN_BY_GLYPH.get(&glyph).copied()
}

/// Whether `glyph` names a standard primitive
pub fn is_primitive_glyph(glyph: char) -> bool {
    BUILTIN_BY_GLYPH.contains_key(&glyph)
}

/// The primitive table a program is compiled and run against.
///
/// Each entry's position is its constant-pool index: the compiler seeds the
/// pool with [`Primitives::values`] in order, so a table must not be reordered
/// between compiling a program and running it. Registering an existing name
/// replaces its value in place and keeps its index.
#[derive(Clone, Default)]
pub struct Primitives {
    names: Vec<String>,
    values: Vec<Value>,
    index: HashMap<String, usize>,
}

impl Primitives {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table holding every builtin primitive, keyed by glyph
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for op in get_builtin_ops() {
            table.register(op.glyph.to_string(), Value::Function(op.to_function()));
        }
        table
    }

    /// Add or replace a primitive; returns its stable index
    pub fn register(&mut self, name: impl Into<String>, value: impl Into<Value>) -> usize {
        let name = name.into();
        let value = value.into();
        if let Some(&at) = self.index.get(&name) {
            self.values[at] = value;
            return at;
        }
        let at = self.values.len();
        self.index.insert(name.clone(), at);
        self.names.push(name);
        self.values.push(value);
        at
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.lookup(name).map(|at| &self.values[at])
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for Primitives {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Primitives")
            .field("names", &self.names)
            .finish()
    }
}
