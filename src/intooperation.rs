use crate::Error;
use crate::array::{Array, Shape, ZipFn};
use crate::value::Value;
use std::rc::Rc;
use std::sync::Arc;

// NOTE: This module is internal plumbing for the primitive table.
// It defines the adapter layer that turns strongly-typed Rust
// functions into the erased one- and two-argument callables stored
// in the static registry, and the pervasive lifting that carries a
// scalar function through nested arrays.
//
// External users should register primitives through
// `Primitives::register` with a ready-made `Function`; this module
// stays crate-private.

/// Erased one-argument primitive: `y -> result`
pub(crate) type MonadFn = dyn Fn(Value) -> Result<Value, Error> + Send + Sync;

/// Erased two-argument primitive: `(x, y) -> result`, left argument first
pub(crate) type DyadFn = dyn Fn(Value, Value) -> Result<Value, Error> + Send + Sync;

// =====================================================================
// Argument conversion
// =====================================================================

/// Conversion of a single argument into a typed parameter.
///
/// Each implementation states exactly which values it accepts; any
/// other value is a Domain error naming the expectation.
pub(crate) trait FromParam: Sized {
    fn from_arg(value: Value) -> Result<Self, Error>;
}

impl FromParam for Value {
    fn from_arg(value: Value) -> Result<Self, Error> {
        Ok(value)
    }
}

impl FromParam for f64 {
    fn from_arg(value: Value) -> Result<Self, Error> {
        value.as_number()
    }
}

impl FromParam for char {
    fn from_arg(value: Value) -> Result<Self, Error> {
        value.as_char()
    }
}

impl FromParam for i64 {
    fn from_arg(value: Value) -> Result<Self, Error> {
        value.as_integer()
    }
}

impl FromParam for usize {
    fn from_arg(value: Value) -> Result<Self, Error> {
        value.as_index()
    }
}

/// Arrays accept any value; scalars are boxed at rank 0
impl FromParam for Array {
    fn from_arg(value: Value) -> Result<Self, Error> {
        Ok(value.into_array())
    }
}

// =====================================================================
// Return-type adaptation
// =====================================================================

/// Normalizes primitive return types to `Result<Value, Error>`.
///
/// Primitives return either a plain `T: Into<Value>` or a
/// `Result<T, Error>` for such a `T`.
pub(crate) trait IntoValueResult {
    fn into_value_result(self) -> Result<Value, Error>;
}

impl<T> IntoValueResult for Result<T, Error>
where
    T: Into<Value>,
{
    fn into_value_result(self) -> Result<Value, Error> {
        self.map(Into::into)
    }
}

impl<T> IntoValueResult for T
where
    T: Into<Value>,
{
    fn into_value_result(self) -> Result<Value, Error> {
        Ok(self.into())
    }
}

// =====================================================================
// Fixed-arity adapters
// =====================================================================

/// Converts a typed one-parameter Rust function into an erased [`MonadFn`].
pub(crate) trait IntoMonad<Args> {
    fn into_monad(self) -> Arc<MonadFn>;
}

/// Converts a typed two-parameter Rust function `(x, y)` into an erased [`DyadFn`].
pub(crate) trait IntoDyad<Args> {
    fn into_dyad(self) -> Arc<DyadFn>;
}

impl<F, A, R> IntoMonad<(A,)> for F
where
    F: Fn(A) -> R + Send + Sync + 'static,
    A: FromParam,
    R: IntoValueResult,
{
    fn into_monad(self) -> Arc<MonadFn> {
        Arc::new(move |y: Value| {
            let y = A::from_arg(y)?;
            (self)(y).into_value_result()
        })
    }
}

impl<F, A, B, R> IntoDyad<(A, B)> for F
where
    F: Fn(A, B) -> R + Send + Sync + 'static,
    A: FromParam,
    B: FromParam,
    R: IntoValueResult,
{
    fn into_dyad(self) -> Arc<DyadFn> {
        Arc::new(move |x: Value, y: Value| {
            let x = A::from_arg(x)?;
            let y = B::from_arg(y)?;
            (self)(x, y).into_value_result()
        })
    }
}

// =====================================================================
// Pervasive lifting
// =====================================================================

/// Lift a scalar function so it maps through every level of nesting.
pub(crate) fn pervasive_monad(f: Arc<MonadFn>) -> Arc<MonadFn> {
    Arc::new(move |y: Value| apply_pervasive_monad(&f, y))
}

fn apply_pervasive_monad(f: &Arc<MonadFn>, y: Value) -> Result<Value, Error> {
    let Value::Array(ya) = y else {
        return f(y);
    };
    let data = (0..ya.count())
        .map(|i| apply_pervasive_monad(f, ya.pick(i)?))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(Array::new(Shape::from_slice(ya.shape()), data)?))
}

/// Lift a scalar function of two arguments through nested arrays.
///
/// Each level is combined with a zip view so the broadcast alignment law
/// applies at every depth; the view is materialized before returning so
/// that any element error surfaces at the call.
pub(crate) fn pervasive_dyad(f: Arc<DyadFn>) -> Arc<DyadFn> {
    Arc::new(move |x: Value, y: Value| apply_pervasive_dyad(&f, x, y))
}

fn apply_pervasive_dyad(f: &Arc<DyadFn>, x: Value, y: Value) -> Result<Value, Error> {
    if !x.is_array() && !y.is_array() {
        return f(x, y);
    }
    let inner = Arc::clone(f);
    let combine: Rc<ZipFn> = Rc::new(move |l, r| apply_pervasive_dyad(&inner, l, r));
    let zipped = Array::zip(&x.into_array(), &y.into_array(), combine)?;
    Ok(Value::Array(zipped.materialize()?))
}
