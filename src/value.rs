use crate::Error;
use crate::array::{Array, Shape};
use crate::function::Function;

/// Every value a program can compute or bind.
///
/// Numbers, characters and arrays are data. Functions are values too, so that
/// variables and the operand stack can hold them; the role of a name is
/// decided by its spelling, not by what it holds.
#[derive(Clone)]
pub enum Value {
    Number(f64),
    Character(char),
    Array(Array),
    Function(Function),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Character(_) => "character",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
        }
    }

    pub fn as_number(&self) -> Result<f64, Error> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(Error::domain(format!(
                "expected a number, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_char(&self) -> Result<char, Error> {
        match self {
            Value::Character(c) => Ok(*c),
            other => Err(Error::domain(format!(
                "expected a character, got {}",
                other.type_name()
            ))),
        }
    }

    /// Non-negative integral number usable as a flat index
    pub fn as_index(&self) -> Result<usize, Error> {
        let n = self.as_number()?;
        if n.fract() != 0.0 || !n.is_finite() {
            return Err(Error::domain(format!("index {n} is not an integer")));
        }
        if n < 0.0 {
            return Err(Error::index(format!("index {n} is negative")));
        }
        Ok(n as usize)
    }

    /// Integral number, possibly negative
    pub fn as_integer(&self) -> Result<i64, Error> {
        let n = self.as_number()?;
        if n.fract() != 0.0 || !n.is_finite() {
            return Err(Error::domain(format!("{n} is not an integer")));
        }
        Ok(n as i64)
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The value as a function: functions pass through, data becomes a
    /// constant function returning itself
    pub fn to_function(&self) -> Function {
        match self {
            Value::Function(f) => f.clone(),
            data => Function::constant(data.clone()),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// The value as an array; scalars are boxed at rank 0
    pub fn to_array(&self) -> Array {
        match self {
            Value::Array(a) => a.clone(),
            scalar => Array::scalar(scalar.clone()),
        }
    }

    pub fn into_array(self) -> Array {
        match self {
            Value::Array(a) => a,
            scalar => Array::scalar(scalar),
        }
    }

    /// A cell taken out of an array: rank-0 cells are unwrapped to their element
    pub fn from_cell(cell: Array) -> Result<Value, Error> {
        if cell.rank() == 0 {
            cell.pick(0)
        } else {
            Ok(Value::Array(cell))
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Value::Array(a) => Shape::from_slice(a.shape()),
            _ => Shape::new(),
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            Value::Array(a) => a.rank(),
            _ => 0,
        }
    }

    /// Nesting depth: 0 for scalars, 1 + deepest element for arrays
    pub fn depth(&self) -> Result<usize, Error> {
        match self {
            Value::Array(a) => {
                let mut deepest = 0;
                for i in 0..a.count() {
                    deepest = deepest.max(a.pick(i)?.depth()?);
                }
                Ok(deepest + 1)
            }
            _ => Ok(0),
        }
    }

    /// Character list for `text`
    pub fn string(text: &str) -> Value {
        Value::Array(Array::list(text.chars().map(Value::Character).collect()))
    }

    /// The text of a character list, if this is one
    pub fn as_string(&self) -> Option<String> {
        let Value::Array(a) = self else {
            return None;
        };
        if a.rank() != 1 {
            return None;
        }
        (0..a.count())
            .map(|i| match a.pick(i) {
                Ok(Value::Character(c)) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn nil() -> Value {
        Value::Array(Array::nil())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Character(a), Value::Character(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.matches(b),
            (Value::Function(a), Value::Function(b)) => a.same(b),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n as f64)
                }
            }
        )+
    };
}

impl_from_integer!(i32, i64, u32, usize);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Character(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(Array::list(items.into_iter().map(Into::into).collect()))
    }
}

/// Helper function for creating Values in tests and at API boundaries
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

fn write_number(f: &mut std::fmt::Formatter<'_>, n: f64) -> std::fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }
    if n < 0.0 {
        f.write_str("¯")?;
    }
    let magnitude = n.abs();
    if magnitude.is_infinite() {
        f.write_str("∞")
    } else {
        write!(f, "{magnitude}")
    }
}

fn write_element(f: &mut std::fmt::Formatter<'_>, a: &Array, i: usize) -> std::fmt::Result {
    match a.pick(i) {
        Ok(v) => write!(f, "{v}"),
        Err(e) => write!(f, "<{}>", e.kind),
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write_number(f, *n),
            Value::Character(c) => write!(f, "'{c}'"),
            Value::Function(func) => write!(f, "{}", func.name()),
            Value::Array(a) if a.is_nil() => f.write_str("⟨⟩"),
            Value::Array(a) if a.rank() == 0 => {
                f.write_str("<")?;
                write_element(f, a, 0)
            }
            Value::Array(a) => {
                if let Some(text) = self.as_string() {
                    return write!(f, "\"{text}\"");
                }
                if a.rank() > 1 {
                    let dims: Vec<String> = a.shape().iter().map(usize::to_string).collect();
                    write!(f, "{}⥊", dims.join("‿"))?;
                }
                f.write_str("⟨")?;
                for i in 0..a.count() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_element(f, a, i)?;
                }
                f.write_str("⟩")
            }
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Character(c) => write!(f, "Character({c:?})"),
            Value::Array(a) => write!(f, "Array({:?} {self})", a.shape()),
            Value::Function(func) => write!(f, "Function({})", func.name()),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ErrorKind;
    use smallvec::smallvec;

    #[test]
    fn test_display_data_driven() {
        let matrix = Value::Array(
            Array::new(smallvec![2, 2], vec![val(1), val(2), val(3), val(4)]).unwrap(),
        );
        let cases: Vec<(Value, &str)> = vec![
            (val(42), "42"),
            (val(-3), "¯3"),
            (val(2.5), "2.5"),
            (val(f64::INFINITY), "∞"),
            (val(f64::NEG_INFINITY), "¯∞"),
            (val('x'), "'x'"),
            (val("hi"), "\"hi\""),
            (val(vec![1, 2, 3]), "⟨1, 2, 3⟩"),
            (Value::nil(), "⟨⟩"),
            (Value::Array(Array::scalar(val(5))), "<5"),
            (matrix, "2‿2⥊⟨1, 2, 3, 4⟩"),
            (val(vec![val(1), val("ab")]), "⟨1, \"ab\"⟩"),
        ];
        for (i, (value, expected)) in cases.into_iter().enumerate() {
            assert_eq!(value.to_string(), expected, "case #{}", i + 1);
        }
    }

    #[test]
    fn test_equality() {
        assert_eq!(val(vec![1, 2]), val(vec![1.0, 2.0]));
        assert_ne!(val(vec![1, 2]), val(vec![2, 1]));
        assert_ne!(val(1), val('1'));
        assert_ne!(val(1), Value::Array(Array::scalar(val(1))));
        assert_ne!(val(f64::NAN), val(f64::NAN));
        assert_eq!(Value::nil(), val(Vec::<Value>::new()));
    }

    #[test]
    fn test_index_conversion() {
        assert_eq!(val(3).as_index().unwrap(), 3);
        assert_eq!(val(-1).as_index().unwrap_err().kind, ErrorKind::Index);
        assert_eq!(val(1.5).as_index().unwrap_err().kind, ErrorKind::Domain);
        assert_eq!(val('a').as_index().unwrap_err().kind, ErrorKind::Domain);
    }

    #[test]
    fn test_depth_and_cells() {
        assert_eq!(val(1).depth().unwrap(), 0);
        assert_eq!(val(vec![1, 2]).depth().unwrap(), 1);
        assert_eq!(val(vec![val(vec![1]), val(2)]).depth().unwrap(), 2);

        let cell = Value::from_cell(Array::scalar(val('q'))).unwrap();
        assert_eq!(cell, val('q'));
        assert_eq!(val("abc").as_string().as_deref(), Some("abc"));
        assert_eq!(val(vec![1]).as_string(), None);
    }
}
