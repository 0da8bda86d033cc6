//! Immutable, shape-addressed arrays and the lazy views built over them.
//!
//! Every concrete representation implements [`ArrayView`], whose single
//! required accessor is a flat, row-major [`ArrayView::pick`]. The [`Array`]
//! handle wraps any view behind an `Rc`, bounds-checks every pick, and offers
//! the constructors that build views without copying:
//!
//! - owning arrays hold their elements
//! - slice views fix one or more leading axes of a parent
//! - gather views read the parent through an index array
//! - reshape views recycle the parent cyclically under a new shape
//! - zip views combine two parents under the broadcast alignment law
//! - scalar boxes hold one value as a rank-0 array
//!
//! Any array whose element count is zero collapses to the canonical empty
//! value returned by [`Array::nil`].

use crate::{Error, MAX_ARRAY_COUNT};
use crate::value::Value;
use smallvec::SmallVec;
use std::rc::Rc;

/// Ordered axis sizes; the length of a shape is the rank
pub type Shape = SmallVec<[usize; 4]>;

/// Element combiner used by zip views
pub type ZipFn = dyn Fn(Value, Value) -> Result<Value, Error>;

/// Product of the axis sizes, 1 for rank 0. Only for shapes of arrays that
/// already exist; new shapes go through [`checked_count`].
pub fn shape_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Product of the axis sizes, or a Shape error when it exceeds
/// [`MAX_ARRAY_COUNT`]
pub fn checked_count(shape: &[usize]) -> Result<usize, Error> {
    shape
        .iter()
        .try_fold(1usize, |count, &len| count.checked_mul(len))
        .filter(|&count| count <= MAX_ARRAY_COUNT)
        .ok_or_else(|| {
            Error::shape(format!(
                "shape {shape:?} exceeds the limit of {MAX_ARRAY_COUNT} elements"
            ))
        })
}

/// Validate user-supplied dimensions and return the shape with its count.
///
/// Every dimension must be a positive integer. An empty list of dimensions
/// is the rank-0 shape with count 1.
pub fn make_shape(dims: &[f64]) -> Result<(Shape, usize), Error> {
    let mut shape = Shape::with_capacity(dims.len());
    for &d in dims {
        if d.fract() != 0.0 || !d.is_finite() {
            return Err(Error::shape(format!("dimension {d} is not an integer")));
        }
        if d < 1.0 {
            return Err(Error::shape(format!("dimension {d} is not positive")));
        }
        shape.push(d as usize);
    }
    let count = checked_count(&shape)?;
    Ok((shape, count))
}

/// Broadcast alignment of two shapes.
///
/// The longer shape (the left one on a tie) leads; the other must equal a
/// suffix of it, and is then repeated across the leading cells.
pub fn align_shapes(left: &[usize], right: &[usize]) -> Result<Shape, Error> {
    let (lead, short) = if right.len() > left.len() {
        (right, left)
    } else {
        (left, right)
    };
    let split = lead.len() - short.len();
    if &lead[split..] == short {
        Ok(Shape::from_slice(lead))
    } else {
        Err(Error::shape(format!(
            "shapes {left:?} and {right:?} do not align"
        )))
    }
}

/// The array contract every representation implements.
pub trait ArrayView {
    fn shape(&self) -> &[usize];

    fn count(&self) -> usize;

    /// Element used to pad results that extend past the array's length
    fn fill(&self) -> Option<Value> {
        None
    }

    /// Flat row-major accessor; `index` has already been bounds-checked
    fn pick(&self, index: usize) -> Result<Value, Error>;

    /// Short description of the representation, for debugging
    fn describe(&self) -> &'static str;
}

/// Shape together with its cached element count
#[derive(Debug, Clone)]
struct Layout {
    shape: Shape,
    count: usize,
}

impl Layout {
    fn new(shape: Shape) -> Result<Self, Error> {
        let count = checked_count(&shape)?;
        Ok(Layout { shape, count })
    }

    fn list(len: usize) -> Self {
        Layout {
            shape: Shape::from_slice(&[len]),
            count: len,
        }
    }
}

struct OwnedArray {
    layout: Layout,
    data: Vec<Value>,
    fill: Option<Value>,
}

impl ArrayView for OwnedArray {
    fn shape(&self) -> &[usize] {
        &self.layout.shape
    }
    fn count(&self) -> usize {
        self.layout.count
    }
    fn fill(&self) -> Option<Value> {
        self.fill.clone()
    }
    fn pick(&self, index: usize) -> Result<Value, Error> {
        Ok(self.data[index].clone())
    }
    fn describe(&self) -> &'static str {
        "owned"
    }
}

struct ScalarBox {
    value: Value,
}

impl ArrayView for ScalarBox {
    fn shape(&self) -> &[usize] {
        &[]
    }
    fn count(&self) -> usize {
        1
    }
    fn pick(&self, _index: usize) -> Result<Value, Error> {
        Ok(self.value.clone())
    }
    fn describe(&self) -> &'static str {
        "scalar"
    }
}

struct NilArray;

impl ArrayView for NilArray {
    fn shape(&self) -> &[usize] {
        &[0]
    }
    fn count(&self) -> usize {
        0
    }
    fn pick(&self, index: usize) -> Result<Value, Error> {
        Err(Error::index(format!("index {index} into the empty array")))
    }
    fn describe(&self) -> &'static str {
        "nil"
    }
}

struct SliceView {
    layout: Layout,
    parent: Array,
    offset: usize,
}

impl ArrayView for SliceView {
    fn shape(&self) -> &[usize] {
        &self.layout.shape
    }
    fn count(&self) -> usize {
        self.layout.count
    }
    fn fill(&self) -> Option<Value> {
        self.parent.fill()
    }
    fn pick(&self, index: usize) -> Result<Value, Error> {
        self.parent.pick(self.offset + index)
    }
    fn describe(&self) -> &'static str {
        "slice"
    }
}

struct GatherView {
    layout: Layout,
    parent: Array,
    indices: Array,
}

impl ArrayView for GatherView {
    fn shape(&self) -> &[usize] {
        &self.layout.shape
    }
    fn count(&self) -> usize {
        self.layout.count
    }
    fn fill(&self) -> Option<Value> {
        self.parent.fill()
    }
    fn pick(&self, index: usize) -> Result<Value, Error> {
        let at = self.indices.pick(index)?.as_index()?;
        self.parent.pick(at)
    }
    fn describe(&self) -> &'static str {
        "gather"
    }
}

struct ReshapeView {
    layout: Layout,
    parent: Array,
}

impl ArrayView for ReshapeView {
    fn shape(&self) -> &[usize] {
        &self.layout.shape
    }
    fn count(&self) -> usize {
        self.layout.count
    }
    fn fill(&self) -> Option<Value> {
        self.parent.fill()
    }
    fn pick(&self, index: usize) -> Result<Value, Error> {
        self.parent.pick(index % self.parent.count())
    }
    fn describe(&self) -> &'static str {
        "reshape"
    }
}

struct ZipView {
    layout: Layout,
    left: Array,
    right: Array,
    combine: Rc<ZipFn>,
}

impl ArrayView for ZipView {
    fn shape(&self) -> &[usize] {
        &self.layout.shape
    }
    fn count(&self) -> usize {
        self.layout.count
    }
    // The shorter operand's count is exactly the inner count of the split,
    // so a modulus maps every result index back into it.
    fn pick(&self, index: usize) -> Result<Value, Error> {
        let l = self.left.pick(index % self.left.count())?;
        let r = self.right.pick(index % self.right.count())?;
        (self.combine)(l, r)
    }
    fn describe(&self) -> &'static str {
        "zip"
    }
}

thread_local! {
    static NIL: Array = Array(Rc::new(NilArray));
}

/// Shared handle to an immutable array of any representation.
#[derive(Clone)]
pub struct Array(Rc<dyn ArrayView>);

impl Array {
    /// The canonical empty array
    pub fn nil() -> Array {
        NIL.with(Array::clone)
    }

    fn from_view(view: impl ArrayView + 'static) -> Array {
        if view.count() == 0 {
            Array::nil()
        } else {
            Array(Rc::new(view))
        }
    }

    /// Owning array over `data` laid out row-major under `shape`
    pub fn new(shape: Shape, data: Vec<Value>) -> Result<Array, Error> {
        let layout = Layout::new(shape)?;
        if layout.count != data.len() {
            return Err(Error::length(format!(
                "shape {:?} needs {} elements, got {}",
                layout.shape.as_slice(),
                layout.count,
                data.len()
            )));
        }
        Ok(Array::from_view(OwnedArray {
            layout,
            data,
            fill: None,
        }))
    }

    /// Owning rank-1 array
    pub fn list(data: Vec<Value>) -> Array {
        let layout = Layout::list(data.len());
        Array::from_view(OwnedArray {
            layout,
            data,
            fill: None,
        })
    }

    /// Owning array with an explicit fill element
    pub fn with_fill(shape: Shape, data: Vec<Value>, fill: Option<Value>) -> Result<Array, Error> {
        let layout = Layout::new(shape)?;
        if layout.count != data.len() {
            return Err(Error::length(format!(
                "shape {:?} needs {} elements, got {}",
                layout.shape.as_slice(),
                layout.count,
                data.len()
            )));
        }
        Ok(Array::from_view(OwnedArray { layout, data, fill }))
    }

    /// Rank-0 array holding `value`
    pub fn scalar(value: Value) -> Array {
        Array(Rc::new(ScalarBox { value }))
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn rank(&self) -> usize {
        self.0.shape().len()
    }

    pub fn count(&self) -> usize {
        self.0.count()
    }

    pub fn is_nil(&self) -> bool {
        self.0.count() == 0
    }

    pub fn fill(&self) -> Option<Value> {
        self.0.fill()
    }

    /// Fill to pad with: the declared fill, else one derived from the first element
    pub fn fill_or_default(&self) -> Value {
        if let Some(fill) = self.fill() {
            return fill;
        }
        match self.pick(0) {
            Ok(Value::Character(_)) => Value::Character(' '),
            _ => Value::Number(0.0),
        }
    }

    pub fn describe(&self) -> &'static str {
        self.0.describe()
    }

    /// Bounds-checked flat accessor
    pub fn pick(&self, index: usize) -> Result<Value, Error> {
        let count = self.0.count();
        if index >= count {
            return Err(Error::index(format!(
                "index {index} out of bounds for count {count}"
            )));
        }
        self.0.pick(index)
    }

    /// Number of major cells: the first axis, or 1 for a rank-0 array
    pub fn length(&self) -> usize {
        self.shape().first().copied().unwrap_or(1)
    }

    /// Elements in a major cell
    pub fn cell_count(&self) -> usize {
        match self.shape().split_first() {
            Some((_, rest)) => shape_count(rest),
            None => 1,
        }
    }

    /// View of the major cells `start .. start + len`
    pub fn slice(&self, start: usize, len: usize) -> Result<Array, Error> {
        if self.rank() == 0 {
            return Err(Error::rank("cannot slice a rank-0 array"));
        }
        if start + len > self.length() {
            return Err(Error::index(format!(
                "cells {start}..{} out of bounds for length {}",
                start + len,
                self.length()
            )));
        }
        let mut shape = Shape::from_slice(self.shape());
        shape[0] = len;
        if len == self.length() {
            return Ok(self.clone());
        }
        Ok(Array::from_view(SliceView {
            layout: Layout::new(shape)?,
            parent: self.clone(),
            offset: start * self.cell_count(),
        }))
    }

    /// View of major cell `index`
    pub fn slice_cell(&self, index: usize) -> Result<Array, Error> {
        self.select_rank(&[index])
    }

    /// View of the sub-array found by fixing the leading axes to `prefix`
    pub fn select_rank(&self, prefix: &[usize]) -> Result<Array, Error> {
        let shape = self.shape();
        if prefix.len() > shape.len() {
            return Err(Error::rank(format!(
                "cannot fix {} axes of a rank-{} array",
                prefix.len(),
                shape.len()
            )));
        }
        let mut offset = 0;
        let mut stride = self.count();
        for (axis, &i) in prefix.iter().enumerate() {
            if i >= shape[axis] {
                return Err(Error::index(format!(
                    "index {i} out of bounds for axis {axis} of length {}",
                    shape[axis]
                )));
            }
            stride /= shape[axis];
            offset += i * stride;
        }
        Ok(Array::from_view(SliceView {
            layout: Layout::new(Shape::from_slice(&shape[prefix.len()..]))?,
            parent: self.clone(),
            offset,
        }))
    }

    /// View reading `parent` through an index array; the result has the
    /// indices' shape. Every index is validated up front.
    pub fn gather(parent: &Array, indices: &Array) -> Result<Array, Error> {
        for i in 0..indices.count() {
            let at = indices.pick(i)?.as_index()?;
            if at >= parent.count() {
                return Err(Error::index(format!(
                    "index {at} out of bounds for count {}",
                    parent.count()
                )));
            }
        }
        Ok(Array::from_view(GatherView {
            layout: Layout::new(Shape::from_slice(indices.shape()))?,
            parent: parent.clone(),
            indices: indices.clone(),
        }))
    }

    /// View of `parent` under a new shape, recycling its elements cyclically
    pub fn reshape(shape: Shape, parent: &Array) -> Result<Array, Error> {
        let layout = Layout::new(shape)?;
        if layout.count == 0 {
            return Ok(Array::nil());
        }
        if parent.is_nil() {
            return Err(Error::length("cannot reshape the empty array"));
        }
        if layout.shape.as_slice() == parent.shape() {
            return Ok(parent.clone());
        }
        Ok(Array::from_view(ReshapeView {
            layout,
            parent: parent.clone(),
        }))
    }

    /// Broadcasting combination of two arrays
    pub fn zip(left: &Array, right: &Array, combine: Rc<ZipFn>) -> Result<Array, Error> {
        let shape = align_shapes(left.shape(), right.shape())?;
        Ok(Array::from_view(ZipView {
            layout: Layout::new(shape)?,
            left: left.clone(),
            right: right.clone(),
            combine,
        }))
    }

    /// Owning array built by laying same-shaped elements end to end.
    ///
    /// The result shape is `outer` (default: the number of elements) followed
    /// by the common element shape. Non-array elements count as rank 0.
    pub fn merge(
        elements: Vec<Value>,
        fill: Option<Value>,
        outer: Option<Shape>,
    ) -> Result<Array, Error> {
        let outer = outer.unwrap_or_else(|| Shape::from_slice(&[elements.len()]));
        if shape_count(&outer) != elements.len() {
            return Err(Error::length(format!(
                "outer shape {:?} does not hold {} elements",
                outer.as_slice(),
                elements.len()
            )));
        }
        let Some(first) = elements.first() else {
            return Ok(Array::nil());
        };
        let inner = first.shape();
        let mut shape = outer;
        shape.extend_from_slice(&inner);
        let mut data = Vec::with_capacity(checked_count(&shape)?);
        for element in &elements {
            match element {
                Value::Array(a) => {
                    if a.shape() != inner.as_slice() {
                        return Err(Error::shape(format!(
                            "cannot merge elements of shapes {:?} and {:?}",
                            inner.as_slice(),
                            a.shape()
                        )));
                    }
                    for i in 0..a.count() {
                        data.push(a.pick(i)?);
                    }
                }
                scalar => {
                    if !inner.is_empty() {
                        return Err(Error::shape(format!(
                            "cannot merge a scalar with elements of shape {:?}",
                            inner.as_slice()
                        )));
                    }
                    data.push(scalar.clone());
                }
            }
        }
        Array::with_fill(shape, data, fill)
    }

    /// Force every element into an owning array of the same shape
    pub fn materialize(&self) -> Result<Array, Error> {
        if matches!(self.describe(), "owned" | "nil" | "scalar") {
            return Ok(self.clone());
        }
        let data = self.to_vec()?;
        Array::with_fill(Shape::from_slice(self.shape()), data, self.fill())
    }

    pub fn to_vec(&self) -> Result<Vec<Value>, Error> {
        (0..self.count()).map(|i| self.pick(i)).collect()
    }

    /// Major cells, with rank-0 cells unwrapped to their element
    pub fn major_cells(&self) -> Result<Vec<Value>, Error> {
        if self.rank() == 0 {
            return Ok(vec![self.pick(0)?]);
        }
        if self.is_nil() {
            return Ok(Vec::new());
        }
        (0..self.length())
            .map(|i| self.slice_cell(i).and_then(Value::from_cell))
            .collect()
    }

    /// Structural equality: same shape and pairwise equal elements
    pub fn matches(&self, other: &Array) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        (0..self.count()).all(|i| match (self.pick(i), other.pick(i)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        })
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Array<{}>{:?}", self.describe(), self.shape())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::value::val;

    fn iota(n: usize) -> Array {
        Array::list((1..=n).map(|i| val(i as f64)).collect())
    }

    fn numbers(a: &Array) -> Vec<f64> {
        a.to_vec()
            .unwrap()
            .into_iter()
            .map(|v| v.as_number().unwrap())
            .collect()
    }

    fn add() -> Rc<ZipFn> {
        Rc::new(|l: Value, r: Value| Ok(Value::Number(l.as_number()? + r.as_number()?)))
    }

    #[test]
    fn test_make_shape_data_driven() {
        let cases: Vec<(&[f64], Result<(Vec<usize>, usize), ErrorKind>)> = vec![
            (&[], Ok((vec![], 1))),
            (&[3.0], Ok((vec![3], 3))),
            (&[2.0, 3.0], Ok((vec![2, 3], 6))),
            (&[2.0, 3.0, 4.0], Ok((vec![2, 3, 4], 24))),
            (&[2.5], Err(ErrorKind::Shape)),
            (&[0.0], Err(ErrorKind::Shape)),
            (&[-1.0, 2.0], Err(ErrorKind::Shape)),
            (&[f64::INFINITY], Err(ErrorKind::Shape)),
            // product overflows usize
            (&[4294967296.0, 4294967296.0], Err(ErrorKind::Shape)),
            (&[1e300], Err(ErrorKind::Shape)),
            // representable but past the element limit
            (&[4096.0, 4097.0], Err(ErrorKind::Shape)),
            (&[4096.0, 4096.0], Ok((vec![4096, 4096], MAX_ARRAY_COUNT))),
        ];
        for (i, (dims, expected)) in cases.into_iter().enumerate() {
            let actual = make_shape(dims)
                .map(|(s, c)| (s.to_vec(), c))
                .map_err(|e| e.kind);
            assert_eq!(actual, expected, "case #{}", i + 1);
        }
    }

    #[test]
    fn test_count_and_pick_bounds() {
        let a = Array::reshape(Shape::from_slice(&[2, 3]), &iota(6)).unwrap();
        assert_eq!(a.count(), 6);
        for i in 0..6 {
            assert!(a.pick(i).is_ok());
        }
        assert_eq!(a.pick(6).unwrap_err().kind, ErrorKind::Index);

        let s = Array::scalar(val(9));
        assert_eq!(s.rank(), 0);
        assert_eq!(s.count(), 1);
        assert_eq!(s.pick(0).unwrap(), val(9));
        assert_eq!(s.pick(1).unwrap_err().kind, ErrorKind::Index);
    }

    #[test]
    fn test_emptiness_collapse() {
        let shapes: Vec<&[usize]> = vec![&[0], &[0, 3], &[4, 0], &[2, 0, 5]];
        for shape in shapes {
            let a = Array::new(Shape::from_slice(shape), Vec::new()).unwrap();
            assert!(a.is_nil(), "shape {shape:?}");
            assert_eq!(a.shape(), &[0]);
            assert_eq!(a.describe(), "nil");
        }
        assert!(Array::list(Vec::new()).is_nil());
        assert!(iota(3).slice(1, 0).unwrap().is_nil());
        assert!(Array::reshape(Shape::from_slice(&[0]), &iota(3)).unwrap().is_nil());
    }

    #[test]
    fn test_reshape_cyclic() {
        // reshape 2‿3 of 1..6, element 4 is 5
        let a = Array::reshape(Shape::from_slice(&[2, 3]), &iota(6)).unwrap();
        assert_eq!(a.pick(4).unwrap(), val(5));

        let parent = iota(4);
        let b = Array::reshape(Shape::from_slice(&[3, 3]), &parent).unwrap();
        for i in 0..9 {
            assert_eq!(b.pick(i).unwrap(), parent.pick(i % 4).unwrap());
        }
        // higher rank parent reads flat row-major order
        let c = Array::reshape(Shape::from_slice(&[5]), &b).unwrap();
        assert_eq!(numbers(&c), vec![1.0, 2.0, 3.0, 4.0, 1.0]);

        assert_eq!(
            Array::reshape(Shape::from_slice(&[2]), &Array::nil())
                .unwrap_err()
                .kind,
            ErrorKind::Length
        );
    }

    #[test]
    fn test_zip_equal_shapes() {
        let l = iota(4);
        let r = Array::list(vec![val(10), val(20), val(30), val(40)]);
        let z = Array::zip(&l, &r, add()).unwrap();
        assert_eq!(z.shape(), &[4]);
        assert_eq!(numbers(&z), vec![11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn test_zip_broadcasts_suffix() {
        let m = Array::reshape(Shape::from_slice(&[2, 3]), &iota(6)).unwrap();
        let row = Array::list(vec![val(10), val(20), val(30)]);
        let z = Array::zip(&m, &row, add()).unwrap();
        assert_eq!(z.shape(), &[2, 3]);
        assert_eq!(numbers(&z), vec![11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);

        // either side may be the shorter one
        let z = Array::zip(&row, &m, add()).unwrap();
        assert_eq!(z.shape(), &[2, 3]);
        assert_eq!(numbers(&z), vec![11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);

        let z = Array::zip(&m, &Array::scalar(val(100)), add()).unwrap();
        assert_eq!(numbers(&z), vec![101.0, 102.0, 103.0, 104.0, 105.0, 106.0]);
    }

    #[test]
    fn test_zip_shape_mismatch() {
        let cases: Vec<(&[usize], &[usize])> = vec![
            (&[2, 3], &[2]),
            (&[3], &[4]),
            (&[2, 3, 4], &[2, 4]),
            (&[2, 3], &[3, 2]),
        ];
        for (ls, rs) in cases {
            let l = Array::reshape(Shape::from_slice(ls), &iota(3)).unwrap();
            let r = Array::reshape(Shape::from_slice(rs), &iota(3)).unwrap();
            let err = Array::zip(&l, &r, add()).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Shape, "{ls:?} vs {rs:?}");
        }
    }

    #[test]
    fn test_slice_views() {
        let m = Array::reshape(Shape::from_slice(&[3, 2, 2]), &iota(12)).unwrap();
        let cell = m.slice_cell(1).unwrap();
        assert_eq!(cell.shape(), &[2, 2]);
        assert_eq!(numbers(&cell), vec![5.0, 6.0, 7.0, 8.0]);

        let row = m.select_rank(&[2, 1]).unwrap();
        assert_eq!(row.shape(), &[2]);
        assert_eq!(numbers(&row), vec![11.0, 12.0]);

        let elem = m.select_rank(&[0, 1, 0]).unwrap();
        assert_eq!(elem.rank(), 0);
        assert_eq!(elem.pick(0).unwrap(), val(3));

        let tail = m.slice(1, 2).unwrap();
        assert_eq!(tail.shape(), &[2, 2, 2]);
        assert_eq!(tail.pick(0).unwrap(), val(5));

        assert_eq!(m.slice_cell(3).unwrap_err().kind, ErrorKind::Index);
        assert_eq!(m.select_rank(&[0, 0, 0, 0]).unwrap_err().kind, ErrorKind::Rank);
    }

    #[test]
    fn test_gather_view() {
        let parent = Array::list(vec![val('a'), val('b'), val('c')]);
        let idx = Array::new(
            Shape::from_slice(&[2, 2]),
            vec![val(2), val(0), val(1), val(1)],
        )
        .unwrap();
        let g = Array::gather(&parent, &idx).unwrap();
        assert_eq!(g.shape(), &[2, 2]);
        assert_eq!(g.describe(), "gather");
        assert_eq!(
            g.to_vec().unwrap(),
            vec![val('c'), val('a'), val('b'), val('b')]
        );

        let bad = Array::list(vec![val(3)]);
        assert_eq!(
            Array::gather(&parent, &bad).unwrap_err().kind,
            ErrorKind::Index
        );
    }

    #[test]
    fn test_merge() {
        let rows = vec![Value::Array(iota(2)), Value::Array(iota(2)), Value::Array(iota(2))];
        let m = Array::merge(rows, None, None).unwrap();
        assert_eq!(m.shape(), &[3, 2]);
        assert_eq!(numbers(&m), vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);

        let scalars = vec![val(1), val(2), val(3), val(4)];
        let m = Array::merge(scalars, None, Some(Shape::from_slice(&[2, 2]))).unwrap();
        assert_eq!(m.shape(), &[2, 2]);

        let ragged = vec![Value::Array(iota(2)), Value::Array(iota(3))];
        assert_eq!(
            Array::merge(ragged, None, None).unwrap_err().kind,
            ErrorKind::Shape
        );
        assert!(Array::merge(Vec::new(), None, None).unwrap().is_nil());
    }

    #[test]
    fn test_views_share_parent() {
        let parent = iota(3);
        let view = Array::reshape(Shape::from_slice(&[6]), &parent).unwrap();
        assert_eq!(view.describe(), "reshape");
        let owned = view.materialize().unwrap();
        assert_eq!(owned.describe(), "owned");
        assert!(owned.matches(&view));
        assert!(!owned.matches(&parent));
    }
}
