//! Types of values in the IR.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::data_type::DataType;
use crate::index_expr::IndexExpr;

/// Dimension sizes of a tensor.
pub type Shape = SmallVec<[IndexExpr; 4]>;

/// Type of a tensor: its shape and element type.
///
/// Dimension sizes are symbolic, so the same type can describe tensors whose
/// sizes are only known at runtime.
///
/// ```
/// use relay_types::{DataType, IndexExpr, TensorType};
///
/// let boxes = TensorType::new(
///     vec![IndexExpr::from("batch"), 100.into(), 6.into()],
///     DataType::Float32,
/// );
/// assert_eq!(boxes.ndim(), 3);
/// assert_eq!(boxes.dim(0), Some(&IndexExpr::from("batch")));
/// assert_eq!(boxes.to_string(), "Tensor[(batch, 100, 6), float32]");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TensorType {
    pub shape: Shape,
    pub dtype: DataType,
}

impl TensorType {
    pub fn new(shape: impl IntoIterator<Item = IndexExpr>, dtype: DataType) -> Self {
        TensorType {
            shape: shape.into_iter().collect(),
            dtype,
        }
    }

    /// Create a tensor type where all dimensions have known sizes.
    pub fn from_fixed_shape(shape: &[usize], dtype: DataType) -> Self {
        Self::new(shape.iter().map(|&size| IndexExpr::from(size)), dtype)
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Return the size of the index'th dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<&IndexExpr> {
        self.shape.get(index)
    }

    /// Return the shape if every dimension is a known constant.
    pub fn fixed_shape(&self) -> Option<Vec<i64>> {
        self.shape.iter().map(|d| d.simplify().as_value()).collect()
    }

    /// Simplify the dimension expressions.
    ///
    /// See [`IndexExpr::simplify`].
    pub fn simplify(&self) -> TensorType {
        TensorType {
            shape: self.shape.iter().map(|d| d.simplify()).collect(),
            dtype: self.dtype,
        }
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor[(")?;
        for (i, dim) in self.shape.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, "), {}]", self.dtype)
    }
}

/// Ordered sequence of types, eg. the outputs of a multi-output operator.
#[derive(Clone, Debug, PartialEq)]
pub struct TupleType {
    pub fields: Vec<Type>,
}

impl TupleType {
    pub fn new(fields: Vec<Type>) -> Self {
        TupleType { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&Type> {
        self.fields.get(index)
    }
}

impl fmt::Display for TupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, ")")
    }
}

/// Placeholder for a type which has not been determined yet.
///
/// The type checker creates one for the output of each call and binds it
/// once the operator's type relation has run.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TypeVar {
    id: u32,
    name: Arc<str>,
}

impl TypeVar {
    pub fn new(id: u32, name: &str) -> Self {
        TypeVar {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

/// Type of an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Tensor(TensorType),
    Tuple(TupleType),
    /// Type which has not been inferred yet.
    Incomplete(TypeVar),
}

impl Type {
    pub fn as_tensor(&self) -> Option<&TensorType> {
        match self {
            Type::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&TupleType> {
        match self {
            Type::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Return true if this type contains no unresolved type variables.
    pub fn is_complete(&self) -> bool {
        match self {
            Type::Tensor(_) => true,
            Type::Tuple(tuple) => tuple.fields.iter().all(|f| f.is_complete()),
            Type::Incomplete(_) => false,
        }
    }

    /// Simplify dimension expressions in all tensor types.
    pub fn simplify(&self) -> Type {
        match self {
            Type::Tensor(t) => Type::Tensor(t.simplify()),
            Type::Tuple(t) => Type::Tuple(TupleType::new(
                t.fields.iter().map(|f| f.simplify()).collect(),
            )),
            Type::Incomplete(_) => self.clone(),
        }
    }
}

impl From<TensorType> for Type {
    fn from(val: TensorType) -> Self {
        Type::Tensor(val)
    }
}

impl From<TupleType> for Type {
    fn from(val: TupleType) -> Self {
        Type::Tuple(val)
    }
}

impl From<TypeVar> for Type {
    fn from(val: TypeVar) -> Self {
        Type::Incomplete(val)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Tensor(t) => write!(f, "{}", t),
            Type::Tuple(t) => write!(f, "{}", t),
            Type::Incomplete(var) => write!(f, "{}", var),
        }
    }
}

/// Signature of a function.
#[derive(Clone, Debug, PartialEq)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn (")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// Create a [`TensorType`] from a list of dimension sizes or names and a
/// [`DataType`] variant.
///
/// ```
/// use relay_types::{tensor_type, DataType, IndexExpr};
///
/// let t = tensor_type!(["batch", 100, 6], Float32);
/// assert_eq!(t.dtype, DataType::Float32);
/// assert_eq!(t.dim(0), Some(&IndexExpr::from("batch")));
/// ```
#[macro_export]
macro_rules! tensor_type {
    ([$($dim:expr),* $(,)?], $dtype:ident) => {{
        let dims: Vec<$crate::IndexExpr> = vec![$($crate::IndexExpr::from($dim)),*];
        $crate::TensorType::new(dims, $crate::DataType::$dtype)
    }};
}
