use crate::ty::{Type, TypeVar};

/// Errors produced when deriving or unifying types.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TypeError {
    /// Too many or too few input types were provided.
    #[error("expected {expected} input types, got {actual}")]
    IncorrectInputCount { expected: usize, actual: usize },

    /// An input's rank does not match that expected by the operator.
    #[error("input \"{input}\" should have rank {expected}, but has rank {actual}")]
    IncorrectRank {
        input: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An input which must be a tensor is a tuple or is not yet known.
    #[error("input \"{input}\" should be a tensor")]
    ExpectedTensor { input: &'static str },

    /// The operator was given attributes intended for a different operator.
    #[error("expected {expected} attributes")]
    InvalidAttrs { expected: &'static str },

    /// Two types could not be unified.
    #[error("type mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: Type, actual: Type },

    /// A type variable would be bound to a type containing itself.
    #[error("cannot bind {var} to {ty}, which contains it")]
    RecursiveBinding { var: TypeVar, ty: Type },
}
