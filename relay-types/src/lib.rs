//! Types for the relay IR's operator type relations.
//!
//! Before any data exists, each operator in a program describes how the types
//! of its inputs determine the types of its outputs. A type is either a
//! tensor type (a shape plus an element type), a tuple of types, or an
//! incomplete type that the type checker has not determined yet.
//!
//! Tensor dimensions are symbolic [`IndexExpr`]s, so a type such as
//! `Tensor[(batch, 100, 6), float32]` can describe inputs whose batch size
//! is only known at runtime. Deriving the type of a `[batch, n]` by `[batch, n]`
//! index gather produces `Tensor[(batch * n, 3), int32]` without evaluating
//! anything.
//!
//! # Crate overview
//!
//! - [`IndexExpr`] represents dimension sizes and supports simplification.
//! - [`TensorType`], [`TupleType`], [`Type`] and [`FuncType`] describe values.
//! - [`TypeReporter`] records the types bound to type variables and
//!   [`unify`] checks that two types are compatible.

mod data_type;
mod error;
mod index_expr;
mod reporter;
mod ty;
mod type_var_gen;

pub use data_type::DataType;
pub use error::TypeError;
pub use index_expr::{IndexExpr, Symbol};
pub use reporter::{unify, TypeReporter};
pub use ty::{FuncType, Shape, TensorType, TupleType, Type, TypeVar};
pub use type_var_gen::TypeVarGen;
