//! relay derives the types of vision operator calls in a tensor program IR.
//!
//! # Overview
//!
//! Each operator declares how many inputs it takes, the attributes that
//! parameterize it and a _type relation_: a pure function from the types of
//! its inputs to the type of its output. Type relations run before any data
//! exists, so shapes are symbolic and may refer to sizes such as a batch
//! dimension that are only known at runtime.
//!
//! The basic workflow is:
//!
//! 1. Create an [`OpRegistry`] with [`OpRegistry::with_all_ops`].
//! 2. Build expressions with the factories in [`ops`], passing the registry.
//!    Factories fail only if the operator is not registered.
//! 3. Run a [`TypeChecker`] over an expression or [`Function`]. The checker
//!    looks up each call's operator in the registry and invokes its type
//!    relation.
//!
//! ```
//! use relay::ops::{get_valid_counts, non_max_suppression_with_attrs, NonMaxSuppressionAttrs};
//! use relay::{tensor_type, Expr, OpRegistry, TypeChecker};
//!
//! let registry = OpRegistry::with_all_ops();
//! let data = Expr::var("data", tensor_type!([2, 100, 6], Float32).into());
//! let counts = get_valid_counts(&registry, data, 0.0, 0, 1).unwrap();
//!
//! let nms = non_max_suppression_with_attrs(
//!     &registry,
//!     counts.get_item(1),
//!     counts.get_item(0),
//!     counts.get_item(2),
//!     NonMaxSuppressionAttrs::default(),
//! )
//! .unwrap();
//!
//! let ty = TypeChecker::new(&registry).infer(&nms).unwrap();
//! assert_eq!(ty.to_string(), "(Tensor[(2, 100), int32], Tensor[(2, 1), int32])");
//! ```
//!
//! # Operators
//!
//! | Operator                      | Inputs                              | Output |
//! |-------------------------------|-------------------------------------|--------|
//! | `vision.get_valid_counts`     | data `[b, n, k]`                    | `([b] int32, [b, n, k], [b, n] int32)` |
//! | `vision.non_max_suppression`  | data `[b, n, k]`, valid_count `[b]`, indices | `([b, n] int32, [b, 1] int32)` or `[b, n, k]` |
//! | `vision.batch_to_index`       | box_indices `[n, m]`, class_ids `[n, m]` | `[n * m, 3]` |
//!
//! # Logging
//!
//! The type checker emits [`tracing`] events. The type derived for each call
//! is logged at `debug` level, or `info` if [`CheckOptions::verbose`] is set.
//! Options can also be read from the environment with
//! [`CheckOptions::from_env`].

mod env;
mod expr;
mod op;
mod op_registry;
mod type_check;

pub mod attrs;
pub mod ops;

pub use attrs::Attrs;
pub use env::{env_flag, str_as_bool, CheckOptions, CHECK_ARITY_VAR, VERBOSE_VAR};
pub use expr::{Call, Expr, ExprKind, Function, Var};
pub use op::{ArgumentInfo, Op, OpDef, OpKind};
pub use op_registry::{OpRegistry, RegistryError};
pub use type_check::{CheckError, TypeChecker};

pub use relay_types::{
    tensor_type, unify, DataType, FuncType, IndexExpr, TensorType, TupleType, Type, TypeError,
    TypeReporter, TypeVar, TypeVarGen,
};
