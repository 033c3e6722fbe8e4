//! Type checking of expressions and functions.

use rayon::prelude::*;
use relay_types::{FuncType, Type, TypeError, TypeReporter, TypeVarGen};
use rustc_hash::FxHashMap;
use tracing::{debug, info, trace};

use crate::env::CheckOptions;
use crate::expr::{Call, Expr, ExprKind, ExprRef, Function};
use crate::op_registry::{OpRegistry, RegistryError};

/// Errors reported by the [`TypeChecker`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CheckError {
    /// An operator's type relation rejected the input types.
    #[error("type relation of {op} failed: {source}")]
    Relation { op: String, source: TypeError },

    #[error("{op} expects {expected} arguments, got {actual}")]
    ArityMismatch {
        op: String,
        expected: usize,
        actual: usize,
    },

    /// The type of a call argument could not be determined.
    #[error("type of argument {index} of {op} is unknown")]
    UnresolvedInput { op: String, index: usize },

    #[error("expected a tuple, got {ty}")]
    NotATuple { ty: Type },

    #[error("tuple index {index} is out of bounds for a tuple of {len} fields")]
    TupleIndexOutOfBounds { index: usize, len: usize },

    /// The call refers to an operator with a registered name that is not the
    /// registry's own entry.
    #[error("operator {op} does not belong to this registry")]
    ForeignOp { op: String },

    /// A derived type conflicts with a type already bound to its slot.
    #[error("type assignment failed: {source}")]
    Assign { source: TypeError },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Infers the types of expressions by running each call's type relation.
///
/// ```
/// use relay::ops::batch_to_index;
/// use relay::{tensor_type, Expr, OpRegistry, TypeChecker};
///
/// let registry = OpRegistry::with_all_ops();
/// let box_indices = Expr::var("box_indices", tensor_type!([4, 5], Int32).into());
/// let class_ids = Expr::var("class_ids", tensor_type!([4, 5], Int32).into());
/// let call = batch_to_index(&registry, box_indices, class_ids).unwrap();
///
/// let ty = TypeChecker::new(&registry).infer(&call).unwrap();
/// assert_eq!(ty.to_string(), "Tensor[(20, 3), int32]");
/// ```
pub struct TypeChecker<'a> {
    registry: &'a OpRegistry,
    options: CheckOptions,
}

impl<'a> TypeChecker<'a> {
    pub fn new(registry: &'a OpRegistry) -> TypeChecker<'a> {
        TypeChecker {
            registry,
            options: CheckOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CheckOptions) -> TypeChecker<'a> {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Infer the type of an expression.
    pub fn infer(&self, expr: &Expr) -> Result<Type, CheckError> {
        let mut ctx = CheckContext::new(self);
        let ty = ctx.infer(expr)?;
        Ok(ctx.reporter.resolve(&ty))
    }

    /// Infer the signature of a function.
    ///
    /// If the function has a return type annotation it must be compatible
    /// with the type of the body.
    #[tracing::instrument(skip_all, fields(params = func.params.len()))]
    pub fn check_function(&self, func: &Function) -> Result<FuncType, CheckError> {
        let mut ctx = CheckContext::new(self);

        let params = func
            .params
            .iter()
            .map(|param| ctx.infer(param))
            .collect::<Result<Vec<_>, _>>()?;
        let body_ty = ctx.infer(&func.body)?;

        let ret = match &func.ret_type {
            Some(annotation) => {
                let slot = ctx.var_gen.fresh();
                ctx.assign(&slot, body_ty)?;
                ctx.assign(&slot, annotation.clone())?
            }
            None => body_ty,
        };

        let sig = FuncType {
            params: params.iter().map(|p| ctx.reporter.resolve(p)).collect(),
            ret: ctx.reporter.resolve(&ret),
        };
        debug!(sig = %sig, "checked function");
        Ok(sig)
    }

    /// Check independent functions in parallel.
    ///
    /// Results are returned in the same order as `funcs`.
    pub fn check_functions(&self, funcs: &[Function]) -> Vec<Result<FuncType, CheckError>> {
        funcs
            .par_iter()
            .map(|func| self.check_function(func))
            .collect()
    }
}

/// State for one checking pass.
struct CheckContext<'c, 'a> {
    checker: &'c TypeChecker<'a>,
    var_gen: TypeVarGen,
    reporter: TypeReporter,
    types: FxHashMap<ExprRef, Type>,
}

impl<'c, 'a> CheckContext<'c, 'a> {
    fn new(checker: &'c TypeChecker<'a>) -> Self {
        CheckContext {
            checker,
            var_gen: TypeVarGen::new(),
            reporter: TypeReporter::new(),
            types: FxHashMap::default(),
        }
    }

    fn infer(&mut self, expr: &Expr) -> Result<Type, CheckError> {
        let key = ExprRef(expr.clone());
        if let Some(ty) = self.types.get(&key) {
            return Ok(self.reporter.resolve(ty));
        }

        let ty = match expr.kind() {
            ExprKind::Var(var) => match &var.ty {
                Some(ty) => ty.clone(),
                None => self.var_gen.fresh().into(),
            },
            ExprKind::Call(call) => self.infer_call(call)?,
            ExprKind::Tuple(fields) => {
                let fields = fields
                    .iter()
                    .map(|field| self.infer(field))
                    .collect::<Result<Vec<_>, _>>()?;
                relay_types::TupleType::new(fields).into()
            }
            ExprKind::TupleGetItem { tuple, index } => {
                let tuple_ty = self.infer(tuple)?;
                let Some(fields) = tuple_ty.as_tuple() else {
                    return Err(CheckError::NotATuple { ty: tuple_ty });
                };
                fields
                    .field(*index)
                    .cloned()
                    .ok_or(CheckError::TupleIndexOutOfBounds {
                        index: *index,
                        len: fields.len(),
                    })?
            }
        };

        self.types.insert(key, ty.clone());
        Ok(ty)
    }

    fn infer_call(&mut self, call: &Call) -> Result<Type, CheckError> {
        let op_name = call.op.name();
        let op = self.checker.registry.get(op_name)?;
        if op != call.op {
            return Err(CheckError::ForeignOp {
                op: op_name.to_string(),
            });
        }

        if let Some(expected) = op.num_inputs() {
            if self.checker.options.check_arity && expected != call.args.len() {
                return Err(CheckError::ArityMismatch {
                    op: op_name.to_string(),
                    expected,
                    actual: call.args.len(),
                });
            }
        }

        let mut arg_types = Vec::with_capacity(call.args.len());
        for (index, arg) in call.args.iter().enumerate() {
            let ty = self.infer(arg)?;
            if !ty.is_complete() {
                return Err(CheckError::UnresolvedInput {
                    op: op_name.to_string(),
                    index,
                });
            }
            arg_types.push(ty);
        }

        let Some(kind) = op.kind() else {
            return Err(RegistryError::MissingTypeRelation {
                name: op_name.to_string(),
            }
            .into());
        };
        let derived = kind
            .derive_type(&arg_types, &call.attrs)
            .map_err(|source| CheckError::Relation {
                op: op_name.to_string(),
                source,
            })?;

        let slot = self.var_gen.fresh();
        let ty = self.assign(&slot, derived)?;

        if self.checker.options.verbose {
            info!(op = op_name, ty = %ty, "derived call type");
        } else {
            debug!(op = op_name, ty = %ty, "derived call type");
        }
        Ok(ty)
    }

    fn assign(&mut self, slot: &relay_types::TypeVar, ty: Type) -> Result<Type, CheckError> {
        trace!(slot = %slot, ty = %ty, "assign");
        self.reporter
            .assign(slot, ty)
            .map_err(|source| CheckError::Assign { source })
    }
}

#[cfg(test)]
mod tests {
    use relay_testing::TestCases;
    use relay_types::{tensor_type, TupleType, Type, TypeError};

    use super::{CheckError, TypeChecker};
    use crate::attrs::Attrs;
    use crate::env::CheckOptions;
    use crate::expr::{Call, Expr, Function};
    use crate::op::OpDef;
    use crate::op_registry::OpRegistry;
    use crate::ops::{
        batch_to_index, get_valid_counts, non_max_suppression_with_attrs, NonMaxSuppressionAttrs,
    };

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_target(false)
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_infer_get_valid_counts_fields() {
        init_logging();
        let registry = OpRegistry::with_all_ops();
        let data = Expr::var("data", tensor_type!([2, 100, 6], Float32).into());
        let counts = get_valid_counts(&registry, data, 0.0, 0, 1).unwrap();

        #[derive(Debug)]
        struct Case {
            index: usize,
            expected: Type,
        }

        let cases = [
            Case {
                index: 0,
                expected: tensor_type!([2], Int32).into(),
            },
            Case {
                index: 1,
                expected: tensor_type!([2, 100, 6], Float32).into(),
            },
            Case {
                index: 2,
                expected: tensor_type!([2, 100], Int32).into(),
            },
        ];

        let checker = TypeChecker::new(&registry);
        cases.test_each(|case| {
            let item = counts.get_item(case.index);
            assert_eq!(checker.infer(&item).unwrap(), case.expected);
        });

        let err = checker.infer(&counts.get_item(3)).unwrap_err();
        assert_eq!(err, CheckError::TupleIndexOutOfBounds { index: 3, len: 3 });
    }

    #[test]
    fn test_rank_error_is_relation_error() {
        let registry = OpRegistry::with_all_ops();
        let data = Expr::var("data", tensor_type!([2, 100], Float32).into());
        let call = get_valid_counts(&registry, data, 0.0, 0, 1).unwrap();

        let err = TypeChecker::new(&registry).infer(&call).unwrap_err();
        assert_eq!(
            err,
            CheckError::Relation {
                op: "vision.get_valid_counts".into(),
                source: TypeError::IncorrectRank {
                    input: "data",
                    expected: 3,
                    actual: 2,
                },
            }
        );
        assert_eq!(
            err.to_string(),
            "type relation of vision.get_valid_counts failed: \
             input \"data\" should have rank 3, but has rank 2"
        );
    }

    #[test]
    fn test_unresolved_input() {
        let registry = OpRegistry::with_all_ops();
        let call = get_valid_counts(&registry, Expr::untyped_var("data"), 0.0, 0, 1).unwrap();
        assert_eq!(
            TypeChecker::new(&registry).infer(&call),
            Err(CheckError::UnresolvedInput {
                op: "vision.get_valid_counts".into(),
                index: 0
            })
        );
    }

    #[test]
    fn test_arity_check() {
        let registry = OpRegistry::with_all_ops();
        let op = registry.get("vision.batch_to_index").unwrap();
        let idx = Expr::var("idx", tensor_type!([4, 5], Int32).into());
        let call = Expr::call(Call::new(
            op,
            vec![idx.clone(), idx.clone(), idx.clone()],
            Attrs::None,
            vec![],
        ));

        let err = TypeChecker::new(&registry).infer(&call).unwrap_err();
        assert_eq!(
            err,
            CheckError::ArityMismatch {
                op: "vision.batch_to_index".into(),
                expected: 2,
                actual: 3
            }
        );

        // With arity checking disabled the relation reports the mismatch.
        let checker = TypeChecker::new(&registry).with_options(CheckOptions {
            check_arity: false,
            verbose: true,
        });
        let err = checker.infer(&call).unwrap_err();
        assert!(matches!(
            err,
            CheckError::Relation {
                source: TypeError::IncorrectInputCount {
                    expected: 2,
                    actual: 3
                },
                ..
            }
        ));
    }

    #[test]
    fn test_foreign_op() {
        let registry = OpRegistry::with_all_ops();
        let other = OpRegistry::with_all_ops();
        let idx = Expr::var("idx", tensor_type!([4, 5], Int32).into());
        let call = batch_to_index(&other, idx.clone(), idx).unwrap();

        assert_eq!(
            TypeChecker::new(&registry).infer(&call),
            Err(CheckError::ForeignOp {
                op: "vision.batch_to_index".into()
            })
        );

        let mut custom = OpRegistry::new();
        custom
            .register(
                OpDef::new("vision.get_valid_counts")
                    .set_type_rel("GetValidCount", crate::op::OpKind::GetValidCounts),
            )
            .unwrap();
        let err = TypeChecker::new(&custom).infer(&call).unwrap_err();
        assert_eq!(err.to_string(), "operator \"vision.batch_to_index\" is not registered");
    }

    #[test]
    fn test_check_function_ret_type() {
        init_logging();
        let registry = OpRegistry::with_all_ops();
        let data = Expr::var("data", tensor_type!([2, 100, 6], Float32).into());
        let valid = Expr::var("valid_count", tensor_type!([2], Int32).into());
        let indices = Expr::var("indices", tensor_type!([2, 100], Int32).into());
        let nms = non_max_suppression_with_attrs(
            &registry,
            data.clone(),
            valid.clone(),
            indices.clone(),
            NonMaxSuppressionAttrs {
                return_indices: false,
                ..Default::default()
            },
        )
        .unwrap();

        let checker = TypeChecker::new(&registry);
        let func = Function::new(vec![data.clone(), valid.clone(), indices.clone()], nms.clone())
            .with_ret_type(tensor_type!([2, 100, 6], Float32).into());
        let sig = checker.check_function(&func).unwrap();
        assert_eq!(sig.params.len(), 3);
        assert_eq!(sig.ret, tensor_type!([2, 100, 6], Float32).into());

        // An incompatible annotation is an assignment conflict.
        let func = Function::new(vec![data, valid, indices], nms)
            .with_ret_type(TupleType::new(vec![tensor_type!([2, 100], Int32).into()]).into());
        let err = checker.check_function(&func).unwrap_err();
        assert!(matches!(
            err,
            CheckError::Assign {
                source: TypeError::Mismatch { .. }
            }
        ));
    }

    #[test]
    fn test_untyped_param_resolves_through_tuple() {
        let registry = OpRegistry::with_all_ops();
        let x = Expr::untyped_var("x");
        let body = Expr::tuple(vec![x.clone(), x.clone()]).get_item(0);
        let func = Function::new(vec![x], body);
        let sig = TypeChecker::new(&registry).check_function(&func).unwrap();

        // The parameter and the result share one type variable.
        assert!(!sig.ret.is_complete());
        assert_eq!(sig.params[0], sig.ret);
    }

    #[test]
    fn test_get_item_of_tensor() {
        let registry = OpRegistry::with_all_ops();
        let data = Expr::var("data", tensor_type!([2, 3], Int32).into());
        let err = TypeChecker::new(&registry)
            .infer(&data.get_item(0))
            .unwrap_err();
        assert_eq!(err.to_string(), "expected a tuple, got Tensor[(2, 3), int32]");
    }

    #[test]
    fn test_infer_is_idempotent() {
        let registry = OpRegistry::with_all_ops();
        let checker = TypeChecker::new(&registry);
        let idx = Expr::var("idx", tensor_type!(["n", "m"], Int64).into());
        let call = batch_to_index(&registry, idx.clone(), idx).unwrap();

        let first = checker.infer(&call).unwrap();
        let second = checker.infer(&call).unwrap();
        assert_eq!(first, second);
    }
}
