//! Expressions of the IR.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use relay_types::Type;

use crate::attrs::Attrs;
use crate::op::Op;

/// A named variable, such as a function parameter.
#[derive(Clone, Debug)]
pub struct Var {
    pub name: String,
    /// Type annotation. Variables without one are inferred.
    pub ty: Option<Type>,
}

/// Call of an operator.
#[derive(Clone, Debug)]
pub struct Call {
    pub op: Op,
    pub args: Vec<Expr>,
    pub attrs: Attrs,
    pub type_args: Vec<Type>,
}

impl Call {
    pub fn new(op: Op, args: Vec<Expr>, attrs: Attrs, type_args: Vec<Type>) -> Call {
        Call {
            op,
            args,
            attrs,
            type_args,
        }
    }
}

#[derive(Debug)]
pub enum ExprKind {
    Var(Var),
    Call(Call),
    Tuple(Vec<Expr>),
    /// Extract the index'th field of a tuple.
    TupleGetItem { tuple: Expr, index: usize },
}

/// Immutable expression node.
///
/// Expressions are reference counted, so cloning one is cheap and the clone
/// refers to the same node. Expressions can be shared across threads.
#[derive(Clone)]
pub struct Expr {
    kind: Arc<ExprKind>,
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Expr {
        Expr { kind: kind.into() }
    }
}

impl Expr {
    /// Create a variable with a known type.
    pub fn var(name: &str, ty: Type) -> Expr {
        ExprKind::Var(Var {
            name: name.to_string(),
            ty: Some(ty),
        })
        .into()
    }

    /// Create a variable whose type will be inferred.
    pub fn untyped_var(name: &str) -> Expr {
        ExprKind::Var(Var {
            name: name.to_string(),
            ty: None,
        })
        .into()
    }

    pub fn call(call: Call) -> Expr {
        ExprKind::Call(call).into()
    }

    pub fn tuple(fields: Vec<Expr>) -> Expr {
        ExprKind::Tuple(fields).into()
    }

    /// Create an expression which extracts the index'th field of this
    /// tuple-valued expression.
    pub fn get_item(&self, index: usize) -> Expr {
        ExprKind::TupleGetItem {
            tuple: self.clone(),
            index,
        }
        .into()
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self.kind() {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self.kind() {
            ExprKind::Var(var) => Some(var),
            _ => None,
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_list = |f: &mut fmt::Formatter<'_>, items: &[Expr]| -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        };
        match self.kind() {
            ExprKind::Var(var) => write!(f, "%{}", var.name),
            ExprKind::Call(call) => {
                write!(f, "{}(", call.op.name())?;
                write_list(f, call.args.as_slice())?;
                write!(f, ")")
            }
            ExprKind::Tuple(fields) => {
                write!(f, "(")?;
                write_list(f, fields.as_slice())?;
                write!(f, ")")
            }
            ExprKind::TupleGetItem { tuple, index } => write!(f, "{}.{}", tuple, index),
        }
    }
}

/// Wrapper around an `Expr` which uses reference-equality.
#[derive(Clone)]
pub(crate) struct ExprRef(pub(crate) Expr);

impl PartialEq for ExprRef {
    fn eq(&self, other: &ExprRef) -> bool {
        Arc::ptr_eq(&self.0.kind, &other.0.kind)
    }
}

impl Eq for ExprRef {}

impl Hash for ExprRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0.kind).hash(state)
    }
}

/// A function with parameters and a body expression.
#[derive(Clone, Debug)]
pub struct Function {
    /// Parameters. These are variables referenced from the body.
    pub params: Vec<Expr>,
    pub body: Expr,
    /// Annotated return type, checked against the body's type.
    pub ret_type: Option<Type>,
}

impl Function {
    pub fn new(params: Vec<Expr>, body: Expr) -> Function {
        Function {
            params,
            body,
            ret_type: None,
        }
    }

    pub fn with_ret_type(mut self, ty: Type) -> Function {
        self.ret_type = Some(ty);
        self
    }
}

#[cfg(test)]
mod tests {
    use relay_types::tensor_type;

    use super::{Expr, ExprKind, ExprRef};

    #[test]
    fn test_expr_ref_identity() {
        let a = Expr::untyped_var("x");
        let b = Expr::untyped_var("x");
        assert!(ExprRef(a.clone()) == ExprRef(a.clone()));
        assert!(ExprRef(a) != ExprRef(b));
    }

    #[test]
    fn test_get_item_and_display() {
        let data = Expr::var("data", tensor_type!([2, 100, 6], Float32).into());
        let pair = Expr::tuple(vec![data.clone(), Expr::untyped_var("y")]);
        let item = pair.get_item(1);

        let ExprKind::TupleGetItem { tuple, index } = item.kind() else {
            panic!("expected TupleGetItem");
        };
        assert_eq!(*index, 1);
        assert!(ExprRef(tuple.clone()) == ExprRef(pair.clone()));
        assert_eq!(item.to_string(), "(%data, %y).1");

        assert!(data.as_var().and_then(|v| v.ty.as_ref()).is_some());
        assert!(data.as_call().is_none());
    }

    #[test]
    fn test_expr_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expr>();
        assert_send_sync::<super::Function>();
    }
}
