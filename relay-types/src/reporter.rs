//! Unification of types and binding of type variables.

use rustc_hash::FxHashMap;

use crate::error::TypeError;
use crate::ty::{TensorType, TupleType, Type, TypeVar};

/// Unify two types, returning the most specific type compatible with both.
///
/// An incomplete type unifies with anything. Tensor types unify if they have
/// the same rank and data type and each pair of dimensions is equal after
/// simplification. Tuples unify field by field.
pub fn unify(expected: &Type, actual: &Type) -> Result<Type, TypeError> {
    let mismatch = || TypeError::Mismatch {
        expected: expected.clone(),
        actual: actual.clone(),
    };

    match (expected, actual) {
        (Type::Incomplete(_), other) | (other, Type::Incomplete(_)) => Ok(other.clone()),
        (Type::Tensor(a), Type::Tensor(b)) => {
            if !tensors_match(a, b) {
                return Err(mismatch());
            }
            Ok(Type::Tensor(a.simplify()))
        }
        (Type::Tuple(a), Type::Tuple(b)) => {
            if a.len() != b.len() {
                return Err(mismatch());
            }
            let fields = a
                .fields
                .iter()
                .zip(&b.fields)
                .map(|(x, y)| unify(x, y).map_err(|_| mismatch()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Type::Tuple(TupleType::new(fields)))
        }
        _ => Err(mismatch()),
    }
}

fn tensors_match(a: &TensorType, b: &TensorType) -> bool {
    a.dtype == b.dtype
        && a.ndim() == b.ndim()
        && a
            .shape
            .iter()
            .zip(&b.shape)
            .all(|(x, y)| x.simplify() == y.simplify())
}

/// Return true if `var` appears anywhere in `ty`.
fn occurs(var: &TypeVar, ty: &Type) -> bool {
    match ty {
        Type::Incomplete(v) => v == var,
        Type::Tuple(tuple) => tuple.fields.iter().any(|f| occurs(var, f)),
        Type::Tensor(_) => false,
    }
}

/// Records the types bound to type variables during checking.
///
/// Binding a variable twice is allowed if the two types unify, in which case
/// the variable is bound to the unified type.
#[derive(Default)]
pub struct TypeReporter {
    bindings: FxHashMap<TypeVar, Type>,
}

impl TypeReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `slot` to `ty`, or unify `ty` with the existing binding.
    ///
    /// Returns the type `slot` is bound to afterwards.
    pub fn assign(&mut self, slot: &TypeVar, ty: Type) -> Result<Type, TypeError> {
        let ty = self.resolve(&ty);
        if ty == Type::Incomplete(slot.clone()) {
            return Ok(ty);
        }
        if occurs(slot, &ty) {
            return Err(TypeError::RecursiveBinding {
                var: slot.clone(),
                ty,
            });
        }

        let bound = match self.bindings.get(slot) {
            Some(prev) => unify(&self.resolve(prev), &ty)?,
            None => ty,
        };
        self.bindings.insert(slot.clone(), bound.clone());
        Ok(bound)
    }

    /// Return the type bound to `slot`, if any.
    pub fn lookup(&self, slot: &TypeVar) -> Option<&Type> {
        self.bindings.get(slot)
    }

    /// Replace bound type variables in `ty` with their types.
    pub fn resolve(&self, ty: &Type) -> Type {
        match ty {
            Type::Incomplete(var) => match self.bindings.get(var) {
                Some(bound) if bound != ty => self.resolve(bound),
                _ => ty.clone(),
            },
            Type::Tuple(tuple) => Type::Tuple(TupleType::new(
                tuple.fields.iter().map(|f| self.resolve(f)).collect(),
            )),
            Type::Tensor(_) => ty.clone(),
        }
    }

    /// Number of bound type variables.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
