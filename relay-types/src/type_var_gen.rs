//! Type variable generator.

use std::borrow::Cow;

use crate::ty::TypeVar;

/// Generates fresh type variables.
///
/// Each call to [`fresh`](TypeVarGen::fresh) returns a variable with a new
/// id, named after the generator's prefix (`t_1`, `t_2`, ...).
pub struct TypeVarGen {
    prefix: Cow<'static, str>,
    next_id: u32,
}

impl Default for TypeVarGen {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeVarGen {
    pub fn new() -> Self {
        Self::with_prefix("t".into())
    }

    pub fn with_prefix(prefix: Cow<'static, str>) -> Self {
        Self { prefix, next_id: 0 }
    }

    pub fn fresh(&mut self) -> TypeVar {
        self.next_id += 1;
        let name = format!("{}_{}", self.prefix, self.next_id);
        TypeVar::new(self.next_id, &name)
    }
}

#[cfg(test)]
mod tests {
    use super::TypeVarGen;

    #[test]
    fn test_type_var_gen() {
        let mut var_gen = TypeVarGen::new();
        let a = var_gen.fresh();
        let b = var_gen.fresh();
        assert_eq!(a.name(), "t_1");
        assert_eq!(b.name(), "t_2");
        assert_ne!(a, b);

        let mut var_gen = TypeVarGen::with_prefix("out".into());
        assert_eq!(var_gen.fresh().name(), "out_1");
    }
}
