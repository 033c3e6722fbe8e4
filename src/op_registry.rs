use rustc_hash::FxHashMap;

use crate::op::{Op, OpDef};
use crate::ops::{batch_to_index, get_valid_counts, non_max_suppression};

/// Registry of operators, keyed by name.
///
/// New registries are empty. To create a registry with all the vision
/// operators registered use [`OpRegistry::with_all_ops`]. Entries cannot be
/// changed or removed once registered.
///
/// The type checker finds the type relation for a call by looking up the
/// call's operator here, so a registry is passed to both the operator
/// factories and the [`TypeChecker`](crate::TypeChecker).
#[derive(Default)]
pub struct OpRegistry {
    ops: FxHashMap<String, Op>,
}

impl OpRegistry {
    /// Create a new empty registry.
    pub fn new() -> OpRegistry {
        OpRegistry::default()
    }

    /// Create a new registry with all built-in operators registered.
    pub fn with_all_ops() -> OpRegistry {
        let mut reg = OpRegistry::new();

        macro_rules! register_op {
            ($op:ident) => {{
                let def = $op::op_def();
                reg.ops.insert(def.name().to_string(), Op::new(def));
            }};
        }

        register_op!(get_valid_counts);
        register_op!(non_max_suppression);
        register_op!(batch_to_index);

        reg
    }

    /// Register an operator and return its handle.
    ///
    /// Fails if an operator with the same name is already registered or if
    /// the definition has no type relation.
    pub fn register(&mut self, def: OpDef) -> Result<Op, RegistryError> {
        if def.kind().is_none() {
            return Err(RegistryError::MissingTypeRelation {
                name: def.name().to_string(),
            });
        }
        if self.ops.contains_key(def.name()) {
            return Err(RegistryError::AlreadyRegistered {
                name: def.name().to_string(),
            });
        }
        let name = def.name().to_string();
        let op = Op::new(def);
        self.ops.insert(name, op.clone());
        Ok(op)
    }

    /// Look up an operator by name.
    pub fn get(&self, name: &str) -> Result<Op, RegistryError> {
        self.ops
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::Unregistered {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Return the number of registered operators.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Return the names of registered operators in sorted order.
    pub fn op_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ops.keys().map(|name| name.as_str()).collect();
        names.sort();
        names
    }
}

/// Errors that occur when registering or looking up operators.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("operator \"{name}\" is already registered")]
    AlreadyRegistered { name: String },

    #[error("operator \"{name}\" is not registered")]
    Unregistered { name: String },

    #[error("operator \"{name}\" has no type relation")]
    MissingTypeRelation { name: String },
}

#[cfg(test)]
mod tests {
    use relay_testing::TestCases;

    use super::{OpRegistry, RegistryError};
    use crate::op::{OpDef, OpKind};

    #[test]
    fn test_with_all_ops() {
        let reg = OpRegistry::with_all_ops();
        assert_eq!(reg.len(), 3);
        assert_eq!(
            reg.op_names(),
            [
                "vision.batch_to_index",
                "vision.get_valid_counts",
                "vision.non_max_suppression",
            ]
        );
        assert!(reg.contains("vision.non_max_suppression"));
        assert!(!reg.contains("nn.conv2d"));

        // Lookups return the same handle each time.
        assert_eq!(
            reg.get("vision.batch_to_index").unwrap(),
            reg.get("vision.batch_to_index").unwrap()
        );
    }

    #[test]
    fn test_registered_metadata() {
        #[derive(Debug)]
        struct Case {
            name: &'static str,
            num_inputs: usize,
            rel_name: &'static str,
            kind: OpKind,
            arg_names: &'static [&'static str],
        }

        let cases = [
            Case {
                name: "vision.get_valid_counts",
                num_inputs: 1,
                rel_name: "GetValidCount",
                kind: OpKind::GetValidCounts,
                arg_names: &["data"],
            },
            Case {
                name: "vision.non_max_suppression",
                num_inputs: 3,
                rel_name: "NMS",
                kind: OpKind::NonMaxSuppression,
                arg_names: &["data", "valid_count", "indices"],
            },
            Case {
                name: "vision.batch_to_index",
                num_inputs: 2,
                rel_name: "BatchToIndex",
                kind: OpKind::BatchToIndex,
                arg_names: &["box_indices", "class_ids"],
            },
        ];

        let reg = OpRegistry::with_all_ops();
        cases.test_each(|case| {
            let op = reg.get(case.name).unwrap();
            assert_eq!(op.num_inputs(), Some(case.num_inputs));
            assert_eq!(op.support_level(), 5);
            assert_eq!(op.type_rel_name(), Some(case.rel_name));
            assert_eq!(op.kind(), Some(case.kind));
            assert!(!op.description().is_empty());

            let arg_names: Vec<&str> = op.arguments().iter().map(|a| a.name.as_str()).collect();
            assert_eq!(arg_names, case.arg_names);
            assert!(op.arguments().iter().all(|a| !a.description.is_empty()));
        });
    }

    #[test]
    fn test_register_errors() {
        let mut reg = OpRegistry::with_all_ops();

        let dup = OpDef::new("vision.batch_to_index")
            .set_num_inputs(2)
            .set_type_rel("BatchToIndex", OpKind::BatchToIndex);
        assert_eq!(
            reg.register(dup).err(),
            Some(RegistryError::AlreadyRegistered {
                name: "vision.batch_to_index".into()
            })
        );

        let no_rel = OpDef::new("vision.custom").set_num_inputs(1);
        assert_eq!(
            reg.register(no_rel).err().map(|e| e.to_string()),
            Some("operator \"vision.custom\" has no type relation".to_string())
        );
        assert!(!reg.contains("vision.custom"));

        assert_eq!(
            reg.get("vision.roi_align").err(),
            Some(RegistryError::Unregistered {
                name: "vision.roi_align".into()
            })
        );
    }

    #[test]
    fn test_empty_registry() {
        let mut reg = OpRegistry::new();
        assert!(reg.is_empty());

        let op = reg
            .register(
                OpDef::new("vision.get_valid_counts")
                    .set_type_rel("GetValidCount", OpKind::GetValidCounts),
            )
            .unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("vision.get_valid_counts").unwrap(), op);
    }
}
