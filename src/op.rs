//! Operator definitions and handles.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use relay_types::{Type, TypeError};

use crate::attrs::Attrs;
use crate::ops::{batch_to_index, get_valid_counts, non_max_suppression};

/// The operators whose type relations this crate implements.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum OpKind {
    GetValidCounts,
    NonMaxSuppression,
    BatchToIndex,
}

impl OpKind {
    /// Derive the output type of a call to this operator from the types of
    /// its inputs and its attributes.
    ///
    /// This is a pure function: the same inputs and attributes always yield
    /// the same type.
    pub fn derive_type(&self, inputs: &[Type], attrs: &Attrs) -> Result<Type, TypeError> {
        match self {
            OpKind::GetValidCounts => {
                let attrs = attrs
                    .as_get_valid_counts()
                    .ok_or(TypeError::InvalidAttrs {
                        expected: "GetValidCountsAttrs",
                    })?;
                get_valid_counts::get_valid_counts_rel(inputs, attrs)
            }
            OpKind::NonMaxSuppression => {
                let attrs = attrs
                    .as_non_max_suppression()
                    .ok_or(TypeError::InvalidAttrs {
                        expected: "NonMaxSuppressionAttrs",
                    })?;
                non_max_suppression::non_max_suppression_rel(inputs, attrs)
            }
            OpKind::BatchToIndex => {
                let attrs = match attrs {
                    Attrs::None => &batch_to_index::BatchToIndexAttrs {},
                    other => other.as_batch_to_index().ok_or(TypeError::InvalidAttrs {
                        expected: "BatchToIndexAttrs",
                    })?,
                };
                batch_to_index::batch_to_index_rel(inputs, attrs)
            }
        }
    }
}

/// Documentation for one operator argument.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentInfo {
    pub name: String,
    /// Human-readable description of the expected type, eg. `"Tensor"`.
    pub type_info: String,
    pub description: String,
}

/// Definition of an operator, built before it is added to an
/// [`OpRegistry`](crate::OpRegistry).
///
/// ```
/// use relay::{OpDef, OpKind};
///
/// let def = OpDef::new("vision.batch_to_index")
///     .describe("Convert per-batch box indices into global indices.")
///     .set_num_inputs(2)
///     .add_argument("box_indices", "Tensor", "box indices from nms")
///     .add_argument("class_ids", "Tensor", "class ids correspond to box indices")
///     .set_support_level(5)
///     .set_type_rel("BatchToIndex", OpKind::BatchToIndex);
/// assert_eq!(def.num_inputs(), Some(2));
/// ```
#[derive(Clone, Debug)]
pub struct OpDef {
    name: String,
    description: String,
    num_inputs: Option<usize>,
    arguments: Vec<ArgumentInfo>,
    support_level: u32,
    type_rel: Option<(String, OpKind)>,
}

impl OpDef {
    pub fn new(name: &str) -> OpDef {
        OpDef {
            name: name.to_string(),
            description: String::new(),
            num_inputs: None,
            arguments: Vec::new(),
            support_level: 10,
            type_rel: None,
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the number of inputs calls to this operator must have.
    pub fn set_num_inputs(mut self, n: usize) -> Self {
        self.num_inputs = Some(n);
        self
    }

    pub fn add_argument(mut self, name: &str, type_info: &str, description: &str) -> Self {
        self.arguments.push(ArgumentInfo {
            name: name.to_string(),
            type_info: type_info.to_string(),
            description: description.to_string(),
        });
        self
    }

    /// Set the support level. Lower levels are more widely supported.
    pub fn set_support_level(mut self, level: u32) -> Self {
        self.support_level = level;
        self
    }

    /// Bind the type relation used to derive output types.
    pub fn set_type_rel(mut self, rel_name: &str, kind: OpKind) -> Self {
        self.type_rel = Some((rel_name.to_string(), kind));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn num_inputs(&self) -> Option<usize> {
        self.num_inputs
    }

    pub fn arguments(&self) -> &[ArgumentInfo] {
        &self.arguments
    }

    pub fn support_level(&self) -> u32 {
        self.support_level
    }

    /// Name of the type relation, eg. `"NMS"`.
    pub fn type_rel_name(&self) -> Option<&str> {
        self.type_rel.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn kind(&self) -> Option<OpKind> {
        self.type_rel.as_ref().map(|(_, kind)| *kind)
    }
}

/// Handle to a registered operator.
///
/// Handles are cheap to clone and compare by identity: two handles are equal
/// only if they refer to the same registry entry.
#[derive(Clone)]
pub struct Op(Arc<OpDef>);

impl Op {
    pub(crate) fn new(def: OpDef) -> Op {
        Op(Arc::new(def))
    }
}

impl Deref for Op {
    type Target = OpDef;

    fn deref(&self) -> &OpDef {
        &self.0
    }
}

impl PartialEq for Op {
    fn eq(&self, other: &Op) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Op {}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Op({})", self.name())
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
