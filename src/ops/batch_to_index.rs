use relay_types::{IndexExpr, TensorType, Type, TypeError};
use serde::{Deserialize, Serialize};

use crate::attrs::Attrs;
use crate::expr::{Call, Expr};
use crate::op::{OpDef, OpKind};
use crate::op_registry::{OpRegistry, RegistryError};
use crate::ops::{tensor_input, VISION_SUPPORT_LEVEL};

pub const NAME: &str = "vision.batch_to_index";

/// Attributes of `vision.batch_to_index`. The operator has none.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchToIndexAttrs {}

/// Type relation for `vision.batch_to_index`.
///
/// Given box indices and class ids, both of shape `[N, M]`, the output is an
/// `[N * M, 3]` tensor with the box indices' data type.
pub fn batch_to_index_rel(
    inputs: &[Type],
    _attrs: &BatchToIndexAttrs,
) -> Result<Type, TypeError> {
    let [box_indices, class_ids] = inputs else {
        return Err(TypeError::IncorrectInputCount {
            expected: 2,
            actual: inputs.len(),
        });
    };
    let box_indices = tensor_input(box_indices, "box_indices", 2)?;
    tensor_input(class_ids, "class_ids", 2)?;

    let rows = (box_indices.shape[0].clone() * box_indices.shape[1].clone()).simplify();
    Ok(TensorType::new([rows, IndexExpr::Value(3)], box_indices.dtype).into())
}

/// Create a call to `vision.batch_to_index`.
pub fn batch_to_index(
    registry: &OpRegistry,
    box_indices: Expr,
    class_ids: Expr,
) -> Result<Expr, RegistryError> {
    let op = registry.get(NAME)?;
    Ok(Expr::call(Call::new(
        op,
        vec![box_indices, class_ids],
        Attrs::BatchToIndex(BatchToIndexAttrs {}),
        Vec::new(),
    )))
}

pub(crate) fn op_def() -> OpDef {
    OpDef::new(NAME)
        .describe("Convert per-batch box indices into indices over the whole batch.")
        .set_num_inputs(2)
        .add_argument("box_indices", "Tensor", "box indices from nms")
        .add_argument("class_ids", "Tensor", "class ids correspond to box indices")
        .set_support_level(VISION_SUPPORT_LEVEL)
        .set_type_rel("BatchToIndex", OpKind::BatchToIndex)
}
