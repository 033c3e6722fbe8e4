use relay_types::{DataType, TensorType, TupleType, Type, TypeError};
use serde::{Deserialize, Serialize};

use crate::attrs::Attrs;
use crate::expr::{Call, Expr};
use crate::op::{OpDef, OpKind};
use crate::op_registry::{OpRegistry, RegistryError};
use crate::ops::{tensor_input, VISION_SUPPORT_LEVEL};

pub const NAME: &str = "vision.get_valid_counts";

/// Attributes of `vision.get_valid_counts`.
///
/// None of these affect the output type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetValidCountsAttrs {
    /// Boxes with a score at or below this value are considered invalid.
    pub score_threshold: f64,
    /// Position of the class id within each box, or -1 if there is none.
    pub id_index: i32,
    /// Position of the score within each box.
    pub score_index: i32,
}

impl Default for GetValidCountsAttrs {
    fn default() -> Self {
        GetValidCountsAttrs {
            score_threshold: 0.0,
            id_index: 0,
            score_index: 1,
        }
    }
}

/// Type relation for `vision.get_valid_counts`.
///
/// Given boxes of shape `[batch, num_boxes, box_width]`, the outputs are the
/// number of valid boxes per batch item (`[batch]`), the boxes with valid
/// entries moved to the front (same type as the input) and the original
/// index of each output box (`[batch, num_boxes]`).
pub fn get_valid_counts_rel(
    inputs: &[Type],
    _attrs: &GetValidCountsAttrs,
) -> Result<Type, TypeError> {
    let [data] = inputs else {
        return Err(TypeError::IncorrectInputCount {
            expected: 1,
            actual: inputs.len(),
        });
    };
    let data = tensor_input(data, "data", 3)?;
    let batch = data.shape[0].clone();
    let num_boxes = data.shape[1].clone();

    let valid_count = TensorType::new([batch.clone()], DataType::Int32);
    let indices = TensorType::new([batch, num_boxes], DataType::Int32);

    Ok(TupleType::new(vec![valid_count.into(), data.clone().into(), indices.into()]).into())
}

/// Create a call to `vision.get_valid_counts`.
pub fn get_valid_counts(
    registry: &OpRegistry,
    data: Expr,
    score_threshold: f64,
    id_index: i32,
    score_index: i32,
) -> Result<Expr, RegistryError> {
    let attrs = GetValidCountsAttrs {
        score_threshold,
        id_index,
        score_index,
    };
    get_valid_counts_with_attrs(registry, data, attrs)
}

/// Variant of [`get_valid_counts`] which takes a prepared attribute record.
pub fn get_valid_counts_with_attrs(
    registry: &OpRegistry,
    data: Expr,
    attrs: GetValidCountsAttrs,
) -> Result<Expr, RegistryError> {
    let op = registry.get(NAME)?;
    Ok(Expr::call(Call::new(
        op,
        vec![data],
        Attrs::GetValidCounts(attrs),
        Vec::new(),
    )))
}

pub(crate) fn op_def() -> OpDef {
    OpDef::new(NAME)
        .describe(
            "Get valid count of bounding boxes given a score threshold. \
             Also moves valid boxes to the top of input data.",
        )
        .set_num_inputs(1)
        .add_argument("data", "Tensor", "Input data.")
        .set_support_level(VISION_SUPPORT_LEVEL)
        .set_type_rel("GetValidCount", OpKind::GetValidCounts)
}
