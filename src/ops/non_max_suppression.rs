use relay_types::{DataType, IndexExpr, TensorType, TupleType, Type, TypeError};
use serde::{Deserialize, Serialize};

use crate::attrs::Attrs;
use crate::expr::{Call, Expr};
use crate::op::{OpDef, OpKind};
use crate::op_registry::{OpRegistry, RegistryError};
use crate::ops::{tensor_input, VISION_SUPPORT_LEVEL};

pub const NAME: &str = "vision.non_max_suppression";

/// Attributes of `vision.non_max_suppression`.
///
/// Only `return_indices` affects the output type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonMaxSuppressionAttrs {
    /// Maximum number of boxes to keep, or -1 to keep all.
    pub max_output_size: i32,
    pub iou_threshold: f64,
    /// Suppress boxes regardless of their class id.
    pub force_suppress: bool,
    /// Number of highest-scoring boxes to consider, or -1 for all.
    pub top_k: i32,
    /// Position of the first of the four box coordinates.
    pub coord_start: i32,
    pub score_index: i32,
    /// Position of the class id within each box, or -1 if there is none.
    pub id_index: i32,
    /// Return the indices of kept boxes instead of the boxes themselves.
    pub return_indices: bool,
    /// Move invalid boxes to the end of the output.
    pub invalid_to_bottom: bool,
}

impl Default for NonMaxSuppressionAttrs {
    fn default() -> Self {
        NonMaxSuppressionAttrs {
            max_output_size: -1,
            iou_threshold: 0.5,
            force_suppress: false,
            top_k: -1,
            coord_start: 2,
            score_index: 1,
            id_index: 0,
            return_indices: true,
            invalid_to_bottom: false,
        }
    }
}

/// Type relation for `vision.non_max_suppression`.
///
/// Inputs are boxes of shape `[batch, num_boxes, box_width]` where each box
/// is `[class_id, score, left, top, right, bottom]`, the number of valid boxes
/// per batch item (`[batch]`) and the original box indices.
///
/// If `return_indices` is set the output is a tuple of the kept box indices
/// (`[batch, num_boxes]`) and the number of kept boxes (`[batch, 1]`), both
/// `int32`. Otherwise the output has the same type as the boxes, with
/// suppressed entries marked in place.
pub fn non_max_suppression_rel(
    inputs: &[Type],
    attrs: &NonMaxSuppressionAttrs,
) -> Result<Type, TypeError> {
    let [data, valid_count, _indices] = inputs else {
        return Err(TypeError::IncorrectInputCount {
            expected: 3,
            actual: inputs.len(),
        });
    };
    let data = tensor_input(data, "data", 3)?;
    tensor_input(valid_count, "valid_count", 1)?;

    if !attrs.return_indices {
        return Ok(data.clone().into());
    }

    let batch = data.shape[0].clone();
    let num_boxes = data.shape[1].clone();
    let box_indices = TensorType::new([batch.clone(), num_boxes], DataType::Int32);
    let num_kept = TensorType::new([batch, IndexExpr::Value(1)], DataType::Int32);

    Ok(TupleType::new(vec![box_indices.into(), num_kept.into()]).into())
}

/// Create a call to `vision.non_max_suppression`.
pub fn non_max_suppression(
    registry: &OpRegistry,
    data: Expr,
    valid_count: Expr,
    indices: Expr,
    max_output_size: i32,
    iou_threshold: f64,
    force_suppress: bool,
    top_k: i32,
    coord_start: i32,
    score_index: i32,
    id_index: i32,
    return_indices: bool,
    invalid_to_bottom: bool,
) -> Result<Expr, RegistryError> {
    let attrs = NonMaxSuppressionAttrs {
        max_output_size,
        iou_threshold,
        force_suppress,
        top_k,
        coord_start,
        score_index,
        id_index,
        return_indices,
        invalid_to_bottom,
    };
    non_max_suppression_with_attrs(registry, data, valid_count, indices, attrs)
}

/// Variant of [`non_max_suppression`] which takes a prepared attribute
/// record.
pub fn non_max_suppression_with_attrs(
    registry: &OpRegistry,
    data: Expr,
    valid_count: Expr,
    indices: Expr,
    attrs: NonMaxSuppressionAttrs,
) -> Result<Expr, RegistryError> {
    let op = registry.get(NAME)?;
    Ok(Expr::call(Call::new(
        op,
        vec![data, valid_count, indices],
        Attrs::NonMaxSuppression(attrs),
        Vec::new(),
    )))
}

pub(crate) fn op_def() -> OpDef {
    OpDef::new(NAME)
        .describe(
            "Non-maximum suppression. The input boxes should be in the format of \
             [class_id, score, left, top, right, bottom]. Set id_index to be -1 to \
             ignore class_id axis.",
        )
        .set_num_inputs(3)
        .add_argument("data", "Tensor", "Input data.")
        .add_argument("valid_count", "Tensor", "Number of valid anchor boxes.")
        .add_argument(
            "indices",
            "Tensor",
            "Corresponding indices in original input tensor.",
        )
        .set_support_level(VISION_SUPPORT_LEVEL)
        .set_type_rel("NMS", OpKind::NonMaxSuppression)
}
