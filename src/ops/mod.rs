//! Vision operators.
//!
//! Each operator module provides the operator's attribute record, its type
//! relation, a factory function which builds calls to the operator and the
//! definition used to register it.

use relay_types::{TensorType, Type, TypeError};

pub mod batch_to_index;
pub mod get_valid_counts;
pub mod non_max_suppression;

pub use batch_to_index::{batch_to_index, batch_to_index_rel, BatchToIndexAttrs};
pub use get_valid_counts::{
    get_valid_counts, get_valid_counts_rel, get_valid_counts_with_attrs, GetValidCountsAttrs,
};
pub use non_max_suppression::{
    non_max_suppression, non_max_suppression_rel, non_max_suppression_with_attrs,
    NonMaxSuppressionAttrs,
};

/// Support level shared by the vision operators.
pub(crate) const VISION_SUPPORT_LEVEL: u32 = 5;

/// Return the tensor type of the input named `input`, checking that it has
/// `ndim` dimensions.
fn tensor_input<'a>(
    ty: &'a Type,
    input: &'static str,
    ndim: usize,
) -> Result<&'a TensorType, TypeError> {
    let tensor = ty.as_tensor().ok_or(TypeError::ExpectedTensor { input })?;
    if tensor.ndim() != ndim {
        return Err(TypeError::IncorrectRank {
            input,
            expected: ndim,
            actual: tensor.ndim(),
        });
    }
    Ok(tensor)
}
