//! Attributes attached to operator calls.

use serde::{Deserialize, Serialize};

pub use crate::ops::{BatchToIndexAttrs, GetValidCountsAttrs, NonMaxSuppressionAttrs};

/// Scalar parameters of a call, set when the call is created and never
/// modified afterwards.
///
/// Attributes serialize to JSON with a `kind` tag naming the operator they
/// belong to:
///
/// ```
/// use relay::Attrs;
/// use relay::ops::GetValidCountsAttrs;
///
/// let attrs = Attrs::GetValidCounts(GetValidCountsAttrs::default());
/// let json = attrs.to_json().unwrap();
/// assert_eq!(
///     json,
///     r#"{"kind":"get_valid_counts","score_threshold":0.0,"id_index":0,"score_index":1}"#
/// );
/// assert_eq!(Attrs::from_json(&json).unwrap(), attrs);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attrs {
    /// The call has no attributes.
    #[default]
    None,
    GetValidCounts(GetValidCountsAttrs),
    NonMaxSuppression(NonMaxSuppressionAttrs),
    BatchToIndex(BatchToIndexAttrs),
}

impl Attrs {
    pub fn as_get_valid_counts(&self) -> Option<&GetValidCountsAttrs> {
        match self {
            Attrs::GetValidCounts(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_non_max_suppression(&self) -> Option<&NonMaxSuppressionAttrs> {
        match self {
            Attrs::NonMaxSuppression(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_batch_to_index(&self) -> Option<&BatchToIndexAttrs> {
        match self {
            Attrs::BatchToIndex(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Serialize the attributes as a JSON object.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize attributes from JSON.
    ///
    /// Fields which are missing from the object take their default values.
    pub fn from_json(json: &str) -> Result<Attrs, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<GetValidCountsAttrs> for Attrs {
    fn from(val: GetValidCountsAttrs) -> Attrs {
        Attrs::GetValidCounts(val)
    }
}

impl From<NonMaxSuppressionAttrs> for Attrs {
    fn from(val: NonMaxSuppressionAttrs) -> Attrs {
        Attrs::NonMaxSuppression(val)
    }
}

impl From<BatchToIndexAttrs> for Attrs {
    fn from(val: BatchToIndexAttrs) -> Attrs {
        Attrs::BatchToIndex(val)
    }
}
