use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type of a tensor.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Int8,
    UInt8,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
}

impl DataType {
    /// Return the size of one element in bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::Bool => 1,
            Self::Int8 | Self::UInt8 => 8,
            Self::Float16 => 16,
            Self::Int32 | Self::Float32 => 32,
            Self::Int64 | Self::Float64 => 64,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Look up a data type by the name it is displayed with, eg. `"int32"`.
    pub fn from_name(name: &str) -> Option<DataType> {
        let dtype = match name {
            "bool" => Self::Bool,
            "int8" => Self::Int8,
            "uint8" => Self::UInt8,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "float16" => Self::Float16,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            _ => return None,
        };
        Some(dtype)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
