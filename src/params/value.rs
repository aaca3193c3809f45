use crate::params::bundle::Params;
use crate::params::error::FilterError;
use crate::params::scalar::PrimitiveType;
use std::fmt;

/// Runtime value for one field of a params bundle.
///
/// This is the dynamic-value model standing in for the host language's
/// object: field types validate and coerce these, and the generated C code
/// reads the same values through the host runtime API.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Tensor(TensorValue),
    /// A nested params bundle, so a `ParamsType` can itself be used as a
    /// field type.
    Params(Box<Params>),
}

impl FieldValue {
    /// Short kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Tensor(_) => "tensor",
            FieldValue::Params(_) => "params",
        }
    }

    /// Numeric view of scalar-like values; `None` for tensors and bundles.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Tensor(_) | FieldValue::Params(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v:?}"),
            FieldValue::Tensor(t) => write!(f, "{t}"),
            FieldValue::Params(p) => write!(f, "{p}"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<TensorValue> for FieldValue {
    fn from(value: TensorValue) -> Self {
        FieldValue::Tensor(value)
    }
}

impl From<Params> for FieldValue {
    fn from(value: Params) -> Self {
        FieldValue::Params(Box::new(value))
    }
}

/// Dense host-tensor stand-in: dtype, shape, and flat row-major storage.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorValue {
    dtype: PrimitiveType,
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl TensorValue {
    pub fn new(
        dtype: PrimitiveType,
        shape: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<Self, FilterError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(FilterError::DataLength {
                expected,
                len: data.len(),
            });
        }
        Ok(Self { dtype, shape, data })
    }

    pub fn dtype(&self) -> PrimitiveType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Same storage reinterpreted under another dtype.
    pub(crate) fn with_dtype(&self, dtype: PrimitiveType, data: Vec<f64>) -> Self {
        Self {
            dtype,
            shape: self.shape.clone(),
            data,
        }
    }
}

impl fmt::Display for TensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self
            .shape
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "tensor<{}>({})", self.dtype, dims)
    }
}
