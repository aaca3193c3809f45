use crate::params::ctype::{CFieldType, CacheVersion, Signature};
use crate::params::error::FilterError;
use crate::params::scalar::{PrimitiveType, approx_eq};
use crate::params::value::{FieldValue, TensorValue};
use std::any::Any;
use std::fmt;

/// Field type holding one dense tensor of a fixed dtype and rank.
///
/// Each dimension may be pinned to a size or left free (`None`). Values
/// compare by dtype, shape and contents, never by storage identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorType {
    dtype: PrimitiveType,
    shape: Vec<Option<usize>>,
}

impl TensorType {
    pub fn new(dtype: PrimitiveType, shape: Vec<Option<usize>>) -> Self {
        Self { dtype, shape }
    }

    /// Tensor of the given rank with every dimension free.
    pub fn with_rank(dtype: PrimitiveType, rank: usize) -> Self {
        Self {
            dtype,
            shape: vec![None; rank],
        }
    }

    pub fn dtype(&self) -> PrimitiveType {
        self.dtype
    }

    pub fn shape(&self) -> &[Option<usize>] {
        &self.shape
    }

    fn shape_string(shape: &[Option<usize>]) -> String {
        shape
            .iter()
            .map(|d| match d {
                Some(n) => n.to_string(),
                None => "?".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn check_shape(&self, value: &TensorValue) -> Result<(), FilterError> {
        let matches = value.shape().len() == self.shape.len()
            && self
                .shape
                .iter()
                .zip(value.shape())
                .all(|(expected, got)| expected.is_none_or(|n| n == *got));
        if matches {
            Ok(())
        } else {
            Err(FilterError::ShapeMismatch {
                expected: format!("({})", Self::shape_string(&self.shape)),
                got: format!(
                    "({})",
                    value
                        .shape()
                        .iter()
                        .map(|d| d.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
        }
    }

    /// Re-express the tensor's storage under this type's dtype, one element
    /// at a time through the scalar coercion rules.
    fn convert_data(
        &self,
        value: &TensorValue,
        allow_downcast: bool,
    ) -> Result<TensorValue, FilterError> {
        let mut data = Vec::with_capacity(value.data().len());
        for &element in value.data() {
            let coerced = crate::params::scalar::filter_scalar(
                self.dtype,
                &FieldValue::Float(element),
                false,
                allow_downcast,
            )?;
            data.push(coerced.as_f64().unwrap_or(element));
        }
        Ok(value.with_dtype(self.dtype, data))
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor({}, ({}))",
            self.dtype,
            Self::shape_string(&self.shape)
        )
    }
}

/// Extern declarations for the host runtime's tensor handles.
pub(crate) const HOST_TENSOR_API: &str = "\
/* Host runtime tensor handles */
#ifndef PARAMS_HOST_TENSOR_API
#define PARAMS_HOST_TENSOR_API
typedef struct host_tensor host_tensor_t;
extern host_tensor_t* host_object_as_tensor(host_object_t* object);
extern void host_tensor_release(host_tensor_t* tensor);
#endif
";

impl CFieldType for TensorType {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_eq(&self, other: &dyn CFieldType) -> bool {
        other
            .as_any()
            .downcast_ref::<TensorType>()
            .is_some_and(|o| self == o)
    }

    fn filter(
        &self,
        value: &FieldValue,
        strict: bool,
        allow_downcast: bool,
    ) -> Result<FieldValue, FilterError> {
        let FieldValue::Tensor(tensor) = value else {
            return Err(FilterError::TypeMismatch {
                expected: "tensor".to_string(),
                got: value.kind_name(),
            });
        };
        self.check_shape(tensor)?;
        if tensor.dtype() == self.dtype {
            return Ok(FieldValue::Tensor(tensor.clone()));
        }
        if strict {
            return Err(FilterError::TypeMismatch {
                expected: format!("tensor of {}", self.dtype),
                got: value.kind_name(),
            });
        }
        Ok(FieldValue::Tensor(
            self.convert_data(tensor, allow_downcast)?,
        ))
    }

    fn values_eq(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (a, b) {
            (FieldValue::Tensor(x), FieldValue::Tensor(y)) => {
                x.dtype() == y.dtype()
                    && x.shape() == y.shape()
                    && x.data().iter().zip(y.data()).all(|(l, r)| l == r)
            }
            _ => false,
        }
    }

    fn values_eq_approx(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (a, b) {
            (FieldValue::Tensor(x), FieldValue::Tensor(y)) => {
                x.dtype() == y.dtype()
                    && x.shape() == y.shape()
                    && x.data().iter().zip(y.data()).all(|(l, r)| approx_eq(*l, *r))
            }
            _ => false,
        }
    }

    fn value_signature(&self, value: &FieldValue) -> Signature {
        let mut sig = Signature::new(&format!("tensor:{}", self.dtype));
        if let FieldValue::Tensor(tensor) = value {
            sig.push_str(&tensor.dtype().to_string());
            sig.push_u64(tensor.shape().len() as u64);
            for &dim in tensor.shape() {
                sig.push_u64(dim as u64);
            }
            for &element in tensor.data() {
                sig.push_f64(element);
            }
        } else {
            sig.push_str(&value.to_string());
        }
        sig
    }

    fn c_declare(&self, name: &str) -> String {
        format!("host_tensor_t* {name};\n")
    }

    fn c_init(&self, name: &str) -> String {
        format!("{name} = NULL;\n")
    }

    fn c_cleanup(&self, name: &str) -> String {
        format!(
            "if ({name}) {{\n\
                 host_tensor_release({name});\n\
                 {name} = NULL;\n\
             }}\n"
        )
    }

    fn c_extract(&self, name: &str, fail: &str) -> String {
        format!(
            "{name} = host_object_as_tensor(py_{name});\n\
             if ({name} == NULL) {{\n\
                 host_error_format(\"params: expected a tensor value for \\\"{name}\\\".\");\n\
                 {fail}\n\
             }}\n"
        )
    }

    fn c_support_code(&self) -> Vec<String> {
        vec![HOST_TENSOR_API.to_string()]
    }

    fn c_code_cache_version(&self) -> CacheVersion {
        CacheVersion::Version(vec![1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(dtype: PrimitiveType, shape: Vec<usize>, data: Vec<f64>) -> FieldValue {
        FieldValue::Tensor(TensorValue::new(dtype, shape, data).unwrap())
    }

    #[test]
    fn fixed_dimensions_are_enforced() {
        let t = TensorType::new(PrimitiveType::Float64, vec![None, Some(3)]);
        let ok = tensor(PrimitiveType::Float64, vec![2, 3], vec![0.0; 6]);
        assert!(t.filter(&ok, false, false).is_ok());
        let bad = tensor(PrimitiveType::Float64, vec![2, 4], vec![0.0; 8]);
        assert!(matches!(
            t.filter(&bad, false, false).unwrap_err(),
            FilterError::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn equality_distinguishes_shapes_with_equal_storage() {
        let t = TensorType::with_rank(PrimitiveType::Float64, 2);
        let a = tensor(PrimitiveType::Float64, vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = tensor(PrimitiveType::Float64, vec![3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(!t.values_eq(&a, &b));
        assert!(t.values_eq(&a, &a.clone()));
    }

    #[test]
    fn dtype_conversion_respects_downcast_flag() {
        let t = TensorType::with_rank(PrimitiveType::Int32, 1);
        let whole = tensor(PrimitiveType::Float64, vec![2], vec![1.0, 2.0]);
        assert!(t.filter(&whole, false, true).is_ok());
        assert!(t.filter(&whole, false, false).is_err());
    }
}
