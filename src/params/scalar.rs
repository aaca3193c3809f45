use crate::params::ctype::{CFieldType, CacheVersion, Signature};
use crate::params::error::FilterError;
use crate::params::value::FieldValue;
use serde_derive::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Element dtype of scalar and tensor field types.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl PrimitiveType {
    /// C type used for a struct member of this dtype.
    pub fn c_type(&self) -> &'static str {
        match self {
            PrimitiveType::Bool => "unsigned char",
            PrimitiveType::Uint8 => "uint8_t",
            PrimitiveType::Uint16 => "uint16_t",
            PrimitiveType::Uint32 => "uint32_t",
            PrimitiveType::Uint64 => "uint64_t",
            PrimitiveType::Int8 => "int8_t",
            PrimitiveType::Int16 => "int16_t",
            PrimitiveType::Int32 => "int32_t",
            PrimitiveType::Int64 => "int64_t",
            PrimitiveType::Float32 => "float",
            PrimitiveType::Float64 => "double",
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Uint8
                | PrimitiveType::Uint16
                | PrimitiveType::Uint32
                | PrimitiveType::Uint64
                | PrimitiveType::Int8
                | PrimitiveType::Int16
                | PrimitiveType::Int32
                | PrimitiveType::Int64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, PrimitiveType::Float32 | PrimitiveType::Float64)
    }

    /// Inclusive value range of an integral dtype.
    pub(crate) fn int_range(&self) -> Option<(i128, i128)> {
        match self {
            PrimitiveType::Uint8 => Some((0, u8::MAX as i128)),
            PrimitiveType::Uint16 => Some((0, u16::MAX as i128)),
            PrimitiveType::Uint32 => Some((0, u32::MAX as i128)),
            PrimitiveType::Uint64 => Some((0, u64::MAX as i128)),
            PrimitiveType::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            PrimitiveType::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            PrimitiveType::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            PrimitiveType::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            _ => None,
        }
    }

    /// Largest integer magnitude this float dtype represents exactly.
    pub(crate) fn exact_int_bound(&self) -> Option<i64> {
        match self {
            PrimitiveType::Float32 => Some(1 << 24),
            PrimitiveType::Float64 => Some(1 << 53),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Uint8 => "uint8",
            PrimitiveType::Uint16 => "uint16",
            PrimitiveType::Uint32 => "uint32",
            PrimitiveType::Uint64 => "uint64",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::Float64 => "float64",
        };
        f.write_str(name)
    }
}

/// Field type holding one scalar of a fixed dtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScalarType {
    dtype: PrimitiveType,
}

impl ScalarType {
    pub fn new(dtype: PrimitiveType) -> Self {
        Self { dtype }
    }

    pub fn dtype(&self) -> PrimitiveType {
        self.dtype
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({})", self.dtype)
    }
}

/// Coerce one scalar-like value into `dtype`'s canonical `FieldValue` form.
pub(crate) fn filter_scalar(
    dtype: PrimitiveType,
    value: &FieldValue,
    strict: bool,
    allow_downcast: bool,
) -> Result<FieldValue, FilterError> {
    let mismatch = |expected: &str| FilterError::TypeMismatch {
        expected: expected.to_string(),
        got: value.kind_name(),
    };

    if dtype == PrimitiveType::Bool {
        return match value {
            FieldValue::Bool(b) => Ok(FieldValue::Bool(*b)),
            FieldValue::Int(v) if !strict && (*v == 0 || *v == 1) => Ok(FieldValue::Bool(*v != 0)),
            _ => Err(mismatch("bool")),
        };
    }

    if let Some((lo, hi)) = dtype.int_range() {
        return match value {
            FieldValue::Int(v) => {
                if (lo..=hi).contains(&(*v as i128)) {
                    Ok(FieldValue::Int(*v))
                } else {
                    Err(FilterError::OutOfRange {
                        value: v.to_string(),
                        dtype: dtype.to_string(),
                    })
                }
            }
            FieldValue::Bool(b) if !strict => Ok(FieldValue::Int(*b as i64)),
            FieldValue::Float(f) if !strict => {
                if f.fract() != 0.0 || !(lo..=hi).contains(&(*f as i128)) {
                    Err(FilterError::OutOfRange {
                        value: format!("{f:?}"),
                        dtype: dtype.to_string(),
                    })
                } else if allow_downcast {
                    Ok(FieldValue::Int(*f as i64))
                } else {
                    Err(FilterError::DowncastForbidden {
                        value: format!("{f:?}"),
                        dtype: dtype.to_string(),
                    })
                }
            }
            _ => Err(mismatch("integer")),
        };
    }

    /* Floating-point target. */
    match value {
        FieldValue::Float(f) => {
            if dtype == PrimitiveType::Float64 || (*f as f32) as f64 == *f {
                Ok(FieldValue::Float(*f))
            } else if !strict && allow_downcast {
                Ok(FieldValue::Float((*f as f32) as f64))
            } else {
                Err(FilterError::DowncastForbidden {
                    value: format!("{f:?}"),
                    dtype: dtype.to_string(),
                })
            }
        }
        FieldValue::Int(v) if !strict => {
            let bound = dtype.exact_int_bound().unwrap_or(i64::MAX);
            let rounded = if dtype == PrimitiveType::Float32 {
                (*v as f32) as f64
            } else {
                *v as f64
            };
            if v.unsigned_abs() <= bound as u64 || allow_downcast {
                Ok(FieldValue::Float(rounded))
            } else {
                Err(FilterError::DowncastForbidden {
                    value: v.to_string(),
                    dtype: dtype.to_string(),
                })
            }
        }
        FieldValue::Bool(b) if !strict => Ok(FieldValue::Float(*b as i64 as f64)),
        _ => Err(mismatch("float")),
    }
}

/// Approximate numeric equality used by the `values_eq_approx` paths.
pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Extraction fragment reading one scalar member through the host runtime.
pub(crate) fn emit_scalar_extract(dtype: PrimitiveType, name: &str, fail: &str) -> String {
    let ctype = dtype.c_type();
    if dtype.is_float() {
        format!(
            "{name} = ({ctype})host_object_as_double(py_{name});\n\
             if (host_error_occurred()) {{\n\
                 host_error_format(\"params: expected a floating-point value for \\\"{name}\\\".\");\n\
                 {fail}\n\
             }}\n"
        )
    } else {
        format!(
            "{name} = ({ctype})host_object_as_int64(py_{name});\n\
             if (host_error_occurred()) {{\n\
                 host_error_format(\"params: expected an integer value for \\\"{name}\\\".\");\n\
                 {fail}\n\
             }}\n"
        )
    }
}

/// Extern declarations for the host runtime's scalar conversions, shared by
/// every scalar-like field type.
pub(crate) const HOST_SCALAR_API: &str = "\
/* Host runtime scalar conversions */
#ifndef PARAMS_HOST_SCALAR_API
#define PARAMS_HOST_SCALAR_API
extern long long host_object_as_int64(host_object_t* object);
extern double host_object_as_double(host_object_t* object);
#endif
";

impl CFieldType for ScalarType {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_eq(&self, other: &dyn CFieldType) -> bool {
        other
            .as_any()
            .downcast_ref::<ScalarType>()
            .is_some_and(|o| self == o)
    }

    fn filter(
        &self,
        value: &FieldValue,
        strict: bool,
        allow_downcast: bool,
    ) -> Result<FieldValue, FilterError> {
        filter_scalar(self.dtype, value, strict, allow_downcast)
    }

    fn values_eq(&self, a: &FieldValue, b: &FieldValue) -> bool {
        a == b
    }

    fn values_eq_approx(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => approx_eq(x, y),
            _ => a == b,
        }
    }

    fn value_signature(&self, value: &FieldValue) -> Signature {
        let mut sig = Signature::new(&format!("scalar:{}", self.dtype));
        match value {
            FieldValue::Bool(b) => sig.push_u64(*b as u64),
            FieldValue::Int(v) => sig.push_i64(*v),
            FieldValue::Float(f) => sig.push_f64(*f),
            other => sig.push_str(&other.to_string()),
        }
        sig
    }

    fn c_declare(&self, name: &str) -> String {
        format!("{} {};\n", self.dtype.c_type(), name)
    }

    fn c_init(&self, name: &str) -> String {
        format!("{} = ({})0;\n", name, self.dtype.c_type())
    }

    fn c_cleanup(&self, _name: &str) -> String {
        String::new()
    }

    fn c_extract(&self, name: &str, fail: &str) -> String {
        emit_scalar_extract(self.dtype, name, fail)
    }

    fn c_support_code(&self) -> Vec<String> {
        vec![HOST_SCALAR_API.to_string()]
    }

    fn c_code_cache_version(&self) -> CacheVersion {
        CacheVersion::Version(vec![1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_filter_rejects_any_conversion() {
        let t = ScalarType::new(PrimitiveType::Int32);
        assert_eq!(
            t.filter(&FieldValue::Int(5), true, false).unwrap(),
            FieldValue::Int(5)
        );
        assert!(t.filter(&FieldValue::Float(5.0), true, true).is_err());
        assert!(t.filter(&FieldValue::Bool(true), true, true).is_err());
    }

    #[test]
    fn lenient_filter_downcasts_whole_floats() {
        let t = ScalarType::new(PrimitiveType::Int32);
        assert_eq!(
            t.filter(&FieldValue::Float(5.0), false, true).unwrap(),
            FieldValue::Int(5)
        );
        assert!(matches!(
            t.filter(&FieldValue::Float(5.0), false, false).unwrap_err(),
            FilterError::DowncastForbidden { .. }
        ));
        assert!(matches!(
            t.filter(&FieldValue::Float(5.5), false, true).unwrap_err(),
            FilterError::OutOfRange { .. }
        ));
    }

    #[test]
    fn integral_range_is_enforced() {
        let t = ScalarType::new(PrimitiveType::Uint8);
        assert!(t.filter(&FieldValue::Int(255), false, false).is_ok());
        assert!(matches!(
            t.filter(&FieldValue::Int(256), false, true).unwrap_err(),
            FilterError::OutOfRange { .. }
        ));
        assert!(matches!(
            t.filter(&FieldValue::Int(-1), false, true).unwrap_err(),
            FilterError::OutOfRange { .. }
        ));
    }

    #[test]
    fn float32_narrows_only_with_downcast() {
        let t = ScalarType::new(PrimitiveType::Float32);
        /* 0.1 is not exactly representable in f32. */
        assert!(matches!(
            t.filter(&FieldValue::Float(0.1), false, false).unwrap_err(),
            FilterError::DowncastForbidden { .. }
        ));
        let narrowed = t.filter(&FieldValue::Float(0.1), false, true).unwrap();
        assert_eq!(narrowed, FieldValue::Float((0.1f32) as f64));
    }

    #[test]
    fn bool_target_accepts_zero_and_one() {
        let t = ScalarType::new(PrimitiveType::Bool);
        assert_eq!(
            t.filter(&FieldValue::Int(1), false, false).unwrap(),
            FieldValue::Bool(true)
        );
        assert!(t.filter(&FieldValue::Int(2), false, true).is_err());
    }
}
