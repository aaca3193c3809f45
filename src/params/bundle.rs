use crate::params::ctype::Signature;
use crate::params::error::ParamsError;
use crate::params::schema::{ParamsSource, ParamsType};
use crate::params::value::FieldValue;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// One immutable instance of the fields a `ParamsType` declares.
///
/// Construction fails unless every declared field has a value; no field can
/// be changed afterwards (there is deliberately no mutating API), which is
/// what makes the memoized hash below safe. Equality delegates to each
/// field type's own `values_eq`, so e.g. tensor fields compare by dtype,
/// shape and contents rather than storage identity.
#[derive(Debug, Clone)]
pub struct Params {
    params_type: ParamsType,
    values: BTreeMap<String, FieldValue>,
    /// Per-field signature cache, populated on first hash. `OnceLock` keeps
    /// concurrent first hashes race-free.
    signatures: OnceLock<Vec<Signature>>,
}

impl Params {
    pub fn new<I, S>(params_type: ParamsType, values: I) -> Result<Self, ParamsError>
    where
        I: IntoIterator<Item = (S, FieldValue)>,
        S: Into<String>,
    {
        let values: BTreeMap<String, FieldValue> = values
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        for field in params_type.fields() {
            if !values.contains_key(field) {
                return Err(ParamsError::MissingField {
                    field: field.clone(),
                });
            }
        }
        for name in values.keys() {
            if params_type.get_type(name).is_err() {
                return Err(ParamsError::UnknownField {
                    field: name.clone(),
                });
            }
        }
        Ok(Self {
            params_type,
            values,
            signatures: OnceLock::new(),
        })
    }

    pub fn params_type(&self) -> &ParamsType {
        &self.params_type
    }

    /// Value of a declared field.
    pub fn get(&self, field: &str) -> Result<&FieldValue, ParamsError> {
        self.values.get(field).ok_or_else(|| ParamsError::UnknownField {
            field: field.to_string(),
        })
    }

    /// Canonical per-field signatures, computed once and cached. Field
    /// order follows the params type's sorted field order.
    pub fn signatures(&self) -> &[Signature] {
        self.signatures.get_or_init(|| {
            self.params_type
                .fields()
                .iter()
                .zip(self.params_type.types())
                .map(|(field, t)| t.value_signature(&self.values[field]))
                .collect()
        })
    }
}

impl ParamsSource for Params {
    fn attr(&self, name: &str) -> Option<FieldValue> {
        self.values.get(name).cloned()
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(field, value)| format!("{field}:{}:{value}", value.kind_name()))
            .collect();
        write!(f, "Params({})", parts.join(", "))
    }
}

impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.params_type == other.params_type && self.params_type.values_eq(self, other)
    }
}

impl Eq for Params {}

impl Hash for Params {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.params_type.hash(state);
        for signature in self.signatures() {
            signature.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ctype::FieldTypeRef;
    use crate::params::scalar::{PrimitiveType, ScalarType};
    use std::sync::Arc;

    fn int32() -> FieldTypeRef {
        Arc::new(ScalarType::new(PrimitiveType::Int32))
    }

    fn int_pair_type() -> ParamsType {
        ParamsType::new([("x", int32()), ("y", int32())]).unwrap()
    }

    #[test]
    fn every_declared_field_must_be_supplied() {
        let err = Params::new(int_pair_type(), [("x", FieldValue::Int(1))]).unwrap_err();
        assert!(matches!(err, ParamsError::MissingField { field } if field == "y"));
    }

    #[test]
    fn undeclared_fields_are_rejected() {
        let err = Params::new(
            int_pair_type(),
            [
                ("x", FieldValue::Int(1)),
                ("y", FieldValue::Int(2)),
                ("z", FieldValue::Int(3)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ParamsError::UnknownField { field } if field == "z"));
    }

    #[test]
    fn reading_an_undeclared_field_fails() {
        let params = Params::new(
            int_pair_type(),
            [("x", FieldValue::Int(1)), ("y", FieldValue::Int(2))],
        )
        .unwrap();
        assert_eq!(params.get("x").unwrap(), &FieldValue::Int(1));
        assert!(matches!(
            params.get("nope").unwrap_err(),
            ParamsError::UnknownField { .. }
        ));
    }

    #[test]
    fn signatures_are_memoized_and_stable() {
        let params = Params::new(
            int_pair_type(),
            [("x", FieldValue::Int(1)), ("y", FieldValue::Int(2))],
        )
        .unwrap();
        let first = params.signatures().to_vec();
        let second = params.signatures().to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
