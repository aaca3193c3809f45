/* Serde model for params definition files.
 *
 * A definition file names one or more params schemas and the field types
 * each is built from; the CLI loads these and turns every definition into
 * a validated `ParamsType`.
 */

use crate::params::ctype::FieldTypeRef;
use crate::params::enums::EnumType;
use crate::params::error::ParamsError;
use crate::params::scalar::{PrimitiveType, ScalarType};
use crate::params::schema::ParamsType;
use crate::params::tensor::TensorType;
use crate::params::value::FieldValue;
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParamsFile {
    pub params: Vec<ParamsDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParamsDef {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub fields: IndexMap<String, FieldTypeDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum FieldTypeDef {
    Scalar(PrimitiveType),
    Tensor {
        dtype: PrimitiveType,
        #[serde(default)]
        shape: Vec<Option<usize>>,
    },
    Enum {
        #[serde(default = "default_enum_ctype")]
        ctype: PrimitiveType,
        constants: IndexMap<String, f64>,
        #[serde(default)]
        aliases: IndexMap<String, String>,
    },
    EnumList(Vec<EnumListItem>),
}

/// One entry of an `enum-list`: a bare constant name, or a
/// `[name, alias]` pair.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum EnumListItem {
    Name(String),
    WithAlias(String, String),
}

fn default_enum_ctype() -> PrimitiveType {
    PrimitiveType::Float64
}

impl FieldTypeDef {
    pub fn build(&self) -> Result<FieldTypeRef, ParamsError> {
        match self {
            FieldTypeDef::Scalar(dtype) => Ok(Arc::new(ScalarType::new(*dtype))),
            FieldTypeDef::Tensor { dtype, shape } => {
                Ok(Arc::new(TensorType::new(*dtype, shape.clone())))
            }
            FieldTypeDef::Enum {
                ctype,
                constants,
                aliases,
            } => {
                let constants = constants.iter().map(|(name, value)| {
                    let value = if ctype.is_integral() && value.fract() == 0.0 {
                        FieldValue::Int(*value as i64)
                    } else {
                        FieldValue::Float(*value)
                    };
                    (name.clone(), value)
                });
                let aliases = aliases
                    .iter()
                    .map(|(alias, target)| (alias.clone(), target.clone()));
                Ok(Arc::new(EnumType::with_aliases(*ctype, constants, aliases)?))
            }
            FieldTypeDef::EnumList(items) => {
                let entries: Vec<(&str, Option<&str>)> = items
                    .iter()
                    .map(|item| match item {
                        EnumListItem::Name(name) => (name.as_str(), None),
                        EnumListItem::WithAlias(name, alias) => {
                            (name.as_str(), Some(alias.as_str()))
                        }
                    })
                    .collect();
                Ok(Arc::new(EnumType::list_with_aliases(&entries)?))
            }
        }
    }
}

impl ParamsDef {
    pub fn build(&self) -> Result<ParamsType, ParamsError> {
        let mut fields: Vec<(String, FieldTypeRef)> = Vec::with_capacity(self.fields.len());
        for (name, def) in &self.fields {
            fields.push((name.clone(), def.build()?));
        }
        ParamsType::new(fields)
    }
}
