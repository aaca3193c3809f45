use crate::codegen::c_gen::helpers::{is_c_keyword, is_valid_identifier, sha256_hex};
use crate::params::ctype::{CFieldType, CacheVersion, Signature};
use crate::params::error::{FilterError, ParamsError};
use crate::params::scalar::{HOST_SCALAR_API, PrimitiveType, emit_scalar_extract, filter_scalar};
use crate::params::value::FieldValue;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::fmt::Write;

/// Capability set of an enumeration field type, as seen by the params
/// type's constant aggregation: iteration over constant names, membership,
/// indexing by name, and alias resolution.
pub trait CEnumType: CFieldType {
    fn constant_names(&self) -> Vec<&str>;

    fn has_constant(&self, name: &str) -> bool;

    fn constant(&self, name: &str) -> Option<FieldValue>;

    /// (alias, canonical constant name) pairs.
    fn aliases(&self) -> Vec<(&str, &str)>;

    fn from_alias(&self, alias: &str) -> Option<FieldValue>;
}

/// Field type representing a fixed set of named numeric constants,
/// optionally reachable through aliases.
///
/// Constants become `#define`s in the generated support code, so their
/// names obey the same identifier and keyword rules as field names.
#[derive(Debug, Clone)]
pub struct EnumType {
    ctype: PrimitiveType,
    constants: IndexMap<String, FieldValue>,
    aliases: IndexMap<String, String>,
}

impl EnumType {
    pub fn new<I, S>(ctype: PrimitiveType, constants: I) -> Result<Self, ParamsError>
    where
        I: IntoIterator<Item = (S, FieldValue)>,
        S: Into<String>,
    {
        let constants: Vec<(String, FieldValue)> = constants
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        Self::with_aliases(ctype, constants, Vec::<(String, String)>::new())
    }

    pub fn with_aliases<I, S, A>(
        ctype: PrimitiveType,
        constants: I,
        aliases: A,
    ) -> Result<Self, ParamsError>
    where
        I: IntoIterator<Item = (S, FieldValue)>,
        S: Into<String>,
        A: IntoIterator<Item = (S, S)>,
    {
        let mut constant_map = IndexMap::new();
        for (name, value) in constants {
            let name = name.into();
            if !is_valid_identifier(&name) {
                return Err(ParamsError::InvalidIdentifier { name });
            }
            if is_c_keyword(&name) {
                return Err(ParamsError::ReservedKeyword { name });
            }
            let value = filter_scalar(ctype, &value, false, true)
                .map_err(|_| ParamsError::NonNumericConstant { name: name.clone() })?;
            if constant_map.insert(name.clone(), value).is_some() {
                return Err(ParamsError::DuplicateEnumConstant { name });
            }
        }
        if constant_map.is_empty() {
            return Err(ParamsError::EmptyEnum);
        }

        let mut alias_map = IndexMap::new();
        for (alias, target) in aliases {
            let alias = alias.into();
            let target = target.into();
            if !constant_map.contains_key(&target) {
                return Err(ParamsError::UnknownConstant { name: target });
            }
            if constant_map.contains_key(&alias) {
                return Err(ParamsError::AliasShadowsConstant { alias });
            }
            if alias_map.insert(alias.clone(), target).is_some() {
                return Err(ParamsError::DuplicateEnumAlias { alias });
            }
        }

        Ok(Self {
            ctype,
            constants: constant_map,
            aliases: alias_map,
        })
    }

    /// Enum over the given names with values assigned by position, the
    /// conventional shape for mode-selection constants.
    pub fn list<I, S>(names: I) -> Result<Self, ParamsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let constants = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.into(), FieldValue::Int(i as i64)));
        Self::new(PrimitiveType::Int32, constants)
    }

    /// Positional enum where each entry may carry an alias.
    pub fn list_with_aliases(entries: &[(&str, Option<&str>)]) -> Result<Self, ParamsError> {
        let constants: Vec<(String, FieldValue)> = entries
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.to_string(), FieldValue::Int(i as i64)))
            .collect();
        let aliases: Vec<(String, String)> = entries
            .iter()
            .filter_map(|(name, alias)| alias.map(|a| (a.to_string(), name.to_string())))
            .collect();
        Self::with_aliases(PrimitiveType::Int32, constants, aliases)
    }

    pub fn ctype(&self) -> PrimitiveType {
        self.ctype
    }

    fn format_constant(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Float(f) => format!("{f:?}"),
            other => other.to_string(),
        }
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        if self.ctype != other.ctype
            || self.constants.len() != other.constants.len()
            || self.aliases.len() != other.aliases.len()
        {
            return false;
        }
        self.constants
            .iter()
            .all(|(name, value)| other.constants.get(name) == Some(value))
            && self
                .aliases
                .iter()
                .all(|(alias, target)| other.aliases.get(alias) == Some(target))
    }
}

impl fmt::Display for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        /* Sorted so that structurally equal enums print identically
         * regardless of construction order; this string feeds the params
         * type's content hash. */
        let mut names: Vec<&String> = self.constants.keys().collect();
        names.sort();
        let mut parts = Vec::with_capacity(names.len());
        for name in names {
            let value = self.format_constant(&self.constants[name.as_str()]);
            let mut aliases: Vec<&str> = self
                .aliases
                .iter()
                .filter(|(_, target)| *target == name)
                .map(|(alias, _)| alias.as_str())
                .collect();
            aliases.sort_unstable();
            if aliases.is_empty() {
                parts.push(format!("{name}:{value}"));
            } else {
                parts.push(format!("{name}({}):{value}", aliases.join("|")));
            }
        }
        write!(f, "EnumType<{}>({})", self.ctype, parts.join(", "))
    }
}

impl CEnumType for EnumType {
    fn constant_names(&self) -> Vec<&str> {
        self.constants.keys().map(String::as_str).collect()
    }

    fn has_constant(&self, name: &str) -> bool {
        self.constants.contains_key(name)
    }

    fn constant(&self, name: &str) -> Option<FieldValue> {
        self.constants.get(name).cloned()
    }

    fn aliases(&self) -> Vec<(&str, &str)> {
        self.aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
            .collect()
    }

    fn from_alias(&self, alias: &str) -> Option<FieldValue> {
        self.aliases
            .get(alias)
            .and_then(|target| self.constant(target))
    }
}

impl CFieldType for EnumType {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_eq(&self, other: &dyn CFieldType) -> bool {
        other
            .as_any()
            .downcast_ref::<EnumType>()
            .is_some_and(|o| self == o)
    }

    fn filter(
        &self,
        value: &FieldValue,
        strict: bool,
        allow_downcast: bool,
    ) -> Result<FieldValue, FilterError> {
        let coerced = filter_scalar(self.ctype, value, strict, allow_downcast)?;
        if self.constants.values().any(|v| v == &coerced) {
            Ok(coerced)
        } else {
            Err(FilterError::UnknownConstantValue {
                value: value.to_string(),
                type_string: self.to_string(),
            })
        }
    }

    fn values_eq(&self, a: &FieldValue, b: &FieldValue) -> bool {
        a == b
    }

    fn values_eq_approx(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => crate::params::scalar::approx_eq(x, y),
            _ => a == b,
        }
    }

    fn value_signature(&self, value: &FieldValue) -> Signature {
        let mut sig = Signature::new(&format!("enum:{}", self.ctype));
        match value {
            FieldValue::Int(v) => sig.push_i64(*v),
            FieldValue::Float(f) => sig.push_f64(*f),
            other => sig.push_str(&other.to_string()),
        }
        sig
    }

    fn c_declare(&self, name: &str) -> String {
        format!("{} {};\n", self.ctype.c_type(), name)
    }

    fn c_init(&self, name: &str) -> String {
        format!("{} = ({})0;\n", name, self.ctype.c_type())
    }

    fn c_cleanup(&self, _name: &str) -> String {
        String::new()
    }

    fn c_extract(&self, name: &str, fail: &str) -> String {
        emit_scalar_extract(self.ctype, name, fail)
    }

    fn c_support_code(&self) -> Vec<String> {
        /* One #define per constant, in declaration order, guarded by a
         * digest of the type's identity string so the same enum shared by
         * several fields or schemas is only defined once. */
        let guard = format!("PARAMS_ENUM_{}", &sha256_hex(&self.to_string())[..16].to_uppercase());
        let mut code = String::new();
        write!(code, "/* Constants for {} */\n", self).unwrap();
        write!(code, "#ifndef {guard}\n#define {guard}\n").unwrap();
        for (name, value) in &self.constants {
            write!(code, "#define {} {}\n", name, self.format_constant(value)).unwrap();
        }
        code.push_str("#endif\n");
        vec![HOST_SCALAR_API.to_string(), code]
    }

    fn c_code_cache_version(&self) -> CacheVersion {
        CacheVersion::Version(vec![1])
    }

    fn as_enum(&self) -> Option<&dyn CEnumType> {
        Some(self)
    }
}
