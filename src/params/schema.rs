use crate::codegen::c_gen::helpers::{is_c_keyword, is_valid_identifier, sha256_hex};
use crate::codegen::c_gen::{lifecycle, struct_def};
use crate::params::bundle::Params;
use crate::params::ctype::{CFieldType, CacheVersion, FieldTypeRef, Signature};
use crate::params::error::{FilterError, ParamsError};
use crate::params::value::FieldValue;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Format version of the generated params struct; part of the cache token
/// so regenerating the struct layout invalidates previously compiled code.
pub const PARAMS_STRUCT_FORMAT_VERSION: u32 = 1;

/// Something field values can be harvested from by attribute name.
///
/// Operator instances, plain maps and existing bundles all act as sources;
/// absence of a field on one source is not an error, the harvest just moves
/// on to the next candidate.
pub trait ParamsSource {
    fn attr(&self, name: &str) -> Option<FieldValue>;
}

impl ParamsSource for BTreeMap<String, FieldValue> {
    fn attr(&self, name: &str) -> Option<FieldValue> {
        self.get(name).cloned()
    }
}

/// Typed description of a fixed set of named fields.
///
/// Field names are canonicalized by sorting, so two params types built from
/// the same fields in any order are equal, hash alike, and generate the
/// same C struct. The struct name is derived from a content hash of the
/// field names and the type strings; structurally identical params types
/// constructed independently therefore share one generated definition, and
/// the compilation cache can key on that name.
#[derive(Debug, Clone)]
pub struct ParamsType {
    fields: Vec<String>,
    types: Vec<FieldTypeRef>,
    name: String,
    const_to_enum: HashMap<String, usize>,
    alias_to_enum: HashMap<String, usize>,
}

impl ParamsType {
    pub fn new<I, S>(fields: I) -> Result<Self, ParamsError>
    where
        I: IntoIterator<Item = (S, FieldTypeRef)>,
        S: Into<String>,
    {
        /* Later duplicates override earlier ones, which is what lets
         * `extended` replace a field's type. */
        let mut by_name: BTreeMap<String, FieldTypeRef> = BTreeMap::new();
        for (name, field_type) in fields {
            by_name.insert(name.into(), field_type);
        }
        if by_name.is_empty() {
            return Err(ParamsError::EmptyFields);
        }

        for name in by_name.keys() {
            if !is_valid_identifier(name) {
                return Err(ParamsError::InvalidIdentifier { name: name.clone() });
            }
            if is_c_keyword(name) {
                return Err(ParamsError::ReservedKeyword { name: name.clone() });
            }
        }

        let (fields, types): (Vec<String>, Vec<FieldTypeRef>) = by_name.into_iter().unzip();
        let name = generate_struct_name(&fields, &types);

        /* Aggregate enum constants across all wrapped enum types. Every
         * constant and alias must have exactly one owner, and no alias may
         * shadow any constant. */
        let mut const_to_enum: HashMap<String, usize> = HashMap::new();
        let mut alias_to_enum: HashMap<String, usize> = HashMap::new();
        for (index, field_type) in types.iter().enumerate() {
            let Some(enum_type) = field_type.as_enum() else {
                continue;
            };
            for constant in enum_type.constant_names() {
                if const_to_enum.insert(constant.to_string(), index).is_some() {
                    return Err(ParamsError::DuplicateEnumConstant {
                        name: constant.to_string(),
                    });
                }
            }
            for (alias, _) in enum_type.aliases() {
                if alias_to_enum.insert(alias.to_string(), index).is_some() {
                    return Err(ParamsError::DuplicateEnumAlias {
                        alias: alias.to_string(),
                    });
                }
            }
        }
        for alias in alias_to_enum.keys() {
            if const_to_enum.contains_key(alias) {
                return Err(ParamsError::AliasShadowsConstant {
                    alias: alias.clone(),
                });
            }
        }

        debug!(struct_name = %name, fields = fields.len(), "created params type");
        Ok(Self {
            fields,
            types,
            name,
            const_to_enum,
            alias_to_enum,
        })
    }

    /// Field names, lexicographically sorted.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field types, one per field, in field order.
    pub fn types(&self) -> &[FieldTypeRef] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Content-derived name of the generated C struct.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if some field has exactly this type.
    pub fn has_type(&self, field_type: &dyn CFieldType) -> bool {
        self.types.iter().any(|t| t.type_eq(field_type))
    }

    /// Type bound to `field`.
    pub fn get_type(&self, field: &str) -> Result<&FieldTypeRef, ParamsError> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|i| &self.types[i])
            .ok_or_else(|| ParamsError::UnknownField {
                field: field.to_string(),
            })
    }

    /// First field (in sorted order) whose type equals `field_type`. Meant
    /// for callers that know the type occurs exactly once.
    pub fn get_field(&self, field_type: &dyn CFieldType) -> Result<&str, ParamsError> {
        self.types
            .iter()
            .position(|t| t.type_eq(field_type))
            .map(|i| self.fields[i].as_str())
            .ok_or_else(|| ParamsError::NoFieldForType {
                type_string: field_type.to_string(),
            })
    }

    /// Value of the constant `name` defined by one of the wrapped enum
    /// types.
    pub fn get_enum(&self, name: &str) -> Result<FieldValue, ParamsError> {
        self.const_to_enum
            .get(name)
            .and_then(|&i| self.types[i].as_enum())
            .and_then(|e| e.constant(name))
            .ok_or_else(|| ParamsError::UnknownConstant {
                name: name.to_string(),
            })
    }

    /// Resolve `alias` through its owning enum type; if no such alias is
    /// registered, fall back to a constant of that exact name.
    pub fn enum_from_alias(&self, alias: &str) -> Result<FieldValue, ParamsError> {
        if let Some(&index) = self.alias_to_enum.get(alias) {
            return self.types[index]
                .as_enum()
                .and_then(|e| e.from_alias(alias))
                .ok_or_else(|| ParamsError::UnknownAlias {
                    alias: alias.to_string(),
                });
        }
        self.get_enum(alias).map_err(|_| ParamsError::UnknownAlias {
            alias: alias.to_string(),
        })
    }

    /// All constant names across the wrapped enum types, sorted.
    pub fn constant_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.const_to_enum.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All alias names across the wrapped enum types, sorted.
    pub fn alias_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.alias_to_enum.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// New, independently validated params type with the union of this
    /// one's fields and `more_fields`; duplicates override the original.
    pub fn extended<I, S>(&self, more_fields: I) -> Result<ParamsType, ParamsError>
    where
        I: IntoIterator<Item = (S, FieldTypeRef)>,
        S: Into<String>,
    {
        let mut all: Vec<(String, FieldTypeRef)> = self
            .fields
            .iter()
            .cloned()
            .zip(self.types.iter().cloned())
            .collect();
        all.extend(more_fields.into_iter().map(|(n, t)| (n.into(), t)));
        ParamsType::new(all)
    }

    /// Harvest a value for every declared field from `objects` (scanned
    /// left to right, later objects overriding earlier ones) and
    /// `overrides` (which win over any object), filter each through its
    /// field type with lenient-downcast semantics, and wrap the result into
    /// a bundle. A field with no value from either source is an error.
    pub fn get_params(
        &self,
        objects: &[&dyn ParamsSource],
        overrides: &BTreeMap<String, FieldValue>,
    ) -> Result<Params, ParamsError> {
        let mut collected: BTreeMap<String, FieldValue> = BTreeMap::new();
        for object in objects {
            for field in &self.fields {
                if let Some(value) = object.attr(field) {
                    collected.insert(field.clone(), value);
                }
            }
        }
        for field in &self.fields {
            if let Some(value) = overrides.get(field) {
                collected.insert(field.clone(), value.clone());
            }
        }

        let mut filtered: Vec<(String, FieldValue)> = Vec::with_capacity(self.fields.len());
        for (field, field_type) in self.fields.iter().zip(&self.types) {
            let value = collected
                .get(field)
                .ok_or_else(|| ParamsError::MissingField {
                    field: field.clone(),
                })?;
            let value =
                field_type
                    .filter(value, false, true)
                    .map_err(|source| ParamsError::Filter {
                        field: field.clone(),
                        source,
                    })?;
            filtered.push((field.clone(), value));
        }
        Params::new(self.clone(), filtered)
    }

    /// Validate `data` against this params type. In strict mode the bundle
    /// is returned unchanged after validation; otherwise a fresh bundle is
    /// built from the filtered values.
    pub fn filter(
        &self,
        data: &Params,
        strict: bool,
        allow_downcast: bool,
    ) -> Result<Params, ParamsError> {
        let mut filtered: Vec<(String, FieldValue)> = Vec::with_capacity(self.fields.len());
        for (field, field_type) in self.fields.iter().zip(&self.types) {
            let value = data.attr(field).ok_or_else(|| ParamsError::MissingField {
                field: field.clone(),
            })?;
            let value = field_type
                .filter(&value, strict, allow_downcast)
                .map_err(|source| ParamsError::Filter {
                    field: field.clone(),
                    source,
                })?;
            filtered.push((field.clone(), value));
        }
        if strict {
            Ok(data.clone())
        } else {
            Params::new(self.clone(), filtered)
        }
    }

    /// Per-field value equality between two bundles, conjoined over all
    /// fields under each field type's own equality notion.
    pub fn values_eq(&self, a: &Params, b: &Params) -> bool {
        self.fields.iter().zip(&self.types).all(|(field, t)| {
            match (a.attr(field), b.attr(field)) {
                (Some(x), Some(y)) => t.values_eq(&x, &y),
                _ => false,
            }
        })
    }

    pub fn values_eq_approx(&self, a: &Params, b: &Params) -> bool {
        self.fields.iter().zip(&self.types).all(|(field, t)| {
            match (a.attr(field), b.attr(field)) {
                (Some(x), Some(y)) => t.values_eq_approx(&x, &y),
                _ => false,
            }
        })
    }
}

/// Content-derived struct name: one digest over the field names, one over
/// the type strings. Any hash with negligible collision odds at the
/// expected schema cardinality works here; sha256 keeps the name stable
/// across processes and builds.
fn generate_struct_name(fields: &[String], types: &[FieldTypeRef]) -> String {
    let fields_hex = sha256_hex(&fields.join(","));
    let type_strings: Vec<String> = types.iter().map(|t| t.to_string()).collect();
    let types_hex = sha256_hex(&type_strings.join(","));
    format!("_Params_{fields_hex}_{types_hex}")
}

impl fmt::Display for ParamsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .zip(&self.types)
            .map(|(field, t)| format!("{field}:{t}"))
            .collect();
        write!(f, "ParamsType<{}>", parts.join(", "))
    }
}

impl PartialEq for ParamsType {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.types.len() == other.types.len()
            && self
                .types
                .iter()
                .zip(&other.types)
                .all(|(a, b)| a.type_eq(b.as_ref()))
    }
}

impl Eq for ParamsType {}

impl Hash for ParamsType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields.hash(state);
        for field_type in &self.types {
            state.write_u64(field_type.type_hash());
        }
    }
}

impl CFieldType for ParamsType {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_eq(&self, other: &dyn CFieldType) -> bool {
        other
            .as_any()
            .downcast_ref::<ParamsType>()
            .is_some_and(|o| self == o)
    }

    fn filter(
        &self,
        value: &FieldValue,
        strict: bool,
        allow_downcast: bool,
    ) -> Result<FieldValue, FilterError> {
        let FieldValue::Params(bundle) = value else {
            return Err(FilterError::TypeMismatch {
                expected: "params".to_string(),
                got: value.kind_name(),
            });
        };
        self.filter(bundle, strict, allow_downcast)
            .map(|p| FieldValue::Params(Box::new(p)))
            .map_err(|e| FilterError::Bundle {
                message: e.to_string(),
            })
    }

    fn values_eq(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (a, b) {
            (FieldValue::Params(x), FieldValue::Params(y)) => x.as_ref() == y.as_ref(),
            _ => false,
        }
    }

    fn values_eq_approx(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match (a, b) {
            (FieldValue::Params(x), FieldValue::Params(y)) => {
                x.params_type() == y.params_type() && self.values_eq_approx(x, y)
            }
            _ => false,
        }
    }

    fn value_signature(&self, value: &FieldValue) -> Signature {
        let mut sig = Signature::new(&format!("params:{}", self.name));
        if let FieldValue::Params(bundle) = value {
            for field_sig in bundle.signatures() {
                sig.push_bytes(field_sig.as_bytes());
            }
        } else {
            sig.push_str(&value.to_string());
        }
        sig
    }

    fn c_declare(&self, name: &str) -> String {
        format!("{}* {};\n", self.name, name)
    }

    fn c_init(&self, name: &str) -> String {
        /* The pointer is only nulled here; allocation happens at the top of
         * the extraction fragment. */
        format!("{name} = NULL;\n")
    }

    fn c_cleanup(&self, name: &str) -> String {
        format!("delete {name};\n{name} = NULL;\n")
    }

    fn c_extract(&self, name: &str, fail: &str) -> String {
        lifecycle::emit_struct_extract(self, name, fail)
    }

    fn c_support_code(&self) -> Vec<String> {
        let mut dedup: BTreeSet<String> = BTreeSet::new();
        for field_type in &self.types {
            dedup.extend(field_type.c_support_code());
        }
        let mut fragments = vec![lifecycle::HOST_RUNTIME_PRELUDE.to_string()];
        fragments.extend(dedup);
        fragments.push(struct_def::emit_params_struct(self));
        fragments
    }

    fn c_compile_args(&self) -> Vec<String> {
        self.types.iter().flat_map(|t| t.c_compile_args()).collect()
    }

    fn c_no_compile_args(&self) -> Vec<String> {
        self.types
            .iter()
            .flat_map(|t| t.c_no_compile_args())
            .collect()
    }

    fn c_headers(&self) -> Vec<String> {
        self.types.iter().flat_map(|t| t.c_headers()).collect()
    }

    fn c_header_dirs(&self) -> Vec<String> {
        self.types.iter().flat_map(|t| t.c_header_dirs()).collect()
    }

    fn c_libraries(&self) -> Vec<String> {
        self.types.iter().flat_map(|t| t.c_libraries()).collect()
    }

    fn c_lib_dirs(&self) -> Vec<String> {
        self.types.iter().flat_map(|t| t.c_lib_dirs()).collect()
    }

    fn c_init_code(&self) -> Vec<String> {
        self.types.iter().flat_map(|t| t.c_init_code()).collect()
    }

    fn c_code_cache_version(&self) -> CacheVersion {
        CacheVersion::Composite(vec![
            CacheVersion::Version(vec![PARAMS_STRUCT_FORMAT_VERSION]),
            CacheVersion::Composite(
                self.types
                    .iter()
                    .map(|t| t.c_code_cache_version())
                    .collect(),
            ),
        ])
    }
}
