use crate::params::error::{CodegenError, FilterError};
use crate::params::value::FieldValue;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a field type.
pub type FieldTypeRef = Arc<dyn CFieldType>;

/// Capability set every field type of a params type must satisfy.
///
/// A field type owns validation/coercion (`filter`), the equality notion of
/// its values (`values_eq`), a canonical hashable form of a value
/// (`value_signature`), and the C code fragments through which the generated
/// params struct declares, initializes, extracts and cleans up one member of
/// that type. The `Display` form is the type's stable string identity; it
/// feeds both the params type's `repr` and the content hash behind the
/// generated struct name, so it must change whenever the generated code
/// would.
pub trait CFieldType: fmt::Debug + fmt::Display + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Structural equality over type identity.
    fn type_eq(&self, other: &dyn CFieldType) -> bool;

    /// Hash over type identity, consistent with `type_eq`. The default
    /// hashes the stable `Display` form.
    fn type_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        self.to_string().hash(&mut hasher);
        hasher.finish()
    }

    /// Validate `value` against this type and return its canonical form.
    ///
    /// In strict mode the value must already be canonical and no conversion
    /// is performed. Otherwise safe widenings are applied silently and
    /// narrowing conversions are applied only when `allow_downcast` is set.
    fn filter(
        &self,
        value: &FieldValue,
        strict: bool,
        allow_downcast: bool,
    ) -> Result<FieldValue, FilterError>;

    /// Domain-specific value equality (e.g. tensors compare by dtype, shape
    /// and contents, not by storage identity).
    fn values_eq(&self, a: &FieldValue, b: &FieldValue) -> bool;

    fn values_eq_approx(&self, a: &FieldValue, b: &FieldValue) -> bool {
        self.values_eq(a, b)
    }

    /// Canonical constant form of `value` reduced to a hashable signature.
    fn value_signature(&self, value: &FieldValue) -> Signature;

    /* C code fragments. `name` is the struct member name; `fail` is the
     * code to run when extraction fails (it increments the struct's error
     * counter and returns). */

    fn c_declare(&self, name: &str) -> String;

    fn c_init(&self, name: &str) -> String;

    fn c_cleanup(&self, name: &str) -> String;

    fn c_extract(&self, name: &str, fail: &str) -> String;

    /// Standalone support fragments this type needs once per compilation
    /// unit. Fragments are deduplicated across fields by exact content.
    fn c_support_code(&self) -> Vec<String> {
        Vec::new()
    }

    /* Compiler/linker metadata, concatenated across field types. */

    fn c_compile_args(&self) -> Vec<String> {
        Vec::new()
    }

    fn c_no_compile_args(&self) -> Vec<String> {
        Vec::new()
    }

    fn c_headers(&self) -> Vec<String> {
        Vec::new()
    }

    fn c_header_dirs(&self) -> Vec<String> {
        Vec::new()
    }

    fn c_libraries(&self) -> Vec<String> {
        Vec::new()
    }

    fn c_lib_dirs(&self) -> Vec<String> {
        Vec::new()
    }

    fn c_init_code(&self) -> Vec<String> {
        Vec::new()
    }

    /// Code synchronizing a value back from native state into the host
    /// object. Unsupported unless a type explicitly implements it; values
    /// of such types cannot be computation-graph outputs.
    fn c_sync(&self, _name: &str, _fail: &str) -> Result<String, CodegenError> {
        Err(CodegenError::GraphOutputUnsupported {
            type_string: self.to_string(),
        })
    }

    /// Versioning token for the compilation cache. Bumping a field type's
    /// token invalidates cached artifacts of every params type including it.
    fn c_code_cache_version(&self) -> CacheVersion;

    /// Downcast seam for the enum-constant aggregation of `ParamsType`.
    fn as_enum(&self) -> Option<&dyn crate::params::enums::CEnumType> {
        None
    }
}

/// Canonical hashable digest of one field value, used as the per-field
/// contribution to a bundle's hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(tag: &str) -> Self {
        let mut bytes = tag.as_bytes().to_vec();
        bytes.push(0);
        Self(bytes)
    }

    pub fn push_u64(&mut self, v: u64) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    pub fn push_i64(&mut self, v: i64) {
        self.push_u64(v as u64);
    }

    pub fn push_f64(&mut self, v: f64) {
        self.push_u64(v.to_bits());
    }

    pub fn push_str(&mut self, s: &str) {
        self.0.extend_from_slice(s.as_bytes());
        self.0.push(0);
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Cache-versioning token: a leaf version or an ordered composition of the
/// tokens of constituent types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheVersion {
    Version(Vec<u32>),
    Composite(Vec<CacheVersion>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_differ_by_tag_and_payload() {
        let mut a = Signature::new("scalar:int32");
        a.push_i64(7);
        let mut b = Signature::new("scalar:int32");
        b.push_i64(8);
        let mut c = Signature::new("scalar:int64");
        c.push_i64(7);
        assert_ne!(a, b);
        assert_ne!(a, c);
        let mut a2 = Signature::new("scalar:int32");
        a2.push_i64(7);
        assert_eq!(a, a2);
    }
}
