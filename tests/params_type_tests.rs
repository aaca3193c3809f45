/* Params Type Tests
 *
 * These tests exercise the schema/bundle behavior: identity determinism,
 * construction-time validation, enum constant aggregation, harvesting
 * precedence and the equality/hash contract of bundles.
 */

use params_gen::{
    CFieldType, CacheVersion, CodegenError, EnumType, FieldValue, Params, ParamsError,
    ParamsSource, ParamsType, PrimitiveType, ScalarType, TensorType, TensorValue,
};
use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

fn scalar(dtype: PrimitiveType) -> params_gen::FieldTypeRef {
    Arc::new(ScalarType::new(dtype))
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn source(pairs: &[(&str, FieldValue)]) -> BTreeMap<String, FieldValue> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[test]
fn identity_is_independent_of_construction_order() {
    let a = ParamsType::new([
        ("b", scalar(PrimitiveType::Float64)),
        ("a", scalar(PrimitiveType::Int32)),
    ])
    .unwrap();
    let b = ParamsType::new([
        ("a", scalar(PrimitiveType::Int32)),
        ("b", scalar(PrimitiveType::Float64)),
    ])
    .unwrap();

    assert_eq!(a.fields(), ["a", "b"]);
    assert_eq!(a.name(), b.name());
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[test]
fn different_schemas_get_different_identities() {
    let a = ParamsType::new([("a", scalar(PrimitiveType::Int32))]).unwrap();
    let b = ParamsType::new([("a", scalar(PrimitiveType::Int64))]).unwrap();
    let c = ParamsType::new([("b", scalar(PrimitiveType::Int32))]).unwrap();
    assert_ne!(a.name(), b.name());
    assert_ne!(a.name(), c.name());
    assert_ne!(a, b);
}

#[test]
fn reserved_keywords_are_rejected_as_field_names() {
    let err = ParamsType::new([("class", scalar(PrimitiveType::Int32))]).unwrap_err();
    assert!(matches!(err, ParamsError::ReservedKeyword { name } if name == "class"));

    /* A trailing underscore is enough to avoid the collision. */
    assert!(ParamsType::new([("class_", scalar(PrimitiveType::Int32))]).is_ok());
}

#[test]
fn field_names_must_be_identifiers() {
    for bad in ["1st", "with space", "", "dash-ed"] {
        let err = ParamsType::new([(bad, scalar(PrimitiveType::Int32))]).unwrap_err();
        assert!(matches!(err, ParamsError::InvalidIdentifier { .. }), "{bad}");
    }
}

#[test]
fn empty_field_sets_are_rejected() {
    let err = ParamsType::new(Vec::<(String, params_gen::FieldTypeRef)>::new()).unwrap_err();
    assert!(matches!(err, ParamsError::EmptyFields));
}

#[test]
fn bundles_require_every_declared_field() {
    let params_type = ParamsType::new([
        ("x", scalar(PrimitiveType::Int32)),
        ("y", scalar(PrimitiveType::Int32)),
    ])
    .unwrap();

    let err = Params::new(params_type.clone(), [("x", FieldValue::Int(1))]).unwrap_err();
    assert!(matches!(err, ParamsError::MissingField { field } if field == "y"));

    let params = Params::new(
        params_type,
        [("x", FieldValue::Int(1)), ("y", FieldValue::Int(2))],
    )
    .unwrap();
    assert_eq!(params.get("x").unwrap(), &FieldValue::Int(1));
    assert_eq!(params.get("y").unwrap(), &FieldValue::Int(2));
}

#[test]
fn bundle_values_and_hash_are_stable() {
    let params_type = ParamsType::new([
        ("x", scalar(PrimitiveType::Int32)),
        ("y", scalar(PrimitiveType::Float64)),
    ])
    .unwrap();
    let params = Params::new(
        params_type,
        [("x", FieldValue::Int(4)), ("y", FieldValue::Float(2.5))],
    )
    .unwrap();

    let h1 = hash_of(&params);
    let h2 = hash_of(&params);
    assert_eq!(h1, h2);
    assert_eq!(params.get("x").unwrap(), &FieldValue::Int(4));
    assert_eq!(params.get("y").unwrap(), &FieldValue::Float(2.5));
}

#[test]
fn tensor_fields_compare_by_shape_and_contents() {
    let params_type =
        ParamsType::new([("w", Arc::new(TensorType::with_rank(PrimitiveType::Float64, 2)) as _)])
            .unwrap();

    let make = |shape: Vec<usize>| {
        Params::new(
            params_type.clone(),
            [(
                "w",
                FieldValue::Tensor(
                    TensorValue::new(PrimitiveType::Float64, shape, vec![1.0, 2.0, 3.0, 4.0])
                        .unwrap(),
                ),
            )],
        )
        .unwrap()
    };

    /* Separately constructed storage, same shape and values: equal. */
    assert_eq!(make(vec![2, 2]), make(vec![2, 2]));
    assert_eq!(hash_of(&make(vec![2, 2])), hash_of(&make(vec![2, 2])));

    /* Same flattened values, different shape: unequal. */
    assert_ne!(make(vec![2, 2]), make(vec![4, 1]));
}

#[test]
fn equal_bundles_hash_alike() {
    let params_type = ParamsType::new([("x", scalar(PrimitiveType::Int32))]).unwrap();
    let a = Params::new(params_type.clone(), [("x", FieldValue::Int(3))]).unwrap();
    let b = Params::new(params_type, [("x", FieldValue::Int(3))]).unwrap();
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[test]
fn enum_constant_collisions_fail_at_construction() {
    let letters = EnumType::list(["A", "B"]).unwrap();
    let shadows = EnumType::list(["A", "C"]).unwrap();

    let err = ParamsType::new([
        ("one", Arc::new(letters.clone()) as _),
        ("two", Arc::new(shadows) as _),
    ])
    .unwrap_err();
    assert!(matches!(err, ParamsError::DuplicateEnumConstant { name } if name == "A"));

    /* An alias that spells another enum's constant name is also rejected. */
    let aliased = EnumType::list_with_aliases(&[("D", Some("A"))]).unwrap();
    let err = ParamsType::new([
        ("one", Arc::new(letters) as _),
        ("two", Arc::new(aliased) as _),
    ])
    .unwrap_err();
    assert!(matches!(err, ParamsError::AliasShadowsConstant { alias } if alias == "A"));
}

#[test]
fn disjoint_enums_aggregate_and_resolve() {
    let letters = EnumType::new(
        PrimitiveType::Int32,
        vec![("A", FieldValue::Int(1)), ("B", FieldValue::Int(2))],
    )
    .unwrap();
    let digits = EnumType::list_with_aliases(&[("ZERO", Some("nothing")), ("ONE", None)]).unwrap();

    let params_type = ParamsType::new([
        ("letters", Arc::new(letters) as _),
        ("digits", Arc::new(digits) as _),
    ])
    .unwrap();

    assert_eq!(params_type.get_enum("B").unwrap(), FieldValue::Int(2));
    assert_eq!(params_type.get_enum("ZERO").unwrap(), FieldValue::Int(0));
    assert!(matches!(
        params_type.get_enum("missing").unwrap_err(),
        ParamsError::UnknownConstant { .. }
    ));

    /* Alias resolution, with fall-back to a constant of the same name. */
    assert_eq!(
        params_type.enum_from_alias("nothing").unwrap(),
        FieldValue::Int(0)
    );
    assert_eq!(params_type.enum_from_alias("A").unwrap(), FieldValue::Int(1));
    assert!(matches!(
        params_type.enum_from_alias("bogus").unwrap_err(),
        ParamsError::UnknownAlias { .. }
    ));
}

#[test]
fn harvest_prefers_later_objects_and_overrides() {
    let params_type = ParamsType::new([
        ("x", scalar(PrimitiveType::Int32)),
        ("y", scalar(PrimitiveType::Int32)),
    ])
    .unwrap();

    let obj1 = source(&[("x", FieldValue::Int(1)), ("y", FieldValue::Int(2))]);
    let obj2 = source(&[("x", FieldValue::Int(5))]);
    let overrides = source(&[("y", FieldValue::Int(9))]);

    let params = params_type
        .get_params(&[&obj1, &obj2], &overrides)
        .unwrap();
    assert_eq!(params.get("x").unwrap(), &FieldValue::Int(5));
    assert_eq!(params.get("y").unwrap(), &FieldValue::Int(9));
}

#[test]
fn harvest_fails_only_on_total_absence() {
    let params_type = ParamsType::new([
        ("x", scalar(PrimitiveType::Int32)),
        ("y", scalar(PrimitiveType::Int32)),
    ])
    .unwrap();

    let obj = source(&[("x", FieldValue::Int(1))]);
    let err = params_type.get_params(&[&obj], &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, ParamsError::MissingField { field } if field == "y"));
}

#[test]
fn harvest_reads_custom_sources() {
    struct PoolOp {
        stride: i64,
        ignore_border: bool,
    }

    impl ParamsSource for PoolOp {
        fn attr(&self, name: &str) -> Option<FieldValue> {
            match name {
                "stride" => Some(FieldValue::Int(self.stride)),
                "ignore_border" => Some(FieldValue::Bool(self.ignore_border)),
                _ => None,
            }
        }
    }

    let params_type = ParamsType::new([
        ("stride", scalar(PrimitiveType::Int32)),
        ("ignore_border", scalar(PrimitiveType::Bool)),
    ])
    .unwrap();

    let op = PoolOp {
        stride: 3,
        ignore_border: true,
    };
    let params = params_type.get_params(&[&op], &BTreeMap::new()).unwrap();
    assert_eq!(params.get("stride").unwrap(), &FieldValue::Int(3));
    assert_eq!(params.get("ignore_border").unwrap(), &FieldValue::Bool(true));
}

#[test]
fn harvest_applies_lenient_downcast() {
    let params_type = ParamsType::new([("x", scalar(PrimitiveType::Int32))]).unwrap();
    let obj = source(&[("x", FieldValue::Float(7.0))]);
    let params = params_type.get_params(&[&obj], &BTreeMap::new()).unwrap();
    assert_eq!(params.get("x").unwrap(), &FieldValue::Int(7));

    let bad = source(&[("x", FieldValue::Float(7.5))]);
    let err = params_type.get_params(&[&bad], &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, ParamsError::Filter { field, .. } if field == "x"));
}

#[test]
fn extension_leaves_the_original_untouched() {
    let base = ParamsType::new([
        ("a", scalar(PrimitiveType::Int32)),
        ("c", scalar(PrimitiveType::Int32)),
    ])
    .unwrap();

    let extended = base.extended([("b", scalar(PrimitiveType::Float64))]).unwrap();
    assert_eq!(base.fields(), ["a", "c"]);
    assert_eq!(extended.fields(), ["a", "b", "c"]);
    assert_ne!(base.name(), extended.name());

    /* Overriding an existing field replaces its type. */
    let overridden = base.extended([("a", scalar(PrimitiveType::Float64))]).unwrap();
    assert_eq!(overridden.fields(), ["a", "c"]);
    assert!(
        overridden
            .get_type("a")
            .unwrap()
            .type_eq(&ScalarType::new(PrimitiveType::Float64))
    );
}

#[test]
fn type_lookups_work_both_ways() {
    let int32 = ScalarType::new(PrimitiveType::Int32);
    let float64 = ScalarType::new(PrimitiveType::Float64);
    let params_type = ParamsType::new([
        ("alpha", scalar(PrimitiveType::Float64)),
        ("n", scalar(PrimitiveType::Int32)),
    ])
    .unwrap();

    assert!(params_type.has_type(&int32));
    assert!(!params_type.has_type(&ScalarType::new(PrimitiveType::Int64)));
    assert_eq!(params_type.get_field(&float64).unwrap(), "alpha");
    assert!(params_type.get_type("n").unwrap().type_eq(&int32));
    assert!(matches!(
        params_type.get_type("missing").unwrap_err(),
        ParamsError::UnknownField { .. }
    ));
    assert!(matches!(
        params_type
            .get_field(&ScalarType::new(PrimitiveType::Uint8))
            .unwrap_err(),
        ParamsError::NoFieldForType { .. }
    ));
}

#[test]
fn filter_validates_and_rebuilds_bundles() {
    let params_type = ParamsType::new([("x", scalar(PrimitiveType::Int32))]).unwrap();
    let params = Params::new(params_type.clone(), [("x", FieldValue::Int(3))]).unwrap();

    /* Strict mode validates and returns the bundle unchanged. */
    let same = params_type.filter(&params, true, false).unwrap();
    assert_eq!(same, params);

    /* Non-strict mode rebuilds with coerced values. */
    let loose = Params::new(
        ParamsType::new([("x", scalar(PrimitiveType::Float64))]).unwrap(),
        [("x", FieldValue::Float(3.0))],
    )
    .unwrap();
    let rebuilt = params_type.filter(&loose, false, true).unwrap();
    assert_eq!(rebuilt.get("x").unwrap(), &FieldValue::Int(3));
    assert_eq!(rebuilt.params_type(), &params_type);
}

#[test]
fn values_eq_delegates_per_field() {
    let params_type = ParamsType::new([
        ("x", scalar(PrimitiveType::Float64)),
        ("y", scalar(PrimitiveType::Int32)),
    ])
    .unwrap();
    let a = Params::new(
        params_type.clone(),
        [("x", FieldValue::Float(1.0)), ("y", FieldValue::Int(2))],
    )
    .unwrap();
    let b = Params::new(
        params_type.clone(),
        [
            ("x", FieldValue::Float(1.0 + 1e-9)),
            ("y", FieldValue::Int(2)),
        ],
    )
    .unwrap();

    assert!(!params_type.values_eq(&a, &b));
    assert!(params_type.values_eq_approx(&a, &b));
}

#[test]
fn cache_version_composes_schema_and_field_tokens() {
    let params_type = ParamsType::new([
        ("x", scalar(PrimitiveType::Int32)),
        ("e", Arc::new(EnumType::list(["A"]).unwrap()) as _),
    ])
    .unwrap();

    let CacheVersion::Composite(parts) = params_type.c_code_cache_version() else {
        panic!("expected a composite cache version");
    };
    assert_eq!(parts.len(), 2);
    assert!(matches!(&parts[0], CacheVersion::Version(v) if !v.is_empty()));
    let CacheVersion::Composite(field_tokens) = &parts[1] else {
        panic!("expected per-field tokens");
    };
    assert_eq!(field_tokens.len(), 2);
}

#[test]
fn bundles_cannot_be_graph_outputs() {
    let params_type = ParamsType::new([("x", scalar(PrimitiveType::Int32))]).unwrap();
    let err = params_type
        .c_sync("p", "{return 1;}")
        .unwrap_err();
    assert!(matches!(err, CodegenError::GraphOutputUnsupported { .. }));
}

#[test]
fn compile_metadata_concatenates_across_fields() {
    use params_gen::{FilterError, Signature};
    use std::any::Any;
    use std::fmt;

    /* Minimal field type satisfying the capability set, standing in for an
     * externally provided type that needs its own header and library. */
    #[derive(Debug, PartialEq)]
    struct BlasHandleType;

    impl fmt::Display for BlasHandleType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("BlasHandle")
        }
    }

    impl CFieldType for BlasHandleType {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn type_eq(&self, other: &dyn CFieldType) -> bool {
            other.as_any().downcast_ref::<BlasHandleType>().is_some()
        }
        fn filter(
            &self,
            value: &FieldValue,
            _strict: bool,
            _allow_downcast: bool,
        ) -> Result<FieldValue, FilterError> {
            Ok(value.clone())
        }
        fn values_eq(&self, a: &FieldValue, b: &FieldValue) -> bool {
            a == b
        }
        fn value_signature(&self, value: &FieldValue) -> Signature {
            let mut sig = Signature::new("blas-handle");
            sig.push_str(&value.to_string());
            sig
        }
        fn c_declare(&self, name: &str) -> String {
            format!("void* {name};\n")
        }
        fn c_init(&self, name: &str) -> String {
            format!("{name} = NULL;\n")
        }
        fn c_cleanup(&self, name: &str) -> String {
            format!("{name} = NULL;\n")
        }
        fn c_extract(&self, name: &str, fail: &str) -> String {
            format!("{name} = NULL;\nif (!{name}) {fail}\n")
        }
        fn c_headers(&self) -> Vec<String> {
            vec!["<cblas.h>".to_string()]
        }
        fn c_libraries(&self) -> Vec<String> {
            vec!["cblas".to_string()]
        }
        fn c_code_cache_version(&self) -> CacheVersion {
            CacheVersion::Version(vec![2])
        }
    }

    let params_type = ParamsType::new([
        ("handle", Arc::new(BlasHandleType) as _),
        ("n", scalar(PrimitiveType::Int32)),
    ])
    .unwrap();

    assert_eq!(params_type.c_headers(), ["<cblas.h>"]);
    assert_eq!(params_type.c_libraries(), ["cblas"]);
    assert!(params_type.c_compile_args().is_empty());
}

#[test]
fn nested_bundles_work_as_field_values() {
    let inner_type = ParamsType::new([("k", scalar(PrimitiveType::Int32))]).unwrap();
    let inner = Params::new(inner_type.clone(), [("k", FieldValue::Int(1))]).unwrap();

    let outer_type = ParamsType::new([("nested", Arc::new(inner_type) as _)]).unwrap();
    let outer = Params::new(outer_type, [("nested", FieldValue::from(inner.clone()))]).unwrap();

    assert_eq!(
        outer.get("nested").unwrap(),
        &FieldValue::Params(Box::new(inner))
    );
    assert_eq!(hash_of(&outer), hash_of(&outer.clone()));
}
