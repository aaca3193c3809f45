use thiserror::Error;

/// Result alias used across the params core.
pub type ParamsResult<T> = Result<T, ParamsError>;

/// Failures raised while building or querying a `ParamsType` or `Params`.
///
/// All of these are programmer-contract violations: they propagate
/// immediately to the caller and are never retried or recovered locally.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// A params type needs at least one field.
    #[error("cannot create a params type from an empty field set")]
    EmptyFields,

    /// An enum type needs at least one constant.
    #[error("cannot create an enum type without constants")]
    EmptyEnum,

    /// A field or constant name is not a valid C identifier.
    #[error("'{name}' is not a valid identifier")]
    InvalidIdentifier { name: String },

    /// A field or constant name collides with a reserved C/C++ keyword.
    #[error("'{name}' is a reserved C/C++ keyword and cannot be used as a name")]
    ReservedKeyword { name: String },

    /// Two contributing enum types define the same constant name.
    #[error("constant '{name}' is defined by more than one enum type")]
    DuplicateEnumConstant { name: String },

    /// Two contributing enum types define the same alias.
    #[error("alias '{alias}' is defined by more than one enum type")]
    DuplicateEnumAlias { alias: String },

    /// An alias has the same name as a constant.
    #[error("alias '{alias}' collides with a constant of the same name")]
    AliasShadowsConstant { alias: String },

    /// An enum constant was given a non-numeric value.
    #[error("enum constant '{name}' must be a numeric value")]
    NonNumericConstant { name: String },

    /// A declared field has no value available.
    #[error("no value supplied for declared field '{field}'")]
    MissingField { field: String },

    /// The requested field is not declared by the params type.
    #[error("field '{field}' does not exist")]
    UnknownField { field: String },

    /// No constant with the requested name exists in any wrapped enum type.
    #[error("unknown enum constant '{name}'")]
    UnknownConstant { name: String },

    /// Neither an alias nor a constant with the requested name exists.
    #[error("unknown enum alias '{alias}'")]
    UnknownAlias { alias: String },

    /// No field of the params type has the requested type.
    #[error("no field with type {type_string}")]
    NoFieldForType { type_string: String },

    /// A field value was rejected by its field type's filter.
    #[error("field '{field}': {source}")]
    Filter {
        field: String,
        #[source]
        source: FilterError,
    },
}

/// Failures raised by a field type while validating or coercing one value.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    /// The value has the wrong kind entirely (e.g. a tensor for a scalar).
    #[error("expected a {expected} value, got {got}")]
    TypeMismatch { expected: String, got: &'static str },

    /// The value would need a narrowing conversion that was not allowed.
    #[error("value {value} cannot be stored as {dtype} without downcasting")]
    DowncastForbidden { value: String, dtype: String },

    /// The value cannot be represented in the target type at all.
    #[error("value {value} is out of range for {dtype}")]
    OutOfRange { value: String, dtype: String },

    /// A tensor value has an incompatible shape.
    #[error("tensor shape {got} does not match expected {expected}")]
    ShapeMismatch { expected: String, got: String },

    /// Tensor storage does not match the product of its dimensions.
    #[error("tensor data length {len} does not match shape (expected {expected})")]
    DataLength { expected: usize, len: usize },

    /// The value is not one of the enum type's constants.
    #[error("value {value} is not a constant of {type_string}")]
    UnknownConstantValue { value: String, type_string: String },

    /// A nested params bundle was rejected.
    #[error("{message}")]
    Bundle { message: String },
}

/// Failures raised while emitting or writing generated C code.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Synchronizing a value of this type back from native code is not
    /// implemented; such values cannot be computation-graph outputs.
    #[error("variables of type {type_string} cannot be graph outputs")]
    GraphOutputUnsupported { type_string: String },

    /// Writing a generated artifact to disk failed.
    #[error("failed to write generated code to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
