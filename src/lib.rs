/* Typed Operator-Parameter Bundles
 *
 * This library bundles the auxiliary, non-tensor configuration values of a
 * graph operator (flags, small scalars, enumerated constants) into one typed
 * object that is readable from both the interpreted execution path and the
 * natively-compiled one. A `ParamsType` describes a fixed set of named,
 * typed fields; a `Params` holds one immutable instance of those fields;
 * and the code generator synthesizes, per distinct `ParamsType`, the C++
 * struct through which compiled operator implementations read the same
 * values.
 */

pub mod codegen;
pub mod defs;
pub mod params;

pub use params::bundle::Params;
pub use params::ctype::{CFieldType, CacheVersion, FieldTypeRef, Signature};
pub use params::enums::{CEnumType, EnumType};
pub use params::error::{CodegenError, FilterError, ParamsError};
pub use params::scalar::{PrimitiveType, ScalarType};
pub use params::schema::{ParamsSource, ParamsType};
pub use params::tensor::TensorType;
pub use params::value::{FieldValue, TensorValue};
