pub mod bundle;
pub mod ctype;
pub mod enums;
pub mod error;
pub mod scalar;
pub mod schema;
pub mod tensor;
pub mod value;

pub use bundle::Params;
pub use ctype::{CFieldType, CacheVersion, FieldTypeRef, Signature};
pub use enums::{CEnumType, EnumType};
pub use error::{CodegenError, FilterError, ParamsError, ParamsResult};
pub use scalar::{PrimitiveType, ScalarType};
pub use schema::{ParamsSource, ParamsType};
pub use tensor::TensorType;
pub use value::{FieldValue, TensorValue};
