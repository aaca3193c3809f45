pub mod codegen;
pub mod inspect;
