pub mod helpers;
pub mod lifecycle;
pub mod struct_def;

// Re-export main public functions
pub use lifecycle::{HOST_RUNTIME_PRELUDE, emit_struct_extract};
pub use struct_def::{EXTRACT_FAIL_HOOK, emit_params_struct};
