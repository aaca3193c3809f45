use crate::params::schema::ParamsType;
use std::fmt::Write;

/* Declarations of the host runtime object model that both the generated
 * struct and the extraction glue compile against. The host provides the
 * definitions; generated code only ever holds opaque pointers. */
pub const HOST_RUNTIME_PRELUDE: &str = "\
/* Host runtime object model */
#ifndef PARAMS_HOST_RUNTIME_API
#define PARAMS_HOST_RUNTIME_API
typedef struct host_object host_object_t;
extern host_object_t* host_object_get_item(host_object_t* object, const char* key);
extern void host_error_format(const char* fmt, ...);
extern int host_error_occurred(void);
#endif
";

/// Extraction glue for a bundle-typed native variable `name`.
///
/// Allocates a fresh struct, then walks the declared fields in sorted
/// order: each is looked up by name in the external string-keyed object and
/// handed to the struct's positional dispatch. Field lookup failure and
/// per-field extraction failure both route through `fail`, and the struct's
/// own error counter is checked after every dispatch because extraction
/// errors cannot unwind across the native boundary. Cleanup of the
/// allocated struct is the caller's cleanup fragment's job and runs on
/// every exit path, including the failure ones.
pub fn emit_struct_extract(params: &ParamsType, name: &str, fail: &str) -> String {
    let struct_name = params.name();
    let field_count = params.len();
    let fields_list = params
        .fields()
        .iter()
        .map(|f| format!("\"{f}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut output = String::new();
    write!(output, "{name} = new {struct_name}();\n\n").unwrap();
    write!(output, "{{\n").unwrap();
    write!(output, "const char* fields[] = {{{fields_list}}};\n").unwrap();
    write!(output, "if (py_{name} == NULL) {{\n").unwrap();
    write!(
        output,
        "    host_error_format(\"params: expected an object, got none.\");\n"
    )
    .unwrap();
    write!(output, "    {fail}\n").unwrap();
    write!(output, "}}\n").unwrap();
    write!(output, "for (int i = 0; i < {field_count}; ++i) {{\n").unwrap();
    write!(
        output,
        "    host_object_t* item = host_object_get_item(py_{name}, fields[i]);\n"
    )
    .unwrap();
    write!(output, "    if (item == NULL) {{\n").unwrap();
    write!(
        output,
        "        host_error_format(\"params: missing expected attribute \\\"%s\\\" in object.\", fields[i]);\n"
    )
    .unwrap();
    write!(output, "        {fail}\n").unwrap();
    write!(output, "    }}\n").unwrap();
    write!(output, "    {name}->extract(item, i);\n").unwrap();
    write!(output, "    if ({name}->error_occurred()) {{\n").unwrap();
    write!(
        output,
        "        host_error_format(\"params: error when extracting value for attribute \\\"%s\\\".\", fields[i]);\n"
    )
    .unwrap();
    write!(output, "        {fail}\n").unwrap();
    write!(output, "    }}\n").unwrap();
    write!(output, "}}\n").unwrap();
    write!(output, "}}\n").unwrap();
    output
}
