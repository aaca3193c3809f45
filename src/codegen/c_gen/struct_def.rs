use super::helpers::indent_block;
use crate::params::ctype::CFieldType;
use crate::params::schema::ParamsType;
use std::fmt::Write;

/// Code run by a per-field extraction fragment on failure: flag the error
/// on the struct and bail out of the extraction method.
pub const EXTRACT_FAIL_HOOK: &str = "{this->set_error_occurred(); return;}";

/// Emit the self-contained C++ struct definition for one params type.
///
/// The struct carries an error counter, one member per field, a
/// zero-initializing constructor, a destructor funnelling into `cleanup()`,
/// one extraction method per field and a positional dispatch over them.
/// Everything is derived from the params type's sorted fields and type
/// strings, so two params types with the same struct name produce
/// byte-identical definitions and compiled code can be cached by that name.
pub fn emit_params_struct(params: &ParamsType) -> String {
    let name = params.name();
    let guard = name.to_uppercase();
    let mut output = String::new();

    write!(output, "/** Params struct {name} **/\n").unwrap();
    write!(output, "#ifndef {guard}\n#define {guard}\n").unwrap();
    write!(output, "struct {name} {{\n").unwrap();

    /* Members. */
    write!(output, "    /* Fields. */\n").unwrap();
    write!(output, "    int {name}_error;\n").unwrap();
    for (field, field_type) in params.fields().iter().zip(params.types()) {
        output.push_str(&indent_block(&field_type.c_declare(field), 4));
        output.push('\n');
    }

    /* Constructor. */
    write!(output, "\n    /* Constructor. */\n").unwrap();
    write!(output, "    {name}() {{\n").unwrap();
    write!(output, "        {name}_error = 0;\n").unwrap();
    for (field, field_type) in params.fields().iter().zip(params.types()) {
        let init = field_type.c_init(field);
        if !init.is_empty() {
            output.push_str(&indent_block(&init, 8));
            output.push('\n');
        }
    }
    write!(output, "    }}\n").unwrap();

    /* Destructor. */
    write!(output, "\n    /* Destructor. */\n").unwrap();
    write!(output, "    ~{name}() {{\n        cleanup();\n    }}\n").unwrap();

    /* Cleanup. */
    write!(output, "\n    /* Cleanup. */\n").unwrap();
    write!(output, "    void cleanup() {{\n").unwrap();
    for (field, field_type) in params.fields().iter().zip(params.types()) {
        let cleanup = field_type.c_cleanup(field);
        if !cleanup.is_empty() {
            output.push_str(&indent_block(&cleanup, 8));
            output.push('\n');
        }
    }
    write!(output, "    }}\n").unwrap();

    /* Per-field extraction methods. */
    write!(output, "\n    /* Per-field extraction. */\n").unwrap();
    for (field, field_type) in params.fields().iter().zip(params.types()) {
        write!(
            output,
            "    void extract_{field}(host_object_t* py_{field}) {{\n"
        )
        .unwrap();
        output.push_str(&indent_block(
            &field_type.c_extract(field, EXTRACT_FAIL_HOOK),
            8,
        ));
        output.push('\n');
        write!(output, "    }}\n").unwrap();
    }

    /* Positional dispatch. */
    write!(output, "\n    /* Positional dispatch. */\n").unwrap();
    write!(
        output,
        "    void extract(host_object_t* object, int field_pos) {{\n"
    )
    .unwrap();
    write!(output, "        switch (field_pos) {{\n").unwrap();
    for (position, field) in params.fields().iter().enumerate() {
        write!(
            output,
            "        case {position}: extract_{field}(object); break;\n"
        )
        .unwrap();
    }
    write!(output, "        default:\n").unwrap();
    write!(
        output,
        "            host_error_format(\"params: no extraction defined for field position %d.\", field_pos);\n"
    )
    .unwrap();
    write!(output, "            this->set_error_occurred();\n").unwrap();
    write!(output, "            break;\n").unwrap();
    write!(output, "        }}\n    }}\n").unwrap();

    /* Error flag. */
    write!(
        output,
        "\n    void set_error_occurred() {{\n        ++{name}_error;\n    }}\n"
    )
    .unwrap();
    write!(
        output,
        "\n    int error_occurred() {{\n        return {name}_error;\n    }}\n"
    )
    .unwrap();

    write!(output, "}};\n#endif\n").unwrap();
    write!(output, "/** End params struct {name} **/\n").unwrap();

    output
}
