use sha2::{Digest, Sha256};

/* Reserved words of C and C++, including historical and preprocessor-related
 * tokens, plus `NULL` and `_Pragma`. A field or constant name matching any
 * of these is rejected outright rather than escaped: the name appears
 * verbatim as a struct member, an extraction method suffix and a string
 * key, and must be the same spelling in all three places. */
pub const C_CPP_KEYWORDS: &[&str] = &[
    "_Alignas",
    "_Alignof",
    "_Atomic",
    "_Bool",
    "_Complex",
    "_Generic",
    "_Imaginary",
    "_Noreturn",
    "_Pragma",
    "_Static_assert",
    "_Thread_local",
    "alignas",
    "alignof",
    "and",
    "and_eq",
    "asm",
    "auto",
    "bitand",
    "bitor",
    "bool",
    "break",
    "case",
    "catch",
    "char",
    "char16_t",
    "char32_t",
    "class",
    "compl",
    "const",
    "const_cast",
    "constexpr",
    "continue",
    "decltype",
    "default",
    "delete",
    "do",
    "double",
    "dynamic_cast",
    "else",
    "enum",
    "explicit",
    "export",
    "extern",
    "false",
    "float",
    "for",
    "friend",
    "goto",
    "if",
    "inline",
    "int",
    "long",
    "mutable",
    "namespace",
    "new",
    "noexcept",
    "not",
    "not_eq",
    "NULL",
    "nullptr",
    "operator",
    "or",
    "or_eq",
    "private",
    "protected",
    "public",
    "register",
    "reinterpret_cast",
    "restrict",
    "return",
    "short",
    "signed",
    "sizeof",
    "static",
    "static_assert",
    "static_cast",
    "struct",
    "switch",
    "template",
    "this",
    "thread_local",
    "throw",
    "true",
    "try",
    "typedef",
    "typeid",
    "typename",
    "union",
    "unsigned",
    "using",
    "virtual",
    "void",
    "volatile",
    "wchar_t",
    "while",
    "xor",
    "xor_eq",
];

pub fn is_c_keyword(name: &str) -> bool {
    C_CPP_KEYWORDS.contains(&name)
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Prefix every non-empty line of `code` with `indent` spaces.
pub fn indent_block(code: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    code.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_syntax() {
        assert!(is_valid_identifier("attr1"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("class_"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1st"));
        assert!(!is_valid_identifier("with space"));
        assert!(!is_valid_identifier("dash-ed"));
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert!(is_c_keyword("class"));
        assert!(is_c_keyword("NULL"));
        assert!(is_c_keyword("_Pragma"));
        assert!(!is_c_keyword("Class"));
        assert!(!is_c_keyword("null"));
    }

    #[test]
    fn sha256_is_stable() {
        assert_eq!(sha256_hex("a,b"), sha256_hex("a,b"));
        assert_ne!(sha256_hex("a,b"), sha256_hex("b,a"));
        assert_eq!(sha256_hex("").len(), 64);
    }
}
