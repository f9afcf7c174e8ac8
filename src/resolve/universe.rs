//! Go predeclared type identifiers.

use phf::phf_set;

/// Types available in every Go file without an import.
static UNIVERSE_TYPES: phf::Set<&'static str> = phf_set! {
    "bool",
    "string",
    "int", "int8", "int16", "int32", "int64",
    "uint", "uint8", "uint16", "uint32", "uint64", "uintptr",
    "byte", "rune",
    "float32", "float64",
    "complex64", "complex128",
    "error",
    "any",
    "comparable",
};

/// The static string for a predeclared type name.
pub fn lookup(name: &str) -> Option<&'static str> {
    UNIVERSE_TYPES.get_key(name).copied()
}

pub fn is_universe_type(name: &str) -> bool {
    UNIVERSE_TYPES.contains(name)
}

/// Predeclared types that can back an enum: every scalar except `error`,
/// `any` and `comparable`.
pub fn is_primitive(name: &str) -> bool {
    is_universe_type(name) && !matches!(name, "error" | "any" | "comparable")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_lookup() {
        assert_eq!(lookup("string"), Some("string"));
        assert_eq!(lookup("error"), Some("error"));
        assert_eq!(lookup("User"), None);
        assert!(is_primitive("uint16"));
        assert!(!is_primitive("error"));
        assert!(!is_primitive("Time"));
    }
}
