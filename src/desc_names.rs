/// Converts a JVM-style type descriptor into a human readable type name.
///
/// `"I"` becomes `"int"`, `"Ljava/lang/String;"` becomes
/// `"java.lang.String"` and `"[[D"` becomes `"double[][]"`. Unrecognized
/// descriptors map to `"unknown"`; empty or whitespace-only input maps to
/// the empty string.
pub fn pretty_desc(desc: &str) -> String {
    let desc = desc.trim();
    if desc.is_empty() {
        return String::new();
    }

    if let Some(element) = desc.strip_prefix('[') {
        let mut output = pretty_desc(element);
        output.push_str("[]");
        return output;
    }

    if desc.starts_with('L') {
        return match desc.strip_suffix(';') {
            Some(name) => name[1..].replace('/', "."),
            None => "unknown".to_string(),
        };
    }

    match desc.as_bytes()[0] {
        b'V' => "void",
        b'Z' => "boolean",
        b'B' => "byte",
        b'S' => "short",
        b'C' => "char",
        b'I' => "int",
        b'J' => "long",
        b'F' => "float",
        b'D' => "double",
        _ => "unknown",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives() {
        assert_eq!(pretty_desc("V"), "void");
        assert_eq!(pretty_desc("Z"), "boolean");
        assert_eq!(pretty_desc("J"), "long");
    }

    #[test]
    fn test_class_descriptor() {
        assert_eq!(pretty_desc("Ljava/lang/String;"), "java.lang.String");
    }

    #[test]
    fn test_array_descriptor() {
        assert_eq!(pretty_desc("[[Ljava/lang/String;"), "java.lang.String[][]");
        assert_eq!(pretty_desc("[I"), "int[]");
    }

    #[test]
    fn test_class_round_trip() {
        for name in ["java.lang.Object", "a.b.C", "Outer$Inner"] {
            let desc = format!("L{};", name.replace('.', "/"));
            assert_eq!(pretty_desc(&desc), name);
        }
    }

    #[test]
    fn test_array_round_trip() {
        for desc in ["I", "Lfoo/Bar;", "[Z"] {
            let nested = format!("[{}", desc);
            assert_eq!(pretty_desc(&nested), format!("{}[]", pretty_desc(desc)));
        }
    }

    #[test]
    fn test_degenerate_input() {
        assert_eq!(pretty_desc(""), "");
        assert_eq!(pretty_desc("   "), "");
        assert_eq!(pretty_desc("Q"), "unknown");
        assert_eq!(pretty_desc("Lno/semicolon"), "unknown");
    }
}
