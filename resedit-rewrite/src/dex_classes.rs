//! Converts bytecode-file class descriptors (`Lcom/app/Foo;`) to the FQCN
//! form the rest of this crate works with. Actual `.dex` parsing is an
//! external collaborator; this module only does the string transform.

/// Converts `Lcom/app/Foo;` to `com.app.Foo`. Descriptors that don't look
/// like a reference type (no leading `L`/trailing `;`) are returned as-is,
/// since a `--dex-path` file may also list plain FQCNs directly.
pub fn descriptor_to_fqcn(descriptor: &str) -> String {
    let inner = match descriptor.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
        Some(inner) => inner,
        None => return descriptor.to_string(),
    };
    inner.replace('/', ".")
}

/// Parses a newline-separated list of descriptors (the `--dex-path` file
/// format) into a set of FQCNs, skipping blank lines.
pub fn parse_class_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(descriptor_to_fqcn)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_descriptor_wrapper_and_translates_slashes() {
        assert_eq!(descriptor_to_fqcn("Lcom/app/Foo;"), "com.app.Foo");
        assert_eq!(descriptor_to_fqcn("Lcom/app/Foo$Inner;"), "com.app.Foo$Inner");
    }

    #[test]
    fn passes_through_plain_fqcn() {
        assert_eq!(descriptor_to_fqcn("com.app.Foo"), "com.app.Foo");
    }

    #[test]
    fn parses_multiline_list_and_skips_blanks() {
        let list = parse_class_list("Lcom/app/Foo;\n\nLcom/app/Bar;\n");
        assert_eq!(list, vec!["com.app.Foo".to_string(), "com.app.Bar".to_string()]);
    }
}
