//! Candidate-identifier test and the attribute/tag eligibility rules that
//! decide which strings an XML rewriter is allowed to touch.

pub use resedit_format::axml::ANDROID_NS_URI;

pub const RES_AUTO_NS_URI: &str = "http://schemas.android.com/apk/res-auto";
pub const TOOLS_NS_URI: &str = "http://schemas.android.com/tools";

/// `type` on `<variable>`/`<import>` is only eligible inside a `<data>`
/// element; callers track that nesting themselves and consult this set once
/// they know they're inside one.
pub const DATA_BINDING_TAGS: &[&str] = &["variable", "import"];

/// True for attributes considered to carry a class/package reference, per
/// their namespace URI and local name. `tools:context` is additionally
/// gated by `process_tools_context` in the caller's config.
pub fn is_eligible_attribute(namespace: Option<&str>, name: &str, process_tools_context: bool) -> bool {
    match (namespace, name) {
        (Some(ANDROID_NS_URI), "name") => true,
        (Some(ANDROID_NS_URI), "fragment") => true,
        (Some(RES_AUTO_NS_URI), "layoutManager") => true,
        (Some(TOOLS_NS_URI), "context") => process_tools_context,
        (None, "class") => true,
        _ => false,
    }
}

/// A `Whitelist` is the set of own-package prefixes from config; a string is
/// rewritable iff it is a candidate identifier and matches a prefix under
/// the same `.`-boundary rule `PackageMap` uses.
pub struct Whitelist {
    prefixes: Vec<String>,
}

impl Whitelist {
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().collect(),
        }
    }

    pub fn is_rewritable(&self, s: &str) -> bool {
        is_candidate_identifier(s) && self.prefixes.iter().any(|p| matches_prefix_boundary(p, s))
    }
}

/// True iff `s` matches `prefix` exactly or continues past a `.` boundary.
pub fn matches_prefix_boundary(prefix: &str, s: &str) -> bool {
    if s == prefix {
        return true;
    }
    s.len() > prefix.len() && s.starts_with(prefix) && s.as_bytes()[prefix.len()] == b'.'
}

/// Rules 1-5 of spec's candidate-identifier test.
pub fn is_candidate_identifier(s: &str) -> bool {
    if s.starts_with('@') {
        return false;
    }
    if s.contains(['/', '-', ':', ' ', '=']) {
        return false;
    }

    let segments: Vec<&str> = s.split('.').collect();
    if segments.len() < 2 || segments.iter().any(|seg| seg.is_empty()) {
        return false;
    }

    for seg in &segments {
        if seg.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        if !is_valid_identifier_segment(seg) {
            return false;
        }
    }
    true
}

fn is_valid_identifier_segment(seg: &str) -> bool {
    let mut chars = seg.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// True for any substring `T(fqcn)` inside a data-binding expression whose
/// `fqcn` is itself rewritable; used by `DataBinding`'s text rewriting.
pub fn contains_data_binding_type_ref(text: &str) -> bool {
    text.contains("T(")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_class_names() {
        assert!(is_candidate_identifier("com.a.B"));
        assert!(is_candidate_identifier("com.a.B$Inner"));
    }

    #[test]
    fn rejects_version_numbers_and_resource_refs() {
        assert!(!is_candidate_identifier("1.2.3"));
        assert!(!is_candidate_identifier("@string/foo"));
        assert!(!is_candidate_identifier("Hello World"));
        assert!(!is_candidate_identifier("com.a/b"));
    }

    #[test]
    fn rejects_single_segment() {
        assert!(!is_candidate_identifier("Helper"));
    }

    #[test]
    fn prefix_boundary_requires_dot_or_exact_match() {
        assert!(matches_prefix_boundary("com.a", "com.a"));
        assert!(matches_prefix_boundary("com.a", "com.a.b.C"));
        assert!(!matches_prefix_boundary("com.a", "com.acme.C"));
    }

    #[test]
    fn whitelist_combines_candidate_test_and_prefix() {
        let wl = Whitelist::new(["com.app".to_string()]);
        assert!(wl.is_rewritable("com.app.MyView"));
        assert!(!wl.is_rewritable("com.other.MyView"));
        assert!(!wl.is_rewritable("1.2.3"));
    }
}
