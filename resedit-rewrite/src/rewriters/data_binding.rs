use resedit_format::axml::{AttributeValue, Visitor};

use crate::filter::is_eligible_attribute;
use crate::rewriters::RewriteContext;

/// Layout rewriting plus the `type` attribute on `<variable>`/`<import>`
/// (scoped to inside `<data>`) and `T(fqcn)` substrings in data-binding
/// expressions.
pub struct DataBindingRewriter<'a> {
    ctx: &'a RewriteContext<'a>,
    tag_stack: Vec<String>,
    data_depth: Option<usize>,
}

impl<'a> DataBindingRewriter<'a> {
    pub fn new(ctx: &'a RewriteContext<'a>) -> Self {
        Self {
            ctx,
            tag_stack: Vec::new(),
            data_depth: None,
        }
    }

    fn in_data(&self) -> bool {
        self.data_depth.is_some()
    }

    fn rewrite_type_refs(&self, text: &str) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut changed = false;
        let mut rest = text;

        while let Some(start) = rest.find("T(") {
            let (before, after_marker) = rest.split_at(start);
            out.push_str(before);
            let after_marker = &after_marker[2..];
            match after_marker.find(')') {
                Some(end) => {
                    let fqcn = &after_marker[..end];
                    match self.ctx.resolve(fqcn) {
                        Some(replacement) => {
                            out.push_str("T(");
                            out.push_str(&replacement);
                            out.push(')');
                            changed = true;
                        }
                        None => {
                            out.push_str("T(");
                            out.push_str(fqcn);
                            out.push(')');
                        }
                    }
                    rest = &after_marker[end + 1..];
                }
                None => {
                    out.push_str("T(");
                    rest = after_marker;
                }
            }
        }
        out.push_str(rest);
        changed.then_some(out)
    }
}

impl<'a> Visitor for DataBindingRewriter<'a> {
    fn start_element(&mut self, _namespace: Option<&str>, name: &str) -> Option<String> {
        self.tag_stack.push(name.to_string());
        if name == "data" && self.data_depth.is_none() {
            self.data_depth = Some(self.tag_stack.len());
        }
        self.ctx.resolve(name)
    }

    fn attribute(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        _resource_id: Option<u32>,
        value: &AttributeValue,
    ) -> Option<AttributeValue> {
        let current_tag = self.tag_stack.last().map(String::as_str).unwrap_or("");
        let is_data_binding_type = self.in_data() && namespace.is_none() && name == "type" && (current_tag == "variable" || current_tag == "import");

        if !is_data_binding_type && !is_eligible_attribute(namespace, name, self.ctx.process_tools_context) {
            return None;
        }
        match value {
            AttributeValue::String(s) => self.ctx.resolve(s).map(AttributeValue::String),
            _ => None,
        }
    }

    fn text(&mut self, _line: u32, text: &str) -> Option<String> {
        self.rewrite_type_refs(text)
    }

    fn end_element(&mut self, _namespace: Option<&str>, _name: &str) {
        if self.data_depth == Some(self.tag_stack.len()) {
            self.data_depth = None;
        }
        self.tag_stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use resedit_format::axml::{BinaryXml, Event};
    use resedit_format::string_pool::Encoding;

    use super::*;
    use crate::filter::Whitelist;
    use crate::mapping::{ClassMap, PackageMap};

    fn ctx_with(class_map: &ClassMap, whitelist: &Whitelist, package_map: &PackageMap) -> RewriteContext<'_> {
        RewriteContext {
            whitelist,
            class_map,
            package_map,
            process_tools_context: true,
        }
    }

    #[test]
    fn rewrites_type_ref_expression_substring() {
        let whitelist = Whitelist::new(["com.app".to_string()]);
        let mut class_map = ClassMap::new();
        class_map.insert("com.app.Helper", "z.q.Helper").unwrap();
        let package_map = PackageMap::new();
        let ctx = ctx_with(&class_map, &whitelist, &package_map);

        let mut doc = BinaryXml::new(
            vec![Event::CData {
                line: 1,
                text: "@{T(com.app.Helper).isValid(x)}".into(),
            }],
            vec![],
            Encoding::ModifiedUtf8,
        );

        let count = doc.visit(&mut DataBindingRewriter::new(&ctx));
        assert_eq!(count, 1);
        match &doc.events[0] {
            Event::CData { text, .. } => assert_eq!(text, "@{T(z.q.Helper).isValid(x)}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn leaves_unmatched_expression_untouched() {
        let whitelist = Whitelist::new(["com.app".to_string()]);
        let class_map = ClassMap::new();
        let package_map = PackageMap::new();
        let ctx = ctx_with(&class_map, &whitelist, &package_map);

        let mut doc = BinaryXml::new(
            vec![Event::CData {
                line: 1,
                text: "@{user.name}".into(),
            }],
            vec![],
            Encoding::ModifiedUtf8,
        );
        let count = doc.visit(&mut DataBindingRewriter::new(&ctx));
        assert_eq!(count, 0);
    }
}
