use resedit_format::axml::{AttributeValue, Visitor};

use crate::filter::is_eligible_attribute;
use crate::rewriters::RewriteContext;

/// Shared visitor for Drawable/XmlConfig/Generic shapes: rewrites the
/// eligible attribute set's string values only, never tag names.
pub struct GenericRewriter<'a> {
    ctx: &'a RewriteContext<'a>,
}

impl<'a> GenericRewriter<'a> {
    pub fn new(ctx: &'a RewriteContext<'a>) -> Self {
        Self { ctx }
    }
}

impl<'a> Visitor for GenericRewriter<'a> {
    fn attribute(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        _resource_id: Option<u32>,
        value: &AttributeValue,
    ) -> Option<AttributeValue> {
        if !is_eligible_attribute(namespace, name, self.ctx.process_tools_context) {
            return None;
        }
        match value {
            AttributeValue::String(s) => self.ctx.resolve(s).map(AttributeValue::String),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use resedit_format::axml::{ANDROID_NS_URI, Attribute, BinaryXml, Event};
    use resedit_format::string_pool::Encoding;

    use super::*;
    use crate::filter::Whitelist;
    use crate::mapping::{ClassMap, PackageMap};

    #[test]
    fn leaves_tag_name_untouched_rewrites_eligible_attribute() {
        let whitelist = Whitelist::new(["com.app".to_string()]);
        let mut class_map = ClassMap::new();
        class_map.insert("com.app.MyView", "z.q.MyView").unwrap();
        let package_map = PackageMap::new();
        let ctx = RewriteContext {
            whitelist: &whitelist,
            class_map: &class_map,
            package_map: &package_map,
            process_tools_context: true,
        };

        let mut doc = BinaryXml::new(
            vec![Event::StartElement {
                line: 1,
                namespace: None,
                name: "com.app.MyView".into(),
                attributes: vec![Attribute {
                    namespace: Some(ANDROID_NS_URI.into()),
                    name: "name".into(),
                    resource_id: None,
                    value: AttributeValue::String("com.app.MyView".into()),
                }],
                id_index: None,
                class_index: None,
                style_index: None,
            }],
            vec![],
            Encoding::ModifiedUtf8,
        );

        let count = doc.visit(&mut GenericRewriter::new(&ctx));
        assert_eq!(count, 1);
        match &doc.events[0] {
            Event::StartElement { name, attributes, .. } => {
                assert_eq!(name, "com.app.MyView");
                assert_eq!(attributes[0].value, AttributeValue::String("z.q.MyView".into()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
