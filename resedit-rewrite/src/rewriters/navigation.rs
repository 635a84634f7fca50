use resedit_format::axml::{AttributeValue, Visitor};

use crate::filter::ANDROID_NS_URI;
use crate::rewriters::RewriteContext;

const TAG_SCOPED: &[&str] = &["fragment", "activity", "dialog"];

/// Rewrites `android:name` on `<fragment>`, `<activity>`, `<dialog>`.
pub struct NavigationRewriter<'a> {
    ctx: &'a RewriteContext<'a>,
    tag_stack: Vec<String>,
}

impl<'a> NavigationRewriter<'a> {
    pub fn new(ctx: &'a RewriteContext<'a>) -> Self {
        Self {
            ctx,
            tag_stack: Vec::new(),
        }
    }
}

impl<'a> Visitor for NavigationRewriter<'a> {
    fn start_element(&mut self, _namespace: Option<&str>, name: &str) -> Option<String> {
        self.tag_stack.push(name.to_string());
        None
    }

    fn attribute(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        _resource_id: Option<u32>,
        value: &AttributeValue,
    ) -> Option<AttributeValue> {
        let in_scoped_tag = self.tag_stack.last().map(|t| TAG_SCOPED.contains(&t.as_str())).unwrap_or(false);
        if !in_scoped_tag || namespace != Some(ANDROID_NS_URI) || name != "name" {
            return None;
        }
        match value {
            AttributeValue::String(s) => self.ctx.resolve(s).map(AttributeValue::String),
            _ => None,
        }
    }

    fn end_element(&mut self, _namespace: Option<&str>, _name: &str) {
        self.tag_stack.pop();
    }
}
