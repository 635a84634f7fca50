use resedit_format::axml::{AttributeValue, Visitor};

use crate::filter::is_eligible_attribute;
use crate::rewriters::RewriteContext;

/// Rewrites a custom-view tag name if it is itself a rewritable candidate,
/// and the eligible attribute set's string values.
pub struct LayoutRewriter<'a> {
    ctx: &'a RewriteContext<'a>,
}

impl<'a> LayoutRewriter<'a> {
    pub fn new(ctx: &'a RewriteContext<'a>) -> Self {
        Self { ctx }
    }
}

impl<'a> Visitor for LayoutRewriter<'a> {
    fn start_element(&mut self, _namespace: Option<&str>, name: &str) -> Option<String> {
        self.ctx.resolve(name)
    }

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
