use resedit_format::axml::{AttributeValue, Visitor};

use crate::filter::ANDROID_NS_URI;
use crate::rewriters::RewriteContext;

/// Rewrites `android:actionViewClass`, `android:actionProviderClass`, and
/// any bare `class`-shaped attribute. Tag names are left untouched.
pub struct MenuRewriter<'a> {
    ctx: &'a RewriteContext<'a>,
}

impl<'a> MenuRewriter<'a> {
    pub fn new(ctx: &'a RewriteContext<'a>) -> Self {
        Self { ctx }
    }
}

fn is_menu_class_attribute(namespace: Option<&str>, name: &str) -> bool {
    matches!(
        (namespace, name),
        (Some(ANDROID_NS_URI), "actionViewClass")
            | (Some(ANDROID_NS_URI), "actionProviderClass")
            | (_, "class")
    )
}

impl<'a> Visitor for MenuRewriter<'a> {
    fn attribute(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        _resource_id: Option<u32>,
        value: &AttributeValue,
    ) -> Option<AttributeValue> {
        if !is_menu_class_attribute(namespace, name) {
            return None;
        }
        match value {
            AttributeValue::String(s) => self.ctx.resolve(s).map(AttributeValue::String),
            _ => None,
        }
    }
}
