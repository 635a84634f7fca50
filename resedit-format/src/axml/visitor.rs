use super::AttributeValue;

/// Driven by [`super::BinaryXml::visit`]. Every method returning `Option<T>`
/// signals a replacement by returning `Some`; `None` leaves the event
/// untouched. Default impls are no-ops so a rewriter only overrides what it
/// cares about.
pub trait Visitor {
    fn start_namespace(&mut self, _prefix: Option<&str>, _uri: &str) {}

    fn end_namespace(&mut self, _prefix: Option<&str>, _uri: &str) {}

    fn start_element(&mut self, _namespace: Option<&str>, _name: &str) -> Option<String> {
        None
    }

    fn attribute(
        &mut self,
        _namespace: Option<&str>,
        _name: &str,
        _resource_id: Option<u32>,
        _value: &AttributeValue,
    ) -> Option<AttributeValue> {
        None
    }

    fn text(&mut self, _line: u32, _text: &str) -> Option<String> {
        None
    }

    fn end_element(&mut self, _namespace: Option<&str>, _name: &str) {}
}
