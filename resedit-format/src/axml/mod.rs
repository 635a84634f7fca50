//! Binary-XML codec: parse/visit/re-emit of the compiled XML format used
//! for manifests and resource XML, sharing the string-pool sub-codec with
//! the resource-table codec.

mod reader;
mod visitor;
mod writer;

pub use visitor::Visitor;

use crate::string_pool::Encoding;

pub const ANDROID_NS_URI: &str = "http://schemas.android.com/apk/res/android";

#[derive(Clone, Debug, PartialEq)]
pub struct Namespace {
    pub prefix: Option<String>,
    pub uri: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub resource_id: Option<u32>,
    pub value: AttributeValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    String(String),
    Boolean(bool),
    Integer(i32),
    Hex(u32),
    Reference(u32),
    Float(f32),
    /// A `Res_value` whose `dataType` this codec does not model explicitly
    /// (dimensions, fractions, attribute references, packed colors, ...).
    /// Carried verbatim so re-emission round-trips it unchanged.
    Raw { data_type: u8, data: u32 },
}

#[derive(Clone, Debug)]
pub enum Event {
    StartNamespace { line: u32, namespace: Namespace },
    EndNamespace { line: u32, namespace: Namespace },
    StartElement {
        line: u32,
        namespace: Option<String>,
        name: String,
        attributes: Vec<Attribute>,
        /// 1-based position (in the attribute list above) of the attribute
        /// serving as the element's id/class/style fast-path pointer, or
        /// `None` if the element has none. Re-resolved on emit since
        /// attribute order can change.
        id_index: Option<u32>,
        class_index: Option<u32>,
        style_index: Option<u32>,
    },
    EndElement {
        line: u32,
        namespace: Option<String>,
        name: String,
    },
    CData { line: u32, text: String },
}

/// A parsed binary-XML document: an event stream plus the set of attribute
/// names that carry well-known Android resource ids (the resource-id map).
#[derive(Clone)]
pub struct BinaryXml {
    pub events: Vec<Event>,
    known_resource_ids: Vec<(String, u32)>,
    source_encoding: Encoding,
}

impl BinaryXml {
    /// Builds a document directly from an event stream, for callers that
    /// construct or synthesize XML rather than parsing it (rewriter tests,
    /// generated fixtures).
    pub fn new(events: Vec<Event>, known_resource_ids: Vec<(String, u32)>, source_encoding: Encoding) -> Self {
        Self {
            events,
            known_resource_ids,
            source_encoding,
        }
    }

    pub fn parse(bytes: &[u8]) -> crate::error::Result<Self> {
        reader::parse(bytes)
    }

    /// The `(attribute name, resource id)` pairs from the parsed resource-id
    /// map, in string-pool-prefix order.
    pub fn known_resource_ids(&self) -> &[(String, u32)] {
        &self.known_resource_ids
    }

    /// Applies `visitor` to every event in document order, mutating tag
    /// names, attribute values and text in place. Returns the number of
    /// replacements applied. Start/end element names are kept balanced
    /// automatically: renaming a start tag renames its matching end tag.
    pub fn visit(&mut self, visitor: &mut dyn Visitor) -> usize {
        let mut count = 0;
        let mut name_stack: Vec<String> = Vec::new();

        for event in &mut self.events {
            match event {
                Event::StartNamespace { namespace, .. } => {
                    visitor.start_namespace(namespace.prefix.as_deref(), &namespace.uri);
                }
                Event::EndNamespace { namespace, .. } => {
                    visitor.end_namespace(namespace.prefix.as_deref(), &namespace.uri);
                }
                Event::StartElement {
                    namespace,
                    name,
                    attributes,
                    ..
                } => {
                    if let Some(new_name) = visitor.start_element(namespace.as_deref(), name) {
                        *name = new_name;
                        count += 1;
                    }
                    name_stack.push(name.clone());
                    for attr in attributes.iter_mut() {
                        if let Some(new_value) = visitor.attribute(
                            attr.namespace.as_deref(),
                            &attr.name,
                            attr.resource_id,
                            &attr.value,
                        ) {
                            attr.value = new_value;
                            count += 1;
                        }
                    }
                }
                Event::EndElement { namespace, name, .. } => {
                    visitor.end_element(namespace.as_deref(), name);
                    if let Some(matching) = name_stack.pop() {
                        *name = matching;
                    }
                }
                Event::CData { line, text } => {
                    if let Some(new_text) = visitor.text(*line, text) {
                        *text = new_text;
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Re-emits the document. Pure function of current event/resource-id-map
    /// state; safe to call repeatedly ("prepare once, emit many").
    pub fn emit(&self) -> crate::error::Result<Vec<u8>> {
        writer::emit(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> BinaryXml {
        BinaryXml {
            events: vec![
                Event::StartNamespace {
                    line: 1,
                    namespace: Namespace {
                        prefix: Some("android".into()),
                        uri: ANDROID_NS_URI.into(),
                    },
                },
                Event::StartElement {
                    line: 2,
                    namespace: None,
                    name: "com.app.MyView".into(),
                    attributes: vec![
                        Attribute {
                            namespace: Some(ANDROID_NS_URI.into()),
                            name: "android:name".into(),
                            resource_id: Some(0x0101_0003),
                            value: AttributeValue::String("com.app.MyView".into()),
                        },
                        Attribute {
                            namespace: None,
                            name: "class".into(),
                            resource_id: None,
                            value: AttributeValue::String("com.app.MyView".into()),
                        },
                    ],
                    id_index: None,
                    class_index: None,
                    style_index: None,
                },
                Event::CData {
                    line: 3,
                    text: "@{T(com.app.Helper).X}".into(),
                },
                Event::EndElement {
                    line: 4,
                    namespace: None,
                    name: "com.app.MyView".into(),
                },
                Event::EndNamespace {
                    line: 5,
                    namespace: Namespace {
                        prefix: Some("android".into()),
                        uri: ANDROID_NS_URI.into(),
                    },
                },
            ],
            known_resource_ids: vec![("android:name".into(), 0x0101_0003)],
            source_encoding: Encoding::ModifiedUtf8,
        }
    }

    #[test]
    fn emit_then_parse_round_trips_model() {
        let doc = sample_doc();
        let bytes = doc.emit().unwrap();
        let reparsed = BinaryXml::parse(&bytes).unwrap();
        assert_eq!(reparsed.events.len(), doc.events.len());

        match &reparsed.events[1] {
            Event::StartElement { name, attributes, .. } => {
                assert_eq!(name, "com.app.MyView");
                assert_eq!(attributes.len(), 2);
                let named = attributes.iter().find(|a| a.name == "android:name").unwrap();
                assert_eq!(named.resource_id, Some(0x0101_0003));
            }
            other => panic!("expected StartElement, got {other:?}"),
        }
    }

    #[test]
    fn emit_is_idempotent() {
        let doc = sample_doc();
        let first = doc.emit().unwrap();
        let second = doc.emit().unwrap();
        assert_eq!(first, second);
    }

    struct RenameVisitor;
    impl Visitor for RenameVisitor {
        fn start_element(&mut self, _ns: Option<&str>, name: &str) -> Option<String> {
            if name == "com.app.MyView" {
                Some("z.q.MyView".to_string())
            } else {
                None
            }
        }

        fn attribute(
            &mut self,
            _ns: Option<&str>,
            _name: &str,
            _resource_id: Option<u32>,
            value: &AttributeValue,
        ) -> Option<AttributeValue> {
            match value {
                AttributeValue::String(s) if s == "com.app.MyView" => {
                    Some(AttributeValue::String("z.q.MyView".to_string()))
                }
                _ => None,
            }
        }

        fn text(&mut self, _line: u32, text: &str) -> Option<String> {
            text.contains("T(com.app.Helper)")
                .then(|| text.replace("T(com.app.Helper)", "T(z.q.Helper)"))
        }
    }

    #[test]
    fn visit_keeps_start_end_element_names_balanced() {
        let mut doc = sample_doc();
        let count = doc.visit(&mut RenameVisitor);
        assert!(count >= 3);

        match (&doc.events[1], &doc.events[3]) {
            (
                Event::StartElement { name: start_name, .. },
                Event::EndElement { name: end_name, .. },
            ) => {
                assert_eq!(start_name, "z.q.MyView");
                assert_eq!(end_name, "z.q.MyView");
            }
            _ => panic!("unexpected event shape"),
        }

        match &doc.events[2] {
            Event::CData { text, .. } => assert_eq!(text, "@{T(z.q.Helper).X}"),
            other => panic!("expected CData, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_data_type_round_trips_as_raw() {
        let doc = BinaryXml::new(
            vec![Event::StartElement {
                line: 1,
                namespace: None,
                name: "View".into(),
                attributes: vec![Attribute {
                    namespace: Some(ANDROID_NS_URI.into()),
                    name: "layout_width".into(),
                    resource_id: None,
                    value: AttributeValue::Raw {
                        data_type: 0x05, // TYPE_DIMENSION
                        data: 0x0000_0010,
                    },
                }],
                id_index: None,
                class_index: None,
                style_index: None,
            }],
            vec![],
            Encoding::ModifiedUtf8,
        );

        let bytes = doc.emit().unwrap();
        let reparsed = BinaryXml::parse(&bytes).unwrap();
        match &reparsed.events[0] {
            Event::StartElement { attributes, .. } => {
                assert_eq!(
                    attributes[0].value,
                    AttributeValue::Raw {
                        data_type: 0x05,
                        data: 0x0000_0010,
                    }
                );
            }
            other => panic!("expected StartElement, got {other:?}"),
        }
    }

    #[test]
    fn fast_path_indices_survive_attribute_reorder_on_emit() {
        // "a" is interned as the element's own name (index 0) before the
        // attribute loop runs. Giving the second attribute the same name
        // reuses that index, so it sorts ahead of the first attribute on
        // emit even though it comes later in `attributes`.
        let doc = BinaryXml::new(
            vec![Event::StartElement {
                line: 1,
                namespace: None,
                name: "a".into(),
                attributes: vec![
                    Attribute {
                        namespace: None,
                        name: "b".into(),
                        resource_id: None,
                        value: AttributeValue::String("a".into()),
                    },
                    Attribute {
                        namespace: None,
                        name: "a".into(),
                        resource_id: None,
                        value: AttributeValue::Integer(5),
                    },
                ],
                id_index: Some(2),
                class_index: None,
                style_index: Some(1),
            }],
            vec![],
            Encoding::ModifiedUtf8,
        );

        let bytes = doc.emit().unwrap();
        let reparsed = BinaryXml::parse(&bytes).unwrap();
        match &reparsed.events[0] {
            Event::StartElement {
                attributes,
                id_index,
                style_index,
                ..
            } => {
                assert_eq!(attributes[0].name, "a");
                assert_eq!(attributes[0].value, AttributeValue::Integer(5));
                assert_eq!(attributes[1].name, "b");
                assert_eq!(attributes[1].value, AttributeValue::String("a".into()));

                // id_index pointed at the "a"/Integer(5) attribute, now first.
                assert_eq!(*id_index, Some(1));
                // style_index pointed at the "b"/String("a") attribute, now second.
                assert_eq!(*style_index, Some(2));
            }
            other => panic!("expected StartElement, got {other:?}"),
        }
    }

    #[test]
    fn zero_match_visit_leaves_bytes_identical() {
        let doc = sample_doc();
        let before = doc.emit().unwrap();
        let mut doc2 = sample_doc();
        let count = doc2.visit(&mut RenameVisitorNoMatch);
        assert_eq!(count, 0);
        let after = doc2.emit().unwrap();
        assert_eq!(before, after);
    }

    struct RenameVisitorNoMatch;
    impl Visitor for RenameVisitorNoMatch {}
}
