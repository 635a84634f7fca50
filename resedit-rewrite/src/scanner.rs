//! Dry-run traversal (C8): the same eligibility rules the rewriters apply,
//! but recording planned replacements without mutating the document. The
//! pipeline filters its work set to entries with at least one recorded site.

use log::debug;
use resedit_format::axml::{AttributeValue, BinaryXml, Visitor};
use resedit_format::resource_table::ResourceTable;
use resedit_format::string_pool::StringPool;

use crate::filter::is_eligible_attribute;
use crate::rewriters::{detect_kind, root_element_info, FileKind, RewriteContext};

#[derive(Debug, Clone)]
pub struct ScanSite {
    pub location: String,
    pub original_value: String,
    pub replacement: String,
}

#[derive(Debug, Clone)]
pub struct ScanEntry {
    pub path: String,
    pub kind: FileKind,
    pub sites: Vec<ScanSite>,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub entries: Vec<ScanEntry>,
}

impl ScanReport {
    /// Paths with at least one recorded replacement site.
    pub fn positive_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter(|e| !e.sites.is_empty()).map(|e| e.path.as_str())
    }
}

const TAG_SCOPED_NAVIGATION: &[&str] = &["fragment", "activity", "dialog"];

struct RecordingVisitor<'a> {
    kind: FileKind,
    ctx: &'a RewriteContext<'a>,
    tag_stack: Vec<String>,
    data_depth: Option<usize>,
    sites: Vec<ScanSite>,
}

impl<'a> RecordingVisitor<'a> {
    fn new(kind: FileKind, ctx: &'a RewriteContext<'a>) -> Self {
        Self {
            kind,
            ctx,
            tag_stack: Vec::new(),
            data_depth: None,
            sites: Vec::new(),
        }
    }

    fn record(&mut self, location: String, original: &str) {
        if let Some(replacement) = self.ctx.resolve(original) {
            self.sites.push(ScanSite {
                location,
                original_value: original.to_string(),
                replacement,
            });
        }
    }
}

impl<'a> Visitor for RecordingVisitor<'a> {
    fn start_element(&mut self, _namespace: Option<&str>, name: &str) -> Option<String> {
        self.tag_stack.push(name.to_string());
        if name == "data" && self.data_depth.is_none() {
            self.data_depth = Some(self.tag_stack.len());
        }
        if matches!(self.kind, FileKind::Layout | FileKind::DataBinding) {
            self.record(format!("tag:{name}"), name);
        }
        None
    }

    fn attribute(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        _resource_id: Option<u32>,
        value: &AttributeValue,
    ) -> Option<AttributeValue> {
        let s = match value {
            AttributeValue::String(s) => s,
            _ => return None,
        };
        let current_tag = self.tag_stack.last().map(String::as_str).unwrap_or("");

        let eligible = match self.kind {
            FileKind::Menu => {
                matches!(
                    (namespace, name),
                    (Some(crate::filter::ANDROID_NS_URI), "actionViewClass")
                        | (Some(crate::filter::ANDROID_NS_URI), "actionProviderClass")
                        | (_, "class")
                )
            }
            FileKind::Navigation => {
                TAG_SCOPED_NAVIGATION.contains(&current_tag)
                    && namespace == Some(crate::filter::ANDROID_NS_URI)
                    && name == "name"
            }
            FileKind::DataBinding => {
                let is_type_ref = self.data_depth.is_some()
                    && namespace.is_none()
                    && name == "type"
                    && (current_tag == "variable" || current_tag == "import");
                is_type_ref || is_eligible_attribute(namespace, name, self.ctx.process_tools_context)
            }
            FileKind::Layout | FileKind::Drawable | FileKind::Generic => {
                is_eligible_attribute(namespace, name, self.ctx.process_tools_context)
            }
            FileKind::ResourceTable => false,
        };

        if eligible {
            self.record(format!("attr:{name}"), s);
        }
        None
    }

    fn text(&mut self, line: u32, text: &str) -> Option<String> {
        if self.kind != FileKind::DataBinding {
            return None;
        }
        let mut rest = text;
        while let Some(start) = rest.find("T(") {
            let after = &rest[start + 2..];
            if let Some(end) = after.find(')') {
                let fqcn = &after[..end];
                self.record(format!("text:{line}"), fqcn);
                rest = &after[end + 1..];
            } else {
                break;
            }
        }
        None
    }

    fn end_element(&mut self, _namespace: Option<&str>, _name: &str) {
        if self.data_depth == Some(self.tag_stack.len()) {
            self.data_depth = None;
        }
        self.tag_stack.pop();
    }
}

/// Scans a single resource XML entry, detecting its kind and recording the
/// replacements a rewrite pass would make.
pub fn scan_entry(path: &str, doc: &BinaryXml, ctx: &RewriteContext) -> ScanEntry {
    let (root, has_data) = root_element_info(doc);
    let kind = detect_kind(path, root.as_deref().unwrap_or(""), has_data);
    let mut working = doc.clone();
    let mut recorder = RecordingVisitor::new(kind, ctx);
    working.visit(&mut recorder);
    debug!("scan {path} ({kind:?}): {} site(s)", recorder.sites.len());
    ScanEntry {
        path: path.to_string(),
        kind,
        sites: recorder.sites,
    }
}

/// Scans the resource-table entry: the package name(s) and every string in
/// the type/key/global pools, through the same whitelist/mapping rules the
/// XML rewriters use. Dry-run, same as `scan_entry` — `table` is not mutated.
pub fn scan_resource_table(table: &ResourceTable, ctx: &RewriteContext) -> Vec<ScanSite> {
    let mut sites = Vec::new();
    for package in table.packages() {
        if let Some(replacement) = ctx.resolve(package.name()) {
            sites.push(ScanSite {
                location: format!("package:{}", package.name()),
                original_value: package.name().to_string(),
                replacement,
            });
        }
        record_pool_sites("type_pool", &package.type_strings, ctx, &mut sites);
        record_pool_sites("key_pool", &package.key_strings, ctx, &mut sites);
    }
    record_pool_sites("global_pool", table.global_strings(), ctx, &mut sites);
    debug!("scan resources.arsc: {} site(s)", sites.len());
    sites
}

fn record_pool_sites(label: &str, pool: &StringPool, ctx: &RewriteContext, sites: &mut Vec<ScanSite>) {
    for i in 0..pool.len() {
        let Some(s) = pool.get(i) else { continue };
        if let Some(replacement) = ctx.resolve(s) {
            sites.push(ScanSite {
                location: format!("{label}:{i}"),
                original_value: s.to_string(),
                replacement,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use resedit_format::axml::{ANDROID_NS_URI, Attribute, Event};
    use resedit_format::string_pool::Encoding;

    use super::*;
    use crate::filter::Whitelist;
    use crate::mapping::{ClassMap, PackageMap};

    #[test]
    fn records_layout_tag_and_attribute_without_mutating() {
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

        let doc = BinaryXml::new(
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

        let before = doc.emit().unwrap();
        let entry = scan_entry("res/layout/a.xml", &doc, &ctx);
        assert_eq!(entry.kind, FileKind::Layout);
        assert_eq!(entry.sites.len(), 2);
        assert_eq!(doc.emit().unwrap(), before);
    }

    #[test]
    fn records_resource_table_package_and_pool_sites_without_mutating() {
        use resedit_format::string_pool::ValidationMode;

        fn w16(out: &mut Vec<u8>, v: u16) {
            out.extend_from_slice(&v.to_le_bytes());
        }
        fn w32(out: &mut Vec<u8>, v: u32) {
            out.extend_from_slice(&v.to_le_bytes());
        }
        fn build_pool_bytes(strings: &[&str]) -> Vec<u8> {
            let mut pool = StringPool::new(Encoding::ModifiedUtf8);
            for s in strings {
                pool.push(*s);
            }
            let mut out = Vec::new();
            pool.emit(&mut out).unwrap();
            out
        }
        fn encode_package_name(name: &str) -> Vec<u8> {
            let units: Vec<u16> = name.encode_utf16().collect();
            let mut out = vec![0u8; 256];
            for (i, u) in units.iter().enumerate() {
                out[i * 2..i * 2 + 2].copy_from_slice(&u.to_le_bytes());
            }
            out
        }

        let type_pool = build_pool_bytes(&["attr1"]);
        let key_pool = build_pool_bytes(&["key1"]);
        let type_offset = 288u32;
        let key_offset = type_offset + type_pool.len() as u32;
        let package_total = key_offset as usize + key_pool.len();

        let mut package_bytes = Vec::with_capacity(package_total);
        w16(&mut package_bytes, 0x0200);
        w16(&mut package_bytes, 288);
        w32(&mut package_bytes, package_total as u32);
        w32(&mut package_bytes, 0x7F);
        package_bytes.extend_from_slice(&encode_package_name("com.app"));
        w32(&mut package_bytes, type_offset);
        w32(&mut package_bytes, 0);
        w32(&mut package_bytes, key_offset);
        w32(&mut package_bytes, 0);
        w32(&mut package_bytes, 0);
        package_bytes.extend_from_slice(&type_pool);
        package_bytes.extend_from_slice(&key_pool);

        let global_pool = build_pool_bytes(&["com.app.MyView"]);
        let total = 12 + global_pool.len() + package_bytes.len();
        let mut table_bytes = Vec::with_capacity(total);
        w16(&mut table_bytes, 0x0002);
        w16(&mut table_bytes, 12);
        w32(&mut table_bytes, total as u32);
        w32(&mut table_bytes, 1);
        table_bytes.extend_from_slice(&global_pool);
        table_bytes.extend_from_slice(&package_bytes);

        let table = ResourceTable::parse(&table_bytes, ValidationMode::Strict).unwrap();

        let whitelist = Whitelist::new(["com.app".to_string()]);
        let mut class_map = ClassMap::new();
        class_map.insert("com.app.MyView", "z.q.MyView").unwrap();
        let mut package_map = PackageMap::new();
        package_map.insert("com.app", "z.q").unwrap();
        let ctx = RewriteContext {
            whitelist: &whitelist,
            class_map: &class_map,
            package_map: &package_map,
            process_tools_context: true,
        };

        let sites = scan_resource_table(&table, &ctx);
        assert!(sites.iter().any(|s| s.location == "package:com.app" && s.replacement == "z.q"));
        assert!(sites
            .iter()
            .any(|s| s.location == "global_pool:0" && s.original_value == "com.app.MyView"));
        assert_eq!(table.global_strings().get(0).unwrap(), "com.app.MyView");
    }

    #[test]
    fn zero_site_entries_report_empty() {
        let whitelist = Whitelist::new(["com.other".to_string()]);
        let class_map = ClassMap::new();
        let package_map = PackageMap::new();
        let ctx = RewriteContext {
            whitelist: &whitelist,
            class_map: &class_map,
            package_map: &package_map,
            process_tools_context: true,
        };
        let doc = BinaryXml::new(vec![], vec![], Encoding::ModifiedUtf8);
        let entry = scan_entry("res/layout/a.xml", &doc, &ctx);
        assert!(entry.sites.is_empty());
    }
}
