//! Shape-specific XML visitors that drive the binary-XML codec's visitor
//! contract (`resedit_format::axml::Visitor`) using the whitelist/filter
//! (C5) and mapping store (C6).

pub mod data_binding;
pub mod generic;
pub mod layout;
pub mod menu;
pub mod navigation;

use resedit_format::axml::BinaryXml;

use crate::filter::Whitelist;
use crate::mapping::{ClassMap, PackageMap};

/// Shared read-only inputs every rewriter consults: whitelist first, then
/// the exact class map, then the longest-prefix package map.
pub struct RewriteContext<'a> {
    pub whitelist: &'a Whitelist,
    pub class_map: &'a ClassMap,
    pub package_map: &'a PackageMap,
    pub process_tools_context: bool,
}

impl<'a> RewriteContext<'a> {
    /// Resolves `s` to a replacement, or `None` if it is not rewritable or
    /// maps to itself.
    pub fn resolve(&self, s: &str) -> Option<String> {
        if !self.whitelist.is_rewritable(s) {
            return None;
        }
        if let Some(exact) = self.class_map.get(s) {
            return if exact == s { None } else { Some(exact.to_string()) };
        }
        let mapped = self.package_map.replace(s);
        if mapped != s {
            Some(mapped)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Layout,
    Menu,
    Navigation,
    Drawable,
    Generic,
    DataBinding,
    /// The single compiled resource-table entry (`resources.arsc`), not an
    /// XML-shaped entry at all but reported alongside them.
    ResourceTable,
}

const DRAWABLE_ROOTS: &[&str] = &[
    "vector",
    "selector",
    "shape",
    "layer-list",
    "animation-list",
    "ripple",
    "adaptive-icon",
    "inset",
    "scale",
    "clip",
    "rotate",
    "bitmap",
];

const LAYOUT_ROOTS: &[&str] = &[
    "LinearLayout",
    "RelativeLayout",
    "FrameLayout",
    "ConstraintLayout",
    "GridLayout",
    "TableLayout",
    "merge",
];

fn dir_segment_matches(path: &str, name: &str) -> bool {
    path.split('/').any(|seg| seg == name || seg.starts_with(&format!("{name}-")))
}

/// Detects which rewriter should handle a resource XML entry, by path first
/// and root-element name as a fallback, with the data-binding override.
pub fn detect_kind(path: &str, root_element: &str, has_data_child: bool) -> FileKind {
    if root_element == "layout" && has_data_child {
        return FileKind::DataBinding;
    }
    if dir_segment_matches(path, "layout") {
        return FileKind::Layout;
    }
    if dir_segment_matches(path, "menu") {
        return FileKind::Menu;
    }
    if dir_segment_matches(path, "navigation") {
        return FileKind::Navigation;
    }
    if dir_segment_matches(path, "xml")
        || dir_segment_matches(path, "animator")
        || dir_segment_matches(path, "anim")
        || dir_segment_matches(path, "transition")
    {
        return FileKind::Drawable;
    }

    if DRAWABLE_ROOTS.contains(&root_element) {
        return FileKind::Drawable;
    }
    if root_element == "menu" {
        return FileKind::Menu;
    }
    if root_element == "navigation" {
        return FileKind::Navigation;
    }
    if LAYOUT_ROOTS.contains(&root_element) || root_element.contains('.') {
        return FileKind::Layout;
    }
    FileKind::Generic
}

/// The root element name and whether a `<data>` child is its first child,
/// read without a full visitor pass (used by `detect_kind`).
pub fn root_element_info(doc: &BinaryXml) -> (Option<String>, bool) {
    use resedit_format::axml::Event;

    let mut root: Option<String> = None;
    let mut has_data_child = false;
    let mut depth = 0u32;

    for event in &doc.events {
        if let Event::StartElement { name, .. } = event {
            depth += 1;
            if depth == 1 {
                root = Some(name.clone());
            } else if depth == 2 && name == "data" {
                has_data_child = true;
            }
        }
    }
    (root, has_data_child)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_layout_by_path() {
        assert_eq!(detect_kind("res/layout/a.xml", "LinearLayout", false), FileKind::Layout);
        assert_eq!(detect_kind("res/layout-land/a.xml", "LinearLayout", false), FileKind::Layout);
    }

    #[test]
    fn detects_by_root_element_fallback() {
        assert_eq!(detect_kind("res/drawable/a.xml", "vector", false), FileKind::Drawable);
        assert_eq!(detect_kind("res/values/a.xml", "menu", false), FileKind::Menu);
        assert_eq!(detect_kind("res/values/a.xml", "com.app.MyView", false), FileKind::Layout);
        assert_eq!(detect_kind("res/values/a.xml", "SomeOther", false), FileKind::Generic);
    }

    #[test]
    fn data_binding_overrides_path_based_detection() {
        assert_eq!(detect_kind("res/layout/a.xml", "layout", true), FileKind::DataBinding);
    }
}
