//! Whitelist/filter (C5), mapping store (C6), shape-specific XML rewriters
//! (C7) and the dry-run scanner (C8) that together decide which identifiers
//! in a resource XML entry get rewritten and to what.

pub mod dex_classes;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod rewriters;
pub mod scanner;

pub use error::{Result, RewriteError};
pub use rewriters::{FileKind, RewriteContext};

use log::debug;
use resedit_format::axml::BinaryXml;
use rewriters::{
    data_binding::DataBindingRewriter, generic::GenericRewriter, layout::LayoutRewriter,
    menu::MenuRewriter, navigation::NavigationRewriter,
};

/// Runs the rewriter matching `kind` over `doc`, returning the number of
/// replacements applied. Per spec: a rewriter that makes zero replacements
/// must leave the document producing byte-identical output on emit.
pub fn rewrite_document(kind: FileKind, doc: &mut BinaryXml, ctx: &RewriteContext) -> usize {
    let count = match kind {
        FileKind::Layout => doc.visit(&mut LayoutRewriter::new(ctx)),
        FileKind::Menu => doc.visit(&mut MenuRewriter::new(ctx)),
        FileKind::Navigation => doc.visit(&mut NavigationRewriter::new(ctx)),
        FileKind::Drawable | FileKind::Generic => doc.visit(&mut GenericRewriter::new(ctx)),
        FileKind::DataBinding => doc.visit(&mut DataBindingRewriter::new(ctx)),
        FileKind::ResourceTable => 0,
    };
    debug!("rewrite_document({kind:?}): {count} replacement(s)");
    count
}
