//! The 8-phase run (C9): Snapshot, Load, Scan, Pre-validate, Replace,
//! Post-validate, Commit, Rollback-on-fatal. Operates on an archive in
//! place: `archive_path` is read at Load and rewritten at Commit.

use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use resedit_archive::ArchiveView;
use resedit_format::axml::BinaryXml;
use resedit_format::resource_table::ResourceTable;
use resedit_rewrite::rewriters::{detect_kind, root_element_info, FileKind};
use resedit_rewrite::scanner::{scan_entry, scan_resource_table, ScanSite};
use resedit_rewrite::{rewrite_document, RewriteContext};

use crate::cancellation::Cancellation;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::report::{FileReport, ReplacementReport};
use crate::snapshot::Transaction;

pub const RESOURCE_TABLE_PATH: &str = "resources.arsc";

/// Runs the pipeline against the archive at `archive_path`, rewriting it in
/// place. Any fatal failure restores `archive_path` from the snapshot before
/// the error is returned.
pub fn run(
    archive_path: &Path,
    snapshot_dir: &Path,
    transaction_id: &str,
    config: &Config,
    cancellation: &Cancellation,
) -> Result<ReplacementReport> {
    // Phase 1: Snapshot
    let mut txn = Transaction::create(transaction_id, archive_path, snapshot_dir)?;

    match run_inner(archive_path, config, cancellation) {
        Ok((bytes, report)) => {
            // Phase 7: Commit
            txn.commit(&bytes, config.keep_backup)?;
            info!("pipeline commit: {} files touched, {} sites replaced", report.files_touched(), report.total_sites());
            Ok(report)
        }
        Err(err) => {
            // Phase 8: Rollback
            warn!("pipeline fatal error, rolling back: {err}");
            txn.rollback()?;
            Err(err)
        }
    }
}

fn run_inner(archive_path: &Path, config: &Config, cancellation: &Cancellation) -> Result<(Vec<u8>, ReplacementReport)> {
    if cancellation.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    // Phase 2: Load
    let original_bytes = fs::read(archive_path)?;
    let mut view = ArchiveView::load(&original_bytes)?;

    if cancellation.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let whitelist = config.whitelist();
    let class_map = config.class_map()?;
    let package_map = config.package_map()?;
    let ctx = RewriteContext {
        whitelist: &whitelist,
        class_map: &class_map,
        package_map: &package_map,
        process_tools_context: config.process_tools_context,
    };

    // Phase 3: Scan
    let xml_paths: Vec<String> = view
        .entries()
        .filter(|e| e.path == "AndroidManifest.xml" || e.path.ends_with(".xml"))
        .map(|e| e.path.clone())
        .collect();

    let mut parsed: Vec<(String, BinaryXml)> = Vec::new();
    for path in &xml_paths {
        if cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let bytes = view.read(path).expect("path came from this view");
        if let Ok(doc) = BinaryXml::parse(bytes) {
            parsed.push((path.clone(), doc));
        }
    }

    let mut positives = Vec::new();
    for (path, doc) in &parsed {
        let (root, has_data) = root_element_info(doc);
        let kind = detect_kind(path, root.as_deref().unwrap_or(""), has_data);
        let scanned = scan_entry(path, doc, &ctx);
        if !scanned.sites.is_empty() {
            positives.push((path.clone(), kind, scanned.sites));
        }
    }

    debug!("scan: {} of {} xml entries have at least one candidate replacement", positives.len(), parsed.len());

    // Scan also covers the single resource-table entry, not just binary XML.
    let resource_table = if view.exists(RESOURCE_TABLE_PATH) {
        let bytes = view.read(RESOURCE_TABLE_PATH).expect("checked exists");
        Some(ResourceTable::parse(bytes, config.validation_mode)?)
    } else {
        None
    };
    let resource_table_sites: Vec<ScanSite> = resource_table
        .as_ref()
        .map(|table| scan_resource_table(table, &ctx))
        .unwrap_or_default();
    debug!("scan {RESOURCE_TABLE_PATH}: {} site(s)", resource_table_sites.len());

    // Phase 4: Pre-validate
    config.validate_mapping_consistency()?;
    if let Some(enumerated) = &config.enumerated_classes {
        for (_, to) in class_map.iter() {
            if !enumerated.contains(to) {
                return Err(PipelineError::DexMissingClass { fqcn: to.to_string() });
            }
        }
    }
    info!("pre-validate passed");

    // Phase 5: Replace
    let mut report = ReplacementReport::default();
    let mut by_path: std::collections::HashMap<&str, &mut BinaryXml> =
        parsed.iter_mut().map(|(p, d)| (p.as_str(), d)).collect();

    for (path, kind, sites) in positives {
        if cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let doc = by_path.get_mut(path.as_str()).expect("scanned path was parsed");
        rewrite_document(kind, doc, &ctx);
        match doc.emit() {
            Ok(bytes) => {
                view.write(&path, bytes)?;
                report.files.push(FileReport::from_sites(path.clone(), kind, sites));
            }
            Err(err) => {
                report.push_warning(&path, format!("emit failed, keeping original bytes: {err}"));
            }
        }
    }

    if let Some(mut table) = resource_table {
        replace_resource_table(&mut view, &mut table, &ctx)?;
        if !resource_table_sites.is_empty() {
            report.files.push(FileReport::from_sites(
                RESOURCE_TABLE_PATH.to_string(),
                FileKind::ResourceTable,
                resource_table_sites,
            ));
        }
    }

    // Phase 6: Post-validate
    for (path, _) in parsed.iter().filter(|(p, _)| view.exists(p)) {
        if let Some(bytes) = view.read(path) {
            BinaryXml::parse(bytes)?;
        }
    }
    if view.exists(RESOURCE_TABLE_PATH) {
        let bytes = view.read(RESOURCE_TABLE_PATH).expect("checked exists");
        ResourceTable::parse(bytes, config.validation_mode)?;
    }

    let emitted = view.emit()?;
    Ok((emitted, report))
}

/// Renames the package (if a package mapping exactly matches it) and
/// rewrites type/key pool and global pool strings through the same
/// whitelist/mapping rules the XML rewriters use. A failure here is fatal
/// per spec.
fn replace_resource_table(view: &mut ArchiveView, table: &mut ResourceTable, ctx: &RewriteContext) -> Result<()> {
    for package in table.packages_mut() {
        if let Some(new_name) = ctx.resolve(package.name()) {
            package.set_package_name(new_name)?;
        }
        package.replace_in_type_or_key_pool(&mut |s: &str| ctx.resolve(s))?;
    }
    table.replace_in_global_pool(&mut |s: &str| ctx.resolve(s))?;

    let bytes = table.emit()?;
    view.write(RESOURCE_TABLE_PATH, bytes)?;
    Ok(())
}
