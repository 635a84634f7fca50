use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use resedit_archive::ArchiveView;
use resedit_format::axml::BinaryXml;
use resedit_pipeline::{Cancellation, ReplacementReport};
use resedit_rewrite::rewriters::{detect_kind, root_element_info, RewriteContext};
use resedit_rewrite::scanner::scan_entry;

mod config_file;

use config_file::{into_pipeline_config, load_config};

#[derive(Parser)]
#[command(version, long_about = None)]
#[command(arg_required_else_help = true)]
#[command(about = "Rewrites own-app identifiers referenced by compiled Android resource XML")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enables debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrites an archive in place (or to `-o`) per the given config.
    ProcessApk {
        archive: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long = "dex-path")]
        dex_path: Vec<PathBuf>,
        #[arg(long, overrides_with = "no_auto_sign")]
        auto_sign: bool,
        #[arg(long, overrides_with = "auto_sign")]
        no_auto_sign: bool,
    },
    /// Dry-run: reports what `process-apk` would change without mutating the archive.
    Scan {
        archive: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Re-parses every binary-XML entry and the resource table, confirming well-formedness.
    Validate {
        archive: PathBuf,
        #[arg(long = "dex-path")]
        dex_path: Vec<PathBuf>,
    },
}

fn load_enumerated_classes(dex_paths: &[PathBuf]) -> Result<Option<std::collections::HashSet<String>>> {
    if dex_paths.is_empty() {
        return Ok(None);
    }
    let mut classes = std::collections::HashSet::new();
    for path in dex_paths {
        let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        classes.extend(resedit_rewrite::dex_classes::parse_class_list(&contents));
    }
    Ok(Some(classes))
}

fn run_process_apk(
    archive: &Path,
    config_path: &Path,
    out: Option<&Path>,
    dex_path: &[PathBuf],
    auto_sign: bool,
) -> Result<ReplacementReport> {
    let raw = load_config(config_path)?;
    let mut config = into_pipeline_config(raw)?;
    config.enumerated_classes = load_enumerated_classes(dex_path)?;
    config.auto_sign = auto_sign;

    let working_path = match out {
        Some(out) => {
            std::fs::copy(archive, out).with_context(|| format!("failed to copy {} to {}", archive.display(), out.display()))?;
            out.to_path_buf()
        }
        None => archive.to_path_buf(),
    };

    let snapshot_dir = std::env::temp_dir().join("resedit-snapshots");
    let txn_id = format!("{}-{}", working_path.display(), std::process::id());
    let cancellation = Cancellation::new();

    let report = resedit_pipeline::pipeline::run(&working_path, &snapshot_dir, &txn_id, &config, &cancellation)?;

    if config.auto_sign {
        info!("auto-sign requested; signing is an external step and was not performed here");
    }

    Ok(report)
}

fn run_scan(archive: &Path, config_path: &Path) -> Result<Vec<(String, usize)>> {
    let raw = load_config(config_path)?;
    let config = into_pipeline_config(raw)?;

    let bytes = std::fs::read(archive).with_context(|| format!("failed to read {}", archive.display()))?;
    let view = ArchiveView::load(&bytes)?;

    let whitelist = config.whitelist();
    let class_map = config.class_map()?;
    let package_map = config.package_map()?;
    let ctx = RewriteContext {
        whitelist: &whitelist,
        class_map: &class_map,
        package_map: &package_map,
        process_tools_context: config.process_tools_context,
    };

    let mut results = Vec::new();
    for entry in view.entries() {
        if entry.path != "AndroidManifest.xml" && !entry.path.ends_with(".xml") {
            continue;
        }
        let Ok(doc) = BinaryXml::parse(entry.bytes()) else {
            continue;
        };
        let (root, has_data) = root_element_info(&doc);
        let kind = detect_kind(&entry.path, root.as_deref().unwrap_or(""), has_data);
        let scanned = scan_entry(&entry.path, &doc, &ctx);
        if !scanned.sites.is_empty() {
            info!("{} ({:?}): {} site(s)", entry.path, kind, scanned.sites.len());
            results.push((entry.path.clone(), scanned.sites.len()));
        }
    }
    Ok(results)
}

fn run_validate(archive: &Path) -> Result<()> {
    let bytes = std::fs::read(archive).with_context(|| format!("failed to read {}", archive.display()))?;
    let view = ArchiveView::load(&bytes)?;

    for entry in view.entries() {
        if entry.path == "AndroidManifest.xml" || entry.path.ends_with(".xml") {
            if let Err(err) = BinaryXml::parse(entry.bytes()) {
                warn!("{} does not look like compiled binary XML: {err}", entry.path);
            }
        }
    }
    if view.exists(resedit_pipeline::pipeline::RESOURCE_TABLE_PATH) {
        let bytes = view.read(resedit_pipeline::pipeline::RESOURCE_TABLE_PATH).expect("checked exists");
        resedit_format::resource_table::ResourceTable::parse(bytes, resedit_format::string_pool::ValidationMode::Strict)
            .context("resources.arsc failed to re-parse")?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .format_target(false)
        .format_timestamp(None)
        .init();

    let result = match &cli.command {
        Commands::ProcessApk {
            archive,
            config,
            out,
            dex_path,
            auto_sign,
            no_auto_sign,
        } => run_process_apk(archive, config, out.as_deref(), dex_path, *auto_sign && !*no_auto_sign).map(|report| {
            info!(
                "committed: {} file(s) touched, {} replacement site(s), {} warning(s)",
                report.files_touched(),
                report.total_sites(),
                report.warnings.len()
            );
        }),
        Commands::Scan { archive, config, out } => run_scan(archive, config).map(|results| {
            if let Some(out) = out {
                let rendered = results.iter().map(|(path, count)| format!("{path}: {count}\n")).collect::<String>();
                if let Err(err) = std::fs::write(out, rendered) {
                    warn!("failed to write scan report to {}: {err}", out.display());
                }
            }
            info!("{} file(s) with at least one candidate replacement", results.len());
        }),
        Commands::Validate { archive, dex_path: _ } => run_validate(archive),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
