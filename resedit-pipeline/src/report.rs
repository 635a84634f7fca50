//! Per-entry and aggregate outcome of a pipeline run: counts, the first N
//! recorded replacement sites per file, and any non-fatal warnings.

use resedit_rewrite::scanner::ScanSite;
use resedit_rewrite::FileKind;

/// How many sites to retain per file in the report; later sites are still
/// counted but not individually listed.
pub const MAX_SITES_PER_FILE: usize = 50;

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    pub kind: FileKind,
    pub site_count: usize,
    pub sites: Vec<ScanSite>,
}

impl FileReport {
    pub fn from_sites(path: String, kind: FileKind, sites: Vec<ScanSite>) -> Self {
        let site_count = sites.len();
        let sites = sites.into_iter().take(MAX_SITES_PER_FILE).collect();
        Self {
            path,
            kind,
            site_count,
            sites,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Warning {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReplacementReport {
    pub files: Vec<FileReport>,
    pub warnings: Vec<Warning>,
}

impl ReplacementReport {
    pub fn total_sites(&self) -> usize {
        self.files.iter().map(|f| f.site_count).sum()
    }

    pub fn files_touched(&self) -> usize {
        self.files.iter().filter(|f| f.site_count > 0).count()
    }

    pub fn push_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Warning {
            path: path.into(),
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_listed_sites_but_keeps_true_count() {
        let sites: Vec<ScanSite> = (0..MAX_SITES_PER_FILE + 10)
            .map(|i| ScanSite {
                location: format!("attr:{i}"),
                original_value: "com.app.A".into(),
                replacement: "z.q.A".into(),
            })
            .collect();
        let report = FileReport::from_sites("res/layout/a.xml".into(), FileKind::Layout, sites);
        assert_eq!(report.site_count, MAX_SITES_PER_FILE + 10);
        assert_eq!(report.sites.len(), MAX_SITES_PER_FILE);
    }

    #[test]
    fn aggregate_counts_sum_across_files() {
        let mut report = ReplacementReport::default();
        report.files.push(FileReport::from_sites(
            "a.xml".into(),
            FileKind::Layout,
            vec![ScanSite {
                location: "tag".into(),
                original_value: "com.app.A".into(),
                replacement: "z.q.A".into(),
            }],
        ));
        report.files.push(FileReport::from_sites("b.xml".into(), FileKind::Menu, vec![]));
        assert_eq!(report.total_sites(), 1);
        assert_eq!(report.files_touched(), 1);
    }
}
