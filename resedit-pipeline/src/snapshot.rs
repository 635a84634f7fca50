//! Snapshot/rollback (C10): a full-file copy under a temp directory keyed
//! by transaction id, so a fatal failure mid-pipeline can restore the
//! archive to exactly its pre-run state.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Created,
    Committed,
    RolledBack,
}

pub struct Transaction {
    pub id: String,
    pub archive_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub status: TransactionStatus,
}

impl Transaction {
    /// Copies `archive_path` into a snapshot under `snapshot_dir`, keyed by
    /// `id`.
    pub fn create(id: impl Into<String>, archive_path: impl AsRef<Path>, snapshot_dir: impl AsRef<Path>) -> Result<Self> {
        let id = id.into();
        let archive_path = archive_path.as_ref().to_path_buf();
        let snapshot_dir = snapshot_dir.as_ref();
        fs::create_dir_all(snapshot_dir)?;
        let snapshot_path = snapshot_dir.join(format!("{id}.snapshot"));

        fs::copy(&archive_path, &snapshot_path)?;
        info!("created snapshot {} for {}", snapshot_path.display(), archive_path.display());

        Ok(Self {
            id,
            archive_path,
            snapshot_path,
            status: TransactionStatus::Created,
        })
    }

    /// Writes `bytes` to a temp file alongside the target, then renames it
    /// into place; removes the snapshot unless `keep_backup` is set.
    pub fn commit(&mut self, bytes: &[u8], keep_backup: bool) -> Result<()> {
        write_then_rename(&self.archive_path, bytes)?;
        if !keep_backup {
            let _ = fs::remove_file(&self.snapshot_path);
        }
        self.status = TransactionStatus::Committed;
        info!("committed transaction {}", self.id);
        Ok(())
    }

    /// Restores the snapshot over the archive path atomically.
    pub fn rollback(&mut self) -> Result<()> {
        let bytes = fs::read(&self.snapshot_path)?;
        write_then_rename(&self.archive_path, &bytes)?;
        let _ = fs::remove_file(&self.snapshot_path);
        self.status = TransactionStatus::RolledBack;
        warn!("rolled back transaction {}", self.id);
        Ok(())
    }
}

fn write_then_rename(target: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = target.with_extension(format!(
        "{}.tmp",
        target.extension().and_then(|e| e.to_str()).unwrap_or("out")
    ));
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, target)?;
    Ok(())
}

/// Hook for an out-of-core maintenance sweep of old snapshots; the pipeline
/// itself never calls this.
pub trait SnapshotSweeper {
    fn sweep(&self, snapshot_dir: &Path) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn create_commit_removes_snapshot_by_default() {
        let dir = std::env::temp_dir().join(format!("resedit-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let archive_path = dir.join("archive.apk");
        let mut f = fs::File::create(&archive_path).unwrap();
        f.write_all(b"original").unwrap();
        drop(f);

        let snapshot_dir = dir.join("snapshots");
        let mut txn = Transaction::create("txn1", &archive_path, &snapshot_dir).unwrap();
        assert!(txn.snapshot_path.exists());

        txn.commit(b"rewritten", false).unwrap();
        assert_eq!(fs::read(&archive_path).unwrap(), b"rewritten");
        assert!(!txn.snapshot_path.exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rollback_restores_original_bytes() {
        let dir = std::env::temp_dir().join(format!("resedit-test-rb-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let archive_path = dir.join("archive.apk");
        fs::write(&archive_path, b"original").unwrap();

        let snapshot_dir = dir.join("snapshots");
        let mut txn = Transaction::create("txn2", &archive_path, &snapshot_dir).unwrap();
        fs::write(&archive_path, b"corrupted mid-write").unwrap();

        txn.rollback().unwrap();
        assert_eq!(fs::read(&archive_path).unwrap(), b"original");
        assert_eq!(txn.status, TransactionStatus::RolledBack);

        fs::remove_dir_all(&dir).ok();
    }
}
