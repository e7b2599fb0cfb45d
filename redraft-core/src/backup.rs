use std::io;
use std::path::{Path, PathBuf};

use crate::fsio;

pub const BACKUP_EXT: &str = ".bak";

pub fn backup_path(src: &Path) -> PathBuf {
    let mut os = src.as_os_str().to_owned();
    os.push(BACKUP_EXT);
    PathBuf::from(os)
}

/// True if a `.bak` sibling exists for `src`. A leftover backup marks an
/// earlier run that died between backup and commit, so callers use this as
/// a preflight guard before touching anything.
pub fn check_backup_exists(src: &Path) -> io::Result<bool> {
    fsio::check_exists(&backup_path(src))
}

/// Ledger of source paths that currently have a `.bak` copy created by this
/// run. Scoped to a single transaction; never persisted.
#[derive(Default)]
pub struct BackupSet {
    paths: Vec<PathBuf>,
}

impl BackupSet {
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Copies `src` to `src.bak` and records `src` in the ledger. On failure
    /// nothing is recorded; there is nothing to restore for that path.
    pub fn create_backup(&mut self, src: &Path) -> io::Result<PathBuf> {
        let dst = backup_path(src);

        fsio::atomic_copy(&dst, src)?;

        self.paths.push(src.to_path_buf());

        Ok(dst)
    }

    /// Copies every recorded `src.bak` back onto `src`. Every entry is
    /// attempted regardless of earlier failures; afterwards the ledger holds
    /// exactly the subset that failed, and those failures are returned so
    /// the caller can name each path still needing manual recovery.
    pub fn restore_backups(&mut self) -> Vec<(PathBuf, io::Error)> {
        let mut failed_paths = Vec::new();
        let mut failures = Vec::new();

        for src in self.paths.drain(..) {
            let bak = backup_path(&src);
            if let Err(e) = fsio::atomic_copy(&src, &bak) {
                failures.push((src.clone(), e));
                failed_paths.push(src);
            }
        }

        self.paths = failed_paths;

        failures
    }

    /// Deletes every recorded `src.bak`, continuing past individual errors.
    /// Stale backups are a cleanup nicety, not a correctness issue, so the
    /// caller treats the returned failures as warnings.
    pub fn remove_backups(&mut self) -> Vec<(PathBuf, io::Error)> {
        let mut failed_paths = Vec::new();
        let mut failures = Vec::new();

        for src in self.paths.drain(..) {
            let bak = backup_path(&src);
            if let Err(e) = std::fs::remove_file(&bak) {
                failures.push((src.clone(), e));
                failed_paths.push(src);
            }
        }

        self.paths = failed_paths;

        failures
    }
}
