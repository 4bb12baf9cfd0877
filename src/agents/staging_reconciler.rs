use crate::agents::artifact_installer::{StagedInstall, StagingArea};
use crate::error::{DrupdateError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-entry outcome of the batch replace step. Printed to the operator in
/// full; a partial reconciliation is reported, never swallowed.
#[derive(Debug, Default)]
pub struct ReconciliationReport {
    pub removed: Vec<PathBuf>,
    pub failed_removals: Vec<(PathBuf, String)>,
    pub promoted: Vec<PathBuf>,
    pub failed_promotions: Vec<(PathBuf, String)>,
    pub staging_removed: bool,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.failed_removals.is_empty() && self.failed_promotions.is_empty() && self.staging_removed
    }

    /// True when not a single staged entry made it into the live tree.
    /// This is the only reconciliation state that fails the whole run.
    pub fn failed_outright(&self) -> bool {
        self.promoted.is_empty() && !self.failed_promotions.is_empty()
    }
}

/// Performs the single destructive phase of a run: delete every stale module
/// directory, promote every staged entry into the live tree, drop the
/// staging area. Ordering (remove-all, then move-all) is an invariant; the
/// bulk move assumes every target slot was vacated by the removals.
pub struct StagingReconciler {
    install_root: PathBuf,
}

impl StagingReconciler {
    pub fn new(install_root: &Path) -> Self {
        Self {
            install_root: install_root.to_path_buf(),
        }
    }

    /// Consume the staging area exactly once. Individual removal or move
    /// failures are recorded and the remaining entries are still attempted.
    pub fn reconcile(
        &self,
        staging: StagingArea,
        staged: &[StagedInstall],
    ) -> Result<ReconciliationReport> {
        let mut report = ReconciliationReport::default();

        for install in staged {
            match fs::remove_dir_all(&install.stale_path) {
                Ok(()) => report.removed.push(install.stale_path.clone()),
                // A module being installed for the first time has no stale
                // directory; that is not a failure.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    report.removed.push(install.stale_path.clone());
                }
                Err(e) => report
                    .failed_removals
                    .push((install.stale_path.clone(), e.to_string())),
            }
        }

        let entries = fs::read_dir(staging.path()).map_err(|e| {
            DrupdateError::Reconciliation(format!(
                "cannot list staging directory '{}': {e}",
                staging.path().display()
            ))
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report
                        .failed_promotions
                        .push((staging.path().to_path_buf(), e.to_string()));
                    continue;
                }
            };

            let target = self.install_root.join(entry.file_name());
            match fs::rename(entry.path(), &target) {
                Ok(()) => report.promoted.push(target),
                Err(e) => report.failed_promotions.push((entry.path(), e.to_string())),
            }
        }

        // Only drop the staging directory once it is actually empty; after a
        // failed promotion it still holds the entry the operator will want
        // to recover.
        if report.failed_promotions.is_empty() {
            match fs::remove_dir_all(staging.path()) {
                Ok(()) => report.staging_removed = true,
                Err(e) => report
                    .failed_promotions
                    .push((staging.path().to_path_buf(), e.to_string())),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn staged(root: &Path, name: &str) -> StagedInstall {
        StagedInstall {
            module_name: name.to_string(),
            stale_path: root.join(name),
        }
    }

    fn populate(dir: &Path, file: &str, contents: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(file), contents).unwrap();
    }

    #[test]
    fn replaces_stale_module_and_leaves_others_alone() {
        let root = tempdir().unwrap();
        populate(&root.path().join("foo"), "old.txt", "old");
        populate(&root.path().join("bar"), "keep.txt", "keep");

        let staging = StagingArea::create(root.path()).unwrap();
        populate(&staging.path().join("foo"), "new.txt", "new");
        let staging_path = staging.path().to_path_buf();

        let reconciler = StagingReconciler::new(root.path());
        let report = reconciler
            .reconcile(staging, &[staged(root.path(), "foo")])
            .unwrap();

        assert!(report.is_clean());
        assert!(!root.path().join("foo/old.txt").exists());
        assert!(root.path().join("foo/new.txt").is_file());
        assert!(root.path().join("bar/keep.txt").is_file());
        assert!(!staging_path.exists());
    }

    #[test]
    fn missing_stale_directory_is_not_a_failure() {
        let root = tempdir().unwrap();
        let staging = StagingArea::create(root.path()).unwrap();
        populate(&staging.path().join("brandnew"), "a.txt", "a");

        let reconciler = StagingReconciler::new(root.path());
        let report = reconciler
            .reconcile(staging, &[staged(root.path(), "brandnew")])
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.removed.len(), 1);
        assert!(root.path().join("brandnew/a.txt").is_file());
    }

    #[test]
    fn empty_batch_just_drops_the_staging_area() {
        let root = tempdir().unwrap();
        let staging = StagingArea::create(root.path()).unwrap();
        let staging_path = staging.path().to_path_buf();

        let reconciler = StagingReconciler::new(root.path());
        let report = reconciler.reconcile(staging, &[]).unwrap();

        assert!(report.is_clean());
        assert!(report.removed.is_empty());
        assert!(report.promoted.is_empty());
        assert!(!staging_path.exists());
    }

    #[test]
    fn failed_promotion_keeps_the_staging_entry_and_continues() {
        let root = tempdir().unwrap();
        populate(&root.path().join("foo"), "old.txt", "old");
        // 'qux' was extracted into staging but its removal was never queued
        // (its installer step did not complete), so its live directory still
        // blocks the rename.
        populate(&root.path().join("qux"), "blocking.txt", "x");

        let staging = StagingArea::create(root.path()).unwrap();
        populate(&staging.path().join("foo"), "new.txt", "new");
        populate(&staging.path().join("qux"), "new.txt", "new");
        let staging_path = staging.path().to_path_buf();

        let reconciler = StagingReconciler::new(root.path());
        let report = reconciler
            .reconcile(staging, &[staged(root.path(), "foo")])
            .unwrap();

        assert!(!report.is_clean());
        assert!(!report.failed_outright());
        assert_eq!(report.promoted.len(), 1);
        assert_eq!(report.failed_promotions.len(), 1);
        // The successful module still landed.
        assert!(root.path().join("foo/new.txt").is_file());
        // The failed entry is preserved for the operator.
        assert!(staging_path.join("qux/new.txt").is_file());
        assert!(staging_path.exists());
    }

    #[test]
    fn repeated_runs_converge_to_the_same_tree() {
        use crate::agents::artifact_installer::STAGING_DIR_NAME;

        let root = tempdir().unwrap();
        populate(&root.path().join("foo"), "module.info", "version: 1.0");

        // Same staging content and selections, twice over.
        for _ in 0..2 {
            let staging = StagingArea::create(root.path()).unwrap();
            populate(&staging.path().join("foo"), "module.info", "version: 2.0");

            let report = StagingReconciler::new(root.path())
                .reconcile(staging, &[staged(root.path(), "foo")])
                .unwrap();
            assert!(report.is_clean());
        }

        let entries: Vec<String> = fs::read_dir(root.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["foo".to_string()]);
        assert_eq!(
            fs::read_to_string(root.path().join("foo/module.info")).unwrap(),
            "version: 2.0"
        );
        assert!(!root.path().join(STAGING_DIR_NAME).exists());
    }

    #[test]
    fn pending_removals_match_staged_installs() {
        let root = tempdir().unwrap();
        populate(&root.path().join("a"), "f", "1");
        populate(&root.path().join("b"), "f", "1");

        let staging = StagingArea::create(root.path()).unwrap();
        populate(&staging.path().join("a"), "f", "2");
        populate(&staging.path().join("b"), "f", "2");

        let batch = vec![staged(root.path(), "a"), staged(root.path(), "b")];
        let reconciler = StagingReconciler::new(root.path());
        let report = reconciler.reconcile(staging, &batch).unwrap();

        // One removal attempt per staged install, never more.
        assert_eq!(report.removed.len() + report.failed_removals.len(), batch.len());
        assert!(report.is_clean());
    }
}
