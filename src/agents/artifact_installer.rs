use crate::agents::catalog_client::{Artifact, Module};
use crate::error::{DrupdateError, Result};
use colored::Colorize;
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tar::Archive;

/// Name of the scratch directory created under the install root. Must never
/// collide with a module name; the workflow checks this at resolution time.
pub const STAGING_DIR_NAME: &str = ".tmp-drupdate";

/// The single scratch directory a pipeline run downloads and extracts into.
/// Created once at run start, removed once by the reconciler.
#[derive(Debug)]
pub struct StagingArea {
    path: PathBuf,
}

impl StagingArea {
    /// Create `<install_root>/.tmp-drupdate`. An already-existing staging
    /// directory means a previous run was interrupted; the operator has to
    /// inspect and remove it rather than have this run silently reuse it.
    pub fn create(install_root: &Path) -> Result<Self> {
        let path = install_root.join(STAGING_DIR_NAME);
        match fs::create_dir(&path) {
            Ok(()) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(DrupdateError::Staging(format!(
                    "staging directory '{}' already exists (leftover from an \
                     interrupted run?); remove it and retry",
                    path.display()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A module whose replacement has been fully extracted into the staging
/// area. The stale path is the pending removal; nothing is deleted until
/// every module has finished its download/extract phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInstall {
    pub module_name: String,
    pub stale_path: PathBuf,
}

/// Downloads a chosen artifact into the staging area and extracts it there.
pub struct ArtifactInstaller {
    client: Client,
    install_root: PathBuf,
}

impl ArtifactInstaller {
    pub fn new(install_root: &Path) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("drupdate")
            .build()?;

        Ok(Self {
            client,
            install_root: install_root.to_path_buf(),
        })
    }

    /// Download, validate, and extract one artifact. Single attempt, no
    /// retry; any failure here fails this module only.
    pub fn install(
        &self,
        module: &Module,
        artifact: &Artifact,
        staging: &StagingArea,
    ) -> Result<StagedInstall> {
        let archive_name = archive_file_name(&artifact.download_url).ok_or_else(|| {
            DrupdateError::Download {
                module: module.name.clone(),
                message: format!("no file name in URL '{}'", artifact.download_url),
            }
        })?;

        // The stale-path removal target is derived from the archive name,
        // assuming the catalog names archives `<module>-<version>...`. A
        // mismatch (hyphenated module name, changed convention) would queue
        // removal of the wrong directory, so it is checked before anything
        // lands in the staging area.
        let derived = derive_module_name(&archive_name);
        if derived != module.name {
            return Err(DrupdateError::NameMismatch {
                expected: module.name.clone(),
                derived: derived.to_string(),
            });
        }

        let archive_path = staging.path().join(&archive_name);
        self.download(module, &artifact.download_url, &archive_path)?;
        self.stage_archive(module, &archive_path)
    }

    /// Extract a downloaded archive into the staging area and discard the
    /// compressed file. Split out from `install` so the extraction path is
    /// exercisable without a network.
    pub fn stage_archive(&self, module: &Module, archive_path: &Path) -> Result<StagedInstall> {
        let staging_dir = archive_path
            .parent()
            .ok_or_else(|| DrupdateError::Staging("archive path has no parent".to_string()))?;

        extract_tar_gz(archive_path, staging_dir).map_err(|e| DrupdateError::Extraction {
            module: module.name.clone(),
            message: e.to_string(),
        })?;

        // Space reclamation only; a leftover archive is harmless until the
        // bulk move, where it would be promoted alongside the module dirs,
        // so warn when it sticks around.
        if let Err(e) = fs::remove_file(archive_path) {
            eprintln!(
                "{} could not remove '{}': {e}",
                "[!] Warning:".yellow(),
                archive_path.display()
            );
        }

        Ok(StagedInstall {
            module_name: module.name.clone(),
            stale_path: self.install_root.join(&module.name),
        })
    }

    fn download(&self, module: &Module, url: &str, target: &Path) -> Result<()> {
        let mut response =
            self.client
                .get(url)
                .send()
                .map_err(|e| DrupdateError::Download {
                    module: module.name.clone(),
                    message: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DrupdateError::Download {
                module: module.name.clone(),
                message: format!("HTTP {status} from {url}"),
            });
        }

        let total = response.content_length().unwrap_or(0);
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {msg} [{bar:40}] {bytes}/{total_bytes}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_message(format!("Downloading {}", module.name));

        let file = fs::File::create(target)?;
        let mut writer = pb.wrap_write(file);
        response
            .copy_to(&mut writer)
            .map_err(|e| DrupdateError::Download {
                module: module.name.clone(),
                message: e.to_string(),
            })?;
        pb.finish_and_clear();

        Ok(())
    }
}

/// Substring of the archive file name before the first hyphen. The catalog's
/// `<module>-<version>.tar.gz` convention makes this the module name.
pub fn derive_module_name(archive_name: &str) -> &str {
    archive_name.split('-').next().unwrap_or(archive_name)
}

fn archive_file_name(url: &str) -> Option<String> {
    let name = url.rsplit('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> std::io::Result<()> {
    let file = fs::File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);
    archive.unpack(dest)
}
