use crate::error::{DrupdateError, Result};
use std::path::{Path, PathBuf};

/// Safety checks for the contrib install root before anything destructive
/// runs against it.
pub struct PathValidator;

impl PathValidator {
    /// Validates and canonicalises the install root.
    pub fn validate_install_root(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            DrupdateError::Config(format!("Invalid contrib path '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(DrupdateError::Config(format!(
                "Contrib path '{}' is not a directory",
                canonical.display()
            )));
        }

        const FORBIDDEN: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

        for forbidden in FORBIDDEN {
            let forbidden_path = Path::new(forbidden);

            if path.starts_with(forbidden_path) || canonical.starts_with(forbidden_path) {
                return Err(DrupdateError::Config(format!(
                    "Refusing to operate inside system directory '{forbidden}'"
                )));
            }
        }

        Ok(canonical)
    }
}
