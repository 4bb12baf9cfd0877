use std::fmt;
use thiserror::Error;

/// Classification of git failures so the workflow can report them precisely
/// while keeping all of them non-fatal to the module-update result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitFailureKind {
    NotARepository,
    NetworkAuth,
    Other,
}

impl fmt::Display for GitFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GitFailureKind::NotARepository => "not a repository",
            GitFailureKind::NetworkAuth => "network/auth failure",
            GitFailureKind::Other => "other",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum DrupdateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No modules could be resolved under the contrib path")]
    NoModulesResolved,

    #[error("Catalog fetch failed for '{module}': {message}")]
    CatalogFetch { module: String, message: String },

    #[error("Cannot select from an empty artifact set")]
    EmptyArtifactSet,

    #[error("Download failed for '{module}': {message}")]
    Download { module: String, message: String },

    #[error("Extraction failed for '{module}': {message}")]
    Extraction { module: String, message: String },

    #[error(
        "Archive name does not match module '{expected}' (derived '{derived}'); \
         refusing to queue removal of the wrong directory"
    )]
    NameMismatch { expected: String, derived: String },

    #[error("Staging error: {0}")]
    Staging(String),

    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    #[error("Git operation failed ({kind}): {message}")]
    Git {
        kind: GitFailureKind,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, DrupdateError>;
