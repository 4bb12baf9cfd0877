pub mod artifact_installer;
pub mod catalog_client;
pub mod release_selector;
pub mod staging_reconciler;
pub mod version_control;

pub use artifact_installer::{ArtifactInstaller, StagedInstall, StagingArea, STAGING_DIR_NAME};
pub use catalog_client::{Artifact, CatalogClient, CatalogListing, Module};
pub use release_selector::ReleaseSelector;
pub use staging_reconciler::{ReconciliationReport, StagingReconciler};
pub use version_control::VersionControlAgent;
