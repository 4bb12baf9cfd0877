use crate::error::{DrupdateError, Result};
use regex::Regex;
use reqwest::blocking::Client;
use std::time::Duration;
use url::Url;

/// Project listing pages live under this base; the trailing slash is part of
/// the URL scheme and is asserted at construction.
const CATALOG_BASE_URL: &str = "https://www.drupal.org/project/";

/// Every release artifact on a project page is served from here. Labels are
/// derived by stripping this prefix, so a href without it is a parse error,
/// not something to slice blindly.
const ARTIFACT_URL_PREFIX: &str = "https://ftp.drupal.org/files/projects/";

const MAX_PAGE_BYTES: usize = 10 * 1024 * 1024;

/// A contrib module scheduled for update. Identity is the name; the catalog
/// URL is fixed at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub catalog_url: String,
}

/// One downloadable release, in catalog page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub label: String,
    pub download_url: String,
}

/// Result of querying the catalog for one module. `Found(vec![])` means the
/// page exists but lists nothing downloadable, which is distinct from the
/// project not existing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogListing {
    NotFound,
    Found(Vec<Artifact>),
}

/// Client for the drupal.org project catalog.
#[derive(Debug)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    artifact_prefix: String,
    download_cell: Regex,
    anchor_href: Regex,
}

impl CatalogClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(CATALOG_BASE_URL, ARTIFACT_URL_PREFIX)
    }

    /// Construct against a different catalog location (used by tests).
    pub fn with_base_url(base_url: &str, artifact_prefix: &str) -> Result<Self> {
        Self::validate_base_url(base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("drupdate")
            .build()?;

        // Cells tagged as Download cells, then the first anchor inside each.
        let download_cell = Regex::new(r#"(?s)<td[^>]*data-th="Download"[^>]*>(.*?)</td>"#)
            .map_err(|e| DrupdateError::Config(format!("Invalid cell pattern: {e}")))?;
        let anchor_href = Regex::new(r#"<a[^>]*href="([^"]+)""#)
            .map_err(|e| DrupdateError::Config(format!("Invalid anchor pattern: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            artifact_prefix: artifact_prefix.to_string(),
            download_cell,
            anchor_href,
        })
    }

    /// Bind a module name to its catalog page URL.
    pub fn resolve_module(&self, name: &str) -> Module {
        Module {
            name: name.to_string(),
            catalog_url: format!("{}{}", self.base_url, name),
        }
    }

    /// Fetch and parse one module's listing page. A 404-class response maps
    /// to `NotFound`; any other failure is an error scoped to this module.
    pub fn fetch_listing(&self, module: &Module) -> Result<CatalogListing> {
        if std::env::var("DRUPDATE_VERBOSE").is_ok() {
            eprintln!("[VERBOSE] Fetching: {}", module.catalog_url);
        }

        let response = self
            .client
            .get(&module.catalog_url)
            .send()
            .map_err(|e| DrupdateError::CatalogFetch {
                module: module.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_client_error() {
            return Ok(CatalogListing::NotFound);
        }
        if !status.is_success() {
            return Err(DrupdateError::CatalogFetch {
                module: module.name.clone(),
                message: format!("HTTP {status} from {}", module.catalog_url),
            });
        }

        let body = response.text().map_err(|e| DrupdateError::CatalogFetch {
            module: module.name.clone(),
            message: e.to_string(),
        })?;

        if body.len() > MAX_PAGE_BYTES {
            return Err(DrupdateError::CatalogFetch {
                module: module.name.clone(),
                message: "catalog page exceeded 10MB limit".to_string(),
            });
        }

        let artifacts =
            self.extract_artifacts(&body)
                .map_err(|message| DrupdateError::CatalogFetch {
                    module: module.name.clone(),
                    message,
                })?;

        Ok(CatalogListing::Found(artifacts))
    }

    /// Pull every Download cell's anchor target out of the page body, in
    /// document order. No de-duplication, no re-sorting.
    fn extract_artifacts(&self, body: &str) -> std::result::Result<Vec<Artifact>, String> {
        let mut artifacts = Vec::new();

        for cell in self.download_cell.captures_iter(body) {
            let cell_html = &cell[1];
            let Some(anchor) = self.anchor_href.captures(cell_html) else {
                continue;
            };
            let download_url = anchor[1].to_string();

            let label = download_url
                .strip_prefix(&self.artifact_prefix)
                .ok_or_else(|| {
                    format!(
                        "download URL '{download_url}' does not start with '{}'; \
                         the catalog URL scheme may have changed",
                        self.artifact_prefix
                    )
                })?
                .to_string();

            artifacts.push(Artifact {
                label,
                download_url,
            });
        }

        Ok(artifacts)
    }

    fn validate_base_url(base_url: &str) -> Result<()> {
        let parsed = Url::parse(base_url)
            .map_err(|_| DrupdateError::Config(format!("Invalid catalog base URL: {base_url}")))?;

        match parsed.scheme() {
            "https" | "http" => {}
            scheme => {
                return Err(DrupdateError::Config(format!(
                    "Unsupported catalog URL scheme: {scheme}"
                )));
            }
        }

        if !base_url.ends_with('/') {
            return Err(DrupdateError::Config(format!(
                "Catalog base URL must end with '/': {base_url}"
            )));
        }

        Ok(())
    }
}
