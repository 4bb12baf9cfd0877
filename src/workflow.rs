use crate::agents::{
    ArtifactInstaller, CatalogClient, CatalogListing, Module, ReconciliationReport,
    ReleaseSelector, StagedInstall, StagingArea, StagingReconciler, VersionControlAgent,
    STAGING_DIR_NAME,
};
use crate::config::{ModuleSelection, RunConfig};
use crate::error::{DrupdateError, Result};
use crate::prompt;
use colored::Colorize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Terminal state of a single module within a run. Every module reaches one
/// of these without aborting the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    Installed,
    SkippedNotFound,
    SkippedNoArtifacts,
    Failed(String),
}

impl fmt::Display for ModuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleOutcome::Installed => write!(f, "installed"),
            ModuleOutcome::SkippedNotFound => write!(f, "skipped (not found remotely)"),
            ModuleOutcome::SkippedNoArtifacts => write!(f, "skipped (no releases listed)"),
            ModuleOutcome::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// What the run did, per module.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(String, ModuleOutcome)>,
}

impl RunSummary {
    pub fn installed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ModuleOutcome::Installed))
            .count()
    }
}

/// Execute the whole update pipeline: resolve modules, process each one
/// sequentially, then reconcile the staging area against the live tree in a
/// single batch at the end.
pub fn execute_update(config: &RunConfig) -> Result<RunSummary> {
    println!("{}", "Starting contrib module update...".cyan().bold());

    // Step 1: Validate the contrib path
    println!("\n{}", "1. Validating contrib path...".yellow());
    let install_root =
        crate::utils::path_validator::PathValidator::validate_install_root(&config.install_root)?;
    println!("{}", format!("✓ Using {}", install_root.display()).green());

    // Step 2: Create the review branch (non-fatal on failure)
    let review_branch = if config.git_enabled {
        println!("\n{}", "2. Creating git review branch...".yellow());
        create_review_branch(&install_root, config)
    } else {
        println!("\n{}", "2. Git workflow disabled, skipping".yellow());
        None
    };

    // Step 3: Resolve the module set
    println!("\n{}", "3. Resolving modules to update...".yellow());
    let catalog = CatalogClient::new()?;
    let modules = resolve_modules(&catalog, &install_root, &config.modules)?;
    if modules.is_empty() {
        return Err(DrupdateError::NoModulesResolved);
    }
    println!("{}", format!("✓ {} module(s) to check", modules.len()).green());

    // Step 4: Create the staging area
    println!("\n{}", "4. Creating staging area...".yellow());
    let staging = StagingArea::create(&install_root)?;
    println!(
        "{}",
        format!("✓ Staging at {}", staging.path().display()).green()
    );

    // Step 5: Process each module (no removals happen in this phase)
    println!("\n{}", "5. Processing modules...".yellow());
    let installer = ArtifactInstaller::new(&install_root)?;
    let mut summary = RunSummary::default();
    let mut staged: Vec<StagedInstall> = Vec::new();

    for module in &modules {
        let outcome = process_module(&catalog, &installer, &staging, module, &mut staged)?;
        summary.outcomes.push((module.name.clone(), outcome));
    }

    // Step 6: Reconcile the staging area with the live tree
    println!("\n{}", "6. Reconciling staged modules...".yellow());
    let reconciler = StagingReconciler::new(&install_root);
    let report = reconciler.reconcile(staging, &staged)?;
    print_reconciliation_report(&report);
    if report.failed_outright() {
        return Err(DrupdateError::Reconciliation(
            "no staged module could be promoted into the contrib path".to_string(),
        ));
    }

    // Step 7: Offer to commit and push the review branch (non-fatal)
    if config.git_enabled && summary.installed_count() > 0 {
        println!("\n{}", "7. Finalizing git branch...".yellow());
        finalize_review_branch(&install_root, review_branch.as_deref());
    }

    print_summary(&summary);
    Ok(summary)
}

/// Expand the configured selection into concrete modules. `All` takes every
/// non-hidden subdirectory of the contrib path; an explicit list is kept in
/// the order given.
fn resolve_modules(
    catalog: &CatalogClient,
    install_root: &Path,
    selection: &ModuleSelection,
) -> Result<Vec<Module>> {
    let names = match selection {
        ModuleSelection::Explicit(names) => {
            if let Some(clash) = names.iter().find(|name| *name == STAGING_DIR_NAME) {
                return Err(DrupdateError::Config(format!(
                    "module name '{clash}' collides with the staging directory"
                )));
            }
            names.clone()
        }
        ModuleSelection::All => {
            let mut names = Vec::new();
            for entry in fs::read_dir(install_root)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    continue;
                }
                names.push(name);
            }
            names.sort();
            names
        }
    };

    Ok(names
        .iter()
        .map(|name| catalog.resolve_module(name))
        .collect())
}

/// Drive one module through fetch, selection, and staging. Only operator
/// input errors propagate; everything else becomes this module's outcome.
fn process_module(
    catalog: &CatalogClient,
    installer: &ArtifactInstaller,
    staging: &StagingArea,
    module: &Module,
    staged: &mut Vec<StagedInstall>,
) -> Result<ModuleOutcome> {
    println!("\n{}", format!("[*] Project: {}", module.name).cyan().bold());

    let listing = match catalog.fetch_listing(module) {
        Ok(listing) => listing,
        Err(e) => {
            println!("{} {e}", "[!]".red());
            println!("{}", "[-] Skipping!".yellow());
            return Ok(ModuleOutcome::Failed(e.to_string()));
        }
    };

    let artifacts = match listing {
        CatalogListing::NotFound => {
            println!(
                "{}",
                format!("[!] WARNING: Could not find project at {}", module.catalog_url).red()
            );
            println!("{}", "[-] Skipping!".yellow());
            return Ok(ModuleOutcome::SkippedNotFound);
        }
        CatalogListing::Found(artifacts) if artifacts.is_empty() => {
            println!(
                "{}",
                format!("[!] No downloadable releases listed for {}", module.name).yellow()
            );
            println!("{}", "[-] Skipping!".yellow());
            return Ok(ModuleOutcome::SkippedNoArtifacts);
        }
        CatalogListing::Found(artifacts) => artifacts,
    };

    // Operator input failures (closed stdin) abort the run; nothing
    // destructive has happened yet.
    let artifact = match ReleaseSelector::choose_interactive(&artifacts) {
        Ok(artifact) => artifact,
        Err(e @ DrupdateError::Io(_)) => return Err(e),
        Err(e) => {
            println!("{} {e}", "[!]".red());
            return Ok(ModuleOutcome::Failed(e.to_string()));
        }
    };

    match installer.install(module, &artifact, staging) {
        Ok(install) => {
            staged.push(install);
            println!("{}", format!("✓ Staged {}", artifact.label).green());
            Ok(ModuleOutcome::Installed)
        }
        Err(e) => {
            println!("{} {e}", "[!]".red());
            println!("{}", "[-] Module failed, continuing with the rest".yellow());
            Ok(ModuleOutcome::Failed(e.to_string()))
        }
    }
}

fn create_review_branch(install_root: &Path, config: &RunConfig) -> Option<String> {
    let username = config.git_username.as_deref()?;

    let agent = match VersionControlAgent::new(install_root) {
        Ok(agent) => agent,
        Err(e) => {
            println!("{} {e}", "[!]".red());
            println!("{}", "Continuing without a git branch.".yellow());
            return None;
        }
    };

    match agent.create_update_branch(username) {
        Ok(branch) => {
            println!("{}", format!("✓ New git branch: {branch}").green());
            Some(branch)
        }
        Err(e) => {
            println!("{} {e}", "[!]".red());
            println!("{}", "Continuing without a git branch.".yellow());
            None
        }
    }
}

/// Interactive add/commit/push of the review branch. Any failure in the
/// chain is reported and the run still counts its module updates as done.
fn finalize_review_branch(install_root: &Path, review_branch: Option<&str>) {
    let result = (|| -> Result<()> {
        let agent = VersionControlAgent::new(install_root)?;
        let branch = match review_branch {
            Some(branch) => branch.to_string(),
            None => agent.current_branch()?,
        };

        let push = prompt::confirm(&format!(
            "You are currently on branch {branch}.\n\
             Would you like to git add and git push this branch (y|n)?"
        ))?;
        if !push {
            println!("{}", "Leaving the branch unpushed.".yellow());
            return Ok(());
        }

        agent.stage_all()?;
        let message = prompt::ask_required("Enter a commit message:")?;
        agent.commit(&message)?;
        agent.push_upstream(&branch)?;
        println!("{}", format!("✓ Pushed branch {branch}").green());
        Ok(())
    })();

    if let Err(e) = result {
        println!("{} {e}", "[!]".red());
        println!(
            "{}",
            "Module updates succeeded; finish the git workflow manually.".yellow()
        );
    }
}

fn print_reconciliation_report(report: &ReconciliationReport) {
    for path in &report.removed {
        println!("  {} removed {}", "✓".green(), path.display());
    }
    for (path, reason) in &report.failed_removals {
        println!(
            "  {} could not remove {}: {reason}",
            "✗".red(),
            path.display()
        );
    }
    for path in &report.promoted {
        println!("  {} promoted {}", "✓".green(), path.display());
    }
    for (path, reason) in &report.failed_promotions {
        println!(
            "  {} could not promote {}: {reason}",
            "✗".red(),
            path.display()
        );
    }

    if report.is_clean() {
        println!("{}", "✓ Reconciliation complete".green());
    } else {
        println!(
            "{}",
            "⚠ Reconciliation was partial; review the entries above".red()
        );
        if !report.staging_removed {
            println!(
                "{}",
                "⚠ The staging directory was kept so failed entries can be recovered".yellow()
            );
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n{}", "Update Summary:".cyan().bold());
    for (name, outcome) in &summary.outcomes {
        let line = format!("  • {name}: {outcome}");
        match outcome {
            ModuleOutcome::Installed => println!("{}", line.green()),
            ModuleOutcome::Failed(_) => println!("{}", line.red()),
            _ => println!("{}", line.yellow()),
        }
    }
    println!(
        "{}",
        format!("{} module(s) updated", summary.installed_count()).bold()
    );
}
