use crate::agents::catalog_client::Artifact;
use crate::error::{DrupdateError, Result};
use crate::prompt;
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Walks the operator through a module's release artifacts until exactly one
/// is affirmed. Purely interactive; touches neither network nor filesystem.
pub struct ReleaseSelector;

impl ReleaseSelector {
    /// Select against the real terminal.
    pub fn choose_interactive(artifacts: &[Artifact]) -> Result<Artifact> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        Self::choose(&mut input, &mut output, artifacts)
    }

    /// Display the full artifact list, then prompt per artifact in listing
    /// order. Declining everything restarts the cycle; there is no bound on
    /// the number of cycles.
    pub fn choose<R: BufRead, W: Write>(
        input: &mut R,
        output: &mut W,
        artifacts: &[Artifact],
    ) -> Result<Artifact> {
        if artifacts.is_empty() {
            return Err(DrupdateError::EmptyArtifactSet);
        }

        loop {
            writeln!(output, "\n{}", "These are the available project versions:".cyan())?;
            for artifact in artifacts {
                writeln!(output, "  {}", artifact.label)?;
            }
            writeln!(output)?;

            for artifact in artifacts {
                let question = format!("Download {} (y|n)?", artifact.label);
                let answer = prompt::ask_with(input, output, &question)?;
                if prompt::is_affirmative(&answer) {
                    return Ok(artifact.clone());
                }
            }

            writeln!(output, "{}", "End of available files. Recycling...".yellow())?;
        }
    }
}
