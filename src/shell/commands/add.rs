use anyhow::{Result, anyhow};
use colored::*;

use super::{Command, ShellState};
use crate::print_line;
use crate::session::AddSummary;
use crate::ui::create_spinner;

fn report(summary: &AddSummary) -> Result<()> {
    print_line!(
        "added {} ({}), skipped {}, failed {}",
        summary.added.to_string().green(),
        humansize::format_size(summary.bytes, humansize::BINARY),
        summary.skipped,
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        }
    );
    Ok(())
}

pub struct AddCommand;

impl Command for AddCommand {
    fn name(&self) -> &str {
        "add"
    }

    fn usage(&self) -> &str {
        "add FILE... - Append files under their base names"
    }

    fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: {}", self.usage()));
        }
        let summary = state.session_mut().add_entries(args)?;
        report(&summary)
    }
}

pub struct AddDirCommand;

impl Command for AddDirCommand {
    fn name(&self) -> &str {
        "add-dir"
    }

    fn usage(&self) -> &str {
        "add-dir DIR - Append every file under DIR, named relative to DIR"
    }

    fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let [dir] = args else {
            return Err(anyhow!("Usage: {}", self.usage()));
        };

        let spinner = create_spinner(&format!("Archiving {dir}..."));
        let result = state.session_mut().add_folder(dir);
        spinner.finish_and_clear();

        report(&result?)
    }
}
