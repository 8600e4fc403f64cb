use anyhow::{Result, anyhow};
use colored::*;

use super::{Command, ShellState};
use crate::print_line;
use crate::ui::create_spinner;

pub struct ExtractCommand;

impl Command for ExtractCommand {
    fn name(&self) -> &str {
        "extract"
    }

    fn usage(&self) -> &str {
        "extract DIR [ENTRY...] - Extract all entries, or only the listed ones, into DIR"
    }

    fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let (target, names) = args
            .split_first()
            .ok_or_else(|| anyhow!("Usage: {}", self.usage()))?;
        let filter = (!names.is_empty()).then_some(names);

        let spinner = create_spinner(&format!("Extracting into {target}..."));
        let result = state.session_mut().extract_entries(target, filter);
        spinner.finish_and_clear();
        let summary = result?;

        print_line!(
            "extracted {} ({}), skipped {}, failed {}",
            summary.extracted.to_string().green(),
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
}
