use anyhow::{Result, anyhow};
use colored::*;

use super::{Command, ShellState};
use crate::{print_bytes, print_line};

/// Number of bytes shown when an entry is not text
const HEX_PREVIEW_LEN: usize = 1024;

pub struct CatCommand;

impl Command for CatCommand {
    fn name(&self) -> &str {
        "cat"
    }

    fn usage(&self) -> &str {
        "cat ENTRY [--raw] - Display entry contents"
    }

    fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let raw = args.iter().any(|a| a == "--raw");
        let name = args
            .iter()
            .find(|a| !a.starts_with("--"))
            .ok_or_else(|| anyhow!("Usage: {}", self.usage()))?;

        let bytes = state
            .session_mut()
            .get_entry(name)?
            .ok_or_else(|| anyhow!("No such entry: {name}"))?;

        if raw || std::str::from_utf8(&bytes).is_ok() {
            print_bytes!(&bytes);
            return Ok(());
        }

        eprintln!("Warning: Entry contains binary data");
        let display_len = bytes.len().min(HEX_PREVIEW_LEN);
        for (row, chunk) in bytes[..display_len].chunks(16).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            print_line!("{:08x}: {}", row * 16, hex.join(" "));
        }
        if bytes.len() > HEX_PREVIEW_LEN {
            eprintln!("... ({} more bytes)", bytes.len() - HEX_PREVIEW_LEN);
        }
        Ok(())
    }
}

pub struct ExistsCommand;

impl Command for ExistsCommand {
    fn name(&self) -> &str {
        "exists"
    }

    fn usage(&self) -> &str {
        "exists ENTRY... - Report whether entries are stored"
    }

    fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: {}", self.usage()));
        }
        for name in args {
            if state.session_mut().entry_exists(name)? {
                print_line!("{name}: {}", "yes".green());
            } else {
                print_line!("{name}: {}", "no".red());
            }
        }
        Ok(())
    }
}
