use anyhow::{Result, anyhow};
use colored::*;

use super::{Command, ShellState};
use crate::print_line;
use crate::session::OpenMode;

pub struct OpenCommand;

impl Command for OpenCommand {
    fn name(&self) -> &str {
        "open"
    }

    fn usage(&self) -> &str {
        "open ARCHIVE [--rw] - Open an archive (read-only unless --rw)"
    }

    fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let mut read_only = true;
        let mut path: Option<&String> = None;
        for arg in args {
            match arg.as_str() {
                "--rw" | "-w" => read_only = false,
                "--ro" | "-r" => read_only = true,
                _ if path.is_none() => path = Some(arg),
                _ => return Err(anyhow!("Usage: {}", self.usage())),
            }
        }
        let path = path.ok_or_else(|| anyhow!("Usage: {}", self.usage()))?;

        let session = state.session_mut();
        session.open(path, OpenMode::from_read_only(read_only))?;
        if let Some(offset) = session.append_offset() {
            print_line!(
                "Opened {} read-write (appending at byte {offset})",
                path.green()
            );
        } else {
            print_line!("Opened {} read-only", path.green());
        }
        Ok(())
    }
}

pub struct CloseCommand;

impl Command for CloseCommand {
    fn name(&self) -> &str {
        "close"
    }

    fn usage(&self) -> &str {
        "close - Close the open archive"
    }

    fn execute(&self, state: &mut ShellState, _args: &[String]) -> Result<()> {
        state.session_mut().close()?;
        Ok(())
    }
}

pub struct StatusCommand;

impl Command for StatusCommand {
    fn name(&self) -> &str {
        "status"
    }

    fn usage(&self) -> &str {
        "status - Show the open archive and session options"
    }

    fn execute(&self, state: &mut ShellState, _args: &[String]) -> Result<()> {
        let session = state.session();
        match (session.path(), session.mode()) {
            (Some(path), Some(mode)) => {
                let mode = match mode {
                    OpenMode::ReadOnly => "read-only",
                    OpenMode::ReadWrite => "read-write",
                };
                print_line!("archive:    {}", path.display().to_string().green());
                print_line!("mode:       {mode}");
                if let Some(offset) = session.append_offset() {
                    print_line!("append at:  {offset}");
                }
            }
            _ => print_line!("{}", "no archive open".yellow()),
        }
        let options = session.options();
        print_line!("block size: {}", options.block_size);
        print_line!("keep mtime: {}", options.preserve_mtime);
        Ok(())
    }
}
