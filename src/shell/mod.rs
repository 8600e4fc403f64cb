pub mod commands;

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::SessionOptions;
use crate::session::{ArchiveSession, OpenMode};
use commands::Command;

/// Shell state - owns the archive session and dispatches commands
pub struct ShellState {
    /// Session over the currently open archive, if any
    session: ArchiveSession,
    /// Registered commands
    commands: HashMap<String, Arc<dyn Command>>,
}

impl ShellState {
    /// Create a new shell state with no archive open
    pub fn new(options: SessionOptions) -> Self {
        let mut state = ShellState {
            session: ArchiveSession::with_options(options),
            commands: HashMap::new(),
        };

        state.register_command(Arc::new(commands::open::OpenCommand));
        state.register_command(Arc::new(commands::open::CloseCommand));
        state.register_command(Arc::new(commands::open::StatusCommand));
        state.register_command(Arc::new(commands::add::AddCommand));
        state.register_command(Arc::new(commands::add::AddDirCommand));
        state.register_command(Arc::new(commands::ls::LsCommand));
        state.register_command(Arc::new(commands::cat::CatCommand));
        state.register_command(Arc::new(commands::cat::ExistsCommand));
        state.register_command(Arc::new(commands::extract::ExtractCommand));

        state
    }

    /// Create a shell state and open `archive` right away
    pub fn with_archive(
        options: SessionOptions,
        archive: impl AsRef<Path>,
        mode: OpenMode,
    ) -> Result<Self> {
        let mut state = Self::new(options);
        state.session.open(archive, mode)?;
        Ok(state)
    }

    fn register_command(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name().to_string(), command);
    }

    /// Execute a command line
    pub fn execute(&mut self, line: &str) -> Result<()> {
        let parts = Self::parse_command_line(line.trim())?;

        if parts.is_empty() {
            return Ok(());
        }

        let cmd_name = &parts[0];
        let args = &parts[1..];

        match cmd_name.as_str() {
            "exit" | "quit" => {
                return Err(anyhow!("exit"));
            }
            "help" => {
                self.print_help();
                return Ok(());
            }
            _ => {}
        }

        if let Some(command) = self.commands.get(cmd_name) {
            let cmd = Arc::clone(command);
            cmd.execute(self, args)
        } else {
            Err(anyhow!("Unknown command: {cmd_name}"))
        }
    }

    pub fn session(&self) -> &ArchiveSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ArchiveSession {
        &mut self.session
    }

    /// Close the open archive, if any. Called when the shell exits.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.session.is_open() {
            self.session.close()?;
        }
        Ok(())
    }

    fn print_help(&self) {
        let mut names: Vec<_> = self.commands.values().collect();
        names.sort_by_key(|c| c.name());

        println!("Available commands:");
        for command in names {
            println!("  {}", command.usage());
        }
        println!("  help - Show this help");
        println!("  exit/quit - Close the archive and leave the shell");
    }

    /// Get the prompt string
    pub fn prompt(&self) -> String {
        match (self.session.path(), self.session.mode()) {
            (Some(path), Some(OpenMode::ReadWrite)) => {
                format!("tarkeep:{} (rw) $ ", path.display())
            }
            (Some(path), _) => format!("tarkeep:{} (ro) $ ", path.display()),
            _ => "tarkeep $ ".to_string(),
        }
    }

    /// Parse command line respecting quotes (both single and double)
    fn parse_command_line(line: &str) -> Result<Vec<String>> {
        let mut args = Vec::new();
        let mut current_arg = String::new();
        let mut in_single_quote = false;
        let mut in_double_quote = false;
        let mut escape_next = false;

        for ch in line.chars() {
            if escape_next {
                current_arg.push(ch);
                escape_next = false;
                continue;
            }

            match ch {
                '\\' if !in_single_quote => {
                    escape_next = true;
                }
                '\'' if !in_double_quote => {
                    in_single_quote = !in_single_quote;
                }
                '"' if !in_single_quote => {
                    in_double_quote = !in_double_quote;
                }
                ' ' | '\t' if !in_single_quote && !in_double_quote => {
                    if !current_arg.is_empty() {
                        args.push(std::mem::take(&mut current_arg));
                    }
                }
                _ => {
                    current_arg.push(ch);
                }
            }
        }

        if !current_arg.is_empty() {
            args.push(current_arg);
        }

        if in_single_quote {
            return Err(anyhow!("Unclosed single quote"));
        }
        if in_double_quote {
            return Err(anyhow!("Unclosed double quote"));
        }

        Ok(args)
    }
}
