mod cli;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use tarkeep::shell::ShellState;
use tarkeep::shell::commands::{self, Command};
use tarkeep::{ArchiveSession, OpenMode, SessionOptions};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let options = cli.session_options();

    match cli.command {
        Commands::Create { archive, dir } => {
            let mut state = open_shell(options, &archive, OpenMode::ReadWrite)?;
            commands::add::AddDirCommand.execute(&mut state, &[path_arg(&dir)])?;
            state.shutdown()?;
        }
        Commands::Append { archive, files } => {
            let mut state = open_shell(options, &archive, OpenMode::ReadWrite)?;
            let args: Vec<String> = files.iter().map(|f| path_arg(f)).collect();
            commands::add::AddCommand.execute(&mut state, &args)?;
            state.shutdown()?;
        }
        Commands::Extract {
            archive,
            target,
            names,
        } => {
            let mut state = open_shell(options, &archive, OpenMode::ReadOnly)?;
            let mut args = vec![path_arg(&target)];
            args.extend(names);
            commands::extract::ExtractCommand.execute(&mut state, &args)?;
            state.shutdown()?;
        }
        Commands::Exists { archive, name } => {
            let mut session = ArchiveSession::with_options(options);
            session
                .open(&archive, OpenMode::ReadOnly)
                .with_context(|| format!("cannot open {}", archive.display()))?;
            let found = session.entry_exists(&name)?;
            session.close()?;
            if !found {
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Cat { archive, name } => {
            let mut state = open_shell(options, &archive, OpenMode::ReadOnly)?;
            commands::cat::CatCommand.execute(&mut state, &[name, "--raw".to_string()])?;
            state.shutdown()?;
        }
        Commands::List { archive, long } => {
            let mut state = open_shell(options, &archive, OpenMode::ReadOnly)?;
            let args = if long { vec!["-l".to_string()] } else { Vec::new() };
            commands::ls::LsCommand.execute(&mut state, &args)?;
            state.shutdown()?;
        }
        Commands::Shell { archive, rw } => {
            let state = match archive {
                Some(archive) => open_shell(options, &archive, OpenMode::from_read_only(!rw))?,
                None => ShellState::new(options),
            };
            run_shell(state)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open_shell(options: SessionOptions, archive: &Path, mode: OpenMode) -> Result<ShellState> {
    ShellState::with_archive(options, archive, mode)
        .with_context(|| format!("cannot open {}", archive.display()))
}

/// Shell commands take string arguments
fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn run_shell(mut state: ShellState) -> Result<()> {
    println!("{}", "=".repeat(60).cyan());
    println!("{}", "  tarkeep - tar archive shell".bold().cyan());
    println!("{}", "=".repeat(60).cyan());
    println!();
    println!("Type 'help' for available commands or 'exit' to quit");
    println!();

    let mut rl = DefaultEditor::new()?;

    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".tarkeep_history");
        p
    });

    if let Some(path) = &history_file {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = state.prompt();

        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                if let Err(e) = state.execute(&line) {
                    if e.to_string() == "exit" {
                        break;
                    }
                    eprintln!("{} {:#}", "Error:".red().bold(), e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red().bold(), err);
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        let _ = rl.save_history(path);
    }

    state.shutdown()?;
    println!("Goodbye!");
    Ok(())
}
