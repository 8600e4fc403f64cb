use anyhow::Result;
use chrono::DateTime;
use colored::*;

use super::{Command, ShellState};
use crate::archive::{EntryDescriptor, EntryKind};
use crate::print_line;

pub struct LsCommand;

impl Command for LsCommand {
    fn name(&self) -> &str {
        "ls"
    }

    fn usage(&self) -> &str {
        "ls [-l] [PATTERN] - List entries (* and ? wildcards)"
    }

    fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let mut long_format = false;
        let mut pattern: Option<&str> = None;
        for arg in args {
            if arg == "-l" {
                long_format = true;
            } else if !arg.starts_with('-') && pattern.is_none() {
                pattern = Some(arg.as_str());
            }
        }

        let entries = state.session_mut().list_entries()?;
        let shown = entries
            .iter()
            .filter(|e| pattern.is_none_or(|p| matches_pattern(&e.archive_path, p)));

        if long_format {
            print_line!("{:<10} {:>12} {:<20} NAME", "MODE", "SIZE", "MODIFIED");
            print_line!("{}", "-".repeat(80));
            for entry in shown {
                print_line!("{}", format_long(entry));
            }
        } else {
            for entry in shown {
                print_line!("{}", display_name(entry));
            }
        }
        Ok(())
    }
}

fn display_name(entry: &EntryDescriptor) -> ColoredString {
    match entry.kind {
        EntryKind::Directory => entry.archive_path.blue().bold(),
        EntryKind::Other => entry.archive_path.cyan(),
        EntryKind::Regular => entry.archive_path.normal(),
    }
}

fn format_long(entry: &EntryDescriptor) -> String {
    let modified = i64::try_from(entry.mtime)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<10} {:>12} {:<20} {}",
        format_mode(entry),
        humansize::format_size(entry.size, humansize::BINARY),
        modified,
        display_name(entry)
    )
}

/// `ls -l` style permission string, e.g. `-rw-r--r--`
fn format_mode(entry: &EntryDescriptor) -> String {
    let kind = match entry.kind {
        EntryKind::Regular => '-',
        EntryKind::Directory => 'd',
        EntryKind::Other => '?',
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (entry.mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

/// Match a name against a simple wildcard pattern (* and ?)
fn matches_pattern(name: &str, pattern: &str) -> bool {
    let mut name_chars = name.chars().peekable();
    let mut pattern_chars = pattern.chars().peekable();

    loop {
        match (name_chars.peek(), pattern_chars.peek()) {
            (_, Some('*')) => {
                pattern_chars.next();
                // A trailing * matches everything
                if pattern_chars.peek().is_none() {
                    return true;
                }
                let rest: String = pattern_chars.collect();
                loop {
                    if matches_pattern(&name_chars.clone().collect::<String>(), &rest) {
                        return true;
                    }
                    if name_chars.next().is_none() {
                        return false;
                    }
                }
            }
            (Some(_), Some('?')) => {
                name_chars.next();
                pattern_chars.next();
            }
            (Some(n), Some(p)) if n == p => {
                name_chars.next();
                pattern_chars.next();
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}
