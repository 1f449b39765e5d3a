//! Output formatting for the command-line host.
//!
//! Human mode prints coloured lines; JSON mode prints one JSON object per
//! event on stdout (messages on stderr) so output can be piped.

use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use std::io::{self, Write};

/// What a command did to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Created,
    Updated,
    Replaced,
    Imported,
    Deleted,
    Unchanged,
    /// Tracked, but the remote object is gone
    Missing,
    Failed,
}

impl ChangeStatus {
    /// Get the colored string representation
    pub fn colored_string(&self) -> String {
        match self {
            ChangeStatus::Created => "created".green().to_string(),
            ChangeStatus::Updated => "updated".yellow().to_string(),
            ChangeStatus::Replaced => "replaced".magenta().to_string(),
            ChangeStatus::Imported => "imported".cyan().to_string(),
            ChangeStatus::Deleted => "deleted".red().to_string(),
            ChangeStatus::Unchanged => "ok".green().to_string(),
            ChangeStatus::Missing => "missing".yellow().bold().to_string(),
            ChangeStatus::Failed => "failed".red().bold().to_string(),
        }
    }

    /// Get the plain string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Created => "created",
            ChangeStatus::Updated => "updated",
            ChangeStatus::Replaced => "replaced",
            ChangeStatus::Imported => "imported",
            ChangeStatus::Deleted => "deleted",
            ChangeStatus::Unchanged => "ok",
            ChangeStatus::Missing => "missing",
            ChangeStatus::Failed => "failed",
        }
    }
}

/// Output formatter for human and JSON modes
pub struct OutputFormatter {
    use_color: bool,
    json_mode: bool,
    verbosity: u8,
}

impl OutputFormatter {
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print the outcome for one resource address
    pub fn resource_result(&self, address: &str, status: ChangeStatus, detail: Option<&str>) {
        if self.json_mode {
            let event = json!({
                "type": "result",
                "address": address,
                "status": status,
                "detail": detail,
            });
            println!("{}", event);
            return;
        }

        let status_str = if self.use_color {
            status.colored_string()
        } else {
            status.as_str().to_string()
        };
        match detail {
            Some(detail) => println!("{}: [{}] {}", status_str, address, detail),
            None => println!("{}: [{}]", status_str, address),
        }
    }

    /// Print a serializable document (rule state, wire body, schema)
    pub fn document<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        let rendered = if self.json_mode {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        println!("{}", rendered);
        Ok(())
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        self.message("error", "ERROR:", message, |s| s.red().bold().to_string());
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        self.message("warning", "WARNING:", message, |s| {
            s.yellow().bold().to_string()
        });
    }

    /// Print a hint message
    pub fn hint(&self, message: &str) {
        self.message("hint", "HINT:", message, |s| s.cyan().bold().to_string());
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }
        self.message("info", "INFO:", message, |s| s.blue().to_string());
    }

    /// Print a debug message (requires higher verbosity)
    pub fn debug(&self, message: &str) {
        if self.verbosity < 2 {
            return;
        }
        self.message("debug", "DEBUG:", message, |s| s.magenta().to_string());
    }

    fn message(&self, kind: &str, prefix: &str, message: &str, paint: fn(&str) -> String) {
        if self.json_mode {
            eprintln!("{}", json!({ "type": kind, "message": message }));
            return;
        }

        if self.use_color {
            eprintln!("{} {}", paint(prefix), message);
        } else {
            eprintln!("{} {}", prefix, message);
        }
    }

    /// Print a table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.json_mode {
            let table = json!({
                "type": "table",
                "headers": headers,
                "rows": rows
            });
            println!("{}", table);
            return;
        }

        // Calculate column widths
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let header_line = headers
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ");

        if self.use_color {
            println!("{}", header_line.bright_white().bold());
        } else {
            println!("{}", header_line);
        }

        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        if self.use_color {
            println!("{}", sep.join("-+-").bright_black());
        } else {
            println!("{}", sep.join("-+-"));
        }

        for row in rows {
            let row_line = row
                .iter()
                .enumerate()
                .filter(|(i, _)| *i < widths.len())
                .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
                .collect::<Vec<_>>()
                .join(" | ");
            println!("{}", row_line.trim_end());
        }
    }

    /// Print a run summary
    pub fn summary(&self, stats: &RunStats) {
        if self.json_mode {
            println!("{}", json!({ "type": "summary", "stats": stats }));
            return;
        }

        let line = format!(
            "{} created, {} updated, {} replaced, {} imported, {} deleted, {} unchanged, {} failed",
            stats.created,
            stats.updated,
            stats.replaced,
            stats.imported,
            stats.deleted,
            stats.unchanged,
            stats.failed
        );
        if self.use_color && stats.failed > 0 {
            println!("\n{}", line.red());
        } else if self.use_color {
            println!("\n{}", line.green());
        } else {
            println!("\n{}", line);
        }
    }

    /// Flush stdout
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

/// Counts of outcomes over one command run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub created: u32,
    pub updated: u32,
    pub replaced: u32,
    pub imported: u32,
    pub deleted: u32,
    pub unchanged: u32,
    pub missing: u32,
    pub failed: u32,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status: ChangeStatus) {
        match status {
            ChangeStatus::Created => self.created += 1,
            ChangeStatus::Updated => self.updated += 1,
            ChangeStatus::Replaced => self.replaced += 1,
            ChangeStatus::Imported => self.imported += 1,
            ChangeStatus::Deleted => self.deleted += 1,
            ChangeStatus::Unchanged => self.unchanged += 1,
            ChangeStatus::Missing => self.missing += 1,
            ChangeStatus::Failed => self.failed += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
