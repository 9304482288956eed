use std::io::{self, Write};

use colored::Colorize;
use log::debug;

use crate::types::{BuildResult, Message};

/// Render a build outcome: warnings first, then errors, then a one-line
/// verdict.
pub fn print_build_report<W: Write>(writer: &mut W, result: &BuildResult) -> io::Result<()> {
    debug!(
        "Rendering build report: {} errors, {} warnings",
        result.errors.len(),
        result.warnings.len()
    );

    for warning in &result.warnings {
        writeln!(writer, "{} {}", "▲ [WARNING]".yellow().bold(), render(warning))?;
    }
    for error in &result.errors {
        writeln!(writer, "{} {}", "✘ [ERROR]".red().bold(), render(error))?;
    }

    if result.success() {
        writeln!(
            writer,
            "{} No banned dependencies in {} modules.",
            "✓".green().bold(),
            result.modules_visited
        )?;
    } else {
        writeln!(
            writer,
            "\n{} Build failed with {} error(s).",
            "✘".red().bold(),
            result.errors.len().to_string().red().bold()
        )?;
    }

    writer.flush()?;
    Ok(())
}

fn render(message: &Message) -> String {
    match &message.plugin_name {
        Some(name) => {
            format!("{} {}", message.text, format!("[plugin: {}]", name).dimmed())
        }
        None => message.text.clone(),
    }
}
