//! Line-oriented terminal prompts for the interactive commands.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};

/// Print `question` and read one trimmed line from stdin. An empty answer
/// yields `default` when one is given.
pub fn ask(question: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", question, d),
        None => print!("{}: ", question),
    }
    std::io::stdout().flush().ok();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    let answer = line.trim();
    if answer.is_empty() {
        if let Some(d) = default {
            return Ok(d.to_string());
        }
    }
    Ok(answer.to_string())
}

/// Ask for a 1-based selection among `count` listed items; returns the
/// 0-based index.
pub fn select(question: &str, count: usize) -> Result<usize> {
    let answer = ask(question, None)?;
    parse_selection(&answer, count)
}

/// `y`/`Y` confirms; anything else declines.
pub fn confirm(question: &str) -> Result<bool> {
    let answer = ask(&format!("{} (y/N)", question), None)?;
    Ok(matches!(answer.as_str(), "y" | "Y"))
}

fn parse_selection(answer: &str, count: usize) -> Result<usize> {
    match answer.parse::<usize>() {
        Ok(n) if n >= 1 && n <= count => Ok(n - 1),
        _ => bail!("invalid selection: '{}'", answer),
    }
}
