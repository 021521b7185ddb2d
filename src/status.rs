// System status display: shows state location, roster size and label tally.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::output::terminal;
use crate::roster::parse_roster_file;

/// Display the persisted state to the terminal.
pub fn show(config: &Config) -> Result<()> {
    println!("State directory: {}", config.state_dir.display());
    println!("Watching: r/{}", config.subreddit);

    let path = config.roster_path();
    if !path.exists() {
        println!("Roster: not written yet");
        println!("\nRun `clone-finder run --check` to start tracking partner posts.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Roster: {} ({})", path.display(), file_size);

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read roster at {}", path.display()))?;
    terminal::display_roster(&parse_roster_file(&contents));

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_format_by_magnitude() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
