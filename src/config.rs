use std::collections::HashSet;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use crate::clones::RemovalPolicy;
use crate::roster::ROSTER_FILE_NAME;

/// Seconds between cycles when no valid interval is given.
pub const DEFAULT_WAIT_SECS: u64 = 30;

/// The moderation queue feed this tool watches.
pub const DEFAULT_SUBREDDIT: &str = "transcribersofreddit";

/// How many recent submissions make up one cycle's window.
pub const RECENT_PAGE_SIZE: usize = 750;

/// How many moderation-log entries are checked per cycle.
pub const MOD_LOG_PAGE_SIZE: usize = 750;

/// How many moderation-queue items are checked per cycle.
pub const MOD_QUEUE_PAGE_SIZE: usize = 25;

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars only. The .env file is loaded at startup via
/// dotenvy. Values the CLI can override are kept raw here and resolved
/// with the `parse_*` helpers.
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    /// OAuth API base (defaults to https://oauth.reddit.com).
    pub api_url: String,
    /// Token endpoint base (defaults to https://www.reddit.com).
    pub auth_url: String,
    pub subreddit: String,
    /// Where the roster file lives.
    pub state_dir: PathBuf,
    pub wait: Option<String>,
    pub remove: Option<String>,
    pub sources: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let username = env::var("REDDIT_USERNAME").unwrap_or_default();
        let user_agent = env::var("REDDIT_USER_AGENT").unwrap_or_else(|_| {
            format!(
                "{}:clone-finder:v{} (by /u/{})",
                env::consts::OS,
                env!("CARGO_PKG_VERSION"),
                if username.is_empty() { "unknown" } else { username.as_str() }
            )
        });

        Ok(Self {
            client_id: env::var("REDDIT_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("REDDIT_CLIENT_SECRET").unwrap_or_default(),
            password: env::var("REDDIT_PASSWORD").unwrap_or_default(),
            username,
            user_agent,
            api_url: env::var("REDDIT_API_URL")
                .unwrap_or_else(|_| crate::reddit::client::DEFAULT_API_URL.to_string()),
            auth_url: env::var("REDDIT_AUTH_URL")
                .unwrap_or_else(|_| crate::reddit::client::DEFAULT_AUTH_URL.to_string()),
            subreddit: env::var("CLONE_FINDER_SUBREDDIT")
                .unwrap_or_else(|_| DEFAULT_SUBREDDIT.to_string()),
            state_dir: env::var("CLONE_FINDER_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_state_dir()),
            wait: env::var("CLONE_FINDER_WAIT").ok(),
            remove: env::var("CLONE_FINDER_REMOVE").ok(),
            sources: env::var("CLONE_FINDER_SOURCES").ok(),
        })
    }

    /// Check that script-app credentials are configured.
    /// Call this before anything that talks to reddit.
    pub fn require_reddit(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("REDDIT_CLIENT_ID", &self.client_id),
            ("REDDIT_CLIENT_SECRET", &self.client_secret),
            ("REDDIT_USERNAME", &self.username),
            ("REDDIT_PASSWORD", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            anyhow::bail!(
                "{} not set. Add them to your .env file.\n\
                 These are the credentials of a reddit \"script\" app owned by a moderator account.",
                missing.join(", ")
            );
        }
        Ok(())
    }

    pub fn roster_path(&self) -> PathBuf {
        self.state_dir.join(ROSTER_FILE_NAME)
    }

    /// Create the state directory if it doesn't exist yet.
    pub fn ensure_state_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir).with_context(|| {
            format!("Failed to create state directory: {}", self.state_dir.display())
        })
    }
}

/// Platform config directory: ~/.config/clone-finder/ on Linux.
pub fn default_state_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clone-finder")
}

/// Parse a poll interval in seconds. Missing input gives the default
/// silently; anything that isn't a non-negative integer warns and falls back.
pub fn parse_wait(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return DEFAULT_WAIT_SECS;
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => {
            warn!("Invalid wait value {raw:?}; defaulting to {DEFAULT_WAIT_SECS}.");
            DEFAULT_WAIT_SECS
        }
    }
}

/// Parse a removal kind. Missing input removes nothing; an unknown kind
/// warns and removes nothing.
pub fn parse_removal(raw: Option<&str>) -> RemovalPolicy {
    let Some(raw) = raw else {
        return RemovalPolicy::default();
    };
    match RemovalPolicy::from_kind(raw) {
        Ok(policy) => policy,
        Err(e) => {
            warn!("{e}; no clones will be removed.");
            RemovalPolicy::default()
        }
    }
}

/// Split a partner-source list on commas and whitespace, case-folded.
pub fn parse_sources(raw: &str) -> HashSet<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Ask for partner sources on stdin.
pub fn prompt_sources() -> Result<HashSet<String>> {
    print!("Please enter the subreddits to search for, separated by spaces.\n  >> ");
    io::stdout().flush().context("Failed to flush prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read partner sources from stdin")?;

    let sources = parse_sources(&line);
    if sources.is_empty() {
        anyhow::bail!("No partner sources given.");
    }
    Ok(sources)
}
