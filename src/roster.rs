// Wanted-post roster: cross-cycle tracking of partner-source posts.
//
// Entries are keyed by original link and keep their label history one step
// deep. The roster is written out only when something drifted since the last
// write, and the file is always rewritten whole.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::feed::{ModAction, ACTION_REMOVE_LINK};
use crate::post::{PostSnapshot, LABEL_COMPLETED, LABEL_REMOVED};

/// File name of the persisted roster inside the state directory.
pub const ROSTER_FILE_NAME: &str = "post_list.txt";

/// What happened to the roster when a snapshot was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Inserted,
    Updated,
}

#[derive(Debug, Default)]
pub struct Roster {
    entries: Vec<PostSnapshot>,
    /// Set by any insertion, deletion or label change; cleared only by a
    /// successful write.
    dirty: bool,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were first observed.
    pub fn entries(&self) -> &[PostSnapshot] {
        &self.entries
    }

    /// The entry tracking `original_link`, if any.
    pub fn get(&self, original_link: &str) -> Option<&PostSnapshot> {
        self.entries.iter().find(|e| e.original_link == original_link)
    }

    /// Track a partner-source snapshot.
    ///
    /// A snapshot equal to an existing entry only moves that entry's label;
    /// anything else becomes a new entry.
    pub fn observe(&mut self, snapshot: &PostSnapshot) -> Observation {
        match self.entries.iter_mut().find(|e| *e == snapshot) {
            Some(entry) => {
                if entry.label() != snapshot.label() {
                    self.dirty = true;
                }
                entry.update_label(snapshot.label().map(String::from));
                Observation::Updated
            }
            None => {
                info!(target: "notify", "Found {} post.", snapshot.source);
                self.entries.push(snapshot.clone());
                self.dirty = true;
                Observation::Inserted
            }
        }
    }

    /// Drop the entry with this permalink. Returns whether one was found.
    pub fn delete_by_permalink(&mut self, permalink: &str) -> bool {
        match self.entries.iter().position(|e| e.permalink == permalink) {
            Some(index) => {
                self.entries.remove(index);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Whether anything was added, deleted or relabelled since the last write.
    pub fn changed(&self) -> bool {
        self.dirty || self.entries.iter().any(PostSnapshot::has_drifted)
    }

    /// Mark entries removed by moderators outside this tool.
    ///
    /// Every `removelink` target is collected first; entries already labelled
    /// completed or already removed are left alone. Returns how many entries
    /// were relabelled.
    pub fn reconcile_mod_log(&mut self, log: &[ModAction]) -> usize {
        let removed: HashSet<&str> = log
            .iter()
            .filter(|entry| entry.action == ACTION_REMOVE_LINK)
            .filter_map(|entry| entry.target_permalink.as_deref())
            .collect();

        debug!(removals = removed.len(), "Collected mod-log removals");

        let mut relabelled = 0;
        for entry in &mut self.entries {
            if matches!(entry.label(), Some(LABEL_COMPLETED | LABEL_REMOVED)) {
                continue;
            }
            if removed.contains(entry.permalink.as_str()) {
                entry.update_label(Some(LABEL_REMOVED.to_string()));
                self.dirty = true;
                relabelled += 1;
            }
        }
        relabelled
    }

    /// Render the roster file: one `source | label | url` line per entry.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{} | {} | {}\n", e.source, e.label_text(), e.absolute_url()))
            .collect()
    }

    /// Overwrite `path` with the roster if it changed.
    ///
    /// Returns whether a write happened. On failure the roster stays marked
    /// as changed so the next attempt writes it.
    pub fn persist(&mut self, path: &Path) -> Result<bool> {
        if !self.changed() {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create roster directory: {}", parent.display())
                })?;
            }
        }

        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write roster to {}", path.display()))?;

        for entry in &mut self.entries {
            entry.settle();
        }
        self.dirty = false;

        info!(entries = self.entries.len(), path = %path.display(), "Roster written");
        Ok(true)
    }
}

/// One line of a persisted roster file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterLine {
    pub source: String,
    pub label: String,
    pub url: String,
}

/// Parse a persisted roster file. Lines that don't have three fields are skipped.
pub fn parse_roster_file(contents: &str) -> Vec<RosterLine> {
    contents
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, " | ");
            let source = parts.next()?;
            let label = parts.next()?;
            let url = parts.next()?;
            Some(RosterLine {
                source: source.to_string(),
                label: label.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}
