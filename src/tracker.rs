// Post tracker: the engine state carried from cycle to cycle.
//
// Owns the cycle window, the skip pointer and the wanted-post roster. Only
// the window is per-cycle; `clean` empties it and leaves everything else.

use std::collections::HashSet;

use tracing::debug;

use crate::post::{PostSnapshot, RawSubmission};
use crate::roster::Roster;

#[derive(Debug, Default)]
pub struct PostTracker {
    window: Vec<PostSnapshot>,
    roster: Roster,
    first_permalink: Option<String>,
    /// Case-folded partner sources; `None` when partner tracking is off.
    partner_sources: Option<HashSet<String>>,
}

impl PostTracker {
    /// Create a tracker. Pass `None` to disable partner-source tracking.
    pub fn new(partner_sources: Option<HashSet<String>>) -> Self {
        let partner_sources = partner_sources
            .map(|sources| sources.into_iter().map(|s| s.to_lowercase()).collect());
        Self {
            partner_sources,
            ..Self::default()
        }
    }

    /// Whether this page starts with the same post as the last processed one.
    ///
    /// Only the first element is inspected. On a skip nothing is updated;
    /// otherwise the new first permalink is remembered. An empty page is
    /// always a skip.
    pub fn check_skip(&mut self, page: &[RawSubmission]) -> bool {
        let Some(first) = page.first() else {
            return true;
        };
        let Some(permalink) = first.permalink.as_deref() else {
            return false;
        };

        if self.first_permalink.as_deref() == Some(permalink) {
            return true;
        }
        self.first_permalink = Some(permalink.to_string());
        false
    }

    pub fn first_permalink(&self) -> Option<&str> {
        self.first_permalink.as_deref()
    }

    /// Append a fetched submission to the window, tracking it in the roster
    /// if it comes from a partner source.
    ///
    /// Returns `false` when the submission was malformed and skipped.
    pub fn add_post(&mut self, raw: &RawSubmission) -> bool {
        let Some(snapshot) = PostSnapshot::from_raw(raw) else {
            debug!(permalink = ?raw.permalink, "Skipping malformed submission");
            return false;
        };

        if self.is_partner(&snapshot.source) {
            self.roster.observe(&snapshot);
        }
        self.window.push(snapshot);
        true
    }

    pub fn is_partner(&self, source: &str) -> bool {
        self.partner_sources
            .as_ref()
            .is_some_and(|sources| sources.contains(source))
    }

    pub fn tracks_partners(&self) -> bool {
        self.partner_sources.is_some()
    }

    /// The current window in fetch order.
    pub fn window(&self) -> &[PostSnapshot] {
        &self.window
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    /// Drop a removed post from the window and the roster.
    pub fn delete_post(&mut self, permalink: &str) {
        if let Some(index) = self.window.iter().position(|p| p.permalink == permalink) {
            self.window.remove(index);
        }
        self.roster.delete_by_permalink(permalink);
    }

    /// Empty the window at the end of a cycle.
    pub fn clean(&mut self) {
        self.window.clear();
    }
}
