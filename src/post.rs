// Post snapshots: the per-cycle record of one queued submission.
//
// A snapshot is built once from the raw listing data and never reads back
// from the live submission afterwards. Its label is the only field that
// changes, and it changes through `update_label` so the previous value is
// kept for drift detection.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Base URL used when rendering a permalink as an absolute post URL.
pub const REDDIT_BASE_URL: &str = "https://reddit.com";

/// Label applied by downstream tooling once a post has been fully handled.
/// Reconciliation never overwrites it.
pub const LABEL_COMPLETED: &str = "Completed!";

/// Label forced onto roster entries removed out-of-band by a moderator.
pub const LABEL_REMOVED: &str = "Removed";

/// How an unset label is written to the roster file and terminal.
pub const UNSET_LABEL_TEXT: &str = "None";

/// A submission as it comes off a listing, before any validation.
///
/// Every field is optional: reddit omits or nulls fields on deleted and
/// partially-indexed posts, and a bad child must not sink the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubmission {
    /// Fullname (`t3_<id>`), used to address moderation calls.
    pub name: Option<String>,
    pub permalink: Option<String>,
    pub url: Option<String>,
    pub created_utc: Option<f64>,
    pub link_flair_text: Option<String>,
    pub title: Option<String>,
}

/// Opaque reference back to the live submission.
///
/// Only ever handed to `FeedSource::remove`; nothing reads post state from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemovalHandle(String);

impl RemovalHandle {
    pub fn new(fullname: impl Into<String>) -> Self {
        Self(fullname.into())
    }

    pub fn fullname(&self) -> &str {
        &self.0
    }
}

/// One submission observed during a cycle fetch.
///
/// Equality is defined solely by `original_link`: two snapshots pointing at
/// the same partner post are clones of each other whatever their permalink,
/// label or source.
#[derive(Debug, Clone)]
pub struct PostSnapshot {
    pub permalink: String,
    pub original_link: String,
    pub created_at: Option<DateTime<Utc>>,
    pub source: String,
    label: Option<String>,
    previous_label: Option<String>,
    handle: RemovalHandle,
}

impl PartialEq for PostSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.original_link == other.original_link
    }
}

impl Eq for PostSnapshot {}

impl PostSnapshot {
    /// Build a snapshot from raw listing data.
    ///
    /// Returns `None` when the submission lacks a fullname, permalink, url or
    /// title: without those it can be neither compared nor removed.
    pub fn from_raw(raw: &RawSubmission) -> Option<Self> {
        let fullname = raw.name.as_deref()?;
        let permalink = raw.permalink.as_deref()?;
        let url = raw.url.as_deref()?;
        let title = raw.title.as_deref()?;

        let created_at = raw.created_utc.and_then(|secs| {
            DateTime::<Utc>::from_timestamp(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
        });

        Some(Self {
            permalink: permalink.to_string(),
            original_link: url.to_string(),
            created_at,
            source: source_from_title(title),
            label: raw.link_flair_text.clone(),
            // Empty rather than unset so a freshly tracked post reads as drifted.
            previous_label: Some(String::new()),
            handle: RemovalHandle::new(fullname),
        })
    }

    /// The current label, `None` when the post is unflaired.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn previous_label(&self) -> Option<&str> {
        self.previous_label.as_deref()
    }

    pub fn is_flaired(&self) -> bool {
        self.label.is_some()
    }

    pub fn handle(&self) -> &RemovalHandle {
        &self.handle
    }

    /// Record a newly observed label, shifting the current one into
    /// `previous_label`.
    pub fn update_label(&mut self, new_label: Option<String>) {
        self.previous_label = std::mem::replace(&mut self.label, new_label);
    }

    /// Whether the label moved on its last update.
    pub fn has_drifted(&self) -> bool {
        self.label != self.previous_label
    }

    /// Mark the current label as the baseline for future drift checks.
    pub fn settle(&mut self) {
        self.previous_label = self.label.clone();
    }

    /// Absolute URL of the queued post itself (not the partner link).
    pub fn absolute_url(&self) -> String {
        absolute_url(&self.permalink)
    }

    /// Label as written to the roster file.
    pub fn label_text(&self) -> &str {
        label_text(self.label.as_deref())
    }
}

/// Derive a post's source from its title: the text before the first `" |"`,
/// case-folded. Titles without the delimiter use the whole title.
pub fn source_from_title(title: &str) -> String {
    title.split(" |").next().unwrap_or_default().to_lowercase()
}

pub fn absolute_url(permalink: &str) -> String {
    format!("{REDDIT_BASE_URL}{permalink}")
}

pub fn label_text(label: Option<&str>) -> &str {
    label.unwrap_or(UNSET_LABEL_TEXT)
}
