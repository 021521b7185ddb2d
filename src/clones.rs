// Clone detection: pairwise duplicate scan over a cycle's window.
//
// A clone is a post whose original link matches an earlier post in the same
// window. Clones are grouped under the first-seen post and split by whether
// they carried a label when detected. Unflaired clones come from a known
// upstream flairing failure and are safe to remove automatically; flaired
// clones have no diagnosed cause yet and are always reported so they can be
// inspected by hand.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::feed::FeedSource;
use crate::post::PostSnapshot;
use crate::tracker::PostTracker;

/// Moderator note attached to every automatic clone removal.
pub const REMOVAL_NOTE: &str = "Cloned post. (automatic removal)";

/// Point-in-time classification of a clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneKind {
    Flaired,
    Unflaired,
}

impl CloneKind {
    /// Classify a clone by its label at detection time.
    pub fn classify(clone: &PostSnapshot) -> Self {
        if clone.is_flaired() {
            CloneKind::Flaired
        } else {
            CloneKind::Unflaired
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CloneKind::Flaired => "flaired",
            CloneKind::Unflaired => "unflaired",
        }
    }
}

impl fmt::Display for CloneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CloneKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "flaired" => Ok(CloneKind::Flaired),
            "unflaired" => Ok(CloneKind::Unflaired),
            other => anyhow::bail!("unknown clone kind: {other:?}"),
        }
    }
}

/// Which clone kinds are removed automatically. Both off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalPolicy {
    pub flaired: bool,
    pub unflaired: bool,
}

impl RemovalPolicy {
    /// Build a policy from a kind name: `all`, `flaired` or `unflaired`.
    pub fn from_kind(kind: &str) -> Result<Self> {
        if kind.trim().eq_ignore_ascii_case("all") {
            return Ok(Self {
                flaired: true,
                unflaired: true,
            });
        }
        let kind: CloneKind = kind.parse()?;
        Ok(Self {
            flaired: kind == CloneKind::Flaired,
            unflaired: kind == CloneKind::Unflaired,
        })
    }

    pub fn removes(&self, kind: CloneKind) -> bool {
        match kind {
            CloneKind::Flaired => self.flaired,
            CloneKind::Unflaired => self.unflaired,
        }
    }
}

/// One original post and every clone of it found later in the window.
#[derive(Debug, Clone)]
pub struct CloneGroup {
    original: PostSnapshot,
    flaired: Vec<PostSnapshot>,
    unflaired: Vec<PostSnapshot>,
}

impl CloneGroup {
    pub fn new(original: PostSnapshot) -> Self {
        Self {
            original,
            flaired: Vec::new(),
            unflaired: Vec::new(),
        }
    }

    pub fn add_clone(&mut self, clone: PostSnapshot, kind: CloneKind) {
        match kind {
            CloneKind::Flaired => self.flaired.push(clone),
            CloneKind::Unflaired => self.unflaired.push(clone),
        }
    }

    /// Add a clone classified by name. An unknown kind is logged and the
    /// clone dropped; returns whether it was added.
    pub fn add_clone_kind(&mut self, clone: PostSnapshot, kind: &str) -> bool {
        match kind.parse::<CloneKind>() {
            Ok(kind) => {
                self.add_clone(clone, kind);
                true
            }
            Err(e) => {
                warn!(
                    clone = %clone.absolute_url(),
                    "{e}; clone of {} will be ignored",
                    self.original.absolute_url()
                );
                false
            }
        }
    }

    pub fn original(&self) -> &PostSnapshot {
        &self.original
    }

    pub fn flaired_clones(&self) -> &[PostSnapshot] {
        &self.flaired
    }

    pub fn unflaired_clones(&self) -> &[PostSnapshot] {
        &self.unflaired
    }

    pub fn clone_count(&self) -> usize {
        self.flaired.len() + self.unflaired.len()
    }

    /// Every clone with its kind, flaired first, each list in window order.
    pub fn clones(&self) -> impl Iterator<Item = (CloneKind, &PostSnapshot)> {
        self.flaired
            .iter()
            .map(|c| (CloneKind::Flaired, c))
            .chain(self.unflaired.iter().map(|c| (CloneKind::Unflaired, c)))
    }
}

/// Scan a window for clones.
///
/// Each post is compared only against the posts after it, so every clone is
/// attached to the earliest post sharing its link. A link that has already
/// been grouped (as original or clone) is not scanned again, which keeps it
/// to at most one group per link per cycle.
pub fn detect(window: &[PostSnapshot]) -> Vec<CloneGroup> {
    detect_with_progress(window, &ProgressBar::hidden())
}

/// `detect`, advancing `bar` once per post scanned.
pub fn detect_with_progress(window: &[PostSnapshot], bar: &ProgressBar) -> Vec<CloneGroup> {
    let mut groups = Vec::new();
    let mut seen_links: HashSet<&str> = HashSet::new();

    for (i, post) in window.iter().enumerate() {
        bar.inc(1);
        if !seen_links.insert(post.original_link.as_str()) {
            continue;
        }

        let mut group: Option<CloneGroup> = None;
        for candidate in &window[i + 1..] {
            if candidate == post {
                info!(target: "notify", "Found cloned post.");
                group
                    .get_or_insert_with(|| CloneGroup::new(post.clone()))
                    .add_clone(candidate.clone(), CloneKind::classify(candidate));
            }
        }

        match group {
            Some(group) => groups.push(group),
            None => debug!("Skipping post at: {}.", post.absolute_url()),
        }
    }

    groups
}

/// What `enforce_policy` did with each clone.
#[derive(Debug, Clone, Default)]
pub struct PolicyOutcome {
    /// Permalinks removed from the feed and dropped from the window.
    pub removed: Vec<(CloneKind, String)>,
    /// Permalinks detected but left in place.
    pub kept: Vec<(CloneKind, String)>,
}

impl PolicyOutcome {
    pub fn removed_count(&self, kind: CloneKind) -> usize {
        self.removed.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn kept_count(&self, kind: CloneKind) -> usize {
        self.kept.iter().filter(|(k, _)| *k == kind).count()
    }
}

/// Remove clones whose kind the policy enables; report the rest.
///
/// A removal that fails at the feed is logged and counted as kept: the post
/// stays in the window and will be detected again next cycle.
pub async fn enforce_policy(
    groups: &[CloneGroup],
    policy: &RemovalPolicy,
    feed: &dyn FeedSource,
    tracker: &mut PostTracker,
) -> PolicyOutcome {
    let mut outcome = PolicyOutcome::default();

    for group in groups {
        for (kind, clone) in group.clones() {
            let url = clone.absolute_url();

            if !policy.removes(kind) {
                warn!(
                    target: "clones",
                    kind = kind.as_str(),
                    original = %group.original().absolute_url(),
                    "Not removing {kind} clone at: ({url})."
                );
                outcome.kept.push((kind, clone.permalink.clone()));
                continue;
            }

            match feed.remove(clone.handle(), Some(REMOVAL_NOTE)).await {
                Ok(()) => {
                    tracker.delete_post(&clone.permalink);
                    let message = format!("Removed {kind} clone: {url}");
                    match kind {
                        CloneKind::Flaired => warn!(target: "clones", "{message}"),
                        CloneKind::Unflaired => info!(target: "clones", "{message}"),
                    }
                    outcome.removed.push((kind, clone.permalink.clone()));
                }
                Err(e) => {
                    warn!(error = %e, kind = kind.as_str(), "Failed to remove clone at {url}");
                    outcome.kept.push((kind, clone.permalink.clone()));
                }
            }
        }
    }

    outcome
}
