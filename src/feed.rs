// Feed source trait: everything the engine needs from the remote feed.
//
// The cycle controller and reconcilers only ever talk to this trait, so the
// whole engine runs against an in-memory feed in tests. The production
// implementation is `reddit::client::RedditClient`.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::post::{RawSubmission, RemovalHandle};

/// Moderation-log action name for a submission removal.
pub const ACTION_REMOVE_LINK: &str = "removelink";

/// One moderation-log entry. Only the action and its target matter here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModAction {
    #[serde(default)]
    pub action: String,
    pub target_permalink: Option<String>,
}

/// An item waiting in the moderation queue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueItem {
    /// Fullname of the queued thing (`t3_` submission, `t1_` comment).
    pub name: String,
    /// Link the item points to. Comments carry none.
    pub url: Option<String>,
    pub permalink: Option<String>,
}

impl QueueItem {
    pub fn handle(&self) -> RemovalHandle {
        RemovalHandle::new(self.name.clone())
    }
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Most recent submissions, newest first, at most `limit` of them.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RawSubmission>>;

    /// Most recent moderation-log entries, at most `limit` of them.
    async fn fetch_mod_log(&self, limit: usize) -> Result<Vec<ModAction>>;

    /// Items currently in the moderation queue, at most `limit` of them.
    async fn fetch_mod_queue(&self, limit: usize) -> Result<Vec<QueueItem>>;

    /// Look up the live removal state of the submission at `url`.
    ///
    /// Returns `Ok(None)` when the submission is live, `Ok(Some(category))`
    /// when it has been removed, and an error when `url` does not address a
    /// submission this feed can look up.
    async fn removed_by_category(&self, url: &str) -> Result<Option<String>>;

    /// Remove a submission, attaching `note` as the moderator note.
    ///
    /// Must be idempotent: removing an already-removed item is not an error.
    async fn remove(&self, handle: &RemovalHandle, note: Option<&str>) -> Result<()>;
}
