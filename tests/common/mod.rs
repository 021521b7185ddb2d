// Shared fixtures for the integration tests: an in-memory feed and
// builders for raw submissions.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use clone_finder::clones::RemovalPolicy;
use clone_finder::cycle::CycleSettings;
use clone_finder::feed::{FeedSource, ModAction, QueueItem};
use clone_finder::post::{PostSnapshot, RawSubmission, RemovalHandle};

/// Build a queued submission. `id` names it, `link` is the partner URL it
/// points at, `title` decides its source.
pub fn raw(id: &str, link: &str, flair: Option<&str>, title: &str) -> RawSubmission {
    RawSubmission {
        name: Some(format!("t3_{id}")),
        permalink: Some(permalink(id)),
        url: Some(link.to_string()),
        created_utc: Some(1_664_900_000.0),
        link_flair_text: flair.map(String::from),
        title: Some(title.to_string()),
    }
}

pub fn permalink(id: &str) -> String {
    format!("/r/transcribersofreddit/comments/{id}/post/")
}

pub fn snapshot(id: &str, link: &str, flair: Option<&str>) -> PostSnapshot {
    PostSnapshot::from_raw(&raw(id, link, flair, "Other | Image | \"x\"")).unwrap()
}

pub fn removelink(id: &str) -> ModAction {
    ModAction {
        action: "removelink".to_string(),
        target_permalink: Some(permalink(id)),
    }
}

pub fn settings(roster_path: &Path) -> CycleSettings {
    CycleSettings {
        check_partner_sources: true,
        check_mod_log: false,
        check_mod_queue: false,
        verbose: false,
        poll_interval: Duration::from_secs(0),
        removal: RemovalPolicy::default(),
        roster_path: roster_path.to_path_buf(),
        show_progress: false,
    }
}

pub fn sources(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// A feed that serves whatever the test put in it and records removals.
#[derive(Default)]
pub struct FakeFeed {
    pub page: Mutex<Vec<RawSubmission>>,
    pub mod_log: Mutex<Vec<ModAction>>,
    pub queue: Vec<QueueItem>,
    /// Lookup results by url; urls not listed fail the lookup.
    pub live_state: HashMap<String, Option<String>>,
    /// Fullnames whose removal fails.
    pub failing_removals: HashSet<String>,
    pub fail_fetch: AtomicBool,
    pub removals: Mutex<Vec<(String, Option<String>)>>,
    pub mod_log_fetches: AtomicUsize,
}

impl FakeFeed {
    pub fn with_page(page: Vec<RawSubmission>) -> Self {
        Self {
            page: Mutex::new(page),
            ..Self::default()
        }
    }

    pub fn set_page(&self, page: Vec<RawSubmission>) {
        *self.page.lock().unwrap() = page;
    }

    pub fn removed_fullnames(&self) -> Vec<String> {
        self.removals
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RawSubmission>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            anyhow::bail!("feed unavailable");
        }
        let page = self.page.lock().unwrap();
        Ok(page.iter().take(limit).cloned().collect())
    }

    async fn fetch_mod_log(&self, limit: usize) -> Result<Vec<ModAction>> {
        self.mod_log_fetches.fetch_add(1, Ordering::SeqCst);
        let log = self.mod_log.lock().unwrap();
        Ok(log.iter().take(limit).cloned().collect())
    }

    async fn fetch_mod_queue(&self, limit: usize) -> Result<Vec<QueueItem>> {
        Ok(self.queue.iter().take(limit).cloned().collect())
    }

    async fn removed_by_category(&self, url: &str) -> Result<Option<String>> {
        match self.live_state.get(url) {
            Some(state) => Ok(state.clone()),
            None => anyhow::bail!("Not a reddit submission URL: {url}"),
        }
    }

    async fn remove(&self, handle: &RemovalHandle, note: Option<&str>) -> Result<()> {
        if self.failing_removals.contains(handle.fullname()) {
            anyhow::bail!("reddit returned 500");
        }
        self.removals
            .lock()
            .unwrap()
            .push((handle.fullname().to_string(), note.map(String::from)));
        Ok(())
    }
}
