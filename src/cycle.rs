// Cycle controller: one fetch, detect, reconcile, persist pass, and the
// poll loop that repeats it.
//
// Each cycle:
// 1. Fetches the newest page of the queue
// 2. Skips the rest if the page starts where the last one did
// 3. Builds the window (tracking partner posts in the roster on the way)
// 4. Detects clones and applies the removal policy
// 5. Reconciles the roster against the mod log and sweeps the mod queue
// 6. Writes the roster if it changed
//
// The window is emptied after every cycle, including failed and skipped ones.
// The roster is written at most once per cycle, after everything else, so an
// interrupted or failed cycle never leaves a half-updated file behind.

use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::clones::{self, CloneGroup, PolicyOutcome, RemovalPolicy};
use crate::config::{MOD_LOG_PAGE_SIZE, MOD_QUEUE_PAGE_SIZE, RECENT_PAGE_SIZE};
use crate::feed::FeedSource;
use crate::modqueue::{self, QueueSweep};
use crate::output::terminal;
use crate::tracker::PostTracker;

/// Everything a cycle needs to know about how it should behave.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub check_partner_sources: bool,
    pub check_mod_log: bool,
    pub check_mod_queue: bool,
    pub verbose: bool,
    pub poll_interval: Duration,
    pub removal: RemovalPolicy,
    pub roster_path: PathBuf,
    /// Draw progress bars. Off in tests and when output isn't a terminal.
    pub show_progress: bool,
}

/// What one cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub skipped: bool,
    pub fetched: usize,
    pub malformed: usize,
    pub groups: Vec<CloneGroup>,
    pub policy: PolicyOutcome,
    /// Roster entries relabelled as removed from the mod log.
    pub mod_log_removals: usize,
    pub queue: Option<QueueSweep>,
    pub roster_entries: usize,
    pub roster_written: bool,
    /// Set when the roster write failed; the cycle itself still completed.
    pub roster_error: Option<String>,
}

pub struct CycleController {
    settings: CycleSettings,
    tracker: PostTracker,
}

impl CycleController {
    /// Create a controller. `partner_sources` is ignored unless partner
    /// checking is enabled in `settings`.
    pub fn new(settings: CycleSettings, partner_sources: HashSet<String>) -> Self {
        let tracker =
            PostTracker::new(settings.check_partner_sources.then_some(partner_sources));
        Self { settings, tracker }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub fn tracker(&self) -> &PostTracker {
        &self.tracker
    }

    /// Run one cycle against `feed`. The window is always empty afterwards.
    ///
    /// Errors from fetching abort the cycle and are returned; a failed roster
    /// write is reported in the result instead.
    pub async fn run_cycle(&mut self, feed: &dyn FeedSource) -> Result<CycleReport> {
        let result = self.process(feed).await;
        self.tracker.clean();
        result
    }

    async fn process(&mut self, feed: &dyn FeedSource) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        info!("Fetching posts...");
        let page = feed.fetch_recent(RECENT_PAGE_SIZE).await?;
        report.fetched = page.len();

        if self.tracker.check_skip(&page) {
            info!("No new posts since last check, skipping cycle.");
            if self.settings.verbose {
                info!(target: "notify", "Skipping cycle.");
            }
            report.skipped = true;
            report.roster_entries = self.tracker.roster().len();
            return Ok(report);
        }

        info!(count = page.len(), "Posts fetched; generating list...");
        let bar = self.progress_bar(page.len(), "Queue");
        for raw in &page {
            if !self.tracker.add_post(raw) {
                report.malformed += 1;
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        info!("Checking for clones...");
        let bar = self.progress_bar(self.tracker.window().len(), "Clones");
        report.groups = clones::detect_with_progress(self.tracker.window(), &bar);
        bar.finish_and_clear();
        report.policy = clones::enforce_policy(
            &report.groups,
            &self.settings.removal,
            feed,
            &mut self.tracker,
        )
        .await;

        if self.tracker.tracks_partners() {
            if self.settings.check_mod_log {
                info!("Checking modlog...");
                let log = feed.fetch_mod_log(MOD_LOG_PAGE_SIZE).await?;
                let bar = self.progress_bar(log.len(), "Modlog");
                report.mod_log_removals = self.tracker.roster_mut().reconcile_mod_log(&log);
                bar.inc(log.len() as u64);
                bar.finish_and_clear();
            }

            if self.settings.check_mod_queue {
                let items = feed.fetch_mod_queue(MOD_QUEUE_PAGE_SIZE).await?;
                let bar = self.progress_bar(items.len(), "Modqueue");
                report.queue = Some(modqueue::reconcile_mod_queue(&items, feed, &bar).await);
            }

            match self.persist_roster() {
                Ok(written) => report.roster_written = written,
                Err(e) => {
                    error!(error = %format!("{e:#}"), "Failed to write roster; will retry next cycle");
                    report.roster_error = Some(format!("{e:#}"));
                }
            }
            report.roster_entries = self.tracker.roster().len();
        }

        info!(
            groups = report.groups.len(),
            "Finished checking all posts, waiting {} seconds.",
            self.settings.poll_interval.as_secs()
        );
        Ok(report)
    }

    /// Poll forever, sleeping between cycles, until Ctrl-C.
    pub async fn run(&mut self, feed: &dyn FeedSource) -> Result<()> {
        self.run_until(feed, tokio::signal::ctrl_c()).await
    }

    /// Poll until `shutdown` resolves.
    ///
    /// A failed cycle is logged and the loop carries on. A shutdown during a
    /// cycle abandons it and nothing from it is written. A shutdown between
    /// cycles writes a roster still pending from an earlier failed write.
    pub async fn run_until<F: Future>(&mut self, feed: &dyn FeedSource, shutdown: F) -> Result<()> {
        tokio::pin!(shutdown);
        let mut between_cycles = false;

        loop {
            tokio::select! {
                result = self.run_cycle(feed) => match result {
                    Ok(report) => terminal::display_cycle_report(&report),
                    Err(e) => error!(error = %format!("{e:#}"), "Cycle failed"),
                },
                _ = &mut shutdown => break,
            }
            // A cancelled cycle never reached its own cleanup.
            self.tracker.clean();

            info!("Waiting {} seconds.", self.settings.poll_interval.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                _ = &mut shutdown => {
                    between_cycles = true;
                    break;
                }
            }
        }

        self.tracker.clean();
        info!("Received kill signal, exiting...");

        if between_cycles && self.tracker.tracks_partners() {
            if let Err(e) = self.persist_roster() {
                error!(error = %format!("{e:#}"), "Failed to write roster before exit");
            }
        }
        Ok(())
    }

    fn persist_roster(&mut self) -> Result<bool> {
        self.tracker
            .roster_mut()
            .persist(&self.settings.roster_path)
    }

    fn progress_bar(&self, len: usize, label: &str) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!("  {label} [{{bar:30}}] {{pos}}/{{len}} ({{eta}})"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    }
}
