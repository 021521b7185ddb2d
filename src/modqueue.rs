// Moderation-queue sweep: clear queued items whose partner post is gone.
//
// An item can be reported into the queue after the post it points to was
// removed. Each queued item's link is looked up live, and the item is
// removed if the linked post reports a removal category.

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::feed::{FeedSource, QueueItem};

/// Counts from one queue sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSweep {
    pub checked: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Look up each queued item's link and remove the item if the link is dead.
///
/// Items without a link, or whose link can't be looked up, are skipped.
pub async fn reconcile_mod_queue(
    items: &[QueueItem],
    feed: &dyn FeedSource,
    bar: &ProgressBar,
) -> QueueSweep {
    info!("Checking modqueue...");
    let mut sweep = QueueSweep::default();

    for item in items {
        bar.inc(1);
        sweep.checked += 1;

        let Some(url) = item.url.as_deref() else {
            sweep.skipped += 1;
            continue;
        };

        let category = match feed.removed_by_category(url).await {
            Ok(category) => category,
            Err(e) => {
                debug!(item = item.name, error = %e, "Skipping queue item");
                sweep.skipped += 1;
                continue;
            }
        };

        if let Some(category) = category {
            info!(item = item.name, category = category, "Found removed item in modqueue; removing.");
            match feed.remove(&item.handle(), None).await {
                Ok(()) => sweep.removed += 1,
                Err(e) => warn!(item = item.name, error = %e, "Failed to remove queue item"),
            }
        }
    }

    bar.finish_and_clear();
    sweep
}
