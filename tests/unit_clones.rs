// Unit tests for clone detection and the removal policy.
//
// Detection is pure and runs over hand-built windows. Policy enforcement runs
// against the in-memory feed from `common` so removals can be inspected.

mod common;

use clone_finder::clones::{
    detect, detect_with_progress, enforce_policy, CloneGroup, CloneKind, RemovalPolicy,
    REMOVAL_NOTE,
};
use clone_finder::tracker::PostTracker;

use common::{permalink, raw, snapshot, FakeFeed};

const LINK_X: &str = "https://reddit.com/r/partnera/comments/xxx/";
const LINK_Y: &str = "https://reddit.com/r/partnerb/comments/yyy/";

// ============================================================
// detect: grouping
// ============================================================

#[test]
fn unflaired_clone_of_earlier_post() {
    let window = vec![
        snapshot("s1", LINK_X, None),
        snapshot("s2", LINK_Y, Some("Unclaimed")),
        snapshot("s3", LINK_X, None),
    ];

    let groups = detect(&window);

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.original().permalink, permalink("s1"));
    assert!(group.flaired_clones().is_empty());
    assert_eq!(group.unflaired_clones().len(), 1);
    assert_eq!(group.unflaired_clones()[0].permalink, permalink("s3"));
}

#[test]
fn no_duplicates_no_groups() {
    let window = vec![
        snapshot("s1", LINK_X, None),
        snapshot("s2", LINK_Y, None),
    ];
    assert!(detect(&window).is_empty());
}

#[test]
fn empty_window_no_groups() {
    assert!(detect(&[]).is_empty());
}

#[test]
fn three_copies_form_one_group_under_first() {
    let window = vec![
        snapshot("s1", LINK_X, Some("Unclaimed")),
        snapshot("s2", LINK_Y, None),
        snapshot("s3", LINK_X, None),
        snapshot("s4", LINK_Y, Some("Unclaimed")),
        snapshot("s5", LINK_X, Some("In Progress")),
    ];

    let groups = detect(&window);

    assert_eq!(groups.len(), 2);
    let x = &groups[0];
    assert_eq!(x.original().permalink, permalink("s1"));
    assert_eq!(x.clone_count(), 2);
    assert_eq!(x.unflaired_clones()[0].permalink, permalink("s3"));
    assert_eq!(x.flaired_clones()[0].permalink, permalink("s5"));

    let y = &groups[1];
    assert_eq!(y.original().permalink, permalink("s2"));
    assert_eq!(y.flaired_clones()[0].permalink, permalink("s4"));
}

#[test]
fn clone_never_appears_as_original() {
    let window = vec![
        snapshot("s1", LINK_X, None),
        snapshot("s2", LINK_X, None),
        snapshot("s3", LINK_X, None),
    ];

    let groups = detect(&window);

    assert_eq!(groups.len(), 1);
    for group in &groups {
        for (_, clone) in group.clones() {
            assert_ne!(clone.permalink, group.original().permalink);
        }
    }
}

#[test]
fn labels_do_not_affect_duplicate_status() {
    let window = vec![
        snapshot("a", LINK_X, Some("Unclaimed")),
        snapshot("b", LINK_X, None),
    ];
    let swapped = vec![
        snapshot("a", LINK_X, None),
        snapshot("b", LINK_X, Some("Unclaimed")),
    ];

    let groups = detect(&window);
    let swapped_groups = detect(&swapped);

    assert_eq!(groups.len(), 1);
    assert_eq!(swapped_groups.len(), 1);
    assert_eq!(groups[0].unflaired_clones().len(), 1);
    assert_eq!(swapped_groups[0].flaired_clones().len(), 1);
}

#[test]
fn clones_iterate_flaired_first() {
    let window = vec![
        snapshot("s1", LINK_X, None),
        snapshot("s2", LINK_X, None),
        snapshot("s3", LINK_X, Some("Unclaimed")),
    ];

    let groups = detect(&window);
    let kinds: Vec<CloneKind> = groups[0].clones().map(|(kind, _)| kind).collect();

    assert_eq!(kinds, vec![CloneKind::Flaired, CloneKind::Unflaired]);
}

#[test]
fn detection_advances_progress_per_post() {
    let window = vec![
        snapshot("s1", LINK_X, None),
        snapshot("s2", LINK_Y, None),
        snapshot("s3", LINK_X, None),
    ];
    let bar = indicatif::ProgressBar::hidden();

    let groups = detect_with_progress(&window, &bar);

    assert_eq!(groups.len(), 1);
    assert_eq!(bar.position(), 3);
}

// ============================================================
// CloneGroup::add_clone_kind
// ============================================================

#[test]
fn named_kind_adds_clone() {
    let mut group = CloneGroup::new(snapshot("s1", LINK_X, None));

    assert!(group.add_clone_kind(snapshot("s2", LINK_X, Some("Unclaimed")), "flaired"));
    assert!(group.add_clone_kind(snapshot("s3", LINK_X, None), "Unflaired"));

    assert_eq!(group.flaired_clones().len(), 1);
    assert_eq!(group.unflaired_clones().len(), 1);
}

#[test]
fn unknown_kind_drops_clone() {
    let mut group = CloneGroup::new(snapshot("s1", LINK_X, None));

    assert!(!group.add_clone_kind(snapshot("s2", LINK_X, None), "2"));

    assert!(group.flaired_clones().is_empty());
    assert!(group.unflaired_clones().is_empty());
    assert_eq!(group.clone_count(), 0);
}

// ============================================================
// CloneKind and RemovalPolicy parsing
// ============================================================

#[test]
fn kind_parses_case_insensitively() {
    assert_eq!("Flaired".parse::<CloneKind>().unwrap(), CloneKind::Flaired);
    assert_eq!(" unflaired ".parse::<CloneKind>().unwrap(), CloneKind::Unflaired);
    assert!("both".parse::<CloneKind>().is_err());
}

#[test]
fn policy_from_kind() {
    let all = RemovalPolicy::from_kind("all").unwrap();
    assert!(all.flaired && all.unflaired);

    let unflaired = RemovalPolicy::from_kind("unflaired").unwrap();
    assert!(!unflaired.flaired && unflaired.unflaired);

    let flaired = RemovalPolicy::from_kind("FLAIRED").unwrap();
    assert!(flaired.flaired && !flaired.unflaired);

    assert!(RemovalPolicy::from_kind("some").is_err());
}

#[test]
fn default_policy_removes_nothing() {
    let policy = RemovalPolicy::default();
    assert!(!policy.removes(CloneKind::Flaired));
    assert!(!policy.removes(CloneKind::Unflaired));
}

// ============================================================
// enforce_policy: gating and side effects
// ============================================================

fn tracker_with(posts: &[clone_finder::post::RawSubmission]) -> PostTracker {
    let mut tracker = PostTracker::new(None);
    for post in posts {
        assert!(tracker.add_post(post));
    }
    tracker
}

#[tokio::test]
async fn policy_removes_only_enabled_kind() {
    let feed = FakeFeed::default();
    let mut tracker = tracker_with(&[
        raw("a", LINK_X, None, "PartnerA | Image"),
        raw("b", LINK_X, Some("Unclaimed"), "PartnerA | Image"),
        raw("c", LINK_X, None, "PartnerA | Image"),
    ]);
    let policy = RemovalPolicy {
        flaired: false,
        unflaired: true,
    };

    let groups = detect(tracker.window());
    let outcome = enforce_policy(&groups, &policy, &feed, &mut tracker).await;

    let removals = feed.removals.lock().unwrap().clone();
    assert_eq!(removals, vec![("t3_c".to_string(), Some(REMOVAL_NOTE.to_string()))]);

    assert_eq!(outcome.removed_count(CloneKind::Unflaired), 1);
    assert_eq!(outcome.kept_count(CloneKind::Flaired), 1);

    let remaining: Vec<&str> = tracker.window().iter().map(|p| p.permalink.as_str()).collect();
    assert_eq!(remaining, vec![permalink("a"), permalink("b")]);
}

#[tokio::test]
async fn default_policy_only_reports() {
    let feed = FakeFeed::default();
    let mut tracker = tracker_with(&[
        raw("a", LINK_X, None, "Other | Image"),
        raw("b", LINK_X, None, "Other | Image"),
        raw("c", LINK_X, Some("Unclaimed"), "Other | Image"),
    ]);

    let groups = detect(tracker.window());
    let outcome = enforce_policy(&groups, &RemovalPolicy::default(), &feed, &mut tracker).await;

    assert!(feed.removals.lock().unwrap().is_empty());
    assert!(outcome.removed.is_empty());
    assert_eq!(outcome.kept.len(), 2);
    assert_eq!(tracker.window().len(), 3);
}

#[tokio::test]
async fn failed_removal_counts_as_kept() {
    let mut feed = FakeFeed::default();
    feed.failing_removals.insert("t3_b".to_string());
    let mut tracker = tracker_with(&[
        raw("a", LINK_X, None, "Other | Image"),
        raw("b", LINK_X, None, "Other | Image"),
        raw("c", LINK_X, None, "Other | Image"),
    ]);
    let policy = RemovalPolicy::from_kind("all").unwrap();

    let groups = detect(tracker.window());
    let outcome = enforce_policy(&groups, &policy, &feed, &mut tracker).await;

    assert_eq!(feed.removed_fullnames(), vec!["t3_c".to_string()]);
    assert_eq!(outcome.removed_count(CloneKind::Unflaired), 1);
    assert_eq!(outcome.kept, vec![(CloneKind::Unflaired, permalink("b"))]);
    assert!(tracker.window().iter().any(|p| p.permalink == permalink("b")));
}
