//! Contract Test: Change Detection
//!
//! This test verifies how the watcher turns lookups into notifications.
//!
//! Constraints verified:
//! - The first successful lookup after startup is always a change
//! - Equal sets (any order, any duplicates) never notify
//! - A failed lookup leaves snapshot and mailbox exactly as they were
//! - Unread notifications are overwritten, never queued

mod common;

use common::*;
use dynaddr_core::{DnsRecordWatcher, TickOutcome};
use std::time::Duration;

fn watcher_with(resolver: &ControlledResolver) -> DnsRecordWatcher {
    DnsRecordWatcher::new(
        Box::new(resolver.clone()),
        "vpn.example.com",
        Duration::from_secs(60),
    )
    .unwrap()
}

#[tokio::test]
async fn startup_snapshot_is_empty_so_first_lookup_notifies() {
    let resolver = ControlledResolver::new(&["1.2.3.4"]);
    let watcher = watcher_with(&resolver);

    assert!(watcher.snapshot().is_empty());
    assert_eq!(
        watcher.tick().await,
        TickOutcome::Changed(vec!["1.2.3.4".to_string()])
    );
    assert!(watcher.snapshot().contains(&ip("1.2.3.4")));
}

#[tokio::test]
async fn reordered_and_duplicated_answers_do_not_notify() {
    let resolver = ControlledResolver::new(&["1.2.3.4", "5.6.7.8"]);
    let watcher = watcher_with(&resolver);

    watcher.tick().await;
    assert!(watcher.notifier().try_take().is_some());

    resolver.set_answer(&["5.6.7.8", "1.2.3.4", "5.6.7.8"]);
    assert_eq!(watcher.tick().await, TickOutcome::Unchanged);
    assert!(!watcher.notifier().is_pending());
    assert_eq!(resolver.lookup_count(), 2);
}

#[tokio::test]
async fn failed_lookup_changes_nothing() {
    let resolver = ControlledResolver::new(&["1.2.3.4"]);
    let watcher = watcher_with(&resolver);

    watcher.tick().await;
    let notifier = watcher.notifier();
    let snapshot_before = watcher.snapshot();
    let pending_before = notifier.is_pending();

    resolver.set_failure("SERVFAIL");
    assert_eq!(watcher.tick().await, TickOutcome::Failed);

    assert_eq!(watcher.snapshot(), snapshot_before);
    assert_eq!(notifier.is_pending(), pending_before);

    // Recovery compares against the retained snapshot, not an empty one
    resolver.set_answer(&["1.2.3.4"]);
    assert_eq!(watcher.tick().await, TickOutcome::Unchanged);
}

#[tokio::test]
async fn failure_without_prior_success_does_not_notify() {
    let resolver = ControlledResolver::new(&[]);
    resolver.set_failure("NXDOMAIN");
    let watcher = watcher_with(&resolver);

    assert_eq!(watcher.tick().await, TickOutcome::Failed);
    assert!(watcher.snapshot().is_empty());
    assert!(!watcher.notifier().is_pending());
}

#[tokio::test]
async fn slow_consumer_only_sees_the_latest_set() {
    let resolver = ControlledResolver::new(&["1.2.3.4"]);
    let watcher = watcher_with(&resolver);

    watcher.tick().await;
    resolver.set_answer(&["1.2.3.4", "5.6.7.8"]);
    watcher.tick().await;
    resolver.set_answer(&["9.9.9.9"]);
    watcher.tick().await;

    assert_eq!(watcher.wait_for_change().await, vec!["9.9.9.9".to_string()]);
    assert!(!watcher.notifier().is_pending());
}

#[tokio::test]
async fn published_order_is_stable_regardless_of_resolver_order() {
    let resolver = ControlledResolver::new(&["2001:db8::1", "5.6.7.8", "1.2.3.4"]);
    let watcher = watcher_with(&resolver);

    watcher.tick().await;
    assert_eq!(
        watcher.wait_for_change().await,
        vec!["1.2.3.4", "5.6.7.8", "2001:db8::1"]
    );
}
