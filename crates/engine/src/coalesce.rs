//! Bounded-rate forwarding of store changes to page-level observers.

use std::time::Duration;

use formwright_util::FrameThrottle;
use indexmap::IndexSet;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::store::FieldChange;

/// Summary of the changes folded into one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeDigest {
    /// Revision of the newest change included.
    pub revision: u64,
    /// Changed paths in first-seen order.
    pub paths: Vec<String>,
}

/// Forwards store changes as digests, at most one per `interval`.
///
/// The first change after a quiet period is forwarded immediately; changes arriving
/// within the interval are folded into one digest sent when the interval elapses.
/// Returns when the change stream closes (after flushing) or every digest receiver
/// is gone.
pub async fn coalesce_changes(mut changes: broadcast::Receiver<FieldChange>, interval: Duration, digests: watch::Sender<ChangeDigest>) {
    let mut throttle = FrameThrottle::new(interval);
    let mut pending_paths: IndexSet<String> = IndexSet::new();
    let mut pending_revision = 0;

    loop {
        let deadline = throttle.next_deadline().map(Instant::from_std);
        tokio::select! {
            received = changes.recv() => match received {
                Ok(change) => {
                    pending_paths.insert(change.path);
                    pending_revision = change.revision;
                    if throttle.record(Instant::now().into_std())
                        && !emit(&digests, &mut pending_paths, pending_revision)
                    {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change observer lagged; reporting a whole-document change");
                    pending_paths.insert(String::new());
                    if throttle.record(Instant::now().into_std()) && !emit(&digests, &mut pending_paths, pending_revision) {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    if !pending_paths.is_empty() {
                        emit(&digests, &mut pending_paths, pending_revision);
                    }
                    debug!("change stream closed");
                    return;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if throttle.flush(Instant::now().into_std()) && !emit(&digests, &mut pending_paths, pending_revision) {
                    return;
                }
            }
        }
    }
}

fn emit(digests: &watch::Sender<ChangeDigest>, pending_paths: &mut IndexSet<String>, revision: u64) -> bool {
    let digest = ChangeDigest {
        revision,
        paths: pending_paths.drain(..).collect(),
    };
    digests.send(digest).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChangeOrigin, FormStore};
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn folds_bursts_into_one_digest_per_interval() {
        let mut store = FormStore::default();
        let (digest_tx, mut digest_rx) = watch::channel(ChangeDigest::default());
        let interval = Duration::from_millis(16);
        let task = tokio::spawn(coalesce_changes(store.subscribe(), interval, digest_tx));

        let started = Instant::now();
        store.set("name", json!("a"), ChangeOrigin::User).expect("set");
        digest_rx.changed().await.expect("leading digest");
        assert_eq!(digest_rx.borrow_and_update().paths, vec!["name".to_string()]);

        store.set("name", json!("ab"), ChangeOrigin::User).expect("set");
        store.set("type", json!("edge"), ChangeOrigin::User).expect("set");
        store.set("name", json!("abc"), ChangeOrigin::User).expect("set");
        digest_rx.changed().await.expect("folded digest");
        {
            let digest = digest_rx.borrow_and_update();
            assert_eq!(digest.paths, vec!["name".to_string(), "type".to_string()]);
            assert_eq!(digest.revision, 4);
        }
        assert!(started.elapsed() >= interval);

        drop(store);
        task.await.expect("coalescer exits when the store is dropped");
    }
}
