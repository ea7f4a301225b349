//! Background refresh loop.

use std::sync::Arc;
use std::time::Duration;

use thoughts_site::{RefreshOutcome, SyncEngine, SyncError, SyncOutcome};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::shutdown::Shutdown;

/// Refresh the inactive slot every `interval` until `shutdown` fires.
///
/// The first refresh happens one full interval after start. Failures are
/// logged and never end the loop. A refresh in flight when the signal fires
/// is abandoned.
pub(crate) async fn run(engine: Arc<SyncEngine>, interval: Duration, shutdown: Shutdown) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            () = shutdown.wait() => break,
            result = engine.refresh() => log_result(&result),
        }
    }

    debug!("Refresh loop stopped");
}

fn log_result(result: &Result<RefreshOutcome, SyncError>) {
    match result {
        Ok(RefreshOutcome {
            slot,
            outcome: SyncOutcome::Updated {
                fingerprint,
                documents,
            },
        }) => info!(slot = %slot, fingerprint = %fingerprint, documents, "Refreshed site"),
        Ok(RefreshOutcome {
            slot,
            outcome: SyncOutcome::Unchanged { fingerprint },
        }) => debug!(slot = %slot, fingerprint = %fingerprint, "Site unchanged"),
        Err(e) => warn!(
            kind = %e.kind(),
            error = %e,
            "Refresh failed, keeping active snapshot"
        ),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use thoughts_site::{ExtractOptions, SlotId};
    use thoughts_source::{ContentSource, MockSource};

    use super::*;

    fn engine(source: &Arc<MockSource>) -> Arc<SyncEngine> {
        Arc::new(SyncEngine::new(
            Arc::clone(source) as Arc<dyn ContentSource>,
            ExtractOptions::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_refreshes_each_interval() {
        let source = Arc::new(MockSource::new("abc").with_file("w/README.md", "Hello"));
        let engine = engine(&source);
        engine.sync_active().await.unwrap();
        let shutdown = Shutdown::new();

        let task = tokio::spawn(run(
            Arc::clone(&engine),
            Duration::from_secs(60),
            shutdown.clone(),
        ));

        // Nothing happens before the first interval elapses.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.hash_calls(), 1);

        source.set_hash("def");
        tokio::time::sleep(Duration::from_secs(31)).await;
        wait_for(|| engine.active_slot() == SlotId::B).await;
        assert_eq!(engine.active().unwrap().fingerprint(), "def");

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_failures() {
        let source = Arc::new(MockSource::new("abc").with_file("w/README.md", "Hello"));
        let engine = engine(&source);
        engine.sync_active().await.unwrap();
        source.fail_hash(true);
        let shutdown = Shutdown::new();

        let task = tokio::spawn(run(
            Arc::clone(&engine),
            Duration::from_secs(10),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(35)).await;
        wait_for(|| source.hash_calls() >= 4).await;
        assert_eq!(engine.active_slot(), SlotId::A);

        source.fail_hash(false);
        source.set_hash("def");
        tokio::time::sleep(Duration::from_secs(10)).await;
        wait_for(|| engine.active_slot() == SlotId::B).await;

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let source = Arc::new(MockSource::new("abc"));
        let shutdown = Shutdown::new();
        let task = tokio::spawn(run(
            engine(&source),
            Duration::from_secs(3600),
            shutdown.clone(),
        ));

        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source.hash_calls(), 0);
    }

    /// Yield until `condition` holds; blocking-pool work completes in real
    /// time even while the clock is paused.
    async fn wait_for(condition: impl Fn() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("condition not reached");
    }
}
