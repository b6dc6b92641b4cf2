pub mod session;

use anyhow::Result;
use session::SessionTracker;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error};

use super::{events::LifecycleEvent, storage::stats_store::StatsStore};

/// Consumes lifecycle events one at a time and feeds them to the
/// [SessionTracker]. Processing a single event at a time is what keeps the
/// store writes of the daemon serialized.
pub struct TrackerModule<S> {
    receiver: Receiver<LifecycleEvent>,
    tracker: SessionTracker<S>,
}

impl<S: StatsStore> TrackerModule<S> {
    pub fn new(receiver: Receiver<LifecycleEvent>, tracker: SessionTracker<S>) -> Self {
        Self { receiver, tracker }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(event) = self.receiver.recv().await {
            debug!("Processing event {:?}", event);
            match self.tracker.handle(event.clone()).await {
                Ok(_) => {}
                Err(e) => {
                    error!("Error processing event {:?}: {e:?}", event)
                }
            }
        }

        // Senders are gone, the daemon is shutting down.
        let result = self.tracker.finalize().await;
        self.receiver.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{Duration, TimeZone, Utc};
    use tokio::sync::{mpsc, watch};

    use crate::{
        daemon::{
            events::LifecycleEvent,
            storage::{memory::MemoryStatsStore, stats_store::StatsStore},
            tracker::session::SessionTracker,
        },
        utils::clock::test_clock::TestClock,
    };

    use super::TrackerModule;

    #[tokio::test]
    async fn module_drains_the_channel_and_flushes_on_shutdown() -> Result<()> {
        let store = Arc::new(MemoryStatsStore::with_tracking_enabled(true));
        let clock = TestClock::at(Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap());
        let (status_tx, _status_rx) = watch::channel(true);
        let tracker =
            SessionTracker::new(store.clone(), Box::new(clock.clone()), status_tx, true);

        let (sender, receiver) = mpsc::channel(8);
        let module = tokio::spawn(TrackerModule::new(receiver, tracker).run());

        sender
            .send(LifecycleEvent::TabActivated {
                tab_id: 1,
                url: "https://a.com/".into(),
            })
            .await?;
        sender
            .send(LifecycleEvent::Click {
                url: "https://a.com/".into(),
            })
            .await?;

        // Let the module open the session before the clock moves; the flush
        // happens in finalize.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        clock.advance(Duration::milliseconds(1200));
        drop(sender);

        module.await??;

        let stats = store.load_stats().await?;
        assert_eq!(stats["a.com"].time_spent, 1200);
        assert_eq!(stats["a.com"].clicks, 1);
        Ok(())
    }
}
