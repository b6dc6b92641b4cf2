use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::utils::clock::{Clock, DefaultClock};

use events::LifecycleEvent;
use storage::{
    stats_store::{JsonStatsStore, StatsStore},
    STATS_FILE_NAME,
};
use tracker::{session::SessionTracker, TrackerModule};

pub mod args;
pub mod bridge;
pub mod events;
pub mod shutdown;
pub mod storage;
pub mod tracker;

const EVENT_CHANNEL_SIZE: usize = 32;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        /// Represents the starting point for the daemon
        pub async fn start_daemon(dir: PathBuf) -> Result<()> {
            std::env::set_current_dir("/")?;

            let store = JsonStatsStore::new(dir.join(STATS_FILE_NAME))?;
            let tracking_enabled = load_or_init_tracking_flag(&store).await?;

            let (sender, receiver) = mpsc::channel::<LifecycleEvent>(EVENT_CHANNEL_SIZE);
            let (status_sender, status_receiver) = watch::channel(tracking_enabled);
            let shutdown_token = CancellationToken::new();

            let bridge = bridge::BridgeModule::bind(
                dir.join(bridge::SOCKET_FILE_NAME),
                sender,
                status_receiver,
                shutdown_token.clone(),
            )?;

            let tracker = create_tracker(
                store,
                receiver,
                status_sender,
                tracking_enabled,
                DefaultClock,
            );

            let (_, bridge_result, tracker_result) = tokio::join!(
                shutdown::detect_shutdown(shutdown_token),
                bridge.run(),
                tracker.run(),
            );

            if let Err(bridge_result) = bridge_result {
                error!("Bridge module got an error {:?}", bridge_result);
            }

            if let Err(tracker_result) = tracker_result {
                error!("Tracker module got an error {:?}", tracker_result);
            }

            Ok(())
        }
    } else {
        // This runtime error is needed to allow the project to be compiled on
        // platforms without unix sockets.
        pub async fn start_daemon(_dir: PathBuf) -> Result<()> {
            unimplemented!("The bridge transport requires unix sockets")
        }
    }
}

fn create_tracker<S: StatsStore>(
    store: S,
    receiver: mpsc::Receiver<LifecycleEvent>,
    status_sender: watch::Sender<bool>,
    tracking_enabled: bool,
    clock: impl Clock,
) -> TrackerModule<S> {
    TrackerModule::new(
        receiver,
        SessionTracker::new(store, Box::new(clock), status_sender, tracking_enabled),
    )
}

/// Reads the persisted tracking flag; an absent flag is a first run and gets
/// persisted as enabled.
async fn load_or_init_tracking_flag(store: &impl StatsStore) -> Result<bool> {
    match store.load_tracking_enabled().await? {
        Some(enabled) => Ok(enabled),
        None => {
            store.save_tracking_enabled(true).await?;
            Ok(true)
        }
    }
}

#[cfg(all(test, unix))]
mod daemon_tests {
    use std::time::Duration;

    use anyhow::Result;
    use tempfile::tempdir;
    use tokio::{
        io::AsyncWriteExt,
        net::UnixStream,
        sync::{mpsc, watch},
    };
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            bridge::{BridgeModule, SOCKET_FILE_NAME},
            create_tracker, load_or_init_tracking_flag,
            storage::{
                stats_store::{JsonStatsStore, StatsStore},
                STATS_FILE_NAME,
            },
            EVENT_CHANNEL_SIZE,
        },
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
    };

    /// Very simple smoke test to check that events flowing through a real
    /// socket end up as per-hostname totals in the store file.
    #[tokio::test]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;

        let store = JsonStatsStore::new(dir.path().join(STATS_FILE_NAME))?;
        let tracking_enabled = load_or_init_tracking_flag(&store).await?;
        assert!(tracking_enabled);

        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (status_sender, status_receiver) = watch::channel(tracking_enabled);
        let shutdown_token = CancellationToken::new();

        let bridge = BridgeModule::bind(
            dir.path().join(SOCKET_FILE_NAME),
            sender,
            status_receiver,
            shutdown_token.clone(),
        )?;
        let tracker = create_tracker(
            store,
            receiver,
            status_sender,
            tracking_enabled,
            DefaultClock,
        );

        let socket_path = dir.path().join(SOCKET_FILE_NAME);
        let (_, bridge_result, tracker_result) = tokio::join!(
            async {
                let mut stream = UnixStream::connect(&socket_path).await.unwrap();
                stream
                    .write_all(b"{\"type\":\"tabActivated\",\"tabId\":1,\"url\":\"https://example.com/\"}\n")
                    .await
                    .unwrap();
                stream
                    .write_all(b"{\"type\":\"click\",\"url\":\"https://example.com/\"}\n")
                    .await
                    .unwrap();
                tokio::time::sleep(Duration::from_millis(80)).await;
                stream
                    .write_all(b"{\"type\":\"windowFocusChanged\",\"focused\":null}\n")
                    .await
                    .unwrap();
                tokio::time::sleep(Duration::from_millis(80)).await;
                shutdown_token.cancel();
            },
            bridge.run(),
            tracker.run(),
        );

        bridge_result?;
        tracker_result?;

        let store = JsonStatsStore::new(dir.path().join(STATS_FILE_NAME))?;
        let stats = store.load_stats().await?;
        assert!(stats["example.com"].time_spent >= 50);
        assert_eq!(stats["example.com"].clicks, 1);
        assert_eq!(store.load_tracking_enabled().await?, Some(true));

        Ok(())
    }
}
