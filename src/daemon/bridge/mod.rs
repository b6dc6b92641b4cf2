//! Receives lifecycle events from the browser-side bridge. The transport is a
//! unix socket in the application directory carrying newline-delimited JSON;
//! the cli uses the same socket for its toggle/status round-trips.

pub mod protocol;

/// Name of the bridge socket inside the application directory.
pub const SOCKET_FILE_NAME: &str = "bridge.sock";

#[cfg(unix)]
pub use server::BridgeModule;

#[cfg(unix)]
mod server {
    use std::path::PathBuf;

    use anyhow::Result;
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::{unix::OwnedWriteHalf, UnixListener, UnixStream},
        sync::{mpsc, watch},
    };
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, error, info, warn};

    use crate::daemon::events::LifecycleEvent;

    use super::protocol::{BridgeRequest, BridgeResponse};

    /// Accepts bridge connections and forwards the events they carry into the
    /// tracker channel. Status queries are answered directly from the watch
    /// channel the tracker publishes on.
    pub struct BridgeModule {
        listener: UnixListener,
        events: mpsc::Sender<LifecycleEvent>,
        status: watch::Receiver<bool>,
        shutdown: CancellationToken,
    }

    impl BridgeModule {
        pub fn bind(
            socket_path: PathBuf,
            events: mpsc::Sender<LifecycleEvent>,
            status: watch::Receiver<bool>,
            shutdown: CancellationToken,
        ) -> Result<Self> {
            // A previous run may have left the socket file behind.
            if socket_path.exists() {
                std::fs::remove_file(&socket_path)?;
            }
            let listener = UnixListener::bind(&socket_path)?;
            info!("Bridge is listening on {:?}", socket_path);
            Ok(Self {
                listener,
                events,
                status,
                shutdown,
            })
        }

        /// Executes the accept loop until shutdown.
        pub async fn run(self) -> Result<()> {
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => return Ok(()),
                    accepted = self.listener.accept() => {
                        match accepted {
                            Ok((stream, _)) => {
                                tokio::spawn(handle_connection(
                                    stream,
                                    self.events.clone(),
                                    self.status.clone(),
                                    self.shutdown.clone(),
                                ));
                            }
                            Err(e) => error!("Failed to accept a bridge connection {e:?}"),
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(
        stream: UnixStream,
        events: mpsc::Sender<LifecycleEvent>,
        mut status: watch::Receiver<bool>,
        shutdown: CancellationToken,
    ) {
        if let Err(e) = connection_loop(stream, &events, &mut status, &shutdown).await {
            debug!("Bridge connection ended with an error {e:?}");
        }
    }

    async fn connection_loop(
        stream: UnixStream,
        events: &mpsc::Sender<LifecycleEvent>,
        status: &mut watch::Receiver<bool>,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                line = lines.next_line() => {
                    let Some(line) = line? else { return Ok(()) };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let request = match serde_json::from_str::<BridgeRequest>(&line) {
                        Ok(v) => v,
                        Err(e) => {
                            warn!("Ignoring a malformed bridge message {line:?}: {e}");
                            continue;
                        }
                    };
                    debug!("Received bridge message {request:?}");
                    handle_request(request, events, status, &mut write).await?;
                }
            }
        }
    }

    async fn handle_request(
        request: BridgeRequest,
        events: &mpsc::Sender<LifecycleEvent>,
        status: &mut watch::Receiver<bool>,
        write: &mut OwnedWriteHalf,
    ) -> Result<()> {
        match request {
            BridgeRequest::GetTrackingStatus => {
                let is_tracking = *status.borrow_and_update();
                write_response(write, &BridgeResponse::TrackingStatus { is_tracking }).await
            }
            BridgeRequest::ToggleTracking => {
                // The tracker publishes the flag after applying the toggle;
                // wait for that so the reply carries the post-toggle state.
                status.mark_unchanged();
                events.send(LifecycleEvent::ToggleTracking).await?;
                status.changed().await?;
                let is_tracking = *status.borrow_and_update();
                write_response(write, &BridgeResponse::TrackingStatus { is_tracking }).await
            }
            other => {
                if let Some(event) = other.into_event() {
                    events.send(event).await?;
                }
                Ok(())
            }
        }
    }

    async fn write_response(write: &mut OwnedWriteHalf, response: &BridgeResponse) -> Result<()> {
        let mut buffer = serde_json::to_vec(response)?;
        buffer.push(b'\n');
        write.write_all(&buffer).await?;
        Ok(())
    }
}
