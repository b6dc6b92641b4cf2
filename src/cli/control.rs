//! Round-trips toggle/status requests over the daemon's bridge socket.

use std::path::Path;

use anyhow::Result;

use crate::daemon::bridge::protocol::{BridgeRequest, BridgeResponse};

pub async fn request_toggle(app_dir: &Path) -> Result<bool> {
    roundtrip(app_dir, &BridgeRequest::ToggleTracking).await
}

pub async fn request_status(app_dir: &Path) -> Result<bool> {
    roundtrip(app_dir, &BridgeRequest::GetTrackingStatus).await
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use anyhow::Context;
        use tokio::{
            io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
            net::UnixStream,
        };

        use crate::daemon::bridge::SOCKET_FILE_NAME;

        async fn roundtrip(app_dir: &Path, request: &BridgeRequest) -> Result<bool> {
            let socket_path = app_dir.join(SOCKET_FILE_NAME);
            let stream = UnixStream::connect(&socket_path).await.with_context(|| {
                format!(
                    "Couldn't connect to the daemon socket {:?}. Is the daemon running?",
                    socket_path
                )
            })?;
            let (read, mut write) = stream.into_split();

            let mut buffer = serde_json::to_vec(request)?;
            buffer.push(b'\n');
            write.write_all(&buffer).await?;

            let reply = BufReader::new(read)
                .lines()
                .next_line()
                .await?
                .context("The daemon closed the connection without replying")?;

            let BridgeResponse::TrackingStatus { is_tracking } =
                serde_json::from_str(&reply)?;
            Ok(is_tracking)
        }
    } else {
        async fn roundtrip(_app_dir: &Path, _request: &BridgeRequest) -> Result<bool> {
            unimplemented!("The bridge transport requires unix sockets")
        }
    }
}
