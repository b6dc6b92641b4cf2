use tokio::select;
use tokio_util::sync::CancellationToken;

/// Detects signals sent to the process. A cancelled token stops the bridge,
/// which in turn drains and stops the tracker.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
    };
}
