use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::Local;

use crate::daemon::storage::{entities::SiteStats, stats_store::StatsStore};

/// Prints the per-hostname table, busiest site first.
pub async fn print_stats(store: &impl StatsStore) -> Result<()> {
    let stats = store.load_stats().await?;
    if stats.is_empty() {
        println!("No data yet. Start browsing!");
        return Ok(());
    }

    let mut entries = stats.into_iter().collect::<Vec<_>>();
    entries.sort_by(|a, b| b.1.time_spent.cmp(&a.1.time_spent).then(a.0.cmp(&b.0)));

    println!(
        "{:<40} {:>10} {:>10} {:>12}",
        "SITE", "TIME", "CLICKS", "KEYSTROKES"
    );
    for (hostname, SiteStats { time_spent, clicks, keystrokes }) in entries {
        println!(
            "{:<40} {:>10} {:>10} {:>12}",
            hostname,
            format_time(time_spent),
            clicks,
            keystrokes
        );
    }
    Ok(())
}

/// Writes the stats mapping as pretty-printed json, the same shape the data
/// is stored in.
pub async fn export_stats(store: &impl StatsStore, output: Option<PathBuf>) -> Result<()> {
    let stats = store.load_stats().await?;
    let path = output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "website-stats-{}.json",
            Local::now().format("%Y-%m-%d")
        ))
    });

    tokio::fs::write(&path, serde_json::to_string_pretty(&stats)?).await?;
    println!("Exported statistics for {} sites to {:?}", stats.len(), path);
    Ok(())
}

/// Clears the whole store and re-enables tracking. A running daemon keeps its
/// in-memory session; only already flushed data is affected.
pub async fn reset_stats(store: &impl StatsStore, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("Resetting deletes all collected statistics. Pass --yes to confirm");
    }
    store.reset().await?;
    println!("All statistics were deleted");
    Ok(())
}

/// Renders milliseconds the way the stats table shows them: `1h 5m`, `3m 20s`
/// or `45s`.
fn format_time(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
