use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use super::entities::{SiteStatsMap, StoreDocument};

/// Interface for abstracting the persisted key-value layer. The tracker only
/// ever performs whole-value reads and writes against it, so a cli process and
/// the daemon racing on the same key can lose an update. That is accepted for
/// a single-user local counter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn load_stats(&self) -> Result<SiteStatsMap>;

    /// Replaces the whole stats mapping.
    async fn save_stats(&self, stats: SiteStatsMap) -> Result<()>;

    async fn load_tracking_enabled(&self) -> Result<Option<bool>>;

    async fn save_tracking_enabled(&self, enabled: bool) -> Result<()>;

    /// Drops all collected statistics and reinitializes the tracking flag to
    /// enabled.
    async fn reset(&self) -> Result<()>;
}

#[async_trait]
impl<T: StatsStore + ?Sized> StatsStore for std::sync::Arc<T> {
    async fn load_stats(&self) -> Result<SiteStatsMap> {
        (**self).load_stats().await
    }

    async fn save_stats(&self, stats: SiteStatsMap) -> Result<()> {
        (**self).save_stats(stats).await
    }

    async fn load_tracking_enabled(&self) -> Result<Option<bool>> {
        (**self).load_tracking_enabled().await
    }

    async fn save_tracking_enabled(&self, enabled: bool) -> Result<()> {
        (**self).save_tracking_enabled(enabled).await
    }

    async fn reset(&self) -> Result<()> {
        (**self).reset().await
    }
}

/// The main realization of [StatsStore]: one JSON document on disk, guarded by
/// file locks so the daemon and cli never interleave partial writes.
pub struct JsonStatsStore {
    path: PathBuf,
}

impl JsonStatsStore {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<StoreDocument> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Store file {:?} does not exist yet", self.path);
                return Ok(StoreDocument::default());
            }
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let (file, result) = Self::read_with_file(file).await;
        file.unlock_async().await?;

        let contents = result?;
        if contents.trim().is_empty() {
            return Ok(StoreDocument::default());
        }

        match serde_json::from_str::<StoreDocument>(&contents) {
            Ok(document) => Ok(document),
            Err(e) => {
                // Might happen after a shutdown cutting off a write. Starting
                // over beats refusing to run.
                warn!("Store file {:?} was corrupted: {e}", self.path);
                Ok(StoreDocument::default())
            }
        }
    }

    async fn read_with_file(mut file: File) -> (File, Result<String>) {
        let mut contents = String::new();
        let result = file
            .read_to_string(&mut contents)
            .await
            .map(|_| contents)
            .map_err(Into::into);
        (file, result)
    }

    async fn write_document(&self, document: &StoreDocument) -> Result<()> {
        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&self.path)
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::write_with_file(&mut file, document).await;
        file.unlock_async().await?;
        result
    }

    async fn write_with_file(file: &mut File, document: &StoreDocument) -> Result<()> {
        let buffer = serde_json::to_vec(document)?;
        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl StatsStore for JsonStatsStore {
    async fn load_stats(&self) -> Result<SiteStatsMap> {
        Ok(self.read_document().await?.stats)
    }

    async fn save_stats(&self, stats: SiteStatsMap) -> Result<()> {
        let mut document = self.read_document().await?;
        document.stats = stats;
        self.write_document(&document).await
    }

    async fn load_tracking_enabled(&self) -> Result<Option<bool>> {
        Ok(self.read_document().await?.is_tracking)
    }

    async fn save_tracking_enabled(&self, enabled: bool) -> Result<()> {
        let mut document = self.read_document().await?;
        document.is_tracking = Some(enabled);
        self.write_document(&document).await
    }

    async fn reset(&self) -> Result<()> {
        self.write_document(&StoreDocument {
            stats: SiteStatsMap::new(),
            is_tracking: Some(true),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::daemon::storage::{
        entities::{SiteStats, SiteStatsMap},
        STATS_FILE_NAME,
    };

    use super::{JsonStatsStore, StatsStore};

    fn store_in(dir: &tempfile::TempDir) -> JsonStatsStore {
        JsonStatsStore::new(dir.path().join(STATS_FILE_NAME)).unwrap()
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty_store() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(&dir);

        assert!(store.load_stats().await?.is_empty());
        assert_eq!(store.load_tracking_enabled().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn stats_survive_a_reopen() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(&dir);

        let mut stats = SiteStatsMap::new();
        stats.insert(
            "example.com".into(),
            SiteStats {
                time_spent: 5000,
                clicks: 3,
                keystrokes: 12,
            },
        );
        store.save_stats(stats.clone()).await?;

        let reopened = store_in(&dir);
        assert_eq!(reopened.load_stats().await?, stats);
        Ok(())
    }

    #[tokio::test]
    async fn tracking_flag_does_not_clobber_stats() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(&dir);

        let mut stats = SiteStatsMap::new();
        stats.insert("example.com".into(), SiteStats::default());
        store.save_stats(stats.clone()).await?;
        store.save_tracking_enabled(false).await?;

        assert_eq!(store.load_stats().await?, stats);
        assert_eq!(store.load_tracking_enabled().await?, Some(false));
        Ok(())
    }

    #[tokio::test]
    async fn reset_drops_stats_and_reenables_tracking() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(&dir);

        let mut stats = SiteStatsMap::new();
        stats.insert("example.com".into(), SiteStats::default());
        store.save_stats(stats).await?;
        store.save_tracking_enabled(false).await?;

        store.reset().await?;

        assert!(store.load_stats().await?.is_empty());
        assert_eq!(store.load_tracking_enabled().await?, Some(true));
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_document_reads_as_empty_store() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(STATS_FILE_NAME);
        std::fs::write(&path, b"{\"stats\": {\"example")?;

        let store = JsonStatsStore::new(path)?;
        assert!(store.load_stats().await?.is_empty());
        Ok(())
    }
}
