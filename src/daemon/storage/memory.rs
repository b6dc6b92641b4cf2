//! In-memory [StatsStore] used by tracker tests.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::{
    entities::{SiteStatsMap, StoreDocument},
    stats_store::StatsStore,
};

#[derive(Default)]
pub struct MemoryStatsStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStatsStore {
    pub fn with_tracking_enabled(enabled: bool) -> Self {
        Self {
            document: Mutex::new(StoreDocument {
                stats: SiteStatsMap::new(),
                is_tracking: Some(enabled),
            }),
        }
    }

    pub fn document(&self) -> StoreDocument {
        self.document.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn load_stats(&self) -> Result<SiteStatsMap> {
        Ok(self.document.lock().unwrap().stats.clone())
    }

    async fn save_stats(&self, stats: SiteStatsMap) -> Result<()> {
        self.document.lock().unwrap().stats = stats;
        Ok(())
    }

    async fn load_tracking_enabled(&self) -> Result<Option<bool>> {
        Ok(self.document.lock().unwrap().is_tracking)
    }

    async fn save_tracking_enabled(&self, enabled: bool) -> Result<()> {
        self.document.lock().unwrap().is_tracking = Some(enabled);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        *self.document.lock().unwrap() = StoreDocument {
            stats: SiteStatsMap::new(),
            is_tracking: Some(true),
        };
        Ok(())
    }
}
