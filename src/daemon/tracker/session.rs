use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    daemon::{
        events::{FocusedTab, IdleState, LifecycleEvent, TabId},
        storage::{entities::SiteStats, stats_store::StatsStore},
    },
    utils::{clock::Clock, hostname::hostname_of},
};

/// The tab the browser currently shows. Remembered even while tracking is
/// disabled, the window is unfocused or the user is idle, so a later
/// transition can reopen a session for it without a fresh tab switch.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CurrentTab {
    tab_id: TabId,
    url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenSession {
    hostname: String,
    started: DateTime<Utc>,
}

/// Maintains at most one open session (hostname + start time) and flushes
/// every closed session's elapsed duration exactly once into the persisted
/// per-hostname total.
///
/// All store access is a plain read-modify-write. The daemon funnels every
/// event through one instance of this type, which serializes the writes; a
/// concurrent cli process can still race them, which is accepted for a
/// single-user local counter.
pub struct SessionTracker<S> {
    store: S,
    clock: Box<dyn Clock>,
    status: watch::Sender<bool>,
    current_tab: Option<CurrentTab>,
    session: Option<OpenSession>,
    tracking_enabled: bool,
}

impl<S: StatsStore> SessionTracker<S> {
    pub fn new(
        store: S,
        clock: Box<dyn Clock>,
        status: watch::Sender<bool>,
        tracking_enabled: bool,
    ) -> Self {
        Self {
            store,
            clock,
            status,
            current_tab: None,
            session: None,
            tracking_enabled,
        }
    }

    pub fn tracking_enabled(&self) -> bool {
        self.tracking_enabled
    }

    pub async fn handle(&mut self, event: LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::TabActivated { tab_id, url } => {
                self.close_session().await?;
                self.current_tab = Some(CurrentTab { tab_id, url });
                self.open_current_tab();
            }
            LifecycleEvent::TabUrlChanged { tab_id, url } => {
                if self
                    .current_tab
                    .as_ref()
                    .is_some_and(|current| current.tab_id == tab_id)
                {
                    self.close_session().await?;
                    self.current_tab = Some(CurrentTab { tab_id, url });
                    self.open_current_tab();
                } else {
                    debug!("Ignoring url change of background tab {tab_id}");
                }
            }
            LifecycleEvent::WindowFocusChanged { focused: None } => {
                self.close_session().await?;
            }
            LifecycleEvent::WindowFocusChanged {
                focused: Some(FocusedTab { tab_id, url }),
            } => {
                self.close_session().await?;
                self.current_tab = Some(CurrentTab { tab_id, url });
                self.open_current_tab();
            }
            LifecycleEvent::IdleStateChanged {
                state: IdleState::Active,
            } => {
                // The session was already closed on the idle transition, so
                // this is an open, not a retarget.
                self.open_current_tab();
            }
            LifecycleEvent::IdleStateChanged { .. } => {
                self.close_session().await?;
            }
            LifecycleEvent::ToggleTracking => {
                self.toggle_tracking().await?;
            }
            LifecycleEvent::Click { url } => {
                self.record_event(&url, |stats| stats.clicks += 1).await?;
            }
            LifecycleEvent::Keystroke { url } => {
                self.record_event(&url, |stats| stats.keystrokes += 1)
                    .await?;
            }
        }
        Ok(())
    }

    /// Flushes any open session. Intended for shutdown, where the elapsed
    /// time would otherwise be lost with the process.
    pub async fn finalize(&mut self) -> Result<()> {
        self.close_session().await
    }

    /// Closes the open session, adding its elapsed duration to the hostname's
    /// total. The session is cleared even when the write is skipped because
    /// the duration is not positive or tracking is disabled.
    async fn close_session(&mut self) -> Result<()> {
        let Some(OpenSession { hostname, started }) = self.session.take() else {
            return Ok(());
        };

        let duration_ms = (self.clock.time() - started).num_milliseconds();
        if duration_ms <= 0 || !self.tracking_enabled {
            debug!("Dropping session for {hostname} ({duration_ms}ms)");
            return Ok(());
        }

        debug!("Flushing {duration_ms}ms for {hostname}");
        let mut stats = self.store.load_stats().await?;
        stats.entry(hostname).or_default().time_spent += duration_ms as u64;
        self.store.save_stats(stats).await
    }

    fn open_session(&mut self, hostname: String) {
        if !self.tracking_enabled {
            return;
        }
        self.session = Some(OpenSession {
            hostname,
            started: self.clock.time(),
        });
    }

    /// Opens a session for the current tab, if its url has a hostname.
    fn open_current_tab(&mut self) {
        let Some(hostname) = self
            .current_tab
            .as_ref()
            .and_then(|tab| hostname_of(&tab.url))
        else {
            return;
        };
        self.open_session(hostname);
    }

    async fn toggle_tracking(&mut self) -> Result<()> {
        if self.tracking_enabled {
            // Flush while the flag still allows the write, then flip.
            self.close_session().await?;
            self.tracking_enabled = false;
            self.store.save_tracking_enabled(false).await?;
        } else {
            self.tracking_enabled = true;
            self.store.save_tracking_enabled(true).await?;
            self.open_current_tab();
        }

        info!(
            "Tracking was turned {}",
            if self.tracking_enabled { "on" } else { "off" }
        );
        self.status.send_replace(self.tracking_enabled);
        Ok(())
    }

    /// Bumps a per-hostname counter, independently of whether that hostname
    /// has the open session.
    async fn record_event(&mut self, url: &str, apply: impl FnOnce(&mut SiteStats)) -> Result<()> {
        if !self.tracking_enabled {
            return Ok(());
        }
        let Some(hostname) = hostname_of(url) else {
            return Ok(());
        };

        let mut stats = self.store.load_stats().await?;
        apply(stats.entry(hostname).or_default());
        self.store.save_stats(stats).await
    }

    #[cfg(test)]
    fn active_hostname(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.hostname.as_str())
    }

    #[cfg(test)]
    fn active_start_time(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|session| session.started)
    }
}
