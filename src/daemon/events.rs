use serde::{Deserialize, Serialize};

pub type TabId = i64;

/// The active tab of a freshly focused window, as reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedTab {
    pub tab_id: TabId,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

/// Lifecycle events the tracker reacts to. The bridge decides how they arrive;
/// the tracker's contract is only what happens on receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The active tab changed to a different tab.
    TabActivated { tab_id: TabId, url: String },
    /// A tab navigated to a new url. Only relevant when it is the current tab.
    TabUrlChanged { tab_id: TabId, url: String },
    /// Another window gained focus, or no window is focused at all.
    WindowFocusChanged { focused: Option<FocusedTab> },
    IdleStateChanged { state: IdleState },
    /// The user asked to flip the global tracking switch.
    ToggleTracking,
    Click { url: String },
    Keystroke { url: String },
}
