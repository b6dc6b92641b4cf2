//! Wire format of the bridge socket: one JSON object per line, tagged by
//! `type`. The vocabulary matches the messages the browser side sends.

use serde::{Deserialize, Serialize};

use crate::daemon::events::{FocusedTab, IdleState, LifecycleEvent, TabId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeRequest {
    #[serde(rename_all = "camelCase")]
    TabActivated { tab_id: TabId, url: String },
    #[serde(rename_all = "camelCase")]
    TabUrlChanged { tab_id: TabId, url: String },
    WindowFocusChanged { focused: Option<FocusedTab> },
    IdleStateChanged { state: IdleState },
    ToggleTracking,
    GetTrackingStatus,
    Click { url: String },
    Keystroke { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeResponse {
    #[serde(rename_all = "camelCase")]
    TrackingStatus { is_tracking: bool },
}

impl BridgeRequest {
    /// The lifecycle event this request carries. Queries carry none; they are
    /// answered by the server directly.
    pub fn into_event(self) -> Option<LifecycleEvent> {
        match self {
            BridgeRequest::TabActivated { tab_id, url } => {
                Some(LifecycleEvent::TabActivated { tab_id, url })
            }
            BridgeRequest::TabUrlChanged { tab_id, url } => {
                Some(LifecycleEvent::TabUrlChanged { tab_id, url })
            }
            BridgeRequest::WindowFocusChanged { focused } => {
                Some(LifecycleEvent::WindowFocusChanged { focused })
            }
            BridgeRequest::IdleStateChanged { state } => {
                Some(LifecycleEvent::IdleStateChanged { state })
            }
            BridgeRequest::ToggleTracking => Some(LifecycleEvent::ToggleTracking),
            BridgeRequest::GetTrackingStatus => None,
            BridgeRequest::Click { url } => Some(LifecycleEvent::Click { url }),
            BridgeRequest::Keystroke { url } => Some(LifecycleEvent::Keystroke { url }),
        }
    }
}
