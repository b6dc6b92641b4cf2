use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cumulative counters for one hostname. Created lazily with zero defaults on
/// the first write and only ever removed by a full reset.
///
/// Field names are serialized camelCase so exported files keep the format the
/// data was originally collected in.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    /// Accumulated active time in milliseconds.
    pub time_spent: u64,
    pub clicks: u64,
    #[serde(default)]
    pub keystrokes: u64,
}

pub type SiteStatsMap = HashMap<String, SiteStats>;

/// The whole persisted document: one `stats` mapping plus the tracking flag.
/// An absent flag means the store was never initialized and reads as enabled.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct StoreDocument {
    #[serde(default)]
    pub stats: SiteStatsMap,
    #[serde(rename = "isTracking", skip_serializing_if = "Option::is_none")]
    pub is_tracking: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::{SiteStats, StoreDocument};

    #[test]
    fn site_stats_use_the_original_field_names() {
        let json = serde_json::to_string(&SiteStats {
            time_spent: 5000,
            clicks: 2,
            keystrokes: 7,
        })
        .unwrap();

        assert_eq!(json, r#"{"timeSpent":5000,"clicks":2,"keystrokes":7}"#);
    }

    #[test]
    fn keystrokes_are_optional_when_reading() {
        let stats: SiteStats =
            serde_json::from_str(r#"{"timeSpent":100,"clicks":1}"#).unwrap();
        assert_eq!(stats.keystrokes, 0);
    }

    #[test]
    fn empty_document_reads_as_uninitialized() {
        let doc: StoreDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.stats.is_empty());
        assert_eq!(doc.is_tracking, None);
    }
}
