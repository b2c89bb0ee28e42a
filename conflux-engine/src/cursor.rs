//! Sync cursor (§3, §6): opaque at the API boundary, JSON internally.
//! Persisted transactionally with the `SyncJob` update that declares
//! completion — see [`crate::orchestrator::Orchestrator::run`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Required for ACL-supporting sources; the DirSync `cookie_b64` to
    /// resume membership diffing from.
    pub acl_dirsync_cookie: Option<String>,
    /// Optional per-source high-watermark (e.g. a last-modified timestamp).
    pub entity_high_watermark: Option<Value>,
}

impl SyncCursor {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let cursor = SyncCursor { acl_dirsync_cookie: Some("abc".into()), entity_high_watermark: Some(serde_json::json!(42)) };
        let restored = SyncCursor::from_json(&cursor.to_json());
        assert_eq!(restored.acl_dirsync_cookie, cursor.acl_dirsync_cookie);
    }

    #[test]
    fn missing_fields_default_to_none() {
        let restored = SyncCursor::from_json(&serde_json::json!({}));
        assert!(restored.acl_dirsync_cookie.is_none());
    }
}
