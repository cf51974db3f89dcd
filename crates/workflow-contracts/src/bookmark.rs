// Bookmark: a persisted handle naming a future resumption point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::ids::{AecId, NodeId};

/// A resumption handle created by a suspended activity.
///
/// `hash` is a deterministic fingerprint of `(name, payload)`, used by hosts
/// to look a bookmark up by external event identity (e.g. "find the bookmark
/// matching this webhook's event name and correlation payload") without
/// scanning every persisted workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub id: Uuid,
    pub activity_node_id: NodeId,
    pub activity_instance_id: AecId,
    pub name: String,
    pub hash: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub callback_method_name: Option<String>,
    /// If true, the bookmark is consumed (removed) as soon as the owning
    /// activity completes, regardless of whether it was the resumption
    /// trigger. If false, it survives completion until explicitly resumed.
    pub auto_burn: bool,
    /// If true, resuming this bookmark automatically completes the owning
    /// AEC with no further activity callback invocation.
    pub auto_complete: bool,
    pub created_at: DateTime<Utc>,
}

/// Options for creating a bookmark, matching the specification's
/// `CreateBookmark(name, payload, options)` operation (SPEC_FULL.md §4.2).
#[derive(Debug, Clone)]
pub struct BookmarkOptions {
    pub auto_burn: bool,
    pub auto_complete: bool,
    pub callback_method_name: Option<String>,
}

impl Default for BookmarkOptions {
    fn default() -> Self {
        Self {
            auto_burn: true,
            auto_complete: false,
            callback_method_name: None,
        }
    }
}

impl BookmarkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_burn(mut self, value: bool) -> Self {
        self.auto_burn = value;
        self
    }

    pub fn auto_complete(mut self, value: bool) -> Self {
        self.auto_complete = value;
        self
    }

    pub fn callback(mut self, method_name: impl Into<String>) -> Self {
        self.callback_method_name = Some(method_name.into());
        self
    }
}

impl Bookmark {
    pub fn new(
        activity_node_id: impl Into<String>,
        activity_instance_id: AecId,
        name: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        let name = name.into();
        let hash = Self::fingerprint(&name, payload.as_ref());
        Self {
            id: Uuid::now_v7(),
            activity_node_id: activity_node_id.into(),
            activity_instance_id,
            name,
            hash,
            payload,
            callback_method_name: None,
            auto_burn: true,
            auto_complete: false,
            created_at: Utc::now(),
        }
    }

    /// Build a bookmark with its options applied up front, matching the
    /// specification's `CreateBookmark(name, payload, options)` operation —
    /// unlike chaining `.auto_burn(..)`/`.auto_complete(..)` after the fact,
    /// this is the only construction path a caller needs once the bookmark
    /// is about to be recorded somewhere (e.g. `ActivityApi::create_bookmark`).
    pub fn with_options(
        activity_node_id: impl Into<String>,
        activity_instance_id: AecId,
        name: impl Into<String>,
        payload: Option<serde_json::Value>,
        options: BookmarkOptions,
    ) -> Self {
        let name = name.into();
        let hash = Self::fingerprint(&name, payload.as_ref());
        Self {
            id: Uuid::now_v7(),
            activity_node_id: activity_node_id.into(),
            activity_instance_id,
            name,
            hash,
            payload,
            callback_method_name: options.callback_method_name,
            auto_burn: options.auto_burn,
            auto_complete: options.auto_complete,
            created_at: Utc::now(),
        }
    }

    pub fn auto_burn(mut self, value: bool) -> Self {
        self.auto_burn = value;
        self
    }

    pub fn auto_complete(mut self, value: bool) -> Self {
        self.auto_complete = value;
        self
    }

    pub fn callback(mut self, method_name: impl Into<String>) -> Self {
        self.callback_method_name = Some(method_name.into());
        self
    }

    /// Deterministic fingerprint of `(name, payload)` used for external lookup.
    pub fn fingerprint(name: &str, payload: Option<&serde_json::Value>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        if let Some(payload) = payload {
            // `to_string` on serde_json::Value is not guaranteed key-order
            // stable across arbitrary maps, but payloads here are caller
            // supplied small structures where insertion order is preserved
            // by serde_json's default map (preserve_order is not enabled),
            // so this is stable for a given payload value as constructed.
            hasher.update(payload.to_string().as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Whether this bookmark matches the given resumption request.
    pub fn matches(&self, name: &str, payload: Option<&serde_json::Value>) -> bool {
        self.hash == Self::fingerprint(name, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_for_same_inputs() {
        let payload = serde_json::json!({"a": 1});
        let a = Bookmark::fingerprint("evt", Some(&payload));
        let b = Bookmark::fingerprint("evt", Some(&payload));
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_by_name() {
        let a = Bookmark::fingerprint("evt-a", None);
        let b = Bookmark::fingerprint("evt-b", None);
        assert_ne!(a, b);
    }

    #[test]
    fn matches_checks_fingerprint() {
        let bookmark = Bookmark::new("0.1", Uuid::now_v7(), "evt", Some(serde_json::json!({"x": 1})));
        assert!(bookmark.matches("evt", Some(&serde_json::json!({"x": 1}))));
        assert!(!bookmark.matches("evt", Some(&serde_json::json!({"x": 2}))));
    }
}
