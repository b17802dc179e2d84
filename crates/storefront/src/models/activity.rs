//! Audit-log entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dryfruit_core::{ActivityId, ActivityKind, UserId};

/// Number of entries returned by the admin activity feed.
pub const ACTIVITY_FEED_LIMIT: i64 = 50;

/// Who performed an activity, joined in for the admin feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A recorded activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ActivityUser>,
    pub description: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// An activity to record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub user_id: Option<UserId>,
    pub description: String,
    pub metadata: serde_json::Value,
}

impl NewActivity {
    #[must_use]
    pub fn new(kind: ActivityKind, user_id: UserId, description: impl Into<String>) -> Self {
        Self {
            kind,
            user_id: Some(user_id),
            description: description.into(),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Attach structured metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
