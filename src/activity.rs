//! Activity log.
//!
//! An append-only, capacity-bounded log of user actions, namespaced
//! per user and persisted to the durable tier on every append.
//! Entries are never mutated after creation; the oldest fall off the
//! end once the log is full.

use crate::auth::AuthStore;
use crate::storage::{Storage, Tier, keys};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Most-recent-first entries kept per user.
pub const ACTIVITY_CAPACITY: usize = 20;

/// What kind of action an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// A material was uploaded.
    Upload,
    /// A material was downloaded.
    Download,
    /// Feedback was submitted.
    Feedback,
    /// A material was opened for reading.
    Reading,
    /// An upload awaiting approval.
    Pending,
}

/// Optional context attached to an activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetadata {
    /// Course code of the material involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    /// Study level of the material involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Download count at the time of the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,
    /// Status string, e.g. an upload approval state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// URL of the material involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One recorded action. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique entry id.
    pub id: String,
    /// Kind of action.
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// Short human-readable title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
    /// Optional context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ActivityMetadata>,
}

/// The caller-supplied part of an activity; id and timestamp are
/// filled in by the store.
#[derive(Debug, Clone)]
pub struct NewActivity {
    /// Kind of action.
    pub kind: ActivityKind,
    /// Short human-readable title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Optional context.
    pub metadata: Option<ActivityMetadata>,
}

/// Per-user, capacity-bounded activity log.
pub struct ActivityStore {
    log: Store<Vec<Activity>>,
    storage: Arc<Storage>,
    auth: AuthStore,
}

impl ActivityStore {
    /// Create an empty, uninitialized log.
    pub fn new(auth: AuthStore, storage: Arc<Storage>) -> Self {
        Self {
            log: Store::new(Vec::new()),
            storage,
            auth,
        }
    }

    /// Snapshot of the log, most recent first.
    pub fn entries(&self) -> Vec<Activity> {
        self.log.get()
    }

    /// Record an action. Without a resolvable user id this is a no-op:
    /// there is no namespace to persist under.
    pub fn add(&self, entry: NewActivity) {
        let Some(user_id) = self.auth.current_user_id() else {
            tracing::warn!("No user id resolvable, activity not recorded");
            return;
        };

        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            kind: entry.kind,
            title: entry.title,
            description: entry.description,
            timestamp: Utc::now(),
            metadata: entry.metadata,
        };

        self.log.update(|log| {
            log.insert(0, activity);
            log.truncate(ACTIVITY_CAPACITY);
        });

        let key = keys::activities(&user_id);
        if let Err(e) = self.storage.write(Tier::Durable, &key, &self.log.get()) {
            tracing::warn!(error = %e, "Failed to persist activity log");
        }
    }

    /// Load the persisted log for the current user. A malformed log
    /// resets the in-memory state to empty instead of failing.
    pub fn init(&self) {
        let Some(user_id) = self.auth.current_user_id() else {
            tracing::warn!("No user id resolvable, no activities loaded");
            return;
        };

        let key = keys::activities(&user_id);
        match self.storage.read::<Vec<Activity>>(Tier::Durable, &key) {
            Ok(Some(log)) => self.log.set(log),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to load activity log");
                self.log.set(Vec::new());
            }
        }
    }
}

/// Render `timestamp` relative to `now`: "Today", "Yesterday",
/// "3 days ago", "2 weeks ago", and so on.
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - timestamp).num_days().abs();

    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{} days ago", days),
        7..=29 => format!("{} weeks ago", days / 7),
        30..=364 => format!("{} months ago", days / 30),
        _ => format!("{} years ago", days / 365),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_time() {
        let now = Utc::now();

        assert_eq!(relative_time(now, now), "Today");
        assert_eq!(relative_time(now - Duration::days(1), now), "Yesterday");
        assert_eq!(relative_time(now - Duration::days(3), now), "3 days ago");
        assert_eq!(relative_time(now - Duration::days(14), now), "2 weeks ago");
        assert_eq!(relative_time(now - Duration::days(90), now), "3 months ago");
        assert_eq!(relative_time(now - Duration::days(800), now), "2 years ago");
    }

    #[test]
    fn test_activity_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ActivityKind::Download).unwrap(),
            r#""download""#
        );
        assert_eq!(
            serde_json::from_str::<ActivityKind>(r#""pending""#).unwrap(),
            ActivityKind::Pending
        );
    }
}
