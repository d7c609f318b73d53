//! Per-user dashboard aggregates.
//!
//! Running statistics plus a bounded preview of recent materials,
//! updated incrementally on two events (material added, download
//! counted) and persisted after every mutation. The dashboard keeps
//! its own counters independent of the materials collection: the two
//! are separate caches for separate surfaces and are allowed to
//! drift.

use crate::auth::AuthStore;
use crate::categories::CategoryAggregate;
use crate::materials::Material;
use crate::storage::{Storage, Tier, keys};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Preview entries kept, most recent first.
pub const PREVIEW_CAPACITY: usize = 10;

/// Running counters.
///
/// `total_materials` counts every material ever added through this
/// store. It is an independent monotonic counter, never recomputed
/// from the capped preview list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Materials added via this dashboard.
    pub total_materials: u64,
    /// Downloads counted via this dashboard.
    pub total_downloads: u64,
    /// Uploads performed by this user.
    pub uploads: u64,
    /// Materials active this month, as reported by the backend.
    pub active_this_month: u64,
}

/// The slice of a [`Material`] shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialPreview {
    /// Material id.
    pub id: String,
    /// Course title.
    pub title: String,
    /// Course code.
    pub course_code: String,
    /// Study level.
    pub level: String,
    /// Category name.
    pub category: String,
    /// Download counter.
    pub downloads: u64,
    /// Server-side creation time.
    pub created_at: DateTime<Utc>,
}

impl From<&Material> for MaterialPreview {
    fn from(material: &Material) -> Self {
        Self {
            id: material.id.clone(),
            title: material.title.clone(),
            course_code: material.course_code.clone(),
            level: material.level.clone(),
            category: material.category.clone(),
            downloads: material.downloads,
            created_at: material.created_at,
        }
    }
}

/// The full persisted aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    /// Recent materials, capped to [`PREVIEW_CAPACITY`].
    pub materials: Vec<MaterialPreview>,
    /// Running counters.
    pub stats: DashboardStats,
    /// Category breakdown relative to `stats.total_materials`.
    pub categories: Vec<CategoryAggregate>,
}

/// Per-user dashboard store.
pub struct DashboardStore {
    data: Store<DashboardData>,
    storage: Arc<Storage>,
    auth: AuthStore,
}

impl DashboardStore {
    /// Create an empty dashboard.
    pub fn new(auth: AuthStore, storage: Arc<Storage>) -> Self {
        Self {
            data: Store::new(DashboardData::default()),
            storage,
            auth,
        }
    }

    /// Snapshot of the aggregate.
    pub fn snapshot(&self) -> DashboardData {
        self.data.get()
    }

    /// Load the persisted aggregate for the current user, keeping the
    /// empty default when no user id resolves or nothing was stored.
    pub fn init(&self) {
        let Some(user_id) = self.auth.current_user_id() else {
            return;
        };

        let key = keys::dashboard(&user_id);
        match self.storage.read::<DashboardData>(Tier::Durable, &key) {
            Ok(Some(data)) => self.data.set(data),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable dashboard data");
            }
        }
    }

    /// Record a newly added material: prepend its preview (evicting
    /// the oldest past the cap), bump the counters, and fold it into
    /// the category breakdown.
    pub fn add_material(&self, material: &Material) {
        self.data.update(|data| {
            data.materials.insert(0, MaterialPreview::from(material));
            data.materials.truncate(PREVIEW_CAPACITY);

            data.stats.total_materials += 1;
            data.stats.uploads += 1;

            match data
                .categories
                .iter_mut()
                .find(|c| c.name == material.category)
            {
                Some(entry) => entry.count += 1,
                None => data.categories.push(CategoryAggregate {
                    name: material.category.clone(),
                    count: 1,
                    percentage: 0.0,
                }),
            }

            // Percentages are relative to the monotonic counter, not
            // the capped preview list.
            let total = data.stats.total_materials as f64;
            for entry in &mut data.categories {
                entry.percentage = (entry.count as f64 / total) * 100.0;
            }
        });

        self.persist();
    }

    /// Count a download, bumping the matching preview entry when it is
    /// still in the list.
    pub fn increment_downloads(&self, material_id: &str) {
        self.data.update(|data| {
            data.stats.total_downloads += 1;

            if let Some(preview) = data.materials.iter_mut().find(|m| m.id == material_id) {
                preview.downloads += 1;
            }
        });

        self.persist();
    }

    fn persist(&self) {
        let Some(user_id) = self.auth.current_user_id() else {
            tracing::debug!("No user id resolvable, dashboard not persisted");
            return;
        };

        let key = keys::dashboard(&user_id);
        if let Err(e) = self.storage.write(Tier::Durable, &key, &self.data.get()) {
            tracing::warn!(error = %e, "Failed to persist dashboard data");
        }
    }
}
