//! The canonical materials collection.
//!
//! One process-wide list of library materials, refreshable from the
//! backend, cached in the durable tier so the CLI has data before (or
//! without) a network round trip, and patched in place for optimistic
//! download counters. A derived category breakdown is recomputed on
//! every change to the collection.

use crate::api::ApiClient;
use crate::categories::{self, CategoryAggregate};
use crate::storage::{Storage, Tier, keys};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A library material as served by the backend and cached locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// Server-assigned identifier.
    pub id: String,
    /// Course title.
    pub title: String,
    /// Course code, e.g. "CSC280".
    pub course_code: String,
    /// Study level, e.g. "200".
    pub level: String,
    /// Category name, e.g. "Notes" or "Past Questions".
    pub category: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Download counter. Only ever incremented locally; a full refresh
    /// from the backend may replace it wholesale.
    #[serde(default)]
    pub downloads: u64,
    /// Download URL.
    #[serde(default)]
    pub url: String,
    /// Server-side creation time.
    pub created_at: DateTime<Utc>,
}

/// Reactive store for the materials collection.
pub struct MaterialsStore {
    items: Store<Vec<Material>>,
    categories: Store<Vec<CategoryAggregate>>,
    storage: Arc<Storage>,
    api: Arc<ApiClient>,
}

impl MaterialsStore {
    /// Create an empty store; the derived category breakdown tracks
    /// the collection from here on.
    pub fn new(api: Arc<ApiClient>, storage: Arc<Storage>) -> Self {
        let items: Store<Vec<Material>> = Store::new(Vec::new());
        let categories: Store<Vec<CategoryAggregate>> = Store::new(Vec::new());

        let derived = categories.clone();
        items.subscribe(move |collection: &Vec<Material>| {
            derived.set(categories::aggregate(collection));
        });

        Self {
            items,
            categories,
            storage,
            api,
        }
    }

    /// Snapshot of the collection.
    pub fn all(&self) -> Vec<Material> {
        self.items.get()
    }

    /// The material with the given id, if cached.
    pub fn get(&self, id: &str) -> Option<Material> {
        self.items.get().into_iter().find(|m| m.id == id)
    }

    /// Number of cached materials.
    pub fn len(&self) -> usize {
        self.items.get().len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.get().is_empty()
    }

    /// Snapshot of the derived category breakdown.
    pub fn categories(&self) -> Vec<CategoryAggregate> {
        self.categories.get()
    }

    /// The underlying reactive container, for subscribers.
    pub fn items(&self) -> Store<Vec<Material>> {
        self.items.clone()
    }

    /// Replace the collection with the backend listing.
    ///
    /// Any failure (network, non-2xx, bad body) logs and replaces the
    /// collection with an empty one: a failed refresh means nothing is
    /// confirmed, so no stale data is kept.
    pub async fn fetch_all(&self) {
        match self.api.fetch_materials().await {
            Ok(materials) => {
                tracing::info!(count = materials.len(), "Fetched materials");
                self.items.set(materials);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch materials");
                self.items.set(Vec::new());
            }
        }
    }

    /// Prepend `material` and write the collection through to the
    /// durable cache.
    pub fn add(&self, material: Material) {
        self.items.update(|items| items.insert(0, material));
        self.persist();
    }

    /// Bump the download counter of the material with `id`. An unknown
    /// id leaves the collection unchanged; the cache is rewritten
    /// either way.
    pub fn increment_downloads(&self, id: &str) {
        self.items.update(|items| {
            if let Some(material) = items.iter_mut().find(|m| m.id == id) {
                material.downloads += 1;
            }
        });
        self.persist();
    }

    /// Populate the collection from the durable cache, if present.
    /// Called at startup so the UI has (possibly stale) data before
    /// any fetch completes.
    pub fn restore_from_cache(&self) {
        match self.storage.read::<Vec<Material>>(Tier::Durable, keys::MATERIALS) {
            Ok(Some(materials)) => {
                tracing::debug!(count = materials.len(), "Restored materials cache");
                self.items.set(materials);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable materials cache");
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self
            .storage
            .write(Tier::Durable, keys::MATERIALS, &self.items.get())
        {
            tracing::warn!(error = %e, "Failed to persist materials cache");
        }
    }
}
