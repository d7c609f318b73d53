//! Process-wide wiring of stores and clients.

use crate::activity::ActivityStore;
use crate::api::ApiClient;
use crate::auth::AuthStore;
use crate::config::Config;
use crate::dashboard::DashboardStore;
use crate::error::Result;
use crate::feedback::FeedbackClient;
use crate::materials::MaterialsStore;
use crate::storage::Storage;
use std::sync::Arc;

/// Everything a command needs, constructed once per process.
///
/// The auth store is foundational: the activity and dashboard stores
/// derive their persistence namespace from it, so they share its
/// handle rather than going to storage themselves.
pub struct App {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Two-tier persistence.
    pub storage: Arc<Storage>,
    /// Backend API client.
    pub api: Arc<ApiClient>,
    /// Authentication state.
    pub auth: AuthStore,
    /// The shared materials collection.
    pub materials: MaterialsStore,
    /// Per-user activity log.
    pub activity: ActivityStore,
    /// Per-user dashboard aggregates.
    pub dashboard: DashboardStore,
    /// Feedback relay client.
    pub feedback: FeedbackClient,
}

impl App {
    /// Build the application over the configured data directory.
    pub fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config.storage.data_dir)?);
        Ok(Self::with_storage(config, storage))
    }

    /// Build the application over explicit storage (used by tests to
    /// substitute in-memory tiers).
    pub fn with_storage(config: Config, storage: Arc<Storage>) -> Self {
        let api = Arc::new(ApiClient::new(
            config.api.base_url.clone(),
            config.auth.email_domain.clone(),
        ));
        let feedback = FeedbackClient::new(config.feedback.endpoint.clone());

        let auth = AuthStore::new(Arc::clone(&storage));
        let materials = MaterialsStore::new(Arc::clone(&api), Arc::clone(&storage));
        let activity = ActivityStore::new(auth.clone(), Arc::clone(&storage));
        let dashboard = DashboardStore::new(auth.clone(), Arc::clone(&storage));

        Self {
            config: Arc::new(config),
            storage,
            api,
            auth,
            materials,
            activity,
            dashboard,
            feedback,
        }
    }

    /// Restore persisted state: the auth session, the materials cache,
    /// and the per-user stores (which quietly stay empty when no user
    /// id resolves). Returns whether a session was restored.
    pub fn startup(&self) -> bool {
        let restored = self.auth.restore();

        self.materials.restore_from_cache();
        self.activity.init();
        self.dashboard.init();

        restored
    }
}
