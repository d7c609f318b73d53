use crate::activity::{ACTIVITY_CAPACITY, ActivityKind, ActivityMetadata, NewActivity};
use crate::app::App;
use crate::auth::{AuthState, AuthStore, User};
use crate::config::Config;
use crate::dashboard::PREVIEW_CAPACITY;
use crate::materials::Material;
use crate::storage::{MemoryTier, Storage, StorageTier, Tier, keys};
use chrono::Utc;
use std::sync::Arc;

fn storage_over(durable: Arc<MemoryTier>) -> Arc<Storage> {
    Arc::new(Storage::new(durable, Arc::new(MemoryTier::default())))
}

fn test_app() -> App {
    App::with_storage(Config::default(), Arc::new(Storage::in_memory()))
}

fn app_over(durable: Arc<MemoryTier>) -> App {
    App::with_storage(Config::default(), storage_over(durable))
}

fn sample_user(id: &str, email: &str) -> User {
    User {
        id: Some(id.to_string()),
        email: email.to_string(),
        token: Some("token-123".to_string()),
    }
}

fn sample_material(id: &str, category: &str) -> Material {
    Material {
        id: id.to_string(),
        title: format!("Material {}", id),
        course_code: "CSC280".to_string(),
        level: "200".to_string(),
        category: category.to_string(),
        description: "Lecture notes".to_string(),
        downloads: 0,
        url: format!("https://example.org/{}.pdf", id),
        created_at: Utc::now(),
    }
}

fn logged_in_app() -> App {
    let app = test_app();
    app.auth.login(sample_user("user-1", "jane@uniport.edu.ng"));
    app
}

fn download_activity(title: &str) -> NewActivity {
    NewActivity {
        kind: ActivityKind::Download,
        title: title.to_string(),
        description: "Downloaded a file".to_string(),
        metadata: Some(ActivityMetadata {
            course_code: Some("CSC280".to_string()),
            ..Default::default()
        }),
    }
}

#[test]
fn storage_roundtrip() {
    let storage = Storage::in_memory();

    storage
        .write(Tier::Durable, "things", &vec!["a".to_string(), "b".to_string()])
        .unwrap();

    let found: Option<Vec<String>> = storage.read(Tier::Durable, "things").unwrap();
    assert_eq!(found, Some(vec!["a".to_string(), "b".to_string()]));

    // Tiers do not share keys.
    let other: Option<Vec<String>> = storage.read(Tier::Session, "things").unwrap();
    assert!(other.is_none());
}

#[test]
fn storage_missing_key_reads_none() {
    let storage = Storage::in_memory();
    let found: Option<String> = storage.read(Tier::Durable, "absent").unwrap();
    assert!(found.is_none());
}

#[test]
fn storage_remove_is_idempotent() {
    let storage = Storage::in_memory();

    storage.write(Tier::Session, "k", &1u32).unwrap();
    storage.remove(Tier::Session, "k").unwrap();
    storage.remove(Tier::Session, "k").unwrap();

    let found: Option<u32> = storage.read(Tier::Session, "k").unwrap();
    assert!(found.is_none());
}

#[test]
fn storage_malformed_value_is_an_error() {
    let durable = Arc::new(MemoryTier::default());
    durable.write("broken", "{not json").unwrap();

    let storage = storage_over(durable);
    assert!(storage.read::<Vec<u32>>(Tier::Durable, "broken").is_err());
}

#[test]
fn file_tier_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let storage = Storage::open(dir.path()).unwrap();
        storage
            .write(Tier::Durable, keys::MATERIALS, &vec![sample_material("m1", "Notes")])
            .unwrap();
    }

    let storage = Storage::open(dir.path()).unwrap();
    let found: Option<Vec<Material>> = storage.read(Tier::Durable, keys::MATERIALS).unwrap();
    assert_eq!(found.unwrap().len(), 1);
}

#[test]
fn file_tier_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::open(dir.path()).unwrap();

    std::fs::write(dir.path().join("materials.json"), "][").unwrap();

    assert!(
        storage
            .read::<Vec<Material>>(Tier::Durable, keys::MATERIALS)
            .is_err()
    );
}

#[test]
fn auth_login_sets_state() {
    let app = logged_in_app();

    let state = app.auth.current();
    assert!(state.is_authenticated);
    assert_eq!(state.user.unwrap().email, "jane@uniport.edu.ng");
    assert_eq!(state.token.as_deref(), Some("token-123"));
    assert_eq!(app.auth.token().as_deref(), Some("token-123"));
}

#[test]
fn auth_login_then_restore_in_fresh_process() {
    let durable = Arc::new(MemoryTier::default());

    let first = app_over(Arc::clone(&durable));
    first.auth.login(sample_user("user-1", "jane@uniport.edu.ng"));

    // A fresh process shares the durable tier but starts with an empty
    // session tier.
    let second = app_over(durable);
    assert!(second.auth.restore());

    let state = second.auth.current();
    assert!(state.is_authenticated);
    assert_eq!(state.user.unwrap().email, "jane@uniport.edu.ng");
}

#[test]
fn auth_restore_without_snapshot_fails() {
    let app = test_app();

    assert!(!app.auth.restore());
    assert!(!app.auth.current().is_authenticated);
}

#[test]
fn auth_restore_prefers_session_tier() {
    let app = logged_in_app();

    // Another actor rewrote the durable snapshot; the session tier
    // still holds the live one.
    let stale = AuthState {
        is_authenticated: true,
        user: Some(sample_user("user-2", "old@uniport.edu.ng")),
        token: None,
    };
    app.storage.write(Tier::Durable, keys::AUTH, &stale).unwrap();

    let fresh = AuthStore::new(Arc::clone(&app.storage));
    assert!(fresh.restore());
    assert_eq!(
        fresh.current().user.unwrap().email,
        "jane@uniport.edu.ng"
    );

    // The namespacing primitive deliberately reads the durable tier.
    assert_eq!(fresh.current_user_id().as_deref(), Some("user-2"));
}

#[test]
fn auth_logged_out_snapshot_is_not_a_session() {
    let app = test_app();

    app.storage
        .write(Tier::Durable, keys::AUTH, &AuthState::default())
        .unwrap();

    assert!(!app.auth.restore());
    assert!(!app.auth.current().is_authenticated);
}

#[test]
fn auth_malformed_snapshot_treated_as_absent() {
    let durable = Arc::new(MemoryTier::default());
    durable.write(keys::AUTH, "{oops").unwrap();

    let app = app_over(durable);
    assert!(!app.auth.restore());
    assert!(!app.auth.current().is_authenticated);
}

#[test]
fn auth_logout_clears_both_tiers() {
    let app = logged_in_app();
    app.auth.logout();

    assert!(!app.auth.current().is_authenticated);
    assert!(app.auth.token().is_none());

    for tier in [Tier::Session, Tier::Durable] {
        let auth: Option<AuthState> = app.storage.read(tier, keys::AUTH).unwrap();
        assert!(auth.is_none());
        let token: Option<String> = app.storage.read(tier, keys::AUTH_TOKEN).unwrap();
        assert!(token.is_none());
    }
}

#[test]
fn auth_current_user_id_reads_durable_tier() {
    let app = logged_in_app();
    assert_eq!(app.auth.current_user_id().as_deref(), Some("user-1"));

    // Wiping the durable snapshot removes the namespace even though
    // the in-memory state is still authenticated.
    app.storage.remove(Tier::Durable, keys::AUTH).unwrap();
    assert!(app.auth.current_user_id().is_none());
    assert!(app.auth.current().is_authenticated);
}

#[test]
fn materials_add_prepends_and_persists() {
    let app = test_app();

    app.materials.add(sample_material("m1", "Notes"));
    app.materials.add(sample_material("m2", "Notes"));

    let all = app.materials.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "m2");

    let cached: Option<Vec<Material>> =
        app.storage.read(Tier::Durable, keys::MATERIALS).unwrap();
    assert_eq!(cached.unwrap().len(), 2);
}

#[test]
fn materials_increment_downloads() {
    let app = test_app();
    app.materials.add(sample_material("m1", "Notes"));

    app.materials.increment_downloads("m1");
    app.materials.increment_downloads("m1");

    assert_eq!(app.materials.get("m1").unwrap().downloads, 2);
}

#[test]
fn materials_increment_unknown_id_leaves_collection_unchanged() {
    let app = test_app();
    app.materials.add(sample_material("m1", "Notes"));

    let before = app.materials.all();
    app.materials.increment_downloads("missing");

    assert_eq!(app.materials.all(), before);
}

#[test]
fn materials_restore_from_cache() {
    let durable = Arc::new(MemoryTier::default());

    let first = app_over(Arc::clone(&durable));
    first.materials.add(sample_material("m1", "Notes"));
    first.materials.add(sample_material("m2", "Slides"));

    let second = app_over(durable);
    assert!(second.materials.is_empty());

    second.materials.restore_from_cache();
    let all = second.materials.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "m2");
}

#[test]
fn materials_malformed_cache_keeps_collection_empty() {
    let durable = Arc::new(MemoryTier::default());
    durable.write(keys::MATERIALS, "not json at all").unwrap();

    let app = app_over(durable);
    app.materials.restore_from_cache();

    assert!(app.materials.is_empty());
}

#[test]
fn materials_categories_track_collection() {
    let app = test_app();
    assert!(app.materials.categories().is_empty());

    // Prepends: insert the odd category first so "Notes" ends up in
    // front of the collection.
    app.materials.add(sample_material("m1", "Past Questions"));
    app.materials.add(sample_material("m2", "Notes"));
    app.materials.add(sample_material("m3", "Notes"));

    let categories = app.materials.categories();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].name, "Notes");
    assert_eq!(categories[0].count, 2);
    assert!((categories[0].percentage - 66.67).abs() < 0.01);
    assert_eq!(categories[1].name, "Past Questions");
    assert!((categories[1].percentage - 33.33).abs() < 0.01);

    let sum: f64 = categories.iter().map(|c| c.percentage).sum();
    assert!((sum - 100.0).abs() < 1e-9);
}

#[test]
fn activity_add_without_user_is_noop() {
    let app = test_app();

    app.activity.add(download_activity("orphan"));
    assert!(app.activity.entries().is_empty());
}

#[test]
fn activity_log_capacity_and_order() {
    let app = logged_in_app();

    for i in 0..25 {
        app.activity.add(download_activity(&format!("entry-{}", i)));
    }

    let entries = app.activity.entries();
    assert_eq!(entries.len(), ACTIVITY_CAPACITY);
    assert_eq!(entries[0].title, "entry-24");
    assert_eq!(entries.last().unwrap().title, "entry-5");
}

#[test]
fn activity_persists_and_inits() {
    let durable = Arc::new(MemoryTier::default());

    let first = app_over(Arc::clone(&durable));
    first.auth.login(sample_user("user-1", "jane@uniport.edu.ng"));
    first.activity.add(download_activity("one"));
    first.activity.add(download_activity("two"));

    let second = app_over(durable);
    second.activity.init();

    let entries = second.activity.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "two");
    assert_eq!(entries[0].kind, ActivityKind::Download);
}

#[test]
fn activity_init_with_malformed_log_resets_empty() {
    let durable = Arc::new(MemoryTier::default());

    let app = app_over(Arc::clone(&durable));
    app.auth.login(sample_user("user-1", "jane@uniport.edu.ng"));
    app.activity.add(download_activity("one"));

    durable.write(&keys::activities("user-1"), "<<garbage>>").unwrap();
    app.activity.init();

    assert!(app.activity.entries().is_empty());
}

#[test]
fn activity_init_without_user_loads_nothing() {
    let app = test_app();
    app.activity.init();
    assert!(app.activity.entries().is_empty());
}

#[test]
fn dashboard_add_material_updates_stats_and_categories() {
    let app = logged_in_app();

    app.dashboard.add_material(&sample_material("m1", "Past Questions"));
    app.dashboard.add_material(&sample_material("m2", "Notes"));
    app.dashboard.add_material(&sample_material("m3", "Notes"));

    let data = app.dashboard.snapshot();
    assert_eq!(data.stats.total_materials, 3);
    assert_eq!(data.stats.uploads, 3);
    assert_eq!(data.materials.len(), 3);
    assert_eq!(data.materials[0].id, "m3");

    assert_eq!(data.categories[0].name, "Past Questions");
    assert!((data.categories[0].percentage - 33.33).abs() < 0.01);
    assert_eq!(data.categories[1].name, "Notes");
    assert_eq!(data.categories[1].count, 2);
    assert!((data.categories[1].percentage - 66.67).abs() < 0.01);

    let sum: f64 = data.categories.iter().map(|c| c.percentage).sum();
    assert!((sum - 100.0).abs() < 1e-9);
}

#[test]
fn dashboard_preview_is_capped_but_counter_keeps_counting() {
    let app = logged_in_app();

    for i in 0..11 {
        app.dashboard
            .add_material(&sample_material(&format!("m{}", i), "Notes"));
    }

    let data = app.dashboard.snapshot();
    assert_eq!(data.stats.total_materials, 11);
    assert_eq!(data.materials.len(), PREVIEW_CAPACITY);
    assert_eq!(data.materials[0].id, "m10");
    // The oldest preview entry fell off; the counter did not.
    assert!(!data.materials.iter().any(|m| m.id == "m0"));
}

#[test]
fn dashboard_increment_downloads() {
    let app = logged_in_app();
    app.dashboard.add_material(&sample_material("m1", "Notes"));

    app.dashboard.increment_downloads("m1");
    let data = app.dashboard.snapshot();
    assert_eq!(data.stats.total_downloads, 1);
    assert_eq!(data.materials[0].downloads, 1);

    // Downloads of materials outside the preview still count.
    app.dashboard.increment_downloads("not-in-preview");
    let data = app.dashboard.snapshot();
    assert_eq!(data.stats.total_downloads, 2);
    assert_eq!(data.materials[0].downloads, 1);
}

#[test]
fn dashboard_reload_restores_identical_aggregate() {
    let durable = Arc::new(MemoryTier::default());

    let first = app_over(Arc::clone(&durable));
    first.auth.login(sample_user("user-1", "jane@uniport.edu.ng"));
    first.dashboard.add_material(&sample_material("m1", "Notes"));
    first.dashboard.add_material(&sample_material("m2", "Slides"));
    first.dashboard.increment_downloads("m1");
    let before = first.dashboard.snapshot();

    let second = app_over(durable);
    second.dashboard.init();

    let after = second.dashboard.snapshot();
    assert_eq!(after.stats, before.stats);
    assert_eq!(after.categories, before.categories);
    assert_eq!(after.materials, before.materials);
}

#[test]
fn dashboard_init_with_malformed_data_keeps_default() {
    let durable = Arc::new(MemoryTier::default());

    let app = app_over(Arc::clone(&durable));
    app.auth.login(sample_user("user-1", "jane@uniport.edu.ng"));

    durable.write(&keys::dashboard("user-1"), "][").unwrap();
    app.dashboard.init();

    let data = app.dashboard.snapshot();
    assert_eq!(data.stats.total_materials, 0);
    assert!(data.materials.is_empty());
}

#[test]
fn dashboard_init_without_user_keeps_default() {
    let app = test_app();
    app.dashboard.init();

    let data = app.dashboard.snapshot();
    assert_eq!(data.stats.total_materials, 0);
    assert!(data.materials.is_empty());
    assert!(data.categories.is_empty());
}

#[test]
fn app_startup_restores_everything() {
    let durable = Arc::new(MemoryTier::default());

    let first = app_over(Arc::clone(&durable));
    first.auth.login(sample_user("user-1", "jane@uniport.edu.ng"));
    first.materials.add(sample_material("m1", "Notes"));
    first.activity.add(download_activity("one"));
    first.dashboard.add_material(&sample_material("m1", "Notes"));

    let second = app_over(durable);
    assert!(second.startup());

    assert!(second.auth.current().is_authenticated);
    assert_eq!(second.materials.len(), 1);
    assert_eq!(second.activity.entries().len(), 1);
    assert_eq!(second.dashboard.snapshot().stats.total_materials, 1);
}

#[test]
fn app_startup_without_session_reports_none() {
    let app = test_app();
    assert!(!app.startup());
    assert!(!app.auth.current().is_authenticated);
}

#[test]
fn config_parse_toml() {
    let toml = r#"
[api]
base_url = "http://localhost:4000/api/v1"

[auth]
email_domain = "example.edu"

[storage]
data_dir = "/tmp/unilib-test"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.api.base_url, "http://localhost:4000/api/v1");
    assert_eq!(config.auth.email_domain, "example.edu");
    assert_eq!(
        config.storage.data_dir,
        std::path::PathBuf::from("/tmp/unilib-test")
    );
    // Untouched sections keep their defaults.
    assert!(config.feedback.endpoint.starts_with("https://formsubmit.co/"));
}

#[test]
fn config_default_values() {
    let config = Config::default();
    assert!(config.api.base_url.ends_with("/api/v1"));
    assert_eq!(config.auth.email_domain, "uniport.edu.ng");
}
