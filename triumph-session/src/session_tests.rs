use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use docsync::memory::{InMemoryDocumentStore, RecordedRequest};
use docsync::{
    ClientError, DocumentClient, DocumentPath, FileCache, LocalCache, MemoryCache, Readiness,
};
use serde_json::json;

use super::*;
use crate::config::AppVersion;

fn config(user_id: Option<&str>) -> SessionConfig {
    SessionConfig {
        game_id: "solitaire".to_string(),
        app_id: "com.triumph.solitaire".to_string(),
        app_version: AppVersion {
            version: "1.4.0".to_string(),
            build_number: 140,
        },
        user_id: user_id.map(str::to_string),
        cache_dir: None,
    }
}

fn path(path: &str) -> DocumentPath {
    DocumentPath::parse(path).unwrap()
}

fn fixture() -> InMemoryDocumentStore {
    InMemoryDocumentStore::from_fixture(&json!({
        "users/u1": {"username": "ace", "balance": 12.5},
        "publicUserInfo/u1": {"username": "ace"},
        "games/solitaire/config/host": {"supportEmail": "help@triumph.test"},
        "games/solitaire/config/lockdown": {"minimumSupportedVersionNumber": 120},
        "games/solitaire/config/blitz": {"definitions": []},
        "games/solitaire/tournamentConfigs/t-high": {"name": "High", "entryPrice": 10.0},
        "games/solitaire/tournamentConfigs/t-low": {"name": "Low", "entryPrice": 1.0},
        "games/solitaire/tournamentConfigs/t-old": {"name": "Old", "entryPrice": 0.5, "isArchived": true},
        "games/solitaire/liveMessages/m1": {"title": "Welcome"},
        "users/u1/gameStates/solitaire": {"t-low": {"status": "inProgress", "attempts": 1}},
        "users/u1/missions/solitaire": {"missions": []},
        "otherGames/g1": {"name": "Bingo"},
        "depositDefinitions/d1": {"amount": 10.0},
    }))
    .unwrap()
}

struct Harness {
    session: Session,
    store: Arc<InMemoryDocumentStore>,
    cache: Arc<MemoryCache>,
}

fn harness(store: InMemoryDocumentStore, cache: MemoryCache, user_id: Option<&str>) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(store);
    let cache = Arc::new(cache);
    let session = Session::new(config(user_id), store.clone(), cache.clone()).unwrap();
    Harness {
        session,
        store,
        cache,
    }
}

fn preset_ids(session: &Session) -> Vec<String> {
    session.with_state(|state| state.presets.iter().map(|preset| preset.id.clone()).collect())
}

fn record_events(session: &Session) -> Arc<Mutex<Vec<SessionEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    session.subscribe(move |event| sink.lock().push(event.clone()));
    events
}

#[tokio::test]
async fn test_cold_start_uses_only_the_cache() {
    let cache = MemoryCache::new();
    cache
        .write(
            "tournamentConfigs",
            &json!([
                {"id": "b", "name": "B", "entryPrice": 5.0},
                {"id": "a", "name": "A", "entryPrice": 1.0},
                {"id": "x", "name": "X", "entryPrice": 0.5, "isArchived": true},
            ]),
        )
        .unwrap();
    let h = harness(InMemoryDocumentStore::new(), cache, Some("u1"));
    let events = record_events(&h.session);

    // the spawned paths have not run yet on a current-thread runtime
    let _handle = h.session.prepare_session();

    assert!(h.store.requests().is_empty());
    assert_eq!(h.session.readiness(), Some(Readiness::CoreData));
    assert_eq!(preset_ids(&h.session), vec!["a", "b"]);
    assert!(events.lock().contains(&SessionEvent::ReadyForInteraction));
}

#[tokio::test]
async fn test_warm_start_survives_host_config_failure() {
    let store = fixture();
    store.fail_path(
        path("games/solitaire/config/host"),
        ClientError::Transport("connection reset".to_string()),
    );
    let cache = MemoryCache::new();
    cache
        .write("hostConfig", &json!({"supportEmail": "cached@triumph.test"}))
        .unwrap();
    let h = harness(store, cache, Some("u1"));

    let prepared = h.session.prepare_session().wait().await.unwrap();

    assert_eq!(h.session.readiness(), Some(Readiness::Db));
    assert_eq!(prepared.report.failures.len(), 1);
    assert_eq!(prepared.report.failed().collect::<Vec<_>>(), vec![Resource::HostConfig]);
    assert_eq!(prepared.report.fetched.len(), WARM_START_ORDER.len() - 1);
    let host = h.session.snapshot().host_config.unwrap();
    assert_eq!(host.support_email.as_deref(), Some("cached@triumph.test"));

    let status = h.session.resource_status(Resource::HostConfig);
    assert!(status.last_sync_error.unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_warm_start_fills_state_and_cache() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    let events = record_events(&h.session);

    let prepared = h.session.prepare_session().wait().await.unwrap();
    assert!(prepared.report.is_complete());

    let state = h.session.snapshot();
    assert_eq!(state.user.unwrap().username, "ace");
    assert_eq!(preset_ids(&h.session), vec!["t-low", "t-high"]);
    assert_eq!(state.other_games.len(), 2);
    assert_eq!(state.deposit_definitions.0[0].id, "d1");
    assert!(state.game_states.get("t-low").is_some());
    assert!(!h.session.is_locked_down());

    // only cache-eligible resources are written back
    assert!(h.cache.read("tournamentConfigs").unwrap().is_some());
    assert!(h.cache.read("user").unwrap().is_some());
    assert!(h.cache.read("depositDefinitions").unwrap().is_none());

    let events = events.lock();
    let position = |wanted: &SessionEvent| events.iter().position(|event| event == wanted).unwrap();
    assert!(
        position(&SessionEvent::ReadinessChanged(Readiness::CoreData))
            < position(&SessionEvent::ReadinessChanged(Readiness::Db))
    );
    assert!(events.contains(&SessionEvent::SessionDataDidPrepare));
    assert!(events.contains(&SessionEvent::ResourceDidUpdate(Resource::TournamentConfigs)));
}

#[tokio::test]
async fn test_listener_delivery_after_fetch_wins() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    let presets = h.session.tournament_configs();

    presets.get().await.unwrap();
    assert!(presets.observe());
    h.store.push(
        path("games/solitaire/tournamentConfigs/t-mid"),
        json!({"name": "Mid", "entryPrice": 4.0}),
    );

    assert_eq!(preset_ids(&h.session), vec!["t-low", "t-mid", "t-high"]);
}

#[tokio::test]
async fn test_fetch_completing_after_listener_delivery_is_dropped() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    let presets = h.session.tournament_configs();
    assert!(presets.observe());

    let hold = h.store.hold(path("games/solitaire/tournamentConfigs"));
    let mut fetch = Box::pin(presets.get());
    assert!(futures::poll!(&mut fetch).is_pending());

    h.store.push(
        path("games/solitaire/tournamentConfigs/t-mid"),
        json!({"name": "Mid", "entryPrice": 4.0}),
    );
    hold.release();
    fetch.await.unwrap();

    assert_eq!(preset_ids(&h.session), vec!["t-low", "t-mid", "t-high"]);
}

#[tokio::test]
async fn test_reset_discards_late_writes() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    h.session.cold_start();
    let events = record_events(&h.session);

    let hold = h.store.hold(path("games/solitaire/config/lockdown"));
    let lockdown = h.session.lockdown();
    let mut fetch = Box::pin(lockdown.get());
    assert!(futures::poll!(&mut fetch).is_pending());

    h.session.reset_session();
    hold.release();

    assert!(matches!(fetch.await, Err(SessionError::Cancelled)));
    assert_eq!(h.session.snapshot(), SessionState::default());
    assert_eq!(h.session.readiness(), Some(Readiness::CoreData));
    assert!(h.cache.is_empty());
    assert!(events.lock().contains(&SessionEvent::SessionDidReset));
}

#[tokio::test]
async fn test_fetch_failing_after_reset_leaves_no_status() {
    let store = fixture();
    let lockdown_path = path("games/solitaire/config/lockdown");
    store.fail_path(
        lockdown_path.clone(),
        ClientError::Transport("connection reset".to_string()),
    );
    let h = harness(store, MemoryCache::new(), Some("u1"));

    let hold = h.store.hold(lockdown_path);
    let lockdown = h.session.lockdown();
    let mut fetch = Box::pin(lockdown.get());
    assert!(futures::poll!(&mut fetch).is_pending());
    assert!(h.session.resource_status(Resource::Lockdown).last_sync_started.is_some());

    h.session.reset_session();
    hold.release();

    assert!(matches!(fetch.await, Err(SessionError::Cancelled)));
    assert_eq!(h.session.resource_status(Resource::Lockdown), SyncState::default());
}

#[tokio::test]
async fn test_fetch_started_after_reset_is_still_recorded() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    h.session.reset_session();

    h.session.lockdown().get().await.unwrap();

    let status = h.session.resource_status(Resource::Lockdown);
    assert!(status.last_sync_finished.is_some());
    assert!(status.last_sync_error.is_none());
}

#[tokio::test]
async fn test_reset_cancels_prepare() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    let handle = h.session.prepare_session();
    h.session.reset_session();

    assert!(matches!(handle.wait().await, Err(SessionError::Cancelled)));
    assert!(h.store.listener_keys().is_empty());
}

#[tokio::test]
async fn test_listener_activation_from_before_a_reset_registers_nothing() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    let epoch = h.session.inner.store.epoch();

    h.session.reset_session();

    assert!(h.session.activate_listeners_in_epoch(epoch).is_empty());
    assert!(h.store.listener_keys().is_empty());
    assert_eq!(h.session.snapshot(), SessionState::default());

    assert_eq!(h.session.activate_listeners(), LISTENED_RESOURCES.to_vec());
    assert_eq!(h.store.listener_keys().len(), LISTENED_RESOURCES.len());
}

#[tokio::test]
async fn test_reset_from_a_subscriber_during_listener_activation() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    let reset_once = Arc::new(AtomicBool::new(false));
    h.session.subscribe({
        let session = h.session.clone();
        let reset_once = reset_once.clone();
        move |event| {
            if matches!(event, SessionEvent::ResourceDidUpdate(_))
                && !reset_once.swap(true, Ordering::SeqCst)
            {
                session.reset_session();
            }
        }
    });

    // the first listener's initial delivery resets the session; nothing after it may register
    let activated = h.session.activate_listeners();

    assert!(reset_once.load(Ordering::SeqCst));
    assert_eq!(activated, vec![LISTENED_RESOURCES[0]]);
    assert!(h.store.listener_keys().is_empty());
    assert_eq!(h.session.snapshot(), SessionState::default());

    assert_eq!(h.session.activate_listeners(), LISTENED_RESOURCES.to_vec());
}

#[tokio::test]
async fn test_finished_tasks_are_pruned() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));

    for _ in 0..3 {
        h.session.prepare_session().wait().await.unwrap();
    }

    // only the two tasks of the last prepare can still be tracked
    assert!(h.session.inner.in_flight.lock().len() <= 2);
}

#[tokio::test]
async fn test_file_cache_serves_cold_start_after_restart() {
    let _ = env_logger::builder().is_test(true).try_init();
    let directory = tempfile::tempdir().unwrap();

    {
        let cache: Arc<dyn LocalCache> = Arc::new(FileCache::open(directory.path()).unwrap());
        let session = Session::new(config(Some("u1")), Arc::new(fixture()), cache).unwrap();
        session.prepare_session().wait().await.unwrap();
    }

    let store = Arc::new(InMemoryDocumentStore::new());
    let cache: Arc<dyn LocalCache> = Arc::new(FileCache::open(directory.path()).unwrap());
    let session = Session::new(config(Some("u1")), store.clone(), cache).unwrap();

    assert!(session.cold_start() > 0);
    assert_eq!(preset_ids(&session), vec!["t-low", "t-high"]);
    assert_eq!(session.snapshot().user.unwrap().username, "ace");
    assert!(store.requests().is_empty());
}

#[tokio::test]
async fn test_missing_user_skips_user_scoped_resources() {
    let h = harness(fixture(), MemoryCache::new(), None);

    let prepared = h.session.prepare_session().wait().await.unwrap();

    let mut failed: Vec<_> = prepared.report.failed().collect();
    failed.sort();
    let mut expected: Vec<_> = Resource::ALL.into_iter().filter(|r| r.is_user_scoped()).collect();
    expected.sort();
    assert_eq!(failed, expected);
    assert!(prepared
        .report
        .failures
        .iter()
        .all(|(_, e)| matches!(e, SessionError::MissingUserId(_))));

    assert_eq!(
        prepared.listeners,
        vec![Resource::TournamentConfigs, Resource::HostConfig, Resource::Lockdown]
    );
    assert_eq!(h.session.readiness(), Some(Readiness::Db));

    assert!(matches!(
        h.session.register_push_token("tok").await,
        Err(SessionError::MissingUserId(Resource::User))
    ));
    assert!(matches!(
        h.session.call_function("claimMission", json!({})).await,
        Err(SessionError::MissingUserId(_))
    ));
}

#[tokio::test]
async fn test_active_listeners_are_not_registered_twice() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));

    let prepared = h.session.prepare_session().wait().await.unwrap();
    assert_eq!(prepared.listeners, LISTENED_RESOURCES.to_vec());

    assert!(h.session.activate_listeners().is_empty());
    let listens = h
        .store
        .requests()
        .into_iter()
        .filter(|request| matches!(request, RecordedRequest::Listen(_)))
        .count();
    assert_eq!(listens, LISTENED_RESOURCES.len());
}

#[tokio::test]
async fn test_other_games_keeps_list_on_empty_result() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    let other_games = h.session.other_games();

    other_games.get_forced(true).await.unwrap();
    assert_eq!(h.session.snapshot().other_games.len(), 2);

    h.store.remove(&path("otherGames/g1"));
    other_games.get_forced(true).await.unwrap();
    assert_eq!(h.session.snapshot().other_games.len(), 2);

    h.store.clear_requests();
    other_games.get_forced(false).await.unwrap();
    assert!(h.store.requests().is_empty());
}

#[tokio::test]
async fn test_absent_documents_fall_back_to_defaults() {
    let store = fixture();
    store.remove(&path("games/solitaire/config/lockdown"));
    store.remove(&path("users/u1/gameStates/solitaire"));
    store.remove(&path("games/solitaire/config/blitz"));
    let h = harness(store, MemoryCache::new(), Some("u1"));

    h.session.lockdown().get().await.unwrap();
    h.session.game_states().get().await.unwrap();
    let missing = h.session.blitz_definitions().get().await.unwrap_err();

    assert!(missing.is_no_data());
    let state = h.session.snapshot();
    assert_eq!(state.lockdown, Some(Lockdown::default()));
    assert!(state.game_states.is_empty());
    assert!(!h.session.is_locked_down());
}

#[tokio::test]
async fn test_lockdown_compares_build_number() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    assert!(h.session.lockdown().observe());
    assert!(!h.session.is_locked_down());

    h.store.push(
        path("games/solitaire/config/lockdown"),
        json!({"minimumSupportedVersionNumber": 141}),
    );
    assert!(h.session.is_locked_down());
}

#[tokio::test]
async fn test_cache_of_another_user_is_discarded() {
    let cache = MemoryCache::new();
    cache.write("lastUserId", &json!("u0")).unwrap();
    cache
        .write("hostConfig", &json!({"supportEmail": "u0@triumph.test"}))
        .unwrap();
    let h = harness(InMemoryDocumentStore::new(), cache, Some("u1"));

    assert_eq!(h.session.cold_start(), 0);
    assert_eq!(h.session.snapshot().host_config, None);
    assert_eq!(h.cache.read("lastUserId").unwrap(), Some(json!("u1")));
}

#[tokio::test]
async fn test_push_token_round_trip() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    assert!(h.session.user().observe());

    h.session.register_push_token("tok-1").await.unwrap();
    let user = h.session.snapshot().user.unwrap();
    assert_eq!(
        user.fcm_tokens.get("com.triumph.solitaire").map(String::as_str),
        Some("tok-1")
    );

    h.session.unregister_push_token().await.unwrap();
    let user = h.store.document(&path("users/u1")).unwrap();
    assert_eq!(user["fcmTokens"], json!({}));
}

#[tokio::test]
async fn test_user_writes() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    assert!(h.session.user().observe());

    h.session.mark_live_message_seen("m1").await.unwrap();
    assert!(h.session.snapshot().user.unwrap().has_seen("m1"));

    let info = PublicUserInfo {
        username: "ace".to_string(),
        avatar_url: Some("https://cdn.triumph.test/ace.png".to_string()),
        badges: vec!["early".to_string()],
    };
    h.session.set_public_info(&info).await.unwrap();
    assert_eq!(
        h.store.document(&path("publicUserInfo/u1")).unwrap()["avatarUrl"],
        json!("https://cdn.triumph.test/ace.png")
    );

    h.store.set_function_response("claimMission", json!({"ok": true}));
    let response = h.session.call_function("claimMission", json!({"id": "m"})).await.unwrap();
    assert_eq!(response, json!({"ok": true}));
}

#[tokio::test]
async fn test_support_widget_is_identified_after_warm_start() {
    struct Recorder(Mutex<Vec<String>>);

    impl SupportWidget for Recorder {
        fn identify(&self, user_id: &str) {
            self.0.lock().push(user_id.to_string());
        }
    }

    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
    h.session.set_support_widget(recorder.clone());

    h.session.prepare_session().wait().await.unwrap();
    assert_eq!(*recorder.0.lock(), vec!["u1".to_string()]);
}

#[tokio::test]
async fn test_listener_errors_keep_state() {
    let h = harness(fixture(), MemoryCache::new(), Some("u1"));
    let host = path("games/solitaire/config/host");
    assert!(h.session.host_config().observe());
    let before = h.session.snapshot().host_config;
    assert!(before.is_some());

    h.store.emit_error(&host, ClientError::PermissionDenied(host.clone()));
    assert_eq!(h.session.snapshot().host_config, before);

    h.store.push(host, json!({"supportEmail": "new@triumph.test"}));
    let host = h.session.snapshot().host_config.unwrap();
    assert_eq!(host.support_email.as_deref(), Some("new@triumph.test"));
}
