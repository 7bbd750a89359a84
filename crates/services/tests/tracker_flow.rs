use std::sync::Arc;
use std::time::Duration;

use services::{Clock, TrackerConfig, TrackerServices, TrackerSession};
use storage::curriculum::{DEFAULT_CURRICULUM, seed_if_empty};
use storage::identity::SessionIdentity;
use storage::repository::RoleRepository;
use study_core::model::{CurrentUser, Placement, UserId};
use study_core::time::fixed_now;

async fn open_services(name: &str, cache_dir: &tempfile::TempDir) -> TrackerServices {
    let config = TrackerConfig {
        db_url: format!("sqlite:file:{name}?mode=memory&cache=shared"),
        leaderboard_limit: 10,
        cache_path: Some(cache_dir.path().join("progress.json")),
    };
    let services = TrackerServices::from_config(&config, Clock::fixed(fixed_now()))
        .await
        .expect("sqlite services");
    seed_if_empty(services.storage().catalog.as_ref(), DEFAULT_CURRICULUM)
        .await
        .expect("seed");
    services
}

async fn sign_in(services: &TrackerServices, user_id: UserId) -> TrackerSession {
    let identity = SessionIdentity::signed_in(user_id, Arc::clone(&services.storage().roles));
    services.start_session(&identity).await.expect("session")
}

#[tokio::test]
async fn study_progress_round_trip() {
    let cache_dir = tempfile::tempdir().unwrap();
    let services = open_services("memdb_tracker_flow", &cache_dir).await;
    let profiles = services.profiles();
    let ada = profiles
        .register(UserId::random(), "Ada", "ada@example.com")
        .await
        .unwrap();
    let bob = profiles
        .register(UserId::random(), "Bob", "bob@example.com")
        .await
        .unwrap();

    let session = sign_in(&services, ada.user_id()).await;
    let view = session.view().await.unwrap();
    assert_eq!(view.sections.len(), 4);
    assert_eq!(view.overall.completed_count, 0);
    let first_section = &view.sections[0];
    let t1 = first_section.topics[0].topic.id();
    let t2 = first_section.topics[1].topic.id();

    session.toggle(t1).await.unwrap();
    session.toggle(t2).await.unwrap();
    let view = session.view().await.unwrap();
    assert_eq!(view.sections[0].progress.completed_count, 2);
    assert_eq!(view.overall.completed_count, 2);
    assert!(!view.is_complete());

    // Toggling back removes the mark from the store.
    session.toggle(t2).await.unwrap();
    session.reload().await.unwrap();
    assert!(session.synchronizer().is_complete(t1));
    assert!(!session.synchronizer().is_complete(t2));

    let board = session.leaderboard().await;
    assert!(board.is_ok());
    assert_eq!(board.entries.len(), 2);
    assert_eq!(board.entries[0].placement, Placement::First);
    assert_eq!(board.entries[0].entry.user_id, ada.user_id());
    assert_eq!(board.entries[0].entry.completed_count, 1);
    assert_eq!(board.entries[1].placement, Placement::Second);
    assert_eq!(board.entries[1].entry.user_id, bob.user_id());
    assert_eq!(board.entries[1].entry.completion_percentage.value(), 0.0);
}

#[tokio::test]
async fn admin_extends_catalog_and_grants_roles() {
    let cache_dir = tempfile::tempdir().unwrap();
    let services = open_services("memdb_tracker_admin", &cache_dir).await;
    let root = services
        .profiles()
        .register(UserId::random(), "Root", "root@example.com")
        .await
        .unwrap();
    let helper = services
        .profiles()
        .register(UserId::random(), "Helper", "helper@example.com")
        .await
        .unwrap();
    services.storage().roles.grant_admin(root.user_id()).await.unwrap();

    let session = sign_in(&services, root.user_id()).await;
    assert!(session.user().is_admin);
    let before = session.view().await.unwrap();
    let section = &before.sections[2];
    let last_order = section.topics.last().map_or(0, |t| t.topic.order());

    let topic = session
        .append_topic(&section.section.id().to_string(), "Tries")
        .await
        .unwrap();
    assert_eq!(topic.order(), last_order + 1);
    let after = session.view().await.unwrap();
    assert_eq!(after.sections[2].topics.last().unwrap().topic, topic);
    assert_eq!(after.overall.total_count, before.overall.total_count + 1);

    let admin = services.admin();
    let actor = CurrentUser::admin(root.user_id());
    let users = admin.list_users(&actor).await.unwrap();
    assert_eq!(users.len(), 2);
    let granted = admin.grant_admin(&actor, "helper@example.com").await.unwrap();
    assert_eq!(granted.user_id, helper.user_id());
    assert!(granted.newly_granted);
    assert!(sign_in(&services, helper.user_id()).await.user().is_admin);
}

#[tokio::test]
async fn second_device_changes_are_picked_up() {
    let cache_dir = tempfile::tempdir().unwrap();
    let services = open_services("memdb_tracker_devices", &cache_dir).await;
    let ada = services
        .profiles()
        .register(UserId::random(), "Ada", "ada@example.com")
        .await
        .unwrap();

    let mut laptop = sign_in(&services, ada.user_id()).await;
    laptop.follow_changes();
    assert!(laptop.is_following());
    let phone = sign_in(&services, ada.user_id()).await;

    let topic = phone.view().await.unwrap().sections[1].topics[0].topic.id();
    phone.toggle(topic).await.unwrap();

    let sync = laptop.synchronizer();
    let seen = tokio::time::timeout(Duration::from_secs(2), async {
        while !sync.is_complete(topic) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(seen.is_ok(), "laptop never reloaded");
}

#[tokio::test]
async fn cache_hint_is_written_after_load() {
    let cache_dir = tempfile::tempdir().unwrap();
    let services = open_services("memdb_tracker_cache", &cache_dir).await;
    let ada = services
        .profiles()
        .register(UserId::random(), "Ada", "ada@example.com")
        .await
        .unwrap();

    let session = sign_in(&services, ada.user_id()).await;
    let topic = session.view().await.unwrap().sections[0].topics[0].topic.id();
    session.toggle(topic).await.unwrap();

    let raw = std::fs::read_to_string(cache_dir.path().join("progress.json")).unwrap();
    assert!(raw.contains(&ada.user_id().to_string()));
    assert!(raw.contains(&topic.to_string()));
}
