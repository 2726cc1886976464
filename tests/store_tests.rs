use querydeck::db::{Store, SyncStatus};

async fn memory_store() -> Store {
    Store::new("sqlite::memory:")
        .await
        .expect("in-memory store should initialize")
}

/// Admin user id seeded by the initial migration, used as created_by.
const ADMIN_ID: i32 = 1;

#[tokio::test]
async fn test_migrations_seed_admin() {
    let store = memory_store().await;

    let admin = store
        .get_user_by_email("admin@querydeck.local")
        .await
        .unwrap()
        .expect("bootstrap admin should exist");

    assert_eq!(admin.role, "admin");
    assert!(admin.active);
}

#[tokio::test]
async fn test_mark_out_of_sync_only_flips_synced() {
    let store = memory_store().await;

    let db = store
        .create_database("wh", None, "postgres://x", "postgres", ADMIN_ID)
        .await
        .unwrap();
    assert_eq!(db.sync_status, SyncStatus::YetToSync.as_str());

    // Already out of sync: a metadata edit must not touch it
    store.mark_database_out_of_sync(db.id).await.unwrap();
    let current = store.get_database(db.id).await.unwrap().unwrap();
    assert_eq!(current.sync_status, SyncStatus::YetToSync.as_str());

    store
        .set_database_sync_status(db.id, SyncStatus::Synced, Some(true))
        .await
        .unwrap();
    let current = store.get_database(db.id).await.unwrap().unwrap();
    assert_eq!(current.sync_status, SyncStatus::Synced.as_str());
    assert!(current.embeddings_ready);

    store.mark_database_out_of_sync(db.id).await.unwrap();
    let current = store.get_database(db.id).await.unwrap().unwrap();
    assert_eq!(current.sync_status, SyncStatus::YetToSync.as_str());

    // A mid-run sync is left alone too
    store
        .set_database_sync_status(db.id, SyncStatus::Syncing, None)
        .await
        .unwrap();
    store.mark_database_out_of_sync(db.id).await.unwrap();
    let current = store.get_database(db.id).await.unwrap().unwrap();
    assert_eq!(current.sync_status, SyncStatus::Syncing.as_str());
}

#[tokio::test]
async fn test_access_resolution_direct_and_via_team() {
    let store = memory_store().await;

    let user = store
        .create_user("ana@example.com", "Ana", "hash", "user")
        .await
        .unwrap();
    let team_id = store
        .create_team("Data", None, &[user.id], ADMIN_ID)
        .await
        .unwrap();
    let db = store
        .create_database("sales", None, "mysql://x", "mysql", ADMIN_ID)
        .await
        .unwrap();

    let teams = store.team_ids_of_user(user.id).await.unwrap();
    assert_eq!(teams, vec![team_id]);

    assert!(
        !store
            .user_has_database_access(user.id, &teams, db.id)
            .await
            .unwrap()
    );

    store
        .create_access("team", Some(team_id), None, db.id, ADMIN_ID)
        .await
        .unwrap();
    assert!(
        store
            .user_has_database_access(user.id, &teams, db.id)
            .await
            .unwrap()
    );
    assert!(store.team_has_database_access(team_id, db.id).await.unwrap());

    // Direct grant works without any team
    let loner = store
        .create_user("bo@example.com", "Bo", "hash", "user")
        .await
        .unwrap();
    assert!(
        !store
            .user_has_database_access(loner.id, &[], db.id)
            .await
            .unwrap()
    );
    store
        .create_access("user", None, Some(loner.id), db.id, ADMIN_ID)
        .await
        .unwrap();
    assert!(
        store
            .user_has_database_access(loner.id, &[], db.id)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_usage_recording_accumulates() {
    let store = memory_store().await;

    let team_id = store
        .create_team("Pipelines", None, &[], ADMIN_ID)
        .await
        .unwrap();
    let key = store
        .create_api_key(
            team_id,
            ADMIN_ID,
            "ci",
            "qd_abcdef123",
            "not-a-real-digest",
            &["query:read".to_string()],
            None,
        )
        .await
        .unwrap();

    assert_eq!(key.usage_count, 0);

    store
        .record_api_key_usage(key.id, "etl-bot", "How many orders?", Some("10.1.2.3"))
        .await
        .unwrap();
    store
        .record_api_key_usage(key.id, "etl-bot", "Top customers", None)
        .await
        .unwrap();

    let current = store.get_api_key(key.id).await.unwrap().unwrap();
    assert_eq!(current.usage_count, 2);
    assert_eq!(current.last_used_by.as_deref(), Some("etl-bot"));
    assert_eq!(current.last_query.as_deref(), Some("Top customers"));
    assert!(current.last_used_at.is_some());
    assert_eq!(current.last_used_ip, None);
}

#[tokio::test]
async fn test_team_update_replaces_membership() {
    let store = memory_store().await;

    let a = store
        .create_user("a@example.com", "A", "hash", "user")
        .await
        .unwrap();
    let b = store
        .create_user("b@example.com", "B", "hash", "user")
        .await
        .unwrap();

    let team_id = store
        .create_team("Rotation", None, &[a.id], ADMIN_ID)
        .await
        .unwrap();
    assert!(store.is_team_member(team_id, a.id).await.unwrap());

    let updated = store
        .update_team(team_id, None, None, Some(&[b.id]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.members.len(), 1);
    assert_eq!(updated.members[0].id, b.id);

    assert!(!store.is_team_member(team_id, a.id).await.unwrap());
    assert!(store.is_team_member(team_id, b.id).await.unwrap());
}

#[tokio::test]
async fn test_chat_messages_ordered_and_cascade() {
    let store = memory_store().await;

    let db = store
        .create_database("metrics", None, "postgres://x", "postgres", ADMIN_ID)
        .await
        .unwrap();
    let chat = store
        .create_chat("Q3 revenue", ADMIN_ID, &[db.id])
        .await
        .unwrap();
    assert_eq!(chat.database_ids, vec![db.id]);

    store
        .add_chat_message(chat.id, "How much?", "A lot.", Some("SELECT 1"), None)
        .await
        .unwrap();
    store
        .add_chat_message(chat.id, "Compared to Q2?", "Up 12%.", None, None)
        .await
        .unwrap();

    let messages = store.list_chat_messages(chat.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].user_message, "How much?");
    assert_eq!(messages[1].user_message, "Compared to Q2?");

    assert!(store.remove_chat(chat.id).await.unwrap());
    let messages = store.list_chat_messages(chat.id).await.unwrap();
    assert!(messages.is_empty());
}
