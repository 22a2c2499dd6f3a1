// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization decision tree and composite operations of the reader service.

use std::sync::Arc;

use serde_json::json;

use fluxion_core::{FluxionError, JsonPageMetadata, JsonRepository, Message, SenmlPageMetadata};
use fluxion_readers::{
    BackupArchive, Credentials, MemoryStore, ReaderService, Repositories, SearchStatus,
};
use fluxion_test_utils::MockAccessControl;
use fluxion_test_utils::fixtures::{json_record, senml_series};

fn token(t: &str) -> Credentials {
    Credentials::Token(t.to_string())
}

async fn seeded() -> (MemoryStore, Repositories) {
    let store = MemoryStore::new();
    let repos = Repositories {
        senml: Arc::new(store.senml()),
        json: Arc::new(store.json()),
    };
    let mut records = senml_series("p1", "temp", 1.0, &[1.0, 2.0, 3.0]);
    records.extend(senml_series("p2", "temp", 1.0, &[10.0, 20.0]));
    repos.senml.restore(records).await.unwrap();
    repos
        .json
        .restore(vec![
            json_record("p1", 5, json!({"a": 1})).into(),
            json_record("p2", 6, json!({"a": 2})).into(),
        ])
        .await
        .unwrap();
    (store, repos)
}

fn access() -> MockAccessControl {
    MockAccessControl::new()
        .with_admin("root")
        .grant("alice", "p1")
        .with_key("key-p2", "p2")
}

#[tokio::test]
async fn explicit_publisher_needs_view_access() {
    let (_store, repos) = seeded().await;
    let access = access();
    let service = ReaderService::new(repos, Arc::new(access.clone()), 4);

    let query = SenmlPageMetadata {
        publisher: "p1".into(),
        ..Default::default()
    };
    let page = service
        .list_senml_messages(&token("alice"), query)
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(access.calls().await, vec!["can_access:p1:view".to_string()]);

    let denied = service
        .list_senml_messages(
            &token("alice"),
            SenmlPageMetadata {
                publisher: "p2".into(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(denied, Err(FluxionError::Forbidden(_))));
}

#[tokio::test]
async fn thing_key_scopes_query_to_its_publisher() {
    let (_store, repos) = seeded().await;
    let service = ReaderService::new(repos, Arc::new(access()), 4);
    let key = Credentials::ThingKey("key-p2".into());

    let page = service
        .list_senml_messages(&key, SenmlPageMetadata::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.messages.iter().all(|m| m.publisher() == "p2"));
    assert_eq!(page.metadata.publisher, "p2");

    let json = service
        .list_json_messages(&key, JsonPageMetadata::default())
        .await
        .unwrap();
    assert_eq!(json.total, 1);

    let mismatch = service
        .list_senml_messages(
            &key,
            SenmlPageMetadata {
                publisher: "p1".into(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(mismatch, Err(FluxionError::Forbidden(_))));

    let unknown = service
        .list_senml_messages(
            &Credentials::ThingKey("nope".into()),
            SenmlPageMetadata::default(),
        )
        .await;
    assert!(matches!(unknown, Err(FluxionError::Unauthenticated(_))));
}

#[tokio::test]
async fn unscoped_listing_requires_admin() {
    let (_store, repos) = seeded().await;
    let service = ReaderService::new(repos, Arc::new(access()), 4);

    let page = service
        .list_senml_messages(&token("root"), SenmlPageMetadata::default())
        .await
        .unwrap();
    assert_eq!(page.total, 5);

    let denied = service
        .list_senml_messages(&token("alice"), SenmlPageMetadata::default())
        .await;
    assert!(matches!(denied, Err(FluxionError::Forbidden(_))));

    let anonymous = service
        .list_json_messages(&token(""), JsonPageMetadata::default())
        .await;
    assert!(matches!(anonymous, Err(FluxionError::Unauthenticated(_))));
}

#[tokio::test]
async fn scoped_delete_checks_publisher_not_admin() {
    let (store, repos) = seeded().await;
    let access = access();
    let service = ReaderService::new(repos, Arc::new(access.clone()), 4);

    service
        .delete_senml_messages(
            "alice",
            &SenmlPageMetadata {
                publisher: "p1".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(store.len(), 4);
    assert!(!access.calls().await.contains(&"is_admin".to_string()));

    let denied = service
        .delete_json_messages(
            "alice",
            &JsonPageMetadata {
                publisher: "p2".into(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(denied, Err(FluxionError::Forbidden(_))));
    assert_eq!(store.len(), 4);

    let unscoped = service
        .delete_senml_messages("root", &SenmlPageMetadata::default())
        .await;
    assert!(matches!(unscoped, Err(FluxionError::Validation(_))));
}

#[tokio::test]
async fn delete_all_requires_admin_and_criteria() {
    let (store, repos) = seeded().await;
    let service = ReaderService::new(repos, Arc::new(access()), 4);

    let denied = service
        .delete_all_senml_messages(
            "alice",
            &SenmlPageMetadata {
                name: "temp".into(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(denied, Err(FluxionError::Forbidden(_))));

    let no_criteria = service
        .delete_all_json_messages("root", &JsonPageMetadata::default())
        .await;
    assert!(matches!(no_criteria, Err(FluxionError::NoDeleteCriteria)));
    assert_eq!(store.len(), 7);

    service
        .delete_all_senml_messages(
            "root",
            &SenmlPageMetadata {
                name: "temp".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn backup_and_restore_move_everything() {
    let (_store, repos) = seeded().await;
    let service = ReaderService::new(repos, Arc::new(access()), 4);

    assert!(matches!(
        service.backup("alice").await,
        Err(FluxionError::Forbidden(_))
    ));
    let archive = service.backup("root").await.unwrap();
    assert_eq!(archive.senml.len(), 5);
    assert_eq!(archive.json.len(), 2);

    let text = serde_json::to_string(&archive).unwrap();
    let parsed: BackupArchive = serde_json::from_str(&text).unwrap();

    let target = MemoryStore::new();
    let restored = ReaderService::new(
        Repositories {
            senml: Arc::new(target.senml()),
            json: Arc::new(target.json()),
        },
        Arc::new(access()),
        4,
    );
    assert!(matches!(
        restored.restore("alice", parsed.clone()).await,
        Err(FluxionError::Forbidden(_))
    ));
    assert!(target.is_empty());

    restored.restore("root", parsed).await.unwrap();
    assert_eq!(target.len(), 7);
    assert_eq!(restored.backup("root").await.unwrap(), archive);
}

#[tokio::test]
async fn restore_applies_json_before_senml_without_rollback() {
    let target = MemoryStore::new();
    let service = ReaderService::new(
        Repositories {
            senml: Arc::new(target.senml()),
            json: Arc::new(target.json()),
        },
        Arc::new(access()),
        4,
    );
    let archive = BackupArchive {
        json: vec![json_record("p1", 1, json!({"a": 1})).into()],
        senml: vec![Message::Json(json_record("p1", 2, json!({})))],
    };
    let err = service.restore("root", archive).await.unwrap_err();
    assert!(matches!(err, FluxionError::InvalidMessage));
    let json = target
        .json()
        .retrieve(&JsonPageMetadata::default())
        .await
        .unwrap();
    assert_eq!(json.total, 1);
    assert_eq!(target.len(), 1);
}

#[tokio::test]
async fn search_reports_partial_failure_in_input_order() {
    let (_store, repos) = seeded().await;
    let service = ReaderService::new(repos, Arc::new(access()), 2);

    let queries = vec![
        SenmlPageMetadata {
            publisher: "p1".into(),
            ..Default::default()
        },
        SenmlPageMetadata {
            publisher: "p2".into(),
            ..Default::default()
        },
        SenmlPageMetadata {
            publisher: "p1".into(),
            limit: 1,
            ..Default::default()
        },
    ];
    let results = service.search_senml(&token("alice"), queries).await;
    assert_eq!(results.status, SearchStatus::Partial);
    assert_eq!(results.outcomes.len(), 3);
    assert_eq!(results.outcomes[0].as_ref().unwrap().total, 3);
    assert!(matches!(
        results.outcomes[1],
        Err(FluxionError::Forbidden(_))
    ));
    assert_eq!(results.outcomes[2].as_ref().unwrap().messages.len(), 1);

    let all_ok = service
        .search_json(&token("root"), vec![JsonPageMetadata::default(); 5])
        .await;
    assert_eq!(all_ok.status, SearchStatus::AllOk);

    let all_failed = service
        .search_json(&token("bob"), vec![JsonPageMetadata::default(); 2])
        .await;
    assert_eq!(all_failed.status, SearchStatus::AllFailed);
}
