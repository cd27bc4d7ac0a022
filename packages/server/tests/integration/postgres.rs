use std::sync::Arc;

use serde_json::{Map, Value, json};
use uuid::Uuid;

use photolog::records::{NewRecord, RecordChanges, RecordStore, RecordStoreError};

use crate::common::{TestApp, postgres_record_store, routes};

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

mod store {
    use super::*;

    #[tokio::test]
    async fn create_get_update_delete() {
        let store = postgres_record_store().await;

        let created = store
            .create(NewRecord {
                fields: fields(json!({ "title": "Harbour", "tags": ["sea", "dusk"] })),
                image_url: Some("https://cdn.example/images/h.jpg".into()),
                image_path: Some("images/h.jpg".into()),
            })
            .await
            .unwrap();
        assert_eq!(created.version, 1);

        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.fields, json!({ "title": "Harbour", "tags": ["sea", "dusk"] }));
        assert_eq!(fetched.image_path.as_deref(), Some("images/h.jpg"));
        assert_eq!(fetched.created_at, created.created_at);

        let updated = store
            .update(
                created.id,
                &RecordChanges {
                    fields: fields(json!({ "title": "Harbour at night", "tags": null })),
                    image_url: Some(None),
                    image_path: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.fields, json!({ "title": "Harbour at night" }));
        assert_eq!(updated.image_url, None);
        assert_eq!(updated.image_path.as_deref(), Some("images/h.jpg"));

        let reread = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(reread.version, 2);
        assert_eq!(reread.fields, updated.fields);
        assert_eq!(reread.updated_at, updated.updated_at);

        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert!(store.get(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_capped() {
        let store = postgres_record_store().await;
        for n in 0..105 {
            store
                .create(NewRecord {
                    fields: fields(json!({ "n": n })),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let listed = store.list(1000).await.unwrap();
        assert_eq!(listed.len(), 100);
        assert_eq!(listed[0].fields, json!({ "n": 104 }));
        assert!(
            listed
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let store = postgres_record_store().await;

        let err = store
            .update(
                Uuid::now_v7(),
                &RecordChanges {
                    fields: fields(json!({ "title": "x" })),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RecordStoreError::NotFound));
    }

    #[tokio::test]
    async fn concurrent_updates_either_win_or_conflict() {
        let store = Arc::new(postgres_record_store().await);
        let created = store.create(NewRecord::default()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let id = created.id;
            handles.push(tokio::spawn(async move {
                let changes = RecordChanges {
                    fields: fields(json!({ "writer": i })),
                    ..Default::default()
                };
                store.update(id, &changes).await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(RecordStoreError::WriteConflict) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let stored = store.get(created.id).await.unwrap().unwrap();
        assert!(wins >= 1);
        assert_eq!(stored.version, 1 + wins);
    }
}

mod api {
    use super::*;

    #[tokio::test]
    async fn records_round_trip_through_postgres() {
        let app = TestApp::spawn_with(Arc::new(postgres_record_store().await), |_| {}).await;

        let id = app
            .create_record(&json!({ "title": "Pier", "id": "forged" }))
            .await;
        assert_ne!(id, "forged");

        let updated = app
            .put(&routes::record(&id), &json!({ "description": "Low tide" }))
            .await;
        assert_eq!(updated.status, 200, "{}", updated.text);
        assert_eq!(updated.body["title"], "Pier");
        assert_eq!(updated.body["description"], "Low tide");

        let listed = app.get(routes::DATA).await;
        assert_eq!(listed.body.as_array().unwrap().len(), 1);

        let deleted = app.delete(&routes::record(&id)).await;
        assert_eq!(deleted.status, 200);
        assert_eq!(app.get(routes::DATA).await.body, json!([]));
    }

    #[tokio::test]
    async fn concurrent_puts_resolve_to_ok_or_conflict() {
        let app = TestApp::spawn_with(Arc::new(postgres_record_store().await), |_| {}).await;
        let id = app.create_record(&json!({ "title": "Busy" })).await;

        let mut handles = Vec::new();
        for i in 0..12 {
            let client = app.client.clone();
            let url = app.url(&routes::record(&id));
            handles.push(tokio::spawn(async move {
                client
                    .put(url)
                    .json(&json!({ "writer": i }))
                    .send()
                    .await
                    .unwrap()
                    .status()
                    .as_u16()
            }));
        }

        let mut ok = 0;
        for handle in handles {
            let status = handle.await.unwrap();
            assert!(status == 200 || status == 409, "unexpected status {status}");
            if status == 200 {
                ok += 1;
            }
        }
        assert!(ok >= 1);
    }
}
