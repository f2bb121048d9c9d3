use docbatch::{BatchError, BatchRepository, BatchUnit, StoreError};
use serde_json::json;

use crate::band::{registry, Band};
use crate::recording::{Method, RecordingStore};

fn perfect_circle_json() -> serde_json::Value {
    json!({
        "id": "perfect-circle",
        "name": "A Perfect Circle",
        "formationYear": 1999,
        "genres": ["alternative-rock", "alternative-metal", "hard-rock"],
    })
}

#[tokio::test]
async fn create_with_id_writes_entity_unchanged() {
    let store = RecordingStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = BatchRepository::<Band, _>::new(&unit, &registry).unwrap();

    let mut band = Band::perfect_circle();
    bands.create(&mut band).unwrap();
    unit.commit().await.unwrap();

    let sets = store.calls_to(Method::Set);
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].path.as_deref(), Some("bands/perfect-circle"));
    assert_eq!(sets[0].data, Some(perfect_circle_json()));
    assert_eq!(band.id.as_deref(), Some("perfect-circle"));
}

#[tokio::test]
async fn create_without_id_assigns_generated_id() {
    let store = RecordingStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    let mut band = Band {
        id: None,
        name: "The Pinapple Thief".into(),
        formation_year: 1999,
        genres: vec!["progressive-rock".into()],
        contact_email: None,
    };
    bands.create(&mut band).unwrap();

    let id = band.id.clone().expect("create assigns an id");
    assert!(!id.is_empty());

    unit.commit().await.unwrap();

    let data = store.calls_to(Method::Set)[0].data.clone().unwrap();
    assert_eq!(data["id"], json!(id));
    assert_eq!(data["name"], "The Pinapple Thief");
    assert_eq!(data["formationYear"], 1999);
    assert_eq!(data["genres"], json!(["progressive-rock"]));
}

#[tokio::test]
async fn staging_does_no_io_until_commit() {
    let store = RecordingStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    bands.create(&mut Band::perfect_circle()).unwrap();
    assert!(store.calls().is_empty());

    unit.commit().await.unwrap();
    assert_eq!(store.calls().len(), 2);
}

#[tokio::test]
async fn update_captures_mutations_after_create() {
    let store = RecordingStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    let mut band = Band::perfect_circle();
    bands.create(&mut band).unwrap();
    unit.commit().await.unwrap();

    band.name = "Un Círculo Perfecto".into();
    bands.update(&band).unwrap();
    unit.commit().await.unwrap();

    let updates = store.calls_to(Method::Update);
    assert_eq!(updates.len(), 1);
    let mut expected = perfect_circle_json();
    expected["name"] = json!("Un Círculo Perfecto");
    assert_eq!(updates[0].data, Some(expected));

    // The first commit's set is not re-sent by the second commit.
    assert_eq!(store.calls_to(Method::Set).len(), 1);
}

#[tokio::test]
async fn delete_sends_entity_representation() {
    let store = RecordingStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    bands.delete(&Band::perfect_circle()).unwrap();
    unit.commit().await.unwrap();

    let deletes = store.calls_to(Method::Delete);
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].path.as_deref(), Some("bands/perfect-circle"));
    assert_eq!(deletes[0].data, Some(perfect_circle_json()));
}

#[tokio::test]
async fn operations_are_sent_in_staging_order() {
    let store = RecordingStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    let mut a = Band {
        id: Some("A".into()),
        ..Band::default()
    };
    let mut b = Band {
        id: Some("B".into()),
        ..Band::default()
    };
    bands.create(&mut a).unwrap();
    bands.create(&mut b).unwrap();
    bands.delete(&a).unwrap();
    unit.commit().await.unwrap();

    let sent: Vec<(Method, String)> = store
        .writes()
        .into_iter()
        .map(|call| (call.method, call.path.unwrap()))
        .collect();
    assert_eq!(
        sent,
        vec![
            (Method::Set, "bands/A".to_string()),
            (Method::Set, "bands/B".to_string()),
            (Method::Delete, "bands/A".to_string()),
        ]
    );
    assert_eq!(store.calls_to(Method::Commit).len(), 1);
}

#[tokio::test]
async fn repeated_stages_are_not_coalesced() {
    let store = RecordingStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    let mut band = Band::perfect_circle();
    bands.update(&band).unwrap();
    band.formation_year = 2000;
    bands.update(&band).unwrap();
    unit.commit().await.unwrap();

    let updates = store.calls_to(Method::Update);
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].data.as_ref().unwrap()["formationYear"], 2000);
}

#[tokio::test]
async fn second_commit_without_new_work_only_commits() {
    let store = RecordingStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    bands.create(&mut Band::perfect_circle()).unwrap();
    unit.commit().await.unwrap();
    unit.commit().await.unwrap();

    assert_eq!(store.writes().len(), 1);
    assert_eq!(store.calls_to(Method::Commit).len(), 2);
    // One handle for the unit's whole life.
    assert_eq!(store.batches_started(), 1);
}

#[tokio::test]
async fn store_rejection_is_a_commit_error() {
    let store = RecordingStore::new();
    store.fail_commits_with(StoreError::Rejected("quota exceeded".into()));
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    bands.create(&mut Band::perfect_circle()).unwrap();
    let err = unit.commit().await.unwrap_err();

    assert!(matches!(err, BatchError::Commit(StoreError::Rejected(_))));
    assert_eq!(store.calls_to(Method::Set).len(), 1);
    assert!(unit.is_poisoned());
}
