use std::time::Duration;

use docbatch::{BatchError, BatchUnit, InMemoryDocumentStore, StoreError};
use serde_json::json;

use crate::band::{registry, Album, Band};
use crate::gated::GatedStore;

#[tokio::test]
async fn cross_type_batch_lands_together() {
    let store = InMemoryDocumentStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(true);
    let bands = unit.repository::<Band>(&registry).unwrap();
    let albums = unit.repository::<Album>(&registry).unwrap();

    let mut band = Band {
        name: "Tool".into(),
        formation_year: 1990,
        ..Band::default()
    };
    bands.create(&mut band).unwrap();

    // The generated band id is usable before anything reaches the store.
    let band_id = band.id.clone().unwrap();
    let mut album = Album {
        id: None,
        band_id: band_id.clone(),
        name: "Lateralus".into(),
    };
    albums.create(&mut album).unwrap();

    assert!(store.documents("bands").unwrap().is_empty());
    unit.commit().await.unwrap();

    let stored = store.get("bands", &band_id).unwrap().unwrap();
    assert_eq!(stored["name"], "Tool");
    let stored = store
        .get("albums", album.id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored["bandId"], json!(band_id));
}

#[tokio::test]
async fn store_failure_surfaces_as_commit_error() {
    let store = InMemoryDocumentStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    bands.create(&mut Band::perfect_circle()).unwrap();
    bands.update(&Band {
        id: Some("missing".into()),
        ..Band::default()
    })
    .unwrap();

    let err = unit.commit().await.unwrap_err();
    assert!(matches!(
        err,
        BatchError::Commit(StoreError::NotFound(ref path)) if path == "bands/missing"
    ));

    // Nothing from the failed batch was applied.
    assert!(store.get("bands", "perfect-circle").unwrap().is_none());
}

#[tokio::test]
async fn retry_needs_a_fresh_unit() {
    let store = InMemoryDocumentStore::new();
    store.fail_next_commit(StoreError::Unavailable("network down".into()));
    let registry = registry(false);

    let unit = BatchUnit::new(store.clone());
    let bands = unit.repository::<Band>(&registry).unwrap();
    bands.create(&mut Band::perfect_circle()).unwrap();
    assert!(unit.commit().await.is_err());
    assert!(matches!(
        bands.create(&mut Band::perfect_circle()),
        Err(BatchError::Poisoned)
    ));

    let unit = BatchUnit::new(store.clone());
    let bands = unit.repository::<Band>(&registry).unwrap();
    bands.create(&mut Band::perfect_circle()).unwrap();
    unit.commit().await.unwrap();

    assert!(store.get("bands", "perfect-circle").unwrap().is_some());
}

#[tokio::test]
async fn oversized_batch_is_rejected_whole() {
    let store = InMemoryDocumentStore::new().with_max_batch_size(2);
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();

    for _ in 0..3 {
        bands.create(&mut Band::default()).unwrap();
    }

    let err = unit.commit().await.unwrap_err();
    assert!(matches!(
        err,
        BatchError::Commit(StoreError::BatchTooLarge { size: 3, max: 2 })
    ));
    assert!(store.documents("bands").unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_commit_is_refused_while_one_is_in_flight() {
    let store = GatedStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();
    bands.create(&mut Band::perfect_circle()).unwrap();

    let (first, second) = tokio::join!(unit.commit(), async {
        while !store.commit_started() {
            tokio::task::yield_now().await;
        }
        let second = unit.commit().await;
        store.open();
        second
    });

    assert!(matches!(second, Err(BatchError::CommitInProgress)));
    first.unwrap();
    assert_eq!(store.landed(), 1);
    assert!(!unit.is_poisoned());

    // The unit is reusable once the first commit lands.
    bands.create(&mut Band::default()).unwrap();
    store.open();
    unit.commit().await.unwrap();
    assert_eq!(store.landed(), 2);
}

#[tokio::test]
async fn cancelled_commit_poisons_unit() {
    let store = GatedStore::new();
    let unit = BatchUnit::new(store.clone());
    let registry = registry(false);
    let bands = unit.repository::<Band>(&registry).unwrap();
    bands.create(&mut Band::perfect_circle()).unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(20), unit.commit()).await;
    assert!(timed_out.is_err());
    assert!(store.commit_started());

    assert!(unit.is_poisoned());
    assert!(matches!(unit.commit().await, Err(BatchError::Poisoned)));
    assert!(matches!(
        bands.create(&mut Band::default()),
        Err(BatchError::Poisoned)
    ));
    assert_eq!(store.landed(), 0);
}
