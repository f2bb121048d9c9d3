//! Stage a band and its albums in one batch, then commit them atomically.
//!
//! Run with `RUST_LOG=debug cargo run --example bands` to see staging logs.

use docbatch::{
    BatchError, BatchUnit, CollectionSchema, Constraint, Document, FieldRule,
    InMemoryDocumentStore, OrmConfig, SchemaRegistry,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Band {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact_email: Option<String>,
}

impl Document for Band {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Album {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    band_id: String,
    title: String,
}

impl Document for Album {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[tokio::main]
async fn main() -> Result<(), BatchError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = SchemaRegistry::new(OrmConfig::new().with_validate_models(true))
        .with::<Band>(
            CollectionSchema::new("bands").rule(
                FieldRule::new("contactEmail", Constraint::Email)
                    .optional()
                    .with_message("Invalid email!"),
            ),
        )
        .with::<Album>(
            CollectionSchema::new("albums").rule(FieldRule::new("title", Constraint::NotEmpty)),
        );

    let store = InMemoryDocumentStore::new();
    let unit = BatchUnit::new(store.clone());
    let bands = unit.repository::<Band>(&registry)?;
    let albums = unit.repository::<Album>(&registry)?;

    let mut band = Band {
        id: None,
        name: "Porcupine Tree".into(),
        contact_email: Some("info@porcupinetree.com".into()),
    };
    bands.create(&mut band)?;

    let band_id = band.id.clone().unwrap_or_default();
    for title in ["In Absentia", "Deadwing", "Fear of a Blank Planet"] {
        let mut album = Album {
            id: None,
            band_id: band_id.clone(),
            title: title.into(),
        };
        albums.create(&mut album)?;
    }

    unit.commit().await?;
    println!(
        "committed {} band(s) and {} album(s)",
        store.documents("bands")?.len(),
        store.documents("albums")?.len()
    );

    // A second unit with an invalid entity never reaches the store.
    let unit = BatchUnit::new(store.clone());
    let bands = unit.repository::<Band>(&registry)?;
    bands.create(&mut Band {
        id: Some("broken".into()),
        name: "Broken".into(),
        contact_email: Some("Not an email".into()),
    })?;

    match unit.commit().await {
        Err(BatchError::Validation(errors)) => println!("rejected: {}", errors),
        other => println!("unexpected result: {:?}", other),
    }

    Ok(())
}
