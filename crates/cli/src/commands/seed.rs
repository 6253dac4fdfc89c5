//! Seed the database with stores from a YAML file.
//!
//! The file is a list of stores in the same shape the add form submits:
//!
//! ```yaml
//! - name: Cafe Nero
//!   description: Coffee and cake.
//!   tags: [Wifi, Vegetarian]
//!   address: 1 High St, London
//!   lng: -0.1278
//!   lat: 51.5074
//! ```
//!
//! Stores go through the same validation and slug rules as the web form, so
//! seeding a name twice yields `cafe-nero` and `cafe-nero-2`.

use std::path::Path;

use thiserror::Error;
use tracing::{error, info};

use storefinder_web::db::PgStoreRepository;
use storefinder_web::models::StoreDraft;
use storefinder_web::services::{StoreError, StoreService};

use super::{CommandError, connect};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} stores failed validation")]
    Invalid(usize),

    #[error("Could not create store: {0}")]
    Store(#[from] StoreError),
}

/// Parse a seed file.
///
/// # Errors
///
/// Returns `SeedError::Yaml` if the content is not a list of stores.
pub fn parse(content: &str) -> Result<Vec<StoreDraft>, SeedError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Validate every draft, returning one line per problem.
#[must_use]
pub fn validate(drafts: &[StoreDraft]) -> Vec<String> {
    drafts
        .iter()
        .enumerate()
        .filter_map(|(i, draft)| {
            draft.clone().validate().err().map(|errors| {
                let label = if draft.name.trim().is_empty() {
                    format!("#{}", i + 1)
                } else {
                    draft.name.trim().to_owned()
                };
                format!("{label}: {errors}")
            })
        })
        .collect()
}

/// Create the stores listed in `file`.
///
/// Everything is validated before connecting, so a bad file writes nothing.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or a write fails.
pub async fn stores(file: &Path, dry_run: bool) -> Result<(), SeedError> {
    info!(path = %file.display(), "Loading stores from file");

    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| SeedError::Read {
            path: file.display().to_string(),
            source,
        })?;
    let drafts = parse(&content)?;
    info!(stores = drafts.len(), "Parsed seed file");

    let problems = validate(&drafts);
    if !problems.is_empty() {
        error!("Seed file validation failed:");
        for problem in &problems {
            error!("  - {problem}");
        }
        return Err(SeedError::Invalid(problems.len()));
    }

    if dry_run {
        info!("Dry run: seed file is valid, nothing written");
        return Ok(());
    }

    let pool = connect().await?;
    let repository = PgStoreRepository::new(pool);
    let service = StoreService::new(&repository);

    for draft in drafts {
        let store = service.create(draft).await?;
        info!(slug = %store.slug, "Created {}", store.name);
    }

    info!("Seeding complete!");
    Ok(())
}
