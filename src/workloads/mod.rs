//! Built-in workloads, registered by name.

pub mod basic;
pub mod fake;
pub mod user_profile;

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::warn;

use crate::error::{Error, StoreError};
use crate::store::{DocumentStore, IndexSpec, wait_for_index};
use crate::workload::Workload;

pub use basic::Basic;
pub use user_profile::UserProfile;

/// Look up a workload by its registered name. Unknown names are fatal at
/// startup.
pub fn by_name(
    name: &str,
    store: Arc<dyn DocumentStore>,
    num_items: u64,
    seed: u64,
) -> Result<Arc<dyn Workload>, Error> {
    match name {
        basic::NAME => Ok(Arc::new(Basic::new(store, num_items, seed))),
        user_profile::NAME => Ok(Arc::new(UserProfile::new(store, num_items, seed))),
        other => Err(Error::UnknownWorkload(other.to_string())),
    }
}

/// An RNG for one generated document, derived from the run seed and the
/// document id so setup output is reproducible.
pub(crate) fn document_rng(seed: u64, id: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed ^ id.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Create a secondary index and wait for it to come online. Required: any
/// failure is fatal for setup.
pub(crate) async fn create_query_index(
    store: &dyn DocumentStore,
    index: &str,
    field: &str,
) -> Result<(), Error> {
    store
        .create_index(
            index,
            IndexSpec::Query {
                field: field.to_string(),
            },
        )
        .await
        .map_err(|e| Error::Setup(e.to_string()))?;
    wait_for_index(store, index)
        .await
        .map_err(|e| Error::Setup(e.to_string()))
}

/// Create a search index and wait for it to come online. Optional: if the
/// search service is unavailable the index is skipped with a warning, and
/// the workload's search operations are free to fail at runtime instead.
pub(crate) async fn ensure_search_index(
    store: &dyn DocumentStore,
    index: &str,
    field: &str,
) -> Result<(), Error> {
    let created = store
        .create_index(
            index,
            IndexSpec::Search {
                field: field.to_string(),
            },
        )
        .await;
    let online = match created {
        Ok(()) => wait_for_index(store, index).await,
        Err(e) => Err(e),
    };
    match online {
        Ok(()) => Ok(()),
        Err(StoreError::Unavailable(reason)) => {
            warn!(index, reason, "search service unavailable, skipping index");
            Ok(())
        }
        Err(e) => Err(Error::Setup(e.to_string())),
    }
}
