//! The storage used by the [`routes`](crate::routes) handlers.
use async_trait::async_trait;
use primitives::{ad_spot::ListFilter, AdSpot, Timestamp};
use thiserror::Error;

use crate::db::{self, DbPool, PoolError};

pub use memory::MemoryStore;

mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("The in-memory store lock was poisoned")]
    Poisoned,
    #[error("Ad spot {0} was not inserted")]
    NotInserted(String),
}

#[async_trait]
pub trait AdSpotStore: Send + Sync + 'static {
    async fn insert(&self, ad_spot: &AdSpot) -> Result<(), StoreError>;

    async fn find(&self, id: &str) -> Result<Option<AdSpot>, StoreError>;

    /// Sets the status to inactive and `deactivated_at` to `at`
    /// if the spot exists **and** is still active.
    ///
    /// Returns the number of affected spots.
    async fn deactivate(&self, id: &str, at: Timestamp) -> Result<u64, StoreError>;

    /// Applies the `placement` and `status` filters and orders by `created_at` descending.
    ///
    /// Expiry is **not** taken into account.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<AdSpot>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: DbPool,
}

impl PostgresStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdSpotStore for PostgresStore {
    async fn insert(&self, ad_spot: &AdSpot) -> Result<(), StoreError> {
        match db::insert_ad_spot(&self.pool, ad_spot).await? {
            true => Ok(()),
            false => Err(StoreError::NotInserted(ad_spot.id.clone())),
        }
    }

    async fn find(&self, id: &str) -> Result<Option<AdSpot>, StoreError> {
        Ok(db::fetch_ad_spot(&self.pool, id).await?)
    }

    async fn deactivate(&self, id: &str, at: Timestamp) -> Result<u64, StoreError> {
        Ok(db::deactivate_ad_spot(&self.pool, id, at).await?)
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<AdSpot>, StoreError> {
        Ok(db::list_ad_spots(&self.pool, filter).await?)
    }
}
