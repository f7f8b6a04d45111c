use std::sync::RwLock;

use async_trait::async_trait;
use primitives::{ad_spot::ListFilter, AdSpot, Status, Timestamp};

use super::{AdSpotStore, StoreError};

/// Keeps the [`AdSpot`]s in memory, they're lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AdSpot>>,
}

impl MemoryStore {
    pub fn new(initial: &[AdSpot]) -> Self {
        Self {
            records: RwLock::new(initial.to_vec()),
        }
    }
}

#[async_trait]
impl AdSpotStore for MemoryStore {
    async fn insert(&self, ad_spot: &AdSpot) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.push(ad_spot.clone());

        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<AdSpot>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;

        Ok(records.iter().find(|ad_spot| ad_spot.id == id).cloned())
    }

    async fn deactivate(&self, id: &str, at: Timestamp) -> Result<u64, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;

        let mut affected = 0;
        for ad_spot in records
            .iter_mut()
            .filter(|ad_spot| ad_spot.id == id && ad_spot.is_active())
        {
            ad_spot.status = Status::Inactive;
            ad_spot.deactivated_at = Some(at);
            affected += 1;
        }

        Ok(affected)
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<AdSpot>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;

        let mut ad_spots = records
            .iter()
            .filter(|ad_spot| {
                filter
                    .placement
                    .map_or(true, |placement| ad_spot.placement == placement)
                    && filter.status.map_or(true, |status| ad_spot.status == status)
            })
            .cloned()
            .collect::<Vec<_>>();

        // newest first, ties keep the insertion order
        ad_spots.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(ad_spots)
    }
}
