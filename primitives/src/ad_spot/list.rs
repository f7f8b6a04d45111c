use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Placement, Status};

/// The raw query parameters of `GET /adspots`.
///
/// Empty values are treated the same as missing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSpotListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListQueryError {
    #[error("Invalid value for placement field")]
    Placement,
    #[error("Invalid value for status field")]
    Status,
}

/// The filters applied by the storage when listing [`AdSpot`](super::AdSpot)s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub placement: Option<Placement>,
    pub status: Option<Status>,
}

impl ListFilter {
    /// Only requesting active spots hides the expired ones.
    pub fn excludes_expired(&self) -> bool {
        self.status == Some(Status::Active)
    }
}

impl AdSpotListQuery {
    pub fn filter(&self) -> Result<ListFilter, ListQueryError> {
        let placement = non_empty(&self.placement)
            .map(|placement| placement.parse().map_err(|_| ListQueryError::Placement))
            .transpose()?;

        // only the exact lowercase values are accepted
        let status = non_empty(&self.status)
            .map(|status| match status {
                "active" => Ok(Status::Active),
                "inactive" => Ok(Status::Inactive),
                _ => Err(ListQueryError::Status),
            })
            .transpose()?;

        Ok(ListFilter { placement, status })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
