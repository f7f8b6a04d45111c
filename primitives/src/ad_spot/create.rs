use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AdSpot, Placement, Status};
use crate::Timestamp;

pub const MISSING_TITLE: &str = "Title field cannot be missing";
pub const MISSING_IMAGE_URL: &str = "Image URL field cannot be missing";
pub const MISSING_PLACEMENT: &str = "Placement field cannot be missing";
pub const INVALID_PLACEMENT: &str = "Invalid value for placement field";

/// The request body for creating an [`AdSpot`].
///
/// All fields are optional on the wire so that every missing field
/// can be reported at once by [`CreateAdSpot::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateAdSpot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_minutes: Option<u32>,
}

/// Every validation failure of a [`CreateAdSpot`], in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// A validated [`CreateAdSpot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdSpot {
    pub title: String,
    pub image_url: String,
    pub placement: Placement,
    pub ttl_minutes: Option<u32>,
}

impl CreateAdSpot {
    pub fn validate(self) -> Result<NewAdSpot, ValidationErrors> {
        let mut errors = vec![];

        if self.title.is_none() {
            errors.push(MISSING_TITLE.to_string());
        }
        if self.image_url.is_none() {
            errors.push(MISSING_IMAGE_URL.to_string());
        }

        let placement = match self.placement.as_deref().map(str::parse::<Placement>) {
            Some(Ok(placement)) => Some(placement),
            Some(Err(_)) => {
                errors.push(INVALID_PLACEMENT.to_string());
                None
            }
            None => {
                errors.push(MISSING_PLACEMENT.to_string());
                None
            }
        };

        match (self.title, self.image_url, placement) {
            (Some(title), Some(image_url), Some(placement)) if errors.is_empty() => Ok(NewAdSpot {
                title,
                image_url,
                placement,
                ttl_minutes: self.ttl_minutes,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

impl NewAdSpot {
    /// Creates an active [`AdSpot`] with a random UUID v4 as its id.
    pub fn into_ad_spot(self, created_at: Timestamp) -> AdSpot {
        AdSpot {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            image_url: self.image_url,
            placement: self.placement,
            status: Status::Active,
            ttl_minutes: self.ttl_minutes,
            created_at,
            deactivated_at: None,
        }
    }
}
