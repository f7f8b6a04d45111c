use chrono::{DateTime, Duration, Utc};
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::{Clock, Timestamp};

pub use create::{CreateAdSpot, NewAdSpot, ValidationErrors};
pub use list::{AdSpotListQuery, ListFilter, ListQueryError};

pub mod create;
pub mod list;

/// The UI position an [`AdSpot`] is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr)]
#[serde(rename_all = "snake_case")]
#[display(style = "snake_case")]
pub enum Placement {
    HomeScreen,
    RideSummary,
    MapView,
}

/// Whether an [`AdSpot`] is still in rotation.
///
/// Persisted as a boolean: `true` for [`Status::Active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr)]
#[serde(rename_all = "lowercase")]
#[display(style = "lowercase")]
pub enum Status {
    Active,
    Inactive,
}

impl From<bool> for Status {
    fn from(active: bool) -> Self {
        if active {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

impl From<Status> for bool {
    fn from(status: Status) -> Self {
        status == Status::Active
    }
}

/// A promotional image placed in one of the [`Placement`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdSpot {
    pub id: String,
    pub title: String,
    /// Not validated as a URL.
    pub image_url: String,
    pub placement: Placement,
    pub status: Status,
    /// `None` or `Some(0)` both mean the spot never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_minutes: Option<u32>,
    pub created_at: Timestamp,
    /// Set once, when the spot goes from [`Status::Active`] to [`Status::Inactive`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated_at: Option<Timestamp>,
}

impl AdSpot {
    /// The instant after which the spot is expired, if it ever expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.ttl_minutes {
            None | Some(0) => None,
            Some(minutes) => self
                .created_at
                .datetime()
                .checked_add_signed(Duration::minutes(i64::from(minutes))),
        }
    }

    /// A spot is expired strictly **after** `createdAt + ttlMinutes`,
    /// at the boundary itself it is still live.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at()
            .map(|expires_at| now > expires_at)
            .unwrap_or(false)
    }

    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.is_expired_at(clock.now())
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::{AdSpot, Placement, Status};

    use bytes::BytesMut;
    use std::error::Error;
    use tokio_postgres::{
        types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type},
        Row,
    };

    impl From<&Row> for AdSpot {
        fn from(row: &Row) -> Self {
            Self {
                id: row.get("id"),
                title: row.get("title"),
                image_url: row.get("image_url"),
                placement: row.get("placement"),
                status: row.get("status"),
                ttl_minutes: row
                    .get::<_, Option<i64>>("ttl_minutes")
                    .and_then(|minutes| u32::try_from(minutes).ok()),
                created_at: row.get("created_at"),
                deactivated_at: row.get("deactivated_at"),
            }
        }
    }

    impl<'a> FromSql<'a> for Placement {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let text = <&str as FromSql>::from_sql(ty, raw)?;

            Ok(text.parse()?)
        }

        accepts!(TEXT, VARCHAR);
    }

    impl ToSql for Placement {
        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
            self.to_string().to_sql(ty, w)
        }

        accepts!(TEXT, VARCHAR);
        to_sql_checked!();
    }

    impl<'a> FromSql<'a> for Status {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            <bool as FromSql>::from_sql(ty, raw).map(Status::from)
        }

        accepts!(BOOL);
    }

    impl ToSql for Status {
        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
            bool::from(*self).to_sql(ty, w)
        }

        accepts!(BOOL);
        to_sql_checked!();
    }
}
