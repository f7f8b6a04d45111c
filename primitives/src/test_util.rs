//! Fixtures shared by the tests of every crate in the workspace.
use crate::{ad_spot::CreateAdSpot, AdSpot, Clock, Placement, Status, Timestamp};

pub use crate::{clock::MockClock, util::logging::discard_logger};

/// An [`AdSpot`] created at `clock.now()` in [`Placement::HomeScreen`].
pub fn dummy_ad_spot(
    id: &str,
    status: Status,
    ttl_minutes: Option<u32>,
    clock: &dyn Clock,
) -> AdSpot {
    AdSpot {
        id: id.to_string(),
        title: format!("Dummy ad spot {id}"),
        image_url: "https://example.com/image.png".to_string(),
        placement: Placement::HomeScreen,
        status,
        ttl_minutes,
        created_at: Timestamp::new(clock.now()),
        deactivated_at: None,
    }
}

/// A valid create request for the given `placement`.
pub fn dummy_create_request(title: &str, placement: Placement) -> CreateAdSpot {
    CreateAdSpot {
        title: Some(title.to_string()),
        image_url: Some(format!("https://example.com/{}.png", placement)),
        placement: Some(placement.to_string()),
        ttl_minutes: None,
    }
}
