#![deny(rust_2018_idioms)]
#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! Domain and wire types shared by the Ad Spots service and its tooling.

pub use self::{
    ad_spot::{AdSpot, Placement, Status},
    clock::{Clock, SystemClock},
    config::Config,
    timestamp::Timestamp,
};

pub mod ad_spot;
pub mod api;
pub mod clock;
pub mod config;
pub mod timestamp;
pub mod util {
    pub mod logging;
}

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_util;
