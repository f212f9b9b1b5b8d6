//! Track fitting
//!
//! - [`add`]: single-hit Kalman update
//! - [`htrack`]: hit list plus fit status of one track
//! - [`full`]: sequential fit over all hits of a track
//! - [`config`]: full-fit configuration

pub mod add;
pub mod config;
pub mod full;
pub mod htrack;

pub use add::{AddFitKalman, AddFitter, HitUpdate};
pub use config::FitConfig;
pub use full::{FitSummary, FullFitKalman, FullFitter};
pub use htrack::HTrack;
