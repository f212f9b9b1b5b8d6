//! trackfit: sequential Kalman track fitting
//!
//! Reconstructs a charged-particle trajectory from an ordered list of detector
//! measurements. The running estimate is propagated from surface to surface
//! and updated with one measurement at a time.
//!
//! # Features
//!
//! - **Typed state**: track parameters and covariances carry their dimension
//!   and vector space in the type
//! - **Pluggable geometry**: surfaces, propagators and clusters are traits
//! - **Explicit failures**: a fit that stops reports the step and hit index
//!
//! # Example
//!
//! ```ignore
//! use trackfit::prelude::*;
//!
//! let mut fitter = FullFitKalman::new(Box::new(my_propagator));
//! let mut trh = HTrack::from_track(seed);
//! for hit in hits {
//!     trh.add_hit(hit);
//! }
//! match fitter.fit(&mut trh) {
//!     Ok(summary) => println!("chi-square {}", summary.chi_square),
//!     Err(stop) => println!("{}", stop),
//! }
//! ```

pub mod error;
pub mod fit;
pub mod hit;
pub mod propagator;
pub mod surface;
pub mod track;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{Error, FitIncomplete, FitStage, InvalidTrackState, PropagationError, Result, UpdateError};

pub mod prelude {
    pub use crate::error::{
        Error, FitIncomplete, FitStage, InvalidTrackState, PropagationError, UpdateError,
    };
    pub use crate::fit::*;
    pub use crate::hit::*;
    pub use crate::propagator::*;
    pub use crate::surface::*;
    pub use crate::track::*;
    pub use crate::types::measurement::*;
    pub use crate::types::spaces::*;
    pub use crate::types::transforms::*;
}
