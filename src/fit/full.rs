//! Full-track fit
//!
//! The full fitter walks the hit list of an [`HTrack`] in order. For every
//! hit it propagates the running estimate to the hit surface, refreshes the
//! hit prediction against the propagated state and adds the hit. The first
//! failure stops the fit and is reported with the step and hit index.
//!
//! Hits are never reordered. With process noise or a nonlinear transport the
//! result depends on the order, so callers are responsible for supplying hits
//! in the order they want them fit.

use ::core::fmt;
use std::sync::Arc;

use log::{debug, trace};
use nalgebra::RealField;

use crate::error::{Error, FitIncomplete, FitStage, InvalidTrackState};
use crate::propagator::Propagator;

use super::add::{AddFitKalman, AddFitter};
use super::config::FitConfig;
use super::htrack::HTrack;

/// Summary of a completed fit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitSummary<T> {
    /// Total chi-square over all hits
    pub chi_square: T,
    /// Number of hits fit
    pub hit_count: usize,
    /// Total measurement dimension
    pub measurement_count: usize,
}

impl<T: RealField + Copy> FitSummary<T> {
    /// Degrees of freedom for a track with `N` parameters (may be negative
    /// for under-constrained fits).
    pub fn degrees_of_freedom<const N: usize>(&self) -> isize {
        self.measurement_count as isize - N as isize
    }
}

/// Fits all hits of a track.
pub trait FullFitter<T: RealField + Copy, const N: usize>: fmt::Debug + Send {
    /// Refits `trh` from its current estimate.
    ///
    /// On success the track holds the final estimate, the total chi-square
    /// and the refreshed hits in their original order, and is fit. On
    /// failure it keeps its original hits and estimate and is unfit.
    fn fit(&mut self, trh: &mut HTrack<T, N>) -> Result<FitSummary<T>, FitIncomplete>;
}

// ============================================================================
// Kalman Full Fitter
// ============================================================================

/// Sequential Kalman fit bound to one propagator and one add fitter.
#[derive(Debug)]
pub struct FullFitKalman<T: RealField + Copy, const N: usize> {
    propagator: Box<dyn Propagator<T, N>>,
    add_fitter: Arc<dyn AddFitter<T, N>>,
    config: FitConfig<T>,
}

impl<T: RealField + Copy, const N: usize> FullFitKalman<T, N> {
    /// Creates a fitter with the Kalman add fitter and default configuration.
    pub fn new(propagator: Box<dyn Propagator<T, N>>) -> Self {
        Self::with_add_fitter(propagator, Arc::new(AddFitKalman))
    }

    /// Creates a fitter with a custom add fitter.
    pub fn with_add_fitter(
        propagator: Box<dyn Propagator<T, N>>,
        add_fitter: Arc<dyn AddFitter<T, N>>,
    ) -> Self {
        Self {
            propagator,
            add_fitter,
            config: FitConfig::default_config(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: FitConfig<T>) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn config(&self) -> &FitConfig<T> {
        &self.config
    }

    /// The propagator used between hits.
    pub fn propagator(&mut self) -> &mut dyn Propagator<T, N> {
        self.propagator.as_mut()
    }

    /// The add fitter used for each hit.
    pub fn add_fitter(&self) -> &Arc<dyn AddFitter<T, N>> {
        &self.add_fitter
    }

    /// Returns an independent fitter with a detached propagator, for use on
    /// another thread.
    pub fn new_fitter(&self) -> Self {
        Self {
            propagator: self.propagator.new_propagator(),
            add_fitter: Arc::clone(&self.add_fitter),
            config: self.config,
        }
    }

    fn run(&mut self, trh: &HTrack<T, N>) -> Result<HTrack<T, N>, FitIncomplete> {
        let start = trh.track();
        if !start.is_valid() {
            return Err(FitIncomplete::new(
                FitStage::Propagation,
                0,
                InvalidTrackState::NoSurface,
            ));
        }
        let start = start
            .scale_error(self.config.error_scale)
            .map_err(|err| FitIncomplete::new(FitStage::Propagation, 0, err))?;

        let mut work = HTrack::from_track(start);
        for (index, hit) in trh.hits().iter().enumerate() {
            work.propagate(self.propagator.as_mut(), hit.surface(), self.config.direction)
                .map_err(|err| FitIncomplete::new(FitStage::Propagation, index, err))?;

            let refreshed = hit
                .update(work.track())
                .map_err(|err| FitIncomplete::new(FitStage::Refresh, index, err))?;

            let delta = self
                .add_fitter
                .add_hit(&mut work, refreshed)
                .map_err(|err| FitIncomplete::new(FitStage::Update, index, err))?;
            trace!(
                "hit {}: delta chi-square {:?}, total {:?}",
                index,
                delta,
                work.chi_squared()
            );

            if !self.config.accepts(work.chi_squared()) {
                return Err(FitIncomplete::new(
                    FitStage::ChiSquareCut,
                    index,
                    Error::ChiSquareExceeded,
                ));
            }
        }
        Ok(work)
    }
}

impl<T: RealField + Copy, const N: usize> FullFitter<T, N> for FullFitKalman<T, N> {
    fn fit(&mut self, trh: &mut HTrack<T, N>) -> Result<FitSummary<T>, FitIncomplete> {
        debug!("fitting track with {} hits", trh.hits().len());

        match self.run(trh) {
            Ok(fitted) => {
                *trh = fitted;
                let summary = FitSummary {
                    chi_square: trh.chi_squared(),
                    hit_count: trh.hits().len(),
                    measurement_count: trh.number_of_measurements(),
                };
                debug!(
                    "fit complete: {} hits, chi-square {:?}",
                    summary.hit_count, summary.chi_square
                );
                Ok(summary)
            }
            Err(stop) => {
                debug!("fit stopped at hit {} during {}: {}", stop.index, stop.stage, stop.cause);
                trh.unset_fit();
                Err(stop)
            }
        }
    }
}
