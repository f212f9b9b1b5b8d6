//! Track with hits
//!
//! [`HTrack`] holds the ordered hit list of one track together with the
//! current estimate, the accumulated chi-square and the number of hits the
//! estimate was fit with. The track is fit only when that number matches the
//! hit list, so adding or dropping hits makes a fit stale without any
//! recomputation.

use ::core::fmt;

use nalgebra::RealField;

use crate::error::PropagationError;
use crate::hit::Hit;
use crate::propagator::{PropDir, PropStat, Propagator};
use crate::surface::SurfacePtr;
use crate::track::EstimatedTrack;

/// Ordered hits plus the current fit of one track.
#[derive(Debug, Clone, PartialEq)]
pub struct HTrack<T: RealField + Copy, const N: usize> {
    hits: Vec<Hit<T, N>>,
    track: EstimatedTrack<T, N>,
    chi_square: T,
    /// `None` until a fit is set
    fit_count: Option<usize>,
}

impl<T: RealField + Copy, const N: usize> HTrack<T, N> {
    /// Creates an empty, unfit track with an invalid estimate.
    pub fn new() -> Self {
        Self {
            hits: Vec::new(),
            track: EstimatedTrack::invalid(),
            chi_square: T::zero(),
            fit_count: None,
        }
    }

    /// Creates a track with a starting estimate and no hits.
    ///
    /// The track counts as fit with zero hits if `track` is valid.
    pub fn from_track(track: EstimatedTrack<T, N>) -> Self {
        Self {
            hits: Vec::new(),
            track,
            chi_square: T::zero(),
            fit_count: Some(0),
        }
    }

    /// Appends a hit. Leaves the fit count, so a fit track becomes unfit.
    pub fn add_hit(&mut self, hit: Hit<T, N>) {
        self.hits.push(hit);
    }

    /// Removes and returns the last hit, invalidating the fit.
    pub fn drop_hit(&mut self) -> Option<Hit<T, N>> {
        self.fit_count = None;
        self.hits.pop()
    }

    /// Removes all hits, invalidating the fit.
    pub fn drop_hits(&mut self) {
        self.fit_count = None;
        self.hits.clear();
    }

    /// Records a fit of all current hits.
    pub fn set_fit(&mut self, track: EstimatedTrack<T, N>, chi_square: T) {
        self.track = track;
        self.chi_square = chi_square;
        self.fit_count = Some(self.hits.len());
    }

    /// Marks the track unfit; the estimate is kept.
    pub fn unset_fit(&mut self) {
        self.fit_count = None;
        self.chi_square = T::zero();
    }

    /// Marks the track unfit and replaces the estimate.
    pub fn unset_fit_with(&mut self, track: EstimatedTrack<T, N>) {
        self.unset_fit();
        self.track = track;
    }

    /// Returns true if the estimate is valid and includes every hit.
    pub fn is_fit(&self) -> bool {
        self.track.is_valid() && self.fit_count == Some(self.hits.len())
    }

    #[inline]
    pub fn hits(&self) -> &[Hit<T, N>] {
        &self.hits
    }

    /// Current estimate.
    #[inline]
    pub fn track(&self) -> &EstimatedTrack<T, N> {
        &self.track
    }

    /// Copy of the current estimate.
    pub fn new_track(&self) -> EstimatedTrack<T, N> {
        self.track.clone()
    }

    /// Accumulated chi-square of the fit (zero if unfit).
    #[inline]
    pub fn chi_squared(&self) -> T {
        self.chi_square
    }

    /// Number of hits the estimate was fit with, if fit was set.
    #[inline]
    pub fn fit_count(&self) -> Option<usize> {
        self.fit_count
    }

    /// Total measurement dimension over all hits.
    pub fn number_of_measurements(&self) -> usize {
        self.hits.iter().map(Hit::size).sum()
    }

    /// Moves the estimate to `srf`, keeping the fit status.
    ///
    /// On error the track is unchanged.
    pub fn propagate(
        &mut self,
        propagator: &mut dyn Propagator<T, N>,
        srf: &SurfacePtr<T, N>,
        dir: PropDir,
    ) -> Result<PropStat<T>, PropagationError> {
        let (track, stat) = propagator.err_dir_prop(&self.track, srf, dir)?;
        self.track = track;
        Ok(stat)
    }
}

impl<T: RealField + Copy, const N: usize> Default for HTrack<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealField + Copy, const N: usize> fmt::Display for HTrack<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fit() {
            writeln!(f, "fit track with {} hits, chi-square {:?}", self.hits.len(), self.chi_square)?;
        } else {
            writeln!(f, "unfit track with {} hits", self.hits.len())?;
        }
        writeln!(f, "  {}", self.track)?;
        for hit in &self.hits {
            writeln!(f, "  {}", hit)?;
        }
        Ok(())
    }
}
