//! Surface-to-surface propagation
//!
//! A propagator transports track parameters to a target surface and returns
//! the transport Jacobian. Covariance transport `C' = J C Jᵗ + Q` is provided
//! on top of that, so concrete propagators only implement the vector
//! transport law and, optionally, process noise.

mod dispatch;

pub use dispatch::PropDispatch;

use ::core::fmt;

use nalgebra::RealField;

use crate::error::{InvalidTrackState, PropagationError};
use crate::surface::SurfacePtr;
use crate::track::{EstimatedTrack, VectorTrack};
use crate::types::spaces::TrackCovariance;
use crate::types::transforms::TrackDerivative;

// ============================================================================
// Direction and Status
// ============================================================================

/// Requested direction of propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropDir {
    Forward,
    Backward,
    /// Whichever of forward/backward has the shorter path
    #[default]
    Nearest,
}

impl PropDir {
    /// Resolves [`PropDir::Nearest`] from the path lengths of the two
    /// candidate solutions.
    ///
    /// # Arguments
    /// - `forward`: Path length of the forward solution, if one exists
    /// - `backward`: Path length of the backward solution, if one exists
    ///
    /// # Returns
    /// The direction with the shorter absolute path, `Forward` on a tie, or
    /// `None` if neither solution exists.
    pub fn nearest_of<T: RealField + Copy>(forward: Option<T>, backward: Option<T>) -> Option<PropDir> {
        match (forward, backward) {
            (Some(f), Some(b)) => {
                if f.abs() <= b.abs() {
                    Some(PropDir::Forward)
                } else {
                    Some(PropDir::Backward)
                }
            }
            (Some(_), None) => Some(PropDir::Forward),
            (None, Some(_)) => Some(PropDir::Backward),
            (None, None) => None,
        }
    }

    /// Returns true if a transport over signed path `s` honors this direction.
    pub fn allows<T: RealField + Copy>(&self, s: T) -> bool {
        match self {
            PropDir::Forward => s >= T::zero(),
            PropDir::Backward => s <= T::zero(),
            PropDir::Nearest => true,
        }
    }
}

/// Status of a successful propagation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropStat<T> {
    path_distance: T,
}

impl<T: RealField + Copy> PropStat<T> {
    /// Creates a status from the signed path distance.
    #[inline]
    pub fn new(path_distance: T) -> Self {
        Self { path_distance }
    }

    /// Signed path length travelled; negative for backward transport.
    #[inline]
    pub fn path_distance(&self) -> T {
        self.path_distance
    }

    #[inline]
    pub fn forward(&self) -> bool {
        self.path_distance > T::zero()
    }

    #[inline]
    pub fn backward(&self) -> bool {
        self.path_distance < T::zero()
    }

    /// True if the track was already on the target surface.
    #[inline]
    pub fn same(&self) -> bool {
        self.path_distance == T::zero()
    }
}

/// Result of transporting a vector track.
#[derive(Debug, Clone)]
pub struct Transport<T: RealField + Copy, const N: usize> {
    /// Parameters on the target surface
    pub track: VectorTrack<T, N>,
    /// `∂x' / ∂x`
    pub derivative: TrackDerivative<T, N>,
    pub stat: PropStat<T>,
}

// ============================================================================
// Propagator Trait
// ============================================================================

/// Transports track states between surfaces.
///
/// Propagators may hold scratch state and are used through `&mut self`. Use
/// [`Propagator::new_propagator`] to obtain an independent copy for another
/// thread.
pub trait Propagator<T: RealField + Copy, const N: usize>: fmt::Debug + Send {
    /// Returns a detached copy of this propagator.
    fn new_propagator(&self) -> Box<dyn Propagator<T, N>>;

    /// Transports parameters to `srf` in direction `dir`.
    fn vec_dir_prop(
        &mut self,
        trv: &VectorTrack<T, N>,
        srf: &SurfacePtr<T, N>,
        dir: PropDir,
    ) -> Result<Transport<T, N>, PropagationError>;

    /// Extra covariance added after the linear transport (multiple
    /// scattering, energy loss). `None` means no process noise.
    fn process_noise(
        &self,
        _from: &VectorTrack<T, N>,
        _transport: &Transport<T, N>,
    ) -> Option<TrackCovariance<T, N>> {
        None
    }

    /// Transports parameters in the nearest direction.
    fn vec_prop(
        &mut self,
        trv: &VectorTrack<T, N>,
        srf: &SurfacePtr<T, N>,
    ) -> Result<Transport<T, N>, PropagationError> {
        self.vec_dir_prop(trv, srf, PropDir::Nearest)
    }

    /// Transports parameters and covariance to `srf` in direction `dir`.
    ///
    /// The input is only borrowed; on error no state is produced.
    fn err_dir_prop(
        &mut self,
        tre: &EstimatedTrack<T, N>,
        srf: &SurfacePtr<T, N>,
        dir: PropDir,
    ) -> Result<(EstimatedTrack<T, N>, PropStat<T>), PropagationError> {
        let trv = tre.vector_track().ok_or(InvalidTrackState::NoSurface)?;
        let transport = self.vec_dir_prop(&trv, srf, dir)?;
        let noise = self.process_noise(&trv, &transport);
        transport_error(tre, transport, noise)
    }

    /// Transports parameters and covariance in the nearest direction.
    fn err_prop(
        &mut self,
        tre: &EstimatedTrack<T, N>,
        srf: &SurfacePtr<T, N>,
    ) -> Result<(EstimatedTrack<T, N>, PropStat<T>), PropagationError> {
        self.err_dir_prop(tre, srf, PropDir::Nearest)
    }
}

/// Builds the transported estimate from a vector transport.
///
/// Computes `J C Jᵗ (+ Q)`, symmetrizes it and applies the error-matrix
/// check; any bad term rejects the result.
pub fn transport_error<T: RealField + Copy, const N: usize>(
    tre: &EstimatedTrack<T, N>,
    transport: Transport<T, N>,
    noise: Option<TrackCovariance<T, N>>,
) -> Result<(EstimatedTrack<T, N>, PropStat<T>), PropagationError> {
    if !transport.derivative.is_finite() || !transport.track.vector().is_finite() {
        return Err(PropagationError::NumericalBreakdown(
            "transport produced non-finite values",
        ));
    }

    let mut covariance = transport.derivative.propagate_covariance(tre.covariance());
    if let Some(q) = noise {
        covariance = covariance + q;
    }
    let covariance = covariance.symmetrize();

    let bad_terms = covariance.check_error();
    if bad_terms != 0 {
        return Err(InvalidTrackState::BadErrorMatrix { bad_terms }.into());
    }

    let propagated = EstimatedTrack::from_vector_track(transport.track, covariance)?;
    Ok((propagated, transport.stat))
}
