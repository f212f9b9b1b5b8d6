//! Track states
//!
//! [`VectorTrack`] is a parameter vector bound to a surface; [`EstimatedTrack`]
//! adds its covariance. Both are plain values: every update or propagation
//! produces a new state and leaves its input untouched.

use ::core::fmt;
use std::sync::Arc;

use nalgebra::RealField;

use crate::error::InvalidTrackState;
use crate::surface::SurfacePtr;
use crate::types::spaces::{TrackCovariance, TrackVector};

/// Direction of motion of the track relative to its surface.
///
/// Only meaningful for surfaces that a track can cross in either sense; for
/// the rest it stays `Undefined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackSurfaceDirection {
    Forward,
    Backward,
    #[default]
    Undefined,
}

// ============================================================================
// Vector Track
// ============================================================================

/// Track parameters on a surface, without errors.
#[derive(Debug, Clone)]
pub struct VectorTrack<T: RealField + Copy, const N: usize> {
    surface: SurfacePtr<T, N>,
    vector: TrackVector<T, N>,
    direction: TrackSurfaceDirection,
}

impl<T: RealField + Copy, const N: usize> VectorTrack<T, N> {
    /// Creates a track with undefined direction.
    pub fn new(surface: SurfacePtr<T, N>, vector: TrackVector<T, N>) -> Self {
        Self::with_direction(surface, vector, TrackSurfaceDirection::Undefined)
    }

    /// Creates a track with an explicit direction.
    pub fn with_direction(
        surface: SurfacePtr<T, N>,
        vector: TrackVector<T, N>,
        direction: TrackSurfaceDirection,
    ) -> Self {
        Self {
            surface,
            vector,
            direction,
        }
    }

    #[inline]
    pub fn surface(&self) -> &SurfacePtr<T, N> {
        &self.surface
    }

    #[inline]
    pub fn vector(&self) -> &TrackVector<T, N> {
        &self.vector
    }

    #[inline]
    pub fn direction(&self) -> TrackSurfaceDirection {
        self.direction
    }

    #[inline]
    pub fn is_forward(&self) -> bool {
        self.direction == TrackSurfaceDirection::Forward
    }

    #[inline]
    pub fn is_backward(&self) -> bool {
        self.direction == TrackSurfaceDirection::Backward
    }

    /// Returns a copy with new parameters on the same surface.
    pub fn with_vector(&self, vector: TrackVector<T, N>) -> Self {
        Self {
            surface: Arc::clone(&self.surface),
            vector,
            direction: self.direction,
        }
    }
}

impl<T: RealField + Copy, const N: usize> PartialEq for VectorTrack<T, N> {
    fn eq(&self, other: &Self) -> bool {
        *self.surface == *other.surface
            && self.vector == other.vector
            && self.direction == other.direction
    }
}

// ============================================================================
// Estimated Track
// ============================================================================

/// Track parameters with covariance on a surface.
///
/// A default-constructed state has no surface and is invalid; it is the
/// "no estimate yet" value of an unfit track. Every other constructor
/// validates finiteness, symmetry and positive semi-definiteness.
#[derive(Debug, Clone)]
pub struct EstimatedTrack<T: RealField + Copy, const N: usize> {
    surface: Option<SurfacePtr<T, N>>,
    vector: TrackVector<T, N>,
    covariance: TrackCovariance<T, N>,
    direction: TrackSurfaceDirection,
}

impl<T: RealField + Copy, const N: usize> EstimatedTrack<T, N> {
    /// Creates a validated state with undefined direction.
    ///
    /// # Arguments
    /// - `surface`: Surface the parameters are defined on
    /// - `vector`: Track parameters
    /// - `covariance`: Parameter covariance (symmetric PSD)
    ///
    /// # Returns
    /// An error if the parameters or covariance are not finite, or the
    /// covariance is not symmetric positive semi-definite.
    pub fn new(
        surface: SurfacePtr<T, N>,
        vector: TrackVector<T, N>,
        covariance: TrackCovariance<T, N>,
    ) -> Result<Self, InvalidTrackState> {
        Self::with_direction(surface, vector, covariance, TrackSurfaceDirection::Undefined)
    }

    /// Creates a validated state with an explicit direction.
    pub fn with_direction(
        surface: SurfacePtr<T, N>,
        vector: TrackVector<T, N>,
        covariance: TrackCovariance<T, N>,
        direction: TrackSurfaceDirection,
    ) -> Result<Self, InvalidTrackState> {
        validate(&vector, &covariance)?;
        Ok(Self {
            surface: Some(surface),
            vector,
            covariance,
            direction,
        })
    }

    /// Attaches a covariance to a vector track.
    pub fn from_vector_track(
        track: VectorTrack<T, N>,
        covariance: TrackCovariance<T, N>,
    ) -> Result<Self, InvalidTrackState> {
        Self::with_direction(track.surface, track.vector, covariance, track.direction)
    }

    /// Creates the invalid "no estimate" state.
    pub fn invalid() -> Self {
        Self {
            surface: None,
            vector: TrackVector::zeros(),
            covariance: TrackCovariance::zeros(),
            direction: TrackSurfaceDirection::Undefined,
        }
    }

    /// Returns a copy with new parameters and covariance on the same surface.
    pub fn with_state(
        &self,
        vector: TrackVector<T, N>,
        covariance: TrackCovariance<T, N>,
    ) -> Result<Self, InvalidTrackState> {
        let surface = self.surface.clone().ok_or(InvalidTrackState::NoSurface)?;
        Self::with_direction(surface, vector, covariance, self.direction)
    }

    /// Returns a copy with the covariance multiplied by `factor`.
    pub fn scale_error(&self, factor: T) -> Result<Self, InvalidTrackState> {
        self.with_state(self.vector, self.covariance.scale(factor))
    }

    /// True once the state is bound to a surface.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.surface.is_some()
    }

    #[inline]
    pub fn surface(&self) -> Option<&SurfacePtr<T, N>> {
        self.surface.as_ref()
    }

    #[inline]
    pub fn vector(&self) -> &TrackVector<T, N> {
        &self.vector
    }

    #[inline]
    pub fn covariance(&self) -> &TrackCovariance<T, N> {
        &self.covariance
    }

    #[inline]
    pub fn direction(&self) -> TrackSurfaceDirection {
        self.direction
    }

    /// The parameters without errors, if the state is valid.
    pub fn vector_track(&self) -> Option<VectorTrack<T, N>> {
        self.surface
            .as_ref()
            .map(|srf| VectorTrack::with_direction(Arc::clone(srf), self.vector, self.direction))
    }

    /// Number of bad terms in the covariance (see [`TrackCovariance::check_error`]).
    #[inline]
    pub fn check_error(&self) -> usize {
        self.covariance.check_error()
    }

    /// Chi-square difference between two estimates on the same surface.
    ///
    /// Computes `dᵗ (C₁ + C₂)⁻¹ d` with `d` the surface's vector difference.
    /// Returns `None` if either state is invalid, the surfaces differ or the
    /// summed covariance is singular.
    pub fn chisq_diff(&self, other: &Self) -> Option<T> {
        let srf = self.surface.as_ref()?;
        let other_srf = other.surface.as_ref()?;
        if !srf.pure_equal(other_srf.as_ref()) {
            return None;
        }
        let diff = srf.vec_diff(&self.vector, &other.vector);
        let inv = (self.covariance + other.covariance).try_inverse()?;
        let d = diff.as_svector();
        Some(d.dot(&(inv.as_matrix() * d)))
    }

    /// Chi-square difference between this estimate and exact parameters.
    pub fn chisq_diff_vector(&self, other: &VectorTrack<T, N>) -> Option<T> {
        let srf = self.surface.as_ref()?;
        if !srf.pure_equal(other.surface().as_ref()) {
            return None;
        }
        let diff = srf.vec_diff(&self.vector, other.vector());
        let inv = self.covariance.try_inverse()?;
        let d = diff.as_svector();
        Some(d.dot(&(inv.as_matrix() * d)))
    }
}

impl<T: RealField + Copy, const N: usize> Default for EstimatedTrack<T, N> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl<T: RealField + Copy, const N: usize> PartialEq for EstimatedTrack<T, N> {
    fn eq(&self, other: &Self) -> bool {
        let same_surface = match (&self.surface, &other.surface) {
            (Some(a), Some(b)) => **a == **b,
            (None, None) => true,
            _ => false,
        };
        same_surface
            && self.vector == other.vector
            && self.covariance == other.covariance
            && self.direction == other.direction
    }
}

impl<T: RealField + Copy, const N: usize> fmt::Display for EstimatedTrack<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.surface {
            Some(srf) => write!(
                f,
                "track on {}: {:?} ({:?})",
                srf,
                self.vector.as_slice(),
                self.direction
            ),
            None => write!(f, "invalid track"),
        }
    }
}

fn validate<T: RealField + Copy, const N: usize>(
    vector: &TrackVector<T, N>,
    covariance: &TrackCovariance<T, N>,
) -> Result<(), InvalidTrackState> {
    if !vector.is_finite() || !covariance.is_finite() {
        return Err(InvalidTrackState::NonFinite);
    }
    if !covariance.is_symmetric(nalgebra::convert::<f64, T>(1e-9)) {
        return Err(InvalidTrackState::NotSymmetric);
    }
    if !covariance.is_positive_semidefinite() {
        return Err(InvalidTrackState::NotPositiveSemidefinite);
    }
    Ok(())
}
