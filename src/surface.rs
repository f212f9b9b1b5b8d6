//! Detector surfaces
//!
//! A surface defines the parameterization of the track vectors that live on
//! it. Surfaces are immutable and shared between many track states and hits,
//! so they are handled through [`SurfacePtr`].

use ::core::fmt;
use std::sync::Arc;

use nalgebra::RealField;

use crate::types::spaces::TrackVector;

/// Shared handle to an immutable surface.
pub type SurfacePtr<T, const N: usize> = Arc<dyn Surface<T, N>>;

/// A geometric surface on which track parameters are defined.
///
/// Implementations provide a type tag and shape parameters; equality and
/// propagator dispatch are built from those.
pub trait Surface<T: RealField + Copy, const N: usize>: fmt::Debug + Send + Sync {
    /// Type tag of the unbounded surface (e.g. `"ZPlane"`).
    fn pure_type(&self) -> &'static str;

    /// Type tag including bounds. Equal to [`Surface::pure_type`] for an
    /// unbounded surface.
    fn surface_type(&self) -> &'static str {
        self.pure_type()
    }

    /// Returns true if the surface has no bounds.
    fn is_pure(&self) -> bool {
        self.surface_type() == self.pure_type()
    }

    /// Shape parameters (e.g. plane position, cylinder radius).
    fn parameters(&self) -> &[T];

    /// Shape parameter `i`, if present.
    fn parameter(&self, i: usize) -> Option<T> {
        self.parameters().get(i).copied()
    }

    /// Returns a new unbounded copy of this surface.
    fn new_pure_surface(&self) -> SurfacePtr<T, N>;

    /// Difference `a - b` of two track vectors on this surface.
    ///
    /// Surfaces with periodic parameters override this to wrap angles.
    fn vec_diff(&self, a: &TrackVector<T, N>, b: &TrackVector<T, N>) -> TrackVector<T, N> {
        *a - *b
    }

    /// Equality of the unbounded surfaces.
    fn pure_equal(&self, other: &dyn Surface<T, N>) -> bool {
        self.pure_type() == other.pure_type() && self.parameters() == other.parameters()
    }

    /// Full equality including bounds.
    fn bound_equal(&self, other: &dyn Surface<T, N>) -> bool {
        self.surface_type() == other.surface_type() && self.parameters() == other.parameters()
    }
}

impl<T: RealField + Copy, const N: usize> PartialEq for dyn Surface<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.bound_equal(other)
    }
}

impl<T: RealField + Copy, const N: usize> fmt::Display for dyn Surface<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.surface_type(), self.parameters())
    }
}
