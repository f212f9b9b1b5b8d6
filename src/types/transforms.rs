//! Typed transformation matrices
//!
//! Matrices that transform vectors between spaces, with type-level
//! encoding of source and target spaces. The transport Jacobian produced by a
//! propagator is the track-space to track-space case.

use ::core::marker::PhantomData;
use nalgebra::{RealField, SMatrix, Scalar};

use super::spaces::{TrackCovariance, TrackSpace, TrackVector, Vector};

// ============================================================================
// Transform Matrix
// ============================================================================

/// A transformation matrix that maps vectors from one space to another.
///
/// # Type Parameters
///
/// - `T`: Scalar type
/// - `ROWS`: Number of rows (dimension of target space)
/// - `COLS`: Number of columns (dimension of source space)
/// - `To`: Target space marker
/// - `From`: Source space marker
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Transform<T: Scalar, const ROWS: usize, const COLS: usize, To, From> {
    inner: SMatrix<T, ROWS, COLS>,
    _marker: PhantomData<(To, From)>,
}

impl<T: Scalar, const ROWS: usize, const COLS: usize, To, From> Transform<T, ROWS, COLS, To, From> {
    /// Creates a transform from a raw matrix.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, ROWS, COLS>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, ROWS, COLS> {
        &self.inner
    }

    /// Consumes self and returns the underlying matrix.
    #[inline]
    pub fn into_matrix(self) -> SMatrix<T, ROWS, COLS> {
        self.inner
    }
}

impl<T: Scalar + Copy, const ROWS: usize, const COLS: usize, To: Clone, From: Clone> Copy
    for Transform<T, ROWS, COLS, To, From>
where
    SMatrix<T, ROWS, COLS>: Copy,
{
}

impl<T: RealField + Copy, const ROWS: usize, const COLS: usize, To, From>
    Transform<T, ROWS, COLS, To, From>
{
    /// Returns the transpose of this transform.
    ///
    /// The transpose maps from `To` to `From` (reversed).
    #[inline]
    pub fn transpose(&self) -> Transform<T, COLS, ROWS, From, To> {
        Transform {
            inner: self.inner.transpose(),
            _marker: PhantomData,
        }
    }

    /// Applies the transform to a vector of the source space.
    #[inline]
    pub fn apply(&self, v: &Vector<T, COLS, From>) -> Vector<T, ROWS, To> {
        Vector::from_svector(self.inner * v.as_svector())
    }

    /// Returns true if every element is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.inner.iter().all(|x| x.is_finite())
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// Transport Jacobian between the track parameters on two surfaces:
/// `J_ij = ∂x'_i / ∂x_j`.
pub type TrackDerivative<T, const N: usize> = Transform<T, N, N, TrackSpace, TrackSpace>;

// ============================================================================
// Track Transport
// ============================================================================

impl<T: RealField + Copy, const N: usize> TrackDerivative<T, N> {
    /// Creates an identity derivative (no change of parameters).
    #[inline]
    pub fn identity() -> Self {
        Self::from_matrix(SMatrix::identity())
    }

    /// Creates a zero derivative.
    #[inline]
    pub fn zeros() -> Self {
        Self::from_matrix(SMatrix::zeros())
    }

    /// Chains two transports: `self` applied after `first`.
    #[inline]
    pub fn compose(&self, first: &Self) -> Self {
        Self::from_matrix(self.inner * first.inner)
    }

    /// Applies the derivative to a track vector (linear transport of a deviation).
    #[inline]
    pub fn apply_track(&self, vec: &TrackVector<T, N>) -> TrackVector<T, N> {
        TrackVector::from_svector(self.inner * vec.as_svector())
    }

    /// Transports a covariance matrix: J * C * J^T
    #[inline]
    pub fn propagate_covariance(&self, cov: &TrackCovariance<T, N>) -> TrackCovariance<T, N> {
        TrackCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}
