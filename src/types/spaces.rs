//! Track-space vectors and covariance matrices
//!
//! This module provides typed fixed-dimension vectors and covariance matrices
//! for track parameters. The space marker keeps track-space quantities from
//! being mixed with anything else that happens to share a dimension.

use ::core::marker::PhantomData;
use ::core::ops::{Add, Sub};
use nalgebra::{RealField, SMatrix, SVector, Scalar};

// ============================================================================
// Vector Space Markers
// ============================================================================

/// Marker type for track parameter space (e.g., curvature, angles, impact parameters)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSpace;

// ============================================================================
// Typed Vector
// ============================================================================

/// A vector parameterized by scalar type, dimension, and mathematical space.
///
/// # Type Parameters
///
/// - `T`: The scalar type (typically `f64`)
/// - `N`: The dimension of the vector (const generic)
/// - `Space`: A marker type indicating which mathematical space this vector belongs to
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T: Scalar, const N: usize, Space> {
    inner: SVector<T, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Vector<T, N, Space> {
    /// Creates a new vector from raw components.
    #[inline]
    pub fn from_array(data: [T; N]) -> Self {
        Self {
            inner: SVector::from(data),
            _marker: PhantomData,
        }
    }

    /// Creates a new vector from an nalgebra SVector.
    #[inline]
    pub fn from_svector(inner: SVector<T, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying nalgebra vector.
    #[inline]
    pub fn as_svector(&self) -> &SVector<T, N> {
        &self.inner
    }

    /// Consumes self and returns the underlying nalgebra vector.
    #[inline]
    pub fn into_svector(self) -> SVector<T, N> {
        self.inner
    }

    /// Returns a reference to the raw data.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }

    /// Access element at index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.inner.get(index)
    }

    /// Access element at index (unchecked).
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn index(&self, index: usize) -> &T {
        &self.inner[index]
    }

    /// Returns a copy with one component replaced.
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    pub fn with(&self, index: usize, value: T) -> Self {
        let mut inner = self.inner.clone();
        inner[index] = value;
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Vector<T, N, Space> {}

impl<T: RealField + Copy, const N: usize, Space> Vector<T, N, Space> {
    /// Creates a zero vector.
    #[inline]
    pub fn zeros() -> Self {
        Self {
            inner: SVector::zeros(),
            _marker: PhantomData,
        }
    }

    /// Scales the vector by a scalar.
    #[inline]
    pub fn scale(&self, s: T) -> Self {
        Self {
            inner: self.inner.scale(s),
            _marker: PhantomData,
        }
    }

    /// Returns true if every component is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.inner.iter().all(|x| x.is_finite())
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// A track parameter vector.
pub type TrackVector<T, const N: usize> = Vector<T, N, TrackSpace>;

// ============================================================================
// Operations: Same-Space Addition/Subtraction
// ============================================================================

impl<T: RealField + Copy, const N: usize, Space> Add for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner + rhs.inner,
            _marker: PhantomData,
        }
    }
}

impl<T: RealField + Copy, const N: usize, Space> Sub for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner - rhs.inner,
            _marker: PhantomData,
        }
    }
}

// ============================================================================
// Covariance Matrix
// ============================================================================

/// A covariance matrix bound to a specific vector space.
///
/// Covariance matrices are symmetric positive semi-definite matrices
/// that describe the uncertainty in a vector estimate. Construction does not
/// validate; use [`Covariance::check_error`] or [`Covariance::is_symmetric`]
/// at the boundaries where a bad matrix must be rejected.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Covariance<T: Scalar, const N: usize, Space> {
    inner: SMatrix<T, N, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Covariance<T, N, Space> {
    /// Creates a covariance matrix from a raw matrix.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, N, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, N, N> {
        &self.inner
    }

    /// Consumes self and returns the underlying matrix.
    #[inline]
    pub fn into_matrix(self) -> SMatrix<T, N, N> {
        self.inner
    }

    /// Access element (i, j).
    ///
    /// # Panics
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.inner[(i, j)]
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Covariance<T, N, Space> where
    SMatrix<T, N, N>: Copy
{
}

impl<T: RealField + Copy, const N: usize, Space> Covariance<T, N, Space> {
    /// Creates a zero covariance matrix.
    #[inline]
    pub fn zeros() -> Self {
        Self {
            inner: SMatrix::zeros(),
            _marker: PhantomData,
        }
    }

    /// Creates an identity covariance matrix.
    #[inline]
    pub fn identity() -> Self {
        Self {
            inner: SMatrix::identity(),
            _marker: PhantomData,
        }
    }

    /// Creates a diagonal covariance matrix.
    #[inline]
    pub fn from_diagonal(diag: &SVector<T, N>) -> Self {
        Self {
            inner: SMatrix::from_diagonal(diag),
            _marker: PhantomData,
        }
    }

    /// Scales the covariance matrix.
    #[inline]
    pub fn scale(&self, s: T) -> Self {
        Self {
            inner: self.inner.scale(s),
            _marker: PhantomData,
        }
    }

    /// Computes the trace of the covariance matrix.
    #[inline]
    pub fn trace(&self) -> T {
        self.inner.trace()
    }

    /// Attempts to compute the inverse of the covariance matrix.
    #[inline]
    pub fn try_inverse(&self) -> Option<Self> {
        self.inner.try_inverse().map(|inner| Self {
            inner,
            _marker: PhantomData,
        })
    }

    /// Computes the Cholesky decomposition (lower triangular).
    ///
    /// Returns `None` if the matrix is not positive definite.
    #[inline]
    pub fn cholesky(&self) -> Option<SMatrix<T, N, N>> {
        nalgebra::Cholesky::new(self.inner).map(|c| c.l())
    }

    /// Returns the symmetric part `(C + Cᵗ) / 2`.
    ///
    /// Products such as `J C Jᵗ` are symmetric only up to rounding.
    #[inline]
    pub fn symmetrize(&self) -> Self {
        let half: T = nalgebra::convert::<f64, T>(0.5);
        Self {
            inner: (self.inner + self.inner.transpose()) * half,
            _marker: PhantomData,
        }
    }

    /// Returns true if every element is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.inner.iter().all(|x| x.is_finite())
    }

    /// Returns true if `|c_ij - c_ji| <= tol * max(|c_ij|, |c_ji|, 1)` for all pairs.
    pub fn is_symmetric(&self, tol: T) -> bool {
        for i in 0..N {
            for j in 0..i {
                let a = self.inner[(i, j)];
                let b = self.inner[(j, i)];
                let scale = a.abs().max(b.abs()).max(T::one());
                if (a - b).abs() > tol * scale {
                    return false;
                }
            }
        }
        true
    }

    /// Counts the terms that make this an invalid error matrix.
    ///
    /// A diagonal term is bad if it is not strictly positive; an off-diagonal
    /// term is bad if its correlation magnitude reaches one
    /// (`c_ij² >= c_ii c_jj`). Zero means the matrix passes.
    pub fn check_error(&self) -> usize {
        let mut nbad = 0;
        for i in 0..N {
            let eii = self.inner[(i, i)];
            if eii <= T::zero() {
                nbad += 1;
            }
            for j in 0..i {
                let ejj = self.inner[(j, j)];
                let eij = self.inner[(j, i)];
                if eij * eij >= eii * ejj {
                    nbad += 1;
                }
            }
        }
        nbad
    }

    /// Returns true if the matrix is positive semi-definite up to rounding.
    ///
    /// Zero variances are allowed (a parameter may be fixed). The test is a
    /// Cholesky factorization after adding a jitter proportional to the
    /// largest diagonal term.
    pub fn is_positive_semidefinite(&self) -> bool {
        let mut max_diag = T::zero();
        for i in 0..N {
            let d = self.inner[(i, i)];
            if d < T::zero() {
                return false;
            }
            max_diag = max_diag.max(d);
        }
        if max_diag == T::zero() {
            return self.inner.iter().all(|x| *x == T::zero());
        }

        let n: T = nalgebra::convert::<f64, T>(N as f64);
        let jitter = max_diag * n * T::default_epsilon() * nalgebra::convert::<f64, T>(16.0);
        let shifted = self.inner + SMatrix::<T, N, N>::identity() * jitter;
        nalgebra::Cholesky::new(shifted).is_some()
    }
}

impl<T: RealField + Copy, const N: usize, Space> Add for Covariance<T, N, Space> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner + rhs.inner,
            _marker: PhantomData,
        }
    }
}

// ============================================================================
// Type Aliases for Covariance
// ============================================================================

/// Covariance matrix of the track parameters.
pub type TrackCovariance<T, const N: usize> = Covariance<T, N, TrackSpace>;
