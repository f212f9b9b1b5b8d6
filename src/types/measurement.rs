//! Measurement-space primitives
//!
//! The measurement dimension depends on the detector element (a strip measures
//! one coordinate, a pixel two), so it is only known at runtime. Measurement
//! quantities therefore use dynamically sized storage while the track side
//! keeps its fixed dimension `N`.
//!
//! All constructors check dimensions and return [`Error::DimensionMismatch`]
//! instead of panicking.

use nalgebra::{Const, DMatrix, DVector, Dyn, Matrix, RealField, Scalar, VecStorage};

use super::spaces::{TrackCovariance, TrackVector};
use crate::error::{Error, Result};

/// `M × N` measurement derivative: dynamic rows, one column per track
/// parameter.
pub type DerivativeMatrix<T, const N: usize> = Matrix<T, Dyn, Const<N>, VecStorage<T, Dyn, Const<N>>>;

// ============================================================================
// Hit Vector
// ============================================================================

/// Measurement vector of dimension M.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitVector<T: Scalar> {
    inner: DVector<T>,
}

impl<T: Scalar> HitVector<T> {
    /// Creates a measurement vector from components.
    pub fn from_slice(data: &[T]) -> Self {
        Self {
            inner: DVector::from_column_slice(data),
        }
    }

    /// Wraps an nalgebra vector.
    #[inline]
    pub fn from_dvector(inner: DVector<T>) -> Self {
        Self { inner }
    }

    /// Returns the underlying nalgebra vector.
    #[inline]
    pub fn as_dvector(&self) -> &DVector<T> {
        &self.inner
    }

    /// Measurement dimension.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.inner.len()
    }

    /// Access element at index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.inner.get(index)
    }

    /// Returns the components.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }
}

impl<T: RealField + Copy> HitVector<T> {
    /// Component-wise difference `self - other`.
    pub fn difference(&self, other: &Self) -> Result<Self> {
        check_dimension(self.dimension(), other.dimension())?;
        Ok(Self {
            inner: &self.inner - &other.inner,
        })
    }

    /// Returns true if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.inner.iter().all(|x| x.is_finite())
    }
}

// ============================================================================
// Hit Error
// ============================================================================

/// Symmetric M × M measurement covariance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitError<T: Scalar> {
    inner: DMatrix<T>,
}

impl<T: RealField + Copy> HitError<T> {
    /// Creates a measurement covariance from row-major data.
    ///
    /// # Arguments
    /// - `dim`: Measurement dimension M
    /// - `data`: `M * M` elements, row-major
    ///
    /// # Returns
    /// An error if the size is wrong, an element is not finite, the matrix is
    /// not symmetric, or it is not positive semi-definite.
    pub fn from_row_slice(dim: usize, data: &[T]) -> Result<Self> {
        check_dimension(dim * dim, data.len())?;
        Self::from_dmatrix(DMatrix::from_row_slice(dim, dim, data))
    }

    /// Creates a diagonal measurement covariance from variances.
    pub fn from_variances(variances: &[T]) -> Result<Self> {
        Self::from_dmatrix(DMatrix::from_diagonal(&DVector::from_column_slice(variances)))
    }

    /// Wraps a square nalgebra matrix after validation.
    pub fn from_dmatrix(inner: DMatrix<T>) -> Result<Self> {
        check_dimension(inner.nrows(), inner.ncols())?;
        if !inner.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidMeasurement("non-finite element"));
        }
        let n = inner.nrows();
        for i in 0..n {
            if inner[(i, i)] < T::zero() {
                return Err(Error::InvalidMeasurement("negative variance"));
            }
            for j in 0..i {
                let a = inner[(i, j)];
                let b = inner[(j, i)];
                let scale = a.abs().max(b.abs()).max(T::one());
                if (a - b).abs() > symmetry_tolerance::<T>() * scale {
                    return Err(Error::InvalidMeasurement("matrix is not symmetric"));
                }
            }
        }
        if !is_positive_semidefinite(&inner) {
            return Err(Error::InvalidMeasurement("matrix is not positive semi-definite"));
        }
        Ok(Self { inner })
    }

    /// Returns the underlying nalgebra matrix.
    #[inline]
    pub fn as_dmatrix(&self) -> &DMatrix<T> {
        &self.inner
    }

    /// Measurement dimension.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.inner.nrows()
    }

    /// Access element (i, j).
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        self.inner.get((i, j))
    }

    /// Sum of two covariances of the same dimension.
    pub fn sum(&self, other: &Self) -> Result<Self> {
        check_dimension(self.dimension(), other.dimension())?;
        Ok(Self {
            inner: &self.inner + &other.inner,
        })
    }
}

// ============================================================================
// Hit Derivative
// ============================================================================

/// M × N derivative of the predicted measurement with respect to the track
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct HitDerivative<T: Scalar, const N: usize> {
    inner: DerivativeMatrix<T, N>,
}

impl<T: RealField + Copy, const N: usize> HitDerivative<T, N> {
    /// Creates a derivative from row-major data with `rows` measurement rows.
    pub fn from_row_slice(rows: usize, data: &[T]) -> Result<Self> {
        check_dimension(rows * N, data.len())?;
        Ok(Self {
            inner: DerivativeMatrix::from_row_slice_generic(Dyn(rows), Const::<N>, data),
        })
    }

    /// Wraps an nalgebra matrix.
    #[inline]
    pub fn from_matrix(inner: DerivativeMatrix<T, N>) -> Self {
        Self { inner }
    }

    /// Selects track parameters: row `k` has a single one at column `indices[k]`.
    pub fn selection(indices: &[usize]) -> Result<Self> {
        let mut inner = DerivativeMatrix::zeros_generic(Dyn(indices.len()), Const::<N>);
        for (row, &col) in indices.iter().enumerate() {
            if col >= N {
                return Err(Error::DimensionMismatch {
                    expected: N,
                    got: col + 1,
                });
            }
            inner[(row, col)] = T::one();
        }
        Ok(Self { inner })
    }

    /// Returns the underlying nalgebra matrix.
    #[inline]
    pub fn as_matrix(&self) -> &DerivativeMatrix<T, N> {
        &self.inner
    }

    /// Measurement dimension M.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.inner.nrows()
    }

    /// Linear prediction `H x`.
    pub fn apply(&self, vec: &TrackVector<T, N>) -> HitVector<T> {
        HitVector::from_dvector(&self.inner * vec.as_svector())
    }

    /// Projects a track covariance into measurement space: `H C Hᵗ`.
    pub fn project_covariance(&self, cov: &TrackCovariance<T, N>) -> HitError<T> {
        let projected = &self.inner * cov.as_matrix() * self.inner.transpose();
        let half: T = nalgebra::convert::<f64, T>(0.5);
        HitError {
            inner: (&projected + projected.transpose()) * half,
        }
    }

    /// Returns true if every element is finite.
    pub fn is_finite(&self) -> bool {
        self.inner.iter().all(|x| x.is_finite())
    }
}

#[inline]
fn check_dimension(expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, got })
    }
}

#[inline]
fn symmetry_tolerance<T: RealField + Copy>() -> T {
    nalgebra::convert::<f64, T>(1e-9)
}

/// Jittered Cholesky test, matching [`TrackCovariance::is_positive_semidefinite`].
fn is_positive_semidefinite<T: RealField + Copy>(m: &DMatrix<T>) -> bool {
    let n = m.nrows();
    let max_diag = (0..n).fold(T::zero(), |acc, i| acc.max(m[(i, i)]));
    if max_diag == T::zero() {
        return m.iter().all(|x| *x == T::zero());
    }
    let jitter = max_diag
        * nalgebra::convert::<f64, T>(n as f64)
        * T::default_epsilon()
        * nalgebra::convert::<f64, T>(16.0);
    let shifted = m + DMatrix::<T>::identity(n, n) * jitter;
    nalgebra::Cholesky::new(shifted).is_some()
}
