//! Single-measurement update
//!
//! Given a track state and a hit predicted from that state, the Kalman update
//! computes
//!
//! ```text
//! S  = H C Hᵗ + V
//! K  = C Hᵗ S⁻¹
//! x' = x + K r
//! C' = (I - K H) C (I - K H)ᵗ + K V Kᵗ
//! Δχ² = rᵗ S⁻¹ r
//! ```
//!
//! where `r` is the hit residual. The Joseph form of `C'` stays symmetric
//! positive semi-definite under rounding.

use ::core::fmt;

use nalgebra::{Cholesky, DMatrix, RealField, SMatrix, SVector};

use crate::error::{Error, InvalidTrackState, UpdateError};
use crate::hit::Hit;
use crate::track::EstimatedTrack;
use crate::types::spaces::{TrackCovariance, TrackVector};

use super::htrack::HTrack;

/// Outcome of adding one hit to a state.
#[derive(Debug, Clone, PartialEq)]
pub struct HitUpdate<T: RealField + Copy, const N: usize> {
    /// Updated state
    pub track: EstimatedTrack<T, N>,
    /// Chi-square increment of the hit
    pub chi_square: T,
}

/// Adds a single hit to a track state.
pub trait AddFitter<T: RealField + Copy, const N: usize>: fmt::Debug + Send + Sync {
    /// Updates `tre` with `hit`.
    ///
    /// The hit must have been predicted from `tre`. On error nothing is
    /// produced and `tre` is unchanged.
    fn add_hit_fit(&self, tre: &EstimatedTrack<T, N>, hit: &Hit<T, N>) -> Result<HitUpdate<T, N>, UpdateError>;

    /// Fits `hit` against the current estimate of `trh`, then appends the hit
    /// and records the new fit.
    ///
    /// # Returns
    /// The chi-square increment. On error `trh` is unchanged.
    fn add_hit(&self, trh: &mut HTrack<T, N>, hit: Hit<T, N>) -> Result<T, UpdateError> {
        let update = self.add_hit_fit(trh.track(), &hit)?;
        let chi_square = trh.chi_squared() + update.chi_square;
        trh.add_hit(hit);
        trh.set_fit(update.track, chi_square);
        Ok(update.chi_square)
    }
}

/// Kalman filter update in Joseph form.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddFitKalman;

impl AddFitKalman {
    pub fn new() -> Self {
        Self
    }
}

impl<T: RealField + Copy, const N: usize> AddFitter<T, N> for AddFitKalman {
    fn add_hit_fit(&self, tre: &EstimatedTrack<T, N>, hit: &Hit<T, N>) -> Result<HitUpdate<T, N>, UpdateError> {
        let srf = tre.surface().ok_or(InvalidTrackState::NoSurface)?;
        if !srf.pure_equal(hit.surface().as_ref()) {
            return Err(UpdateError::SurfaceMismatch);
        }

        let m = hit.size();
        let h = hit.derivative().as_matrix();
        let v = hit.measured_error().as_dmatrix();
        let residual = hit.residual().map_err(|err| match err {
            Error::DimensionMismatch { expected, got } => UpdateError::DimensionMismatch { expected, got },
            other => UpdateError::Residual(Box::new(other)),
        })?;
        let r = residual.as_dvector();
        for got in [h.nrows(), v.nrows(), r.len()] {
            if got != m {
                return Err(UpdateError::DimensionMismatch { expected: m, got });
            }
        }

        let c = tre.covariance().as_matrix();

        // Innovation covariance
        let ch_t = c * h.transpose();
        let s = h * &ch_t + v;
        let half: T = nalgebra::convert::<f64, T>(0.5);
        let s = (&s + s.transpose()) * half;
        let s_inv = invert_innovation(s)?;

        // Gain, state and covariance
        let k = &ch_t * &s_inv;
        let correction: SVector<T, N> = &k * r;
        let x = tre.vector().as_svector() + correction;

        let i_kh: SMatrix<T, N, N> = SMatrix::identity() - &k * h;
        let c_new: SMatrix<T, N, N> = i_kh * c * i_kh.transpose() + &k * v * k.transpose();
        let covariance = TrackCovariance::from_matrix(c_new).symmetrize();

        let chi_square = r.dot(&(&s_inv * r));
        if !chi_square.is_finite() || chi_square < T::zero() {
            return Err(UpdateError::NotPositiveDefinite);
        }

        let track = tre.with_state(TrackVector::from_svector(x), covariance)?;
        Ok(HitUpdate { track, chi_square })
    }
}

/// Inverts a symmetric innovation covariance through its Cholesky factor.
fn invert_innovation<T: RealField + Copy>(s: DMatrix<T>) -> Result<DMatrix<T>, UpdateError> {
    if !s.iter().all(|x| x.is_finite()) {
        return Err(UpdateError::SingularInnovation);
    }
    match Cholesky::new(s.clone()) {
        Some(chol) => Ok(chol.inverse()),
        None => {
            if s.try_inverse().is_some() {
                Err(UpdateError::NotPositiveDefinite)
            } else {
                Err(UpdateError::SingularInnovation)
            }
        }
    }
}
