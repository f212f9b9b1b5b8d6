//! Linear projection cluster
//!
//! Measures a fixed linear combination `H x` of the track parameters on a
//! surface. Several measured values may be given for one cluster; they are
//! offered as candidates ordered by their residual chi-square against the
//! predicting state.

use std::cmp::Ordering;

use nalgebra::RealField;

use super::{Cluster, Measurement, Prediction};
use crate::error::{Error, InvalidTrackState, Result, UpdateError};
use crate::surface::SurfacePtr;
use crate::track::EstimatedTrack;
use crate::types::measurement::{HitDerivative, HitError, HitVector};

/// A cluster measuring `H x` with one or more candidate values.
#[derive(Debug, Clone)]
pub struct ProjectionCluster<T: RealField + Copy, const N: usize> {
    surface: SurfacePtr<T, N>,
    projection: HitDerivative<T, N>,
    values: Vec<HitVector<T>>,
    error: HitError<T>,
}

impl<T: RealField + Copy, const N: usize> ProjectionCluster<T, N> {
    /// Creates an unambiguous cluster.
    pub fn new(
        surface: SurfacePtr<T, N>,
        projection: HitDerivative<T, N>,
        value: HitVector<T>,
        error: HitError<T>,
    ) -> Result<Self> {
        Self::with_candidates(surface, projection, vec![value], error)
    }

    /// Creates a cluster with several candidate values sharing one error.
    ///
    /// # Returns
    /// An error if the projection, values and error disagree on the
    /// measurement dimension, or a value is not finite.
    pub fn with_candidates(
        surface: SurfacePtr<T, N>,
        projection: HitDerivative<T, N>,
        values: Vec<HitVector<T>>,
        error: HitError<T>,
    ) -> Result<Self> {
        let m = projection.dimension();
        if error.dimension() != m {
            return Err(Error::DimensionMismatch {
                expected: m,
                got: error.dimension(),
            });
        }
        for value in &values {
            if value.dimension() != m {
                return Err(Error::DimensionMismatch {
                    expected: m,
                    got: value.dimension(),
                });
            }
            if !value.is_finite() {
                return Err(Error::InvalidMeasurement("non-finite measured value"));
            }
        }
        if !projection.is_finite() {
            return Err(Error::InvalidMeasurement("non-finite projection"));
        }
        Ok(Self {
            surface,
            projection,
            values,
            error,
        })
    }

    /// Number of candidate values.
    pub fn candidate_count(&self) -> usize {
        self.values.len()
    }

    fn check_surface(&self, tre: &EstimatedTrack<T, N>) -> Result<()> {
        match tre.surface() {
            Some(srf) if srf.pure_equal(self.surface.as_ref()) => Ok(()),
            Some(_) => Err(UpdateError::SurfaceMismatch.into()),
            None => Err(InvalidTrackState::NoSurface.into()),
        }
    }

    fn measurement(&self, candidate: usize) -> Option<Measurement<T>> {
        self.values.get(candidate).map(|vector| Measurement {
            candidate,
            vector: vector.clone(),
            error: self.error.clone(),
        })
    }

    /// `rᵗ (V + H C Hᵗ)⁻¹ r` for each candidate; `None` if the sum is singular.
    fn residual_chi_squares(&self, tre: &EstimatedTrack<T, N>) -> Option<Vec<T>> {
        let predicted = self.projection.apply(tre.vector());
        let total = self
            .error
            .sum(&self.projection.project_covariance(tre.covariance()))
            .ok()?;
        let inverse = total.as_dmatrix().clone().try_inverse()?;
        self.values
            .iter()
            .map(|value| {
                let r = value.difference(&predicted).ok()?;
                let r = r.as_dvector();
                Some(r.dot(&(&inverse * r)))
            })
            .collect()
    }
}

impl<T: RealField + Copy, const N: usize> Cluster<T, N> for ProjectionCluster<T, N> {
    fn cluster_type(&self) -> &'static str {
        "Projection"
    }

    fn surface(&self) -> &SurfacePtr<T, N> {
        &self.surface
    }

    fn dimension(&self) -> usize {
        self.projection.dimension()
    }

    fn candidates(&self, tre: &EstimatedTrack<T, N>) -> Result<Vec<Measurement<T>>> {
        self.check_surface(tre)?;
        let mut order: Vec<(usize, T)> = match self.residual_chi_squares(tre) {
            Some(chi2) => chi2.into_iter().enumerate().collect(),
            None => (0..self.values.len()).map(|i| (i, T::zero())).collect(),
        };
        // Stable: equal chi-squares keep their input order
        order.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        Ok(order
            .into_iter()
            .filter_map(|(candidate, _)| self.measurement(candidate))
            .collect())
    }

    fn prediction(&self, candidate: usize, tre: &EstimatedTrack<T, N>) -> Result<Prediction<T, N>> {
        self.check_surface(tre)?;
        if candidate >= self.values.len() {
            return Err(Error::UnknownCandidate {
                candidate,
                count: self.values.len(),
            });
        }
        Ok(Prediction {
            vector: self.projection.apply(tre.vector()),
            error: self.projection.project_covariance(tre.covariance()),
            derivative: self.projection.clone(),
        })
    }
}
