//! Clusters and hits
//!
//! A [`Cluster`] is the immutable detector response on one surface. Given a
//! track state on that surface it lists one or more candidate measurements
//! (more than one when the response is ambiguous, e.g. left/right in a drift
//! cell) and predicts each of them. A [`Hit`] is one candidate together with
//! its most recent prediction.

mod projection;

pub use projection::ProjectionCluster;

use ::core::fmt;
use std::sync::Arc;

use nalgebra::RealField;

use crate::error::{Error, Result};
use crate::surface::SurfacePtr;
use crate::track::EstimatedTrack;
use crate::types::measurement::{HitDerivative, HitError, HitVector};

/// Shared handle to an immutable cluster.
pub type ClusterPtr<T, const N: usize> = Arc<dyn Cluster<T, N>>;

/// A fixed measured value of one cluster candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement<T: RealField + Copy> {
    /// Candidate index within the cluster
    pub candidate: usize,
    pub vector: HitVector<T>,
    pub error: HitError<T>,
}

/// Linearized prediction of a measurement at a track state.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction<T: RealField + Copy, const N: usize> {
    /// Predicted measurement `h(x)`
    pub vector: HitVector<T>,
    /// Predicted error `H C Hᵗ`
    pub error: HitError<T>,
    /// `H = ∂h / ∂x`
    pub derivative: HitDerivative<T, N>,
}

// ============================================================================
// Cluster Trait
// ============================================================================

/// Detector response on one surface.
pub trait Cluster<T: RealField + Copy, const N: usize>: fmt::Debug + Send + Sync {
    /// Type tag of the cluster.
    fn cluster_type(&self) -> &'static str;

    /// Surface the cluster lies on.
    fn surface(&self) -> &SurfacePtr<T, N>;

    /// Measurement dimension M.
    fn dimension(&self) -> usize;

    /// Candidate measurements compatible with `tre`, best first.
    ///
    /// An empty list means the cluster cannot be associated with the state.
    fn candidates(&self, tre: &EstimatedTrack<T, N>) -> Result<Vec<Measurement<T>>>;

    /// Predicts candidate `candidate` from `tre`.
    fn prediction(&self, candidate: usize, tre: &EstimatedTrack<T, N>) -> Result<Prediction<T, N>>;

    /// Residual `measured - predicted`.
    ///
    /// Clusters measuring periodic quantities override this.
    fn measurement_difference(
        &self,
        measured: &HitVector<T>,
        predicted: &HitVector<T>,
    ) -> Result<HitVector<T>> {
        measured.difference(predicted)
    }
}

/// Predicts every candidate hit of `cluster` from `tre`.
///
/// # Returns
/// One hit per candidate in the cluster's order; an empty list if the
/// cluster has no candidate for this state.
pub fn predict<T: RealField + Copy, const N: usize>(
    cluster: &ClusterPtr<T, N>,
    tre: &EstimatedTrack<T, N>,
) -> Result<Vec<Hit<T, N>>> {
    cluster
        .candidates(tre)?
        .into_iter()
        .map(|measurement| {
            let prediction = cluster.prediction(measurement.candidate, tre)?;
            Hit::new(Arc::clone(cluster), measurement, prediction)
        })
        .collect()
}

// ============================================================================
// Hit
// ============================================================================

/// One candidate measurement of a cluster with its latest prediction.
///
/// Hits are values: [`Hit::update`] returns a refreshed copy.
#[derive(Debug, Clone)]
pub struct Hit<T: RealField + Copy, const N: usize> {
    cluster: ClusterPtr<T, N>,
    measurement: Measurement<T>,
    prediction: Prediction<T, N>,
}

impl<T: RealField + Copy, const N: usize> Hit<T, N> {
    /// Creates a hit after checking that all parts share one dimension.
    pub fn new(
        cluster: ClusterPtr<T, N>,
        measurement: Measurement<T>,
        prediction: Prediction<T, N>,
    ) -> Result<Self> {
        let m = cluster.dimension();
        for got in [
            measurement.vector.dimension(),
            measurement.error.dimension(),
            prediction.vector.dimension(),
            prediction.error.dimension(),
            prediction.derivative.dimension(),
        ] {
            if got != m {
                return Err(Error::DimensionMismatch { expected: m, got });
            }
        }
        Ok(Self {
            cluster,
            measurement,
            prediction,
        })
    }

    /// Re-predicts this hit from a new state. `self` is left unchanged.
    pub fn update(&self, tre: &EstimatedTrack<T, N>) -> Result<Self> {
        let prediction = self.cluster.prediction(self.measurement.candidate, tre)?;
        Self::new(Arc::clone(&self.cluster), self.measurement.clone(), prediction)
    }

    #[inline]
    pub fn cluster(&self) -> &ClusterPtr<T, N> {
        &self.cluster
    }

    #[inline]
    pub fn surface(&self) -> &SurfacePtr<T, N> {
        self.cluster.surface()
    }

    #[inline]
    pub fn candidate(&self) -> usize {
        self.measurement.candidate
    }

    /// Measurement dimension M.
    #[inline]
    pub fn size(&self) -> usize {
        self.measurement.vector.dimension()
    }

    #[inline]
    pub fn measured_vector(&self) -> &HitVector<T> {
        &self.measurement.vector
    }

    #[inline]
    pub fn measured_error(&self) -> &HitError<T> {
        &self.measurement.error
    }

    #[inline]
    pub fn predicted_vector(&self) -> &HitVector<T> {
        &self.prediction.vector
    }

    #[inline]
    pub fn predicted_error(&self) -> &HitError<T> {
        &self.prediction.error
    }

    #[inline]
    pub fn derivative(&self) -> &HitDerivative<T, N> {
        &self.prediction.derivative
    }

    /// Residual `measured - predicted` using the cluster's difference.
    pub fn residual(&self) -> Result<HitVector<T>> {
        self.cluster
            .measurement_difference(&self.measurement.vector, &self.prediction.vector)
    }

    /// Residual covariance `V + H C Hᵗ`.
    pub fn residual_error(&self) -> Result<HitError<T>> {
        self.measurement.error.sum(&self.prediction.error)
    }
}

impl<T: RealField + Copy, const N: usize> PartialEq for Hit<T, N> {
    fn eq(&self, other: &Self) -> bool {
        let same_cluster =
            Arc::as_ptr(&self.cluster) as *const () == Arc::as_ptr(&other.cluster) as *const ();
        same_cluster && self.measurement == other.measurement && self.prediction == other.prediction
    }
}

impl<T: RealField + Copy, const N: usize> fmt::Display for Hit<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hit {} on {}: measured {:?}, predicted {:?}",
            self.cluster.cluster_type(),
            self.measurement.candidate,
            self.cluster.surface(),
            self.measurement.vector.as_slice(),
            self.prediction.vector.as_slice()
        )
    }
}
