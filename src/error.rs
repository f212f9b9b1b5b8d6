//! Error types for track fitting
//!
//! Propagation and update failures are expected outcomes in reconstruction
//! ("this track could not be fit") and are always returned as values.
//! [`InvalidTrackState`] marks a state that should never have been built and
//! is rejected at construction and propagation boundaries.

use ::core::fmt;
use thiserror::Error;

/// Reasons a track vector/covariance pair is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidTrackState {
    /// The state is not bound to a surface
    #[error("track state has no surface")]
    NoSurface,
    /// Parameters or covariance contain NaN or infinity
    #[error("track parameters or covariance contain non-finite values")]
    NonFinite,
    /// Covariance differs from its transpose beyond rounding
    #[error("covariance matrix is not symmetric")]
    NotSymmetric,
    /// Covariance has a negative eigenvalue
    #[error("covariance matrix is not positive semi-definite")]
    NotPositiveSemidefinite,
    /// Error-matrix check failed (non-positive variance or |correlation| >= 1)
    #[error("covariance matrix has {bad_terms} invalid term(s)")]
    BadErrorMatrix { bad_terms: usize },
}

/// Failure to transport a state to a target surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropagationError {
    /// The target surface cannot be reached in the requested direction
    #[error("target surface cannot be reached from the current state")]
    Unreachable,
    /// No propagator is registered for this pair of surface types
    #[error("no propagator registered from {from} to {to} surfaces")]
    NoPropagator {
        from: &'static str,
        to: &'static str,
    },
    /// Transport produced non-finite parameters or derivatives
    #[error("transport is numerically ill-defined: {0}")]
    NumericalBreakdown(&'static str),
    /// The transported state failed validation
    #[error("transported state is invalid: {0}")]
    InvalidTransport(#[from] InvalidTrackState),
}

/// Failure of a single-measurement update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// Innovation covariance `S = H C Hᵗ + V` cannot be inverted
    #[error("innovation covariance is singular")]
    SingularInnovation,
    /// Innovation covariance is invertible but not positive definite
    #[error("innovation covariance is not positive definite")]
    NotPositiveDefinite,
    /// The hit lives on a different surface than the state
    #[error("hit surface does not match the track surface")]
    SurfaceMismatch,
    /// Hit components disagree on the measurement dimension
    #[error("measurement dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// The input or updated state failed validation
    #[error("track state is invalid: {0}")]
    InvalidState(#[from] InvalidTrackState),
    /// The cluster could not form the residual
    #[error("residual could not be formed: {0}")]
    Residual(#[source] Box<Error>),
}

/// Error type for the library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidTrackState(#[from] InvalidTrackState),

    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    /// Vector/matrix dimensions do not agree
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A measurement error matrix is not a valid covariance
    #[error("invalid measurement error: {0}")]
    InvalidMeasurement(&'static str),

    /// A cluster was asked for a candidate it does not have
    #[error("unknown candidate {candidate}, cluster has {count}")]
    UnknownCandidate { candidate: usize, count: usize },

    /// A propagator is already registered for this pair of surface types
    #[error("propagator already registered from {from} to {to} surfaces")]
    DuplicatePropagator {
        from: &'static str,
        to: &'static str,
    },

    /// Accumulated chi-square passed the configured maximum
    #[error("total chi-square exceeds the configured maximum")]
    ChiSquareExceeded,
}

/// Result type for the library.
pub type Result<T> = ::core::result::Result<T, Error>;

// ============================================================================
// Fit Status
// ============================================================================

/// Step of the full-fit loop at which a fit stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FitStage {
    /// Transporting the state to the hit surface
    Propagation,
    /// Re-predicting the hit against the transported state
    Refresh,
    /// Single-measurement update
    Update,
    /// Accumulated chi-square cut
    ChiSquareCut,
}

impl fmt::Display for FitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitStage::Propagation => write!(f, "propagation"),
            FitStage::Refresh => write!(f, "hit refresh"),
            FitStage::Update => write!(f, "measurement update"),
            FitStage::ChiSquareCut => write!(f, "chi-square cut"),
        }
    }
}

/// A full fit that stopped before its last hit.
///
/// `index` is the position of the failing hit in the track's hit list, which
/// is also the number of hits that were processed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fit stopped at hit {index} during {stage}: {cause}")]
pub struct FitIncomplete {
    /// Step that failed
    pub stage: FitStage,
    /// Index of the failing hit
    pub index: usize,
    /// Underlying failure
    pub cause: Error,
}

impl FitIncomplete {
    /// Creates a new fit failure record.
    pub fn new(stage: FitStage, index: usize, cause: impl Into<Error>) -> Self {
        Self {
            stage,
            index,
            cause: cause.into(),
        }
    }

    /// Number of hits that were fit before the failure.
    pub fn hits_processed(&self) -> usize {
        self.index
    }
}
