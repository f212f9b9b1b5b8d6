//! Full-fit configuration

use nalgebra::RealField;

use crate::propagator::PropDir;

/// Configuration for [`FullFitKalman`](super::FullFitKalman).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitConfig<T: RealField> {
    /// Direction used to reach each hit surface
    pub direction: PropDir,
    /// Maximum total chi-square; the fit stops once it is exceeded
    pub max_chi_square: Option<T>,
    /// Factor applied to the starting covariance before the first hit
    pub error_scale: T,
}

impl<T: RealField + Copy> FitConfig<T> {
    /// Creates a default configuration: nearest direction, no chi-square
    /// cut and the starting covariance used as given.
    pub fn default_config() -> Self {
        Self {
            direction: PropDir::Nearest,
            max_chi_square: None,
            error_scale: T::one(),
        }
    }

    /// Creates a configuration with custom values.
    pub fn new(direction: PropDir, max_chi_square: Option<T>, error_scale: T) -> Self {
        Self {
            direction,
            max_chi_square,
            error_scale,
        }
    }

    /// Returns a copy with the given propagation direction.
    pub fn with_direction(mut self, direction: PropDir) -> Self {
        self.direction = direction;
        self
    }

    /// Returns a copy with a total chi-square cut.
    pub fn with_max_chi_square(mut self, max_chi_square: T) -> Self {
        self.max_chi_square = Some(max_chi_square);
        self
    }

    /// Returns a copy with a starting error scale.
    pub fn with_error_scale(mut self, error_scale: T) -> Self {
        self.error_scale = error_scale;
        self
    }

    /// Returns true if `chi_square` passes the configured cut.
    pub fn accepts(&self, chi_square: T) -> bool {
        self.max_chi_square.map_or(true, |max| chi_square <= max)
    }
}

impl<T: RealField + Copy> Default for FitConfig<T> {
    fn default() -> Self {
        Self::default_config()
    }
}
