//! Toy surface and propagator shared by the unit tests.

use std::sync::Arc;

use crate::error::PropagationError;
use crate::propagator::{PropDir, PropStat, Propagator, Transport};
use crate::surface::{Surface, SurfacePtr};
use crate::track::VectorTrack;
use crate::types::spaces::TrackCovariance;
use crate::types::transforms::TrackDerivative;

/// Surface identified by a single position parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSurface {
    params: [f64; 1],
}

impl TestSurface {
    pub fn new(position: f64) -> Self {
        Self { params: [position] }
    }
}

impl<const N: usize> Surface<f64, N> for TestSurface {
    fn pure_type(&self) -> &'static str {
        "Test"
    }

    fn parameters(&self) -> &[f64] {
        &self.params
    }

    fn new_pure_surface(&self) -> SurfacePtr<f64, N> {
        Arc::new(self.clone())
    }
}

pub fn test_surface<const N: usize>(position: f64) -> SurfacePtr<f64, N> {
    Arc::new(TestSurface::new(position))
}

/// Moves a track between test surfaces without changing its parameters.
///
/// The path distance is the difference of surface positions. Optional process
/// noise adds `noise * |path|` to every variance.
#[derive(Debug, Clone, Default)]
pub struct ShiftPropagator {
    noise: f64,
}

impl ShiftPropagator {
    pub fn new() -> Self {
        Self { noise: 0.0 }
    }

    pub fn with_noise(noise: f64) -> Self {
        Self { noise }
    }
}

impl<const N: usize> Propagator<f64, N> for ShiftPropagator {
    fn new_propagator(&self) -> Box<dyn Propagator<f64, N>> {
        Box::new(self.clone())
    }

    fn vec_dir_prop(
        &mut self,
        trv: &VectorTrack<f64, N>,
        srf: &SurfacePtr<f64, N>,
        dir: PropDir,
    ) -> Result<Transport<f64, N>, PropagationError> {
        let from = trv.surface().parameter(0).ok_or(PropagationError::Unreachable)?;
        let to = srf.parameter(0).ok_or(PropagationError::Unreachable)?;
        let path = to - from;
        if !dir.allows(path) {
            return Err(PropagationError::Unreachable);
        }
        Ok(Transport {
            track: VectorTrack::with_direction(Arc::clone(srf), *trv.vector(), trv.direction()),
            derivative: TrackDerivative::identity(),
            stat: PropStat::new(path),
        })
    }

    fn process_noise(
        &self,
        _from: &VectorTrack<f64, N>,
        transport: &Transport<f64, N>,
    ) -> Option<TrackCovariance<f64, N>> {
        if self.noise == 0.0 {
            return None;
        }
        Some(TrackCovariance::identity().scale(self.noise * transport.stat.path_distance().abs()))
    }
}
