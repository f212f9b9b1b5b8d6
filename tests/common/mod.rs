//! Common test helpers for track-fit integration tests
//!
//! Toy geometry: planes at fixed `z` and a straight-line propagator for the
//! track vector `[x, y, dx/dz, dy/dz]`.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use trackfit::error::{Error, PropagationError};
use trackfit::hit::{predict, Cluster, ClusterPtr, Hit, Measurement, Prediction, ProjectionCluster};
use trackfit::propagator::{PropDir, PropStat, Propagator, Transport};
use trackfit::surface::{Surface, SurfacePtr};
use trackfit::track::{EstimatedTrack, TrackSurfaceDirection, VectorTrack};
use trackfit::types::measurement::{HitDerivative, HitError, HitVector};
use trackfit::types::spaces::{TrackCovariance, TrackVector};
use trackfit::types::transforms::TrackDerivative;

pub type Track4 = EstimatedTrack<f64, 4>;

// ============================================================================
// Surfaces
// ============================================================================

/// Plane perpendicular to the z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ZPlane {
    params: [f64; 1],
}

impl ZPlane {
    pub fn new(z: f64) -> Self {
        Self { params: [z] }
    }

    pub fn z(&self) -> f64 {
        self.params[0]
    }
}

impl<const N: usize> Surface<f64, N> for ZPlane {
    fn pure_type(&self) -> &'static str {
        "ZPlane"
    }

    fn parameters(&self) -> &[f64] {
        &self.params
    }

    fn new_pure_surface(&self) -> SurfacePtr<f64, N> {
        Arc::new(self.clone())
    }
}

/// Cylinder around the z axis; no toy propagator handles it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    params: [f64; 1],
}

impl Cylinder {
    pub fn new(radius: f64) -> Self {
        Self { params: [radius] }
    }
}

impl<const N: usize> Surface<f64, N> for Cylinder {
    fn pure_type(&self) -> &'static str {
        "Cylinder"
    }

    fn parameters(&self) -> &[f64] {
        &self.params
    }

    fn new_pure_surface(&self) -> SurfacePtr<f64, N> {
        Arc::new(self.clone())
    }
}

pub fn plane(z: f64) -> SurfacePtr<f64, 4> {
    Arc::new(ZPlane::new(z))
}

pub fn cylinder(radius: f64) -> SurfacePtr<f64, 4> {
    Arc::new(Cylinder::new(radius))
}

// ============================================================================
// Propagators
// ============================================================================

/// Straight-line transport between z planes.
///
/// `scattering` adds `scattering * |dz|` to both slope variances, a crude
/// stand-in for multiple scattering that makes the fit order-dependent.
#[derive(Debug, Clone, Default)]
pub struct StraightLinePropagator {
    pub scattering: f64,
}

impl StraightLinePropagator {
    pub fn new() -> Self {
        Self { scattering: 0.0 }
    }

    pub fn with_scattering(scattering: f64) -> Self {
        Self { scattering }
    }
}

impl Propagator<f64, 4> for StraightLinePropagator {
    fn new_propagator(&self) -> Box<dyn Propagator<f64, 4>> {
        Box::new(self.clone())
    }

    fn vec_dir_prop(
        &mut self,
        trv: &VectorTrack<f64, 4>,
        srf: &SurfacePtr<f64, 4>,
        dir: PropDir,
    ) -> Result<Transport<f64, 4>, PropagationError> {
        if trv.surface().pure_type() != "ZPlane" || srf.pure_type() != "ZPlane" {
            return Err(PropagationError::NoPropagator {
                from: trv.surface().pure_type(),
                to: srf.pure_type(),
            });
        }
        let z0 = trv.surface().parameter(0).ok_or(PropagationError::Unreachable)?;
        let z1 = srf.parameter(0).ok_or(PropagationError::Unreachable)?;
        let dz = z1 - z0;
        if !dir.allows(dz) {
            return Err(PropagationError::Unreachable);
        }

        let v = trv.vector();
        let (tx, ty) = (*v.index(2), *v.index(3));
        let vector = TrackVector::from_array([v.index(0) + tx * dz, v.index(1) + ty * dz, tx, ty]);
        let derivative = TrackDerivative::from_matrix(nalgebra::matrix![
            1.0, 0.0, dz, 0.0;
            0.0, 1.0, 0.0, dz;
            0.0, 0.0, 1.0, 0.0;
            0.0, 0.0, 0.0, 1.0
        ]);
        let direction = if dz > 0.0 {
            TrackSurfaceDirection::Forward
        } else if dz < 0.0 {
            TrackSurfaceDirection::Backward
        } else {
            trv.direction()
        };

        // Path length along the line, signed by direction
        let path = dz * (1.0 + tx * tx + ty * ty).sqrt();
        Ok(Transport {
            track: VectorTrack::with_direction(Arc::clone(srf), vector, direction),
            derivative,
            stat: PropStat::new(path),
        })
    }

    fn process_noise(
        &self,
        _from: &VectorTrack<f64, 4>,
        transport: &Transport<f64, 4>,
    ) -> Option<TrackCovariance<f64, 4>> {
        if self.scattering == 0.0 {
            return None;
        }
        let q = self.scattering * transport.stat.path_distance().abs();
        Some(TrackCovariance::from_diagonal(&nalgebra::vector![0.0, 0.0, q, q]))
    }
}

/// Straight-line propagator that records the z of every target surface.
#[derive(Debug, Clone)]
pub struct RecordingPropagator {
    inner: StraightLinePropagator,
    pub visited: Arc<Mutex<Vec<f64>>>,
}

impl RecordingPropagator {
    pub fn new(inner: StraightLinePropagator) -> Self {
        Self {
            inner,
            visited: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn visited(&self) -> Vec<f64> {
        self.visited.lock().unwrap().clone()
    }
}

impl Propagator<f64, 4> for RecordingPropagator {
    fn new_propagator(&self) -> Box<dyn Propagator<f64, 4>> {
        Box::new(self.clone())
    }

    fn vec_dir_prop(
        &mut self,
        trv: &VectorTrack<f64, 4>,
        srf: &SurfacePtr<f64, 4>,
        dir: PropDir,
    ) -> Result<Transport<f64, 4>, PropagationError> {
        if let Some(z) = srf.parameter(0) {
            self.visited.lock().unwrap().push(z);
        }
        self.inner.vec_dir_prop(trv, srf, dir)
    }

    fn process_noise(
        &self,
        from: &VectorTrack<f64, 4>,
        transport: &Transport<f64, 4>,
    ) -> Option<TrackCovariance<f64, 4>> {
        self.inner.process_noise(from, transport)
    }
}

// ============================================================================
// States and Hits
// ============================================================================

/// Creates a state on the plane at `z` with a diagonal covariance.
pub fn make_track(z: f64, params: [f64; 4], variances: [f64; 4]) -> Track4 {
    EstimatedTrack::new(
        plane(z),
        TrackVector::from_array(params),
        TrackCovariance::from_diagonal(&nalgebra::Vector4::from(variances)),
    )
    .unwrap()
}

/// Loose seed at `z = 0`.
pub fn make_seed() -> Track4 {
    make_track(0.0, [0.0, 0.0, 0.0, 0.0], [100.0, 100.0, 1.0, 1.0])
}

/// A pixel-like cluster measuring `(x, y)` on the plane at `z`.
pub fn xy_cluster(z: f64, x: f64, y: f64, sigma: f64) -> ClusterPtr<f64, 4> {
    Arc::new(
        ProjectionCluster::new(
            plane(z),
            HitDerivative::selection(&[0, 1]).unwrap(),
            HitVector::from_slice(&[x, y]),
            HitError::from_variances(&[sigma * sigma, sigma * sigma]).unwrap(),
        )
        .unwrap(),
    )
}

/// A strip-like cluster measuring only `x` on the plane at `z`.
pub fn x_cluster(z: f64, x: f64, sigma: f64) -> ClusterPtr<f64, 4> {
    Arc::new(
        ProjectionCluster::new(
            plane(z),
            HitDerivative::selection(&[0]).unwrap(),
            HitVector::from_slice(&[x]),
            HitError::from_variances(&[sigma * sigma]).unwrap(),
        )
        .unwrap(),
    )
}

/// Predicts the best candidate of `cluster` from `tre` moved onto its surface.
pub fn make_hit(cluster: &ClusterPtr<f64, 4>, tre: &Track4) -> Hit<f64, 4> {
    let mut prop = StraightLinePropagator::new();
    let (on_surface, _) = prop.err_prop(tre, cluster.surface()).unwrap();
    predict(cluster, &on_surface).unwrap().remove(0)
}

/// Predicts a hit for a cluster on a surface the toy propagator cannot reach.
pub fn make_unreachable_hit(radius: f64) -> Hit<f64, 4> {
    let cluster: ClusterPtr<f64, 4> = Arc::new(
        ProjectionCluster::new(
            cylinder(radius),
            HitDerivative::selection(&[0]).unwrap(),
            HitVector::from_slice(&[0.0]),
            HitError::from_variances(&[1.0]).unwrap(),
        )
        .unwrap(),
    );
    let tre = EstimatedTrack::new(
        cylinder(radius),
        TrackVector::zeros(),
        TrackCovariance::identity(),
    )
    .unwrap();
    predict(&cluster, &tre).unwrap().remove(0)
}

/// A cluster that measures `x` only if the track crosses the sensor within
/// `|x| <= half_width`.
#[derive(Debug)]
pub struct SensorCluster {
    inner: ProjectionCluster<f64, 4>,
    half_width: f64,
}

impl Cluster<f64, 4> for SensorCluster {
    fn cluster_type(&self) -> &'static str {
        "Sensor"
    }

    fn surface(&self) -> &SurfacePtr<f64, 4> {
        self.inner.surface()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn candidates(&self, tre: &Track4) -> trackfit::Result<Vec<Measurement<f64>>> {
        self.inner.candidates(tre)
    }

    fn prediction(&self, candidate: usize, tre: &Track4) -> trackfit::Result<Prediction<f64, 4>> {
        if tre.vector().index(0).abs() > self.half_width {
            return Err(Error::InvalidMeasurement("track misses the sensitive area"));
        }
        self.inner.prediction(candidate, tre)
    }
}

/// Sensor of half-width `half_width` at `z` measuring `x`.
pub fn sensor_cluster(z: f64, x: f64, sigma: f64, half_width: f64) -> ClusterPtr<f64, 4> {
    let inner = ProjectionCluster::new(
        plane(z),
        HitDerivative::selection(&[0]).unwrap(),
        HitVector::from_slice(&[x]),
        HitError::from_variances(&[sigma * sigma]).unwrap(),
    )
    .unwrap();
    Arc::new(SensorCluster { inner, half_width })
}

/// A cluster on the plane at `z` that measures nothing: `H = 0`, `V = 0`.
pub fn blind_cluster(z: f64) -> ClusterPtr<f64, 4> {
    Arc::new(
        ProjectionCluster::new(
            plane(z),
            HitDerivative::from_row_slice(1, &[0.0, 0.0, 0.0, 0.0]).unwrap(),
            HitVector::from_slice(&[0.0]),
            HitError::from_variances(&[0.0]).unwrap(),
        )
        .unwrap(),
    )
}

/// Simulated straight track.
#[derive(Debug, Clone, Copy)]
pub struct TrueTrack {
    pub x0: f64,
    pub y0: f64,
    pub tx: f64,
    pub ty: f64,
}

impl TrueTrack {
    pub fn at(&self, z: f64) -> (f64, f64) {
        (self.x0 + self.tx * z, self.y0 + self.ty * z)
    }
}

/// Generates `(x, y)` clusters at each `z` with Gaussian smearing.
pub fn simulate_clusters(
    truth: &TrueTrack,
    planes: &[f64],
    sigma: f64,
    rng: &mut StdRng,
) -> Vec<ClusterPtr<f64, 4>> {
    let noise = Normal::new(0.0, sigma).unwrap();
    planes
        .iter()
        .map(|&z| {
            let (x, y) = truth.at(z);
            xy_cluster(z, x + noise.sample(rng), y + noise.sample(rng), sigma)
        })
        .collect()
}
