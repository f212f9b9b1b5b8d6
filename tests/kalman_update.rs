//! Integration tests for the single-measurement update

mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use trackfit::prelude::*;

use common::*;

fn scalar_surface() -> SurfacePtr<f64, 1> {
    Arc::new(ZPlane::new(0.0))
}

fn scalar_hit(tre: &EstimatedTrack<f64, 1>, value: f64, variance: f64) -> Hit<f64, 1> {
    let cluster: ClusterPtr<f64, 1> = Arc::new(
        ProjectionCluster::new(
            scalar_surface(),
            HitDerivative::selection(&[0]).unwrap(),
            HitVector::from_slice(&[value]),
            HitError::from_variances(&[variance]).unwrap(),
        )
        .unwrap(),
    );
    predict(&cluster, tre).unwrap().remove(0)
}

#[test]
fn test_update_known_values() {
    let tre = EstimatedTrack::new(
        scalar_surface(),
        TrackVector::from_array([1.0]),
        TrackCovariance::from_diagonal(&nalgebra::vector![4.0]),
    )
    .unwrap();
    let hit = scalar_hit(&tre, 2.0, 1.0);

    let update = AddFitKalman.add_hit_fit(&tre, &hit).unwrap();

    assert_relative_eq!(*update.track.vector().index(0), 1.8, epsilon = 1e-12);
    assert_relative_eq!(*update.track.covariance().get(0, 0), 0.8, epsilon = 1e-12);
    assert_relative_eq!(update.chi_square, 0.2, epsilon = 1e-12);
}

#[test]
fn test_update_never_increases_trace() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..50 {
        // Random SPD covariance A Aᵗ + diag
        let a = nalgebra::Matrix4::from_fn(|_, _| rng.random_range(-1.0..1.0));
        let cov = a * a.transpose() + nalgebra::Matrix4::from_diagonal_element(0.1);
        let tre = EstimatedTrack::new(
            plane(1.0),
            TrackVector::from_array([
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
            ]),
            TrackCovariance::from_matrix(cov),
        )
        .unwrap();

        let sigma = rng.random_range(0.01..2.0);
        let cluster = xy_cluster(
            1.0,
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
            sigma,
        );
        let hit = predict(&cluster, &tre).unwrap().remove(0);

        let update = AddFitKalman.add_hit_fit(&tre, &hit).unwrap();
        let after = update.track.covariance();
        assert!(after.trace() <= tre.covariance().trace() + 1e-9);
        assert!(after.is_symmetric(1e-12));
        assert!(after.is_positive_semidefinite());
        assert!(update.chi_square >= 0.0);
    }
}

#[test]
fn test_one_dimensional_hit_on_four_parameter_track() {
    let tre = make_track(2.0, [1.0, 2.0, 0.1, 0.2], [1.0, 1.0, 0.5, 0.5]);
    let hit = predict(&x_cluster(2.0, 1.5, 0.5), &tre).unwrap().remove(0);

    let update = AddFitKalman.add_hit_fit(&tre, &hit).unwrap();
    // Only x is measured: S = 1.25, K_x = 0.8
    assert_relative_eq!(*update.track.vector().index(0), 1.4, epsilon = 1e-12);
    assert_relative_eq!(*update.track.vector().index(1), 2.0, epsilon = 1e-12);
    assert_relative_eq!(*update.track.covariance().get(0, 0), 0.2, epsilon = 1e-12);
    assert_relative_eq!(*update.track.covariance().get(1, 1), 1.0, epsilon = 1e-12);
    assert_relative_eq!(update.chi_square, 0.2, epsilon = 1e-12);
}

#[test]
fn test_failed_update_leaves_input_unchanged() {
    let tre = make_track(1.0, [0.0, 0.0, 0.0, 0.0], [1.0, 1.0, 1.0, 1.0]);
    let snapshot = tre.clone();

    // Hit on another plane
    let other = make_track(2.0, [0.0, 0.0, 0.0, 0.0], [1.0, 1.0, 1.0, 1.0]);
    let hit = predict(&xy_cluster(2.0, 0.5, 0.5, 0.1), &other).unwrap().remove(0);

    let err = AddFitKalman.add_hit_fit(&tre, &hit).unwrap_err();
    assert_eq!(err, UpdateError::SurfaceMismatch);
    assert_eq!(tre, snapshot);

    // Through an HTrack: nothing is appended or committed
    let mut trh = HTrack::from_track(tre.clone());
    assert!(AddFitKalman.add_hit(&mut trh, hit).is_err());
    assert!(trh.hits().is_empty());
    assert!(trh.is_fit());
    assert_eq!(*trh.track(), snapshot);
}

#[test]
fn test_add_hit_accumulates_chi_square() {
    let seed = make_track(1.0, [0.0, 0.0, 0.0, 0.0], [4.0, 4.0, 1.0, 1.0]);
    let mut trh = HTrack::from_track(seed.clone());

    let first = predict(&x_cluster(1.0, 2.0, 1.0), &seed).unwrap().remove(0);
    let d1 = AddFitKalman.add_hit(&mut trh, first).unwrap();

    let second = predict(&x_cluster(1.0, 2.0, 1.0), trh.track()).unwrap().remove(0);
    let d2 = AddFitKalman.add_hit(&mut trh, second).unwrap();

    assert!(trh.is_fit());
    assert_eq!(trh.hits().len(), 2);
    assert_relative_eq!(trh.chi_squared(), d1 + d2, epsilon = 1e-12);
    // x: 0 -> 1.6 (K = 0.8) -> 1.6 + 0.8/1.8 * 0.4
    assert_relative_eq!(
        *trh.track().vector().index(0),
        1.6 + 0.4 * 0.8 / 1.8,
        epsilon = 1e-12
    );
}
