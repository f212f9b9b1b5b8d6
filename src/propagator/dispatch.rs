//! Propagator dispatch by surface type
//!
//! Concrete propagators usually handle one pair of surface types (plane to
//! plane, cylinder to plane, ...). [`PropDispatch`] combines them into one
//! propagator that routes by the pure types of the source and target
//! surfaces.

use std::collections::HashMap;

use log::debug;
use nalgebra::RealField;

use super::{PropDir, PropStat, Propagator, Transport};
use crate::error::{Error, InvalidTrackState, PropagationError};
use crate::surface::SurfacePtr;
use crate::track::{EstimatedTrack, VectorTrack};

type PairKey = (&'static str, &'static str);

/// Routes propagation requests to a propagator registered for the
/// (source type, target type) pair.
#[derive(Debug)]
pub struct PropDispatch<T: RealField + Copy, const N: usize> {
    propagators: HashMap<PairKey, Box<dyn Propagator<T, N>>>,
}

impl<T: RealField + Copy, const N: usize> PropDispatch<T, N> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            propagators: HashMap::new(),
        }
    }

    /// Registers a propagator for a pair of pure surface types.
    ///
    /// # Returns
    /// [`Error::DuplicatePropagator`] if the pair already has one; the
    /// existing registration is kept.
    pub fn add_propagator(
        &mut self,
        from: &'static str,
        to: &'static str,
        propagator: Box<dyn Propagator<T, N>>,
    ) -> Result<(), Error> {
        if self.propagators.contains_key(&(from, to)) {
            return Err(Error::DuplicatePropagator { from, to });
        }
        debug!("registered propagator for {} -> {}", from, to);
        self.propagators.insert((from, to), propagator);
        Ok(())
    }

    /// Number of registered propagators.
    pub fn propagator_count(&self) -> usize {
        self.propagators.len()
    }

    /// Returns true if a propagator is registered for the pair.
    pub fn has_propagator(&self, from: &str, to: &str) -> bool {
        self.propagators.keys().any(|(f, t)| *f == from && *t == to)
    }

    fn route(
        &mut self,
        from: &SurfacePtr<T, N>,
        to: &SurfacePtr<T, N>,
    ) -> Result<&mut Box<dyn Propagator<T, N>>, PropagationError> {
        let key = (from.pure_type(), to.pure_type());
        self.propagators
            .get_mut(&key)
            .ok_or(PropagationError::NoPropagator {
                from: key.0,
                to: key.1,
            })
    }
}

impl<T: RealField + Copy, const N: usize> Default for PropDispatch<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealField + Copy, const N: usize> Propagator<T, N> for PropDispatch<T, N> {
    fn new_propagator(&self) -> Box<dyn Propagator<T, N>> {
        let propagators = self
            .propagators
            .iter()
            .map(|(key, prop)| (*key, prop.new_propagator()))
            .collect();
        Box::new(Self { propagators })
    }

    fn vec_dir_prop(
        &mut self,
        trv: &VectorTrack<T, N>,
        srf: &SurfacePtr<T, N>,
        dir: PropDir,
    ) -> Result<Transport<T, N>, PropagationError> {
        self.route(trv.surface(), srf)?.vec_dir_prop(trv, srf, dir)
    }

    // Delegated whole so that the routed propagator's process noise applies.
    fn err_dir_prop(
        &mut self,
        tre: &EstimatedTrack<T, N>,
        srf: &SurfacePtr<T, N>,
        dir: PropDir,
    ) -> Result<(EstimatedTrack<T, N>, PropStat<T>), PropagationError> {
        let from = tre.surface().ok_or(InvalidTrackState::NoSurface)?;
        self.route(from, srf)?.err_dir_prop(tre, srf, dir)
    }
}
