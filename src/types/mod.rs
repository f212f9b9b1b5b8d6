//! Core types for track-space vectors, transports and measurements

pub mod measurement;
pub mod spaces;
pub mod transforms;
