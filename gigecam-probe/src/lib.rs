//! # gigecam-probe
//!
//! Command-line check for a remote camera: confirms the server answers,
//! opens the camera, applies property settings, grabs a run of frames
//! while reporting throughput, then releases the camera.

pub mod config;
pub mod probe;
