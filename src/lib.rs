//! Stratus - Satellite Imagery Metadata Core
//!
//! Stratus keeps the metadata state of a satellite imagery viewer
//! coherent over time: which datasets exist, which layer owns them, and
//! which of them are the visible frames at the current simulated time.
//!
//! # Architecture
//!
//! The system splits into two halves around an event stream:
//! - Layer model: layers keyed by product family, each owning a timeline
//!   of datasets; derived (RGB/algebraic) layers are kept in sync with
//!   their input layers by recipe cascades
//! - Time subsystem: a driving-layer cursor defines simulated time; each
//!   step matches every dynamic layer's timeline against it and publishes
//!   one atomic frame-activation mapping

pub mod cli;
pub mod error;
pub mod event;
pub mod model;
pub mod time;

pub use error::{Result, StratusError};
