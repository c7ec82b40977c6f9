//! Time Synchronization Module
//!
//! Everything that turns wall-clock-independent product timelines into a
//! coherent animation: the driving-layer cursor over simulated time,
//! timestamp matching policies and the manager that orchestrates one
//! synchronization cycle against the layer model.

pub mod driving;
pub mod manager;
pub mod matcher;
pub mod transformer;

pub use driving::{DrivingPolicy, WrappingDrivingPolicy};
pub use manager::TimeManager;
pub use matcher::{MatchPolicy, NearestPastPolicy, NearestPolicy, TimeMatcher};
pub use transformer::TimeTransformer;
