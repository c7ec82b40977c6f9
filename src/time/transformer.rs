//! Translation of timebase interactions into simulated time
//!
//! `TimeTransformer` is a thin facade over a [`DrivingPolicy`]: it owns the
//! policy, forwards stepping and jumping to it and exposes the resulting
//! simulated time for display and matching.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::model::layer::Layer;
use crate::time::driving::{DrivingPolicy, WrappingDrivingPolicy};

pub struct TimeTransformer {
    translation_policy: Box<dyn DrivingPolicy>,
}

impl TimeTransformer {
    pub fn new() -> Self {
        Self::with_policy(Box::new(WrappingDrivingPolicy::new()))
    }

    pub fn with_policy(translation_policy: Box<dyn DrivingPolicy>) -> Self {
        Self { translation_policy }
    }

    /// Advance simulated time one step along the driving layer's timeline.
    pub fn step(&mut self, backwards: bool) -> Result<DateTime<Utc>> {
        self.translation_policy.compute_t_sim(backwards)
    }

    /// Jump simulated time to the given timeline index.
    pub fn jump(&mut self, index: usize) -> Result<DateTime<Utc>> {
        self.translation_policy.jump_to(index)
    }

    /// Make `layer` the timebase. Returns whether the driving layer
    /// identity changed.
    pub fn change_timebase(&mut self, layer: Option<&Layer>) -> bool {
        self.translation_policy.set_driving_layer(layer)
    }

    /// Propagate a layer stack change to the policy. Returns whether the
    /// driving layer identity changed.
    pub fn on_layers_update(&mut self, dynamic_layers: &[&Layer]) -> bool {
        self.translation_policy.on_layers_update(dynamic_layers)
    }

    pub fn t_sim(&self) -> Option<DateTime<Utc>> {
        self.translation_policy.t_sim()
    }

    pub fn timeline_index(&self) -> usize {
        self.translation_policy.timeline_index()
    }

    pub fn timeline(&self) -> &[DateTime<Utc>] {
        self.translation_policy.timeline()
    }

    pub fn driving_layer_uuid(&self) -> Option<Uuid> {
        self.translation_policy.driving_layer_uuid()
    }

    /// Simulated time formatted for display, `--:--:--` while no timebase
    /// is set.
    pub fn formatted_t_sim(&self) -> String {
        match self.t_sim() {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "--:--:--".to_string(),
        }
    }
}

impl Default for TimeTransformer {
    fn default() -> Self {
        Self::new()
    }
}
