//! Driving layer policies
//!
//! Simulated time is not free-running: it is always one time step of the
//! designated driving layer. The policy below owns a snapshot of that
//! layer's timeline plus a cursor into it; successive forward steps walk
//! the timeline and wrap from the last step back to the first (and the
//! other way round when stepping backwards).
//!
//! The snapshot is deliberate: matching during one animation step must see
//! a stable timeline even while imports land, so the policy re-adopts the
//! driving layer's timeline only at defined points (timebase change and
//! `on_layers_update`).

use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StratusError};
use crate::model::layer::Layer;

/// Index of the greatest entry of the ascending `timeline` at or before
/// `tstamp`.
fn nearest_past_index(timeline: &[DateTime<Utc>], tstamp: DateTime<Utc>) -> Option<usize> {
    timeline.partition_point(|&t| t <= tstamp).checked_sub(1)
}

/// Strategy translating tick/jump requests into a simulated time.
pub trait DrivingPolicy {
    /// Adopt `layer` as the driving layer (`None` or a non-dynamic layer
    /// clears the timebase). Returns whether the driving layer identity
    /// changed.
    fn set_driving_layer(&mut self, layer: Option<&Layer>) -> bool;

    /// React to a change of the layer stack: keep the current driving
    /// layer if it is still among `dynamic_layers` (re-adopting its
    /// possibly changed timeline), otherwise fall back to the first
    /// dynamic layer. Returns whether the driving layer identity changed.
    fn on_layers_update(&mut self, dynamic_layers: &[&Layer]) -> bool;

    /// Advance the cursor one step, wrapping at both ends, and return the
    /// new simulated time.
    fn compute_t_sim(&mut self, backwards: bool) -> Result<DateTime<Utc>>;

    /// Move the cursor to `index` and return the simulated time there.
    fn jump_to(&mut self, index: usize) -> Result<DateTime<Utc>>;

    /// Identity of the current driving layer.
    fn driving_layer_uuid(&self) -> Option<Uuid>;

    /// Adopted snapshot of the driving layer's time steps.
    fn timeline(&self) -> &[DateTime<Utc>];

    /// Cursor position in the snapshot.
    fn timeline_index(&self) -> usize;

    /// Current simulated time; `None` without a driving layer.
    fn t_sim(&self) -> Option<DateTime<Utc>>;
}

/// The default (and currently only) driving policy: cursor over the
/// driving layer's timeline with wrap-around stepping.
#[derive(Debug, Default)]
pub struct WrappingDrivingPolicy {
    driving_layer_uuid: Option<Uuid>,
    timeline: Vec<DateTime<Utc>>,
    driving_idx: usize,
    curr_t_sim: Option<DateTime<Utc>>,
}

impl WrappingDrivingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear(&mut self) {
        self.driving_layer_uuid = None;
        self.timeline.clear();
        self.driving_idx = 0;
        self.curr_t_sim = None;
    }
}

impl DrivingPolicy for WrappingDrivingPolicy {
    fn set_driving_layer(&mut self, layer: Option<&Layer>) -> bool {
        let previous = self.driving_layer_uuid;
        match layer {
            Some(layer) if layer.is_dynamic() => {
                let timeline: Vec<DateTime<Utc>> = layer.timeline().times().collect();
                self.driving_idx = match (self.driving_layer_uuid, self.curr_t_sim) {
                    // Carry the cursor over to the new timebase: stay at
                    // the nearest past of the previous simulated time,
                    // else restart from the beginning.
                    (Some(_), Some(t_sim)) => nearest_past_index(&timeline, t_sim).unwrap_or(0),
                    _ => 0,
                };
                self.driving_layer_uuid = Some(layer.uuid);
                self.timeline = timeline;
                self.curr_t_sim = self.timeline.get(self.driving_idx).copied();
                debug!(
                    "driving layer now '{}', cursor at step {} of {}",
                    layer.descriptor,
                    self.driving_idx,
                    self.timeline.len()
                );
            }
            _ => self.clear(),
        }
        self.driving_layer_uuid != previous
    }

    fn on_layers_update(&mut self, dynamic_layers: &[&Layer]) -> bool {
        // Presence must be an explicit lookup: the driving layer sitting
        // at position 0 of the stack is still present.
        let current = self
            .driving_layer_uuid
            .and_then(|uuid| dynamic_layers.iter().find(|l| l.uuid == uuid).copied());

        match current {
            Some(layer) => {
                // Same timebase, possibly grown or shrunk timeline:
                // re-adopt it and keep the cursor on the previous
                // simulated time where possible.
                let timeline: Vec<DateTime<Utc>> = layer.timeline().times().collect();
                let idx = self
                    .curr_t_sim
                    .and_then(|t_sim| {
                        timeline
                            .iter()
                            .position(|&t| t == t_sim)
                            .or_else(|| nearest_past_index(&timeline, t_sim))
                    })
                    .unwrap_or(0);
                self.timeline = timeline;
                self.driving_idx = idx;
                self.curr_t_sim = self.timeline.get(idx).copied();
                false
            }
            None => {
                let next = dynamic_layers.first().copied();
                if next.is_none() {
                    info!("no suitable driving layer found");
                }
                self.set_driving_layer(next)
            }
        }
    }

    fn compute_t_sim(&mut self, backwards: bool) -> Result<DateTime<Utc>> {
        if self.timeline.is_empty() {
            return Err(StratusError::NoDrivingLayer);
        }
        let len = self.timeline.len();
        self.driving_idx = if backwards {
            (self.driving_idx + len - 1) % len
        } else {
            (self.driving_idx + 1) % len
        };
        let t_sim = self.timeline[self.driving_idx];
        self.curr_t_sim = Some(t_sim);
        Ok(t_sim)
    }

    fn jump_to(&mut self, index: usize) -> Result<DateTime<Utc>> {
        if self.timeline.is_empty() {
            return Err(StratusError::NoDrivingLayer);
        }
        // Validate before touching the cursor so a bad index leaves the
        // current position intact.
        let t_sim = *self
            .timeline
            .get(index)
            .ok_or(StratusError::InvalidIndex {
                index,
                timeline_len: self.timeline.len(),
            })?;
        self.driving_idx = index;
        self.curr_t_sim = Some(t_sim);
        Ok(t_sim)
    }

    fn driving_layer_uuid(&self) -> Option<Uuid> {
        self.driving_layer_uuid
    }

    fn timeline(&self) -> &[DateTime<Utc>] {
        &self.timeline
    }

    fn timeline_index(&self) -> usize {
        self.driving_idx
    }

    fn t_sim(&self) -> Option<DateTime<Utc>> {
        self.curr_t_sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metadata::{DatasetInfo, GroupingPolicy, Kind, ProductFamilyKeyPolicy};
    use chrono::TimeZone;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 15, hour, minute, 0).unwrap()
    }

    fn layer_with_steps(name: &str, steps: &[(u32, u32)]) -> Layer {
        let info = DatasetInfo::new("GOES-16", "ABI", name, Kind::Image, ts(0, 0));
        let key = ProductFamilyKeyPolicy.grouping_key(&info);
        let mut layer = Layer::from_info(&info, Kind::Image, key);
        for &(hour, minute) in steps {
            layer.add_dataset(Kind::Image, ts(hour, minute));
        }
        layer
    }

    fn hourly_layer() -> Layer {
        layer_with_steps("B02", &[(0, 0), (1, 0), (2, 0)])
    }

    // === Adoption ===

    #[test]
    fn test_adopting_a_layer_starts_at_first_step() {
        let mut policy = WrappingDrivingPolicy::new();
        let layer = hourly_layer();

        assert!(policy.set_driving_layer(Some(&layer)));
        assert_eq!(policy.driving_layer_uuid(), Some(layer.uuid));
        assert_eq!(policy.timeline_index(), 0);
        assert_eq!(policy.t_sim(), Some(ts(0, 0)));
    }

    #[test]
    fn test_non_dynamic_layer_clears_timebase() {
        let mut policy = WrappingDrivingPolicy::new();
        let layer = hourly_layer();
        policy.set_driving_layer(Some(&layer));

        let single = layer_with_steps("B03", &[(0, 0)]);
        assert!(policy.set_driving_layer(Some(&single)));
        assert_eq!(policy.driving_layer_uuid(), None);
        assert!(policy.t_sim().is_none());
        assert!(policy.timeline().is_empty());
    }

    #[test]
    fn test_clearing_twice_reports_no_change() {
        let mut policy = WrappingDrivingPolicy::new();
        assert!(!policy.set_driving_layer(None));
    }

    // === Stepping ===

    #[test]
    fn test_forward_steps_wrap_around() {
        let mut policy = WrappingDrivingPolicy::new();
        let layer = hourly_layer();
        policy.set_driving_layer(Some(&layer));

        assert_eq!(policy.compute_t_sim(false).unwrap(), ts(1, 0));
        assert_eq!(policy.compute_t_sim(false).unwrap(), ts(2, 0));
        // Off the end: wrap to the beginning
        assert_eq!(policy.compute_t_sim(false).unwrap(), ts(0, 0));
        assert_eq!(policy.timeline_index(), 0);
    }

    #[test]
    fn test_backward_step_from_start_wraps_to_end() {
        let mut policy = WrappingDrivingPolicy::new();
        let layer = hourly_layer();
        policy.set_driving_layer(Some(&layer));

        assert_eq!(policy.compute_t_sim(true).unwrap(), ts(2, 0));
        assert_eq!(policy.timeline_index(), 2);
        assert_eq!(policy.compute_t_sim(true).unwrap(), ts(1, 0));
    }

    #[test]
    fn test_stepping_without_driving_layer_fails() {
        let mut policy = WrappingDrivingPolicy::new();
        let err = policy.compute_t_sim(false).unwrap_err();
        assert_eq!(err.error_code(), "NO_DRIVING_LAYER");
        assert!(err.is_recoverable());
    }

    // === Jumping ===

    #[test]
    fn test_jump_moves_the_cursor() {
        let mut policy = WrappingDrivingPolicy::new();
        let layer = hourly_layer();
        policy.set_driving_layer(Some(&layer));

        assert_eq!(policy.jump_to(2).unwrap(), ts(2, 0));
        assert_eq!(policy.timeline_index(), 2);
        assert_eq!(policy.t_sim(), Some(ts(2, 0)));
    }

    #[test]
    fn test_invalid_jump_leaves_cursor_untouched() {
        let mut policy = WrappingDrivingPolicy::new();
        let layer = hourly_layer();
        policy.set_driving_layer(Some(&layer));
        policy.jump_to(1).unwrap();

        let err = policy.jump_to(7).unwrap_err();
        match err {
            StratusError::InvalidIndex { index, timeline_len } => {
                assert_eq!(index, 7);
                assert_eq!(timeline_len, 3);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(policy.timeline_index(), 1);
        assert_eq!(policy.t_sim(), Some(ts(1, 0)));
    }

    #[test]
    fn test_jump_without_driving_layer_fails() {
        let mut policy = WrappingDrivingPolicy::new();
        let err = policy.jump_to(0).unwrap_err();
        assert_eq!(err.error_code(), "NO_DRIVING_LAYER");
    }

    // === Timebase swaps ===

    #[test]
    fn test_swap_relocates_to_nearest_past() {
        let mut policy = WrappingDrivingPolicy::new();
        let hourly = hourly_layer();
        policy.set_driving_layer(Some(&hourly));
        policy.compute_t_sim(false).unwrap();
        assert_eq!(policy.t_sim(), Some(ts(1, 0)));

        // The quarter-hourly timeline has no 1:00 step in its future half,
        // the nearest past of 1:00 is 0:45
        let quarter = layer_with_steps("B05", &[(0, 0), (0, 15), (0, 30), (0, 45), (1, 30)]);
        assert!(policy.set_driving_layer(Some(&quarter)));
        assert_eq!(policy.t_sim(), Some(ts(0, 45)));
        assert_eq!(policy.timeline_index(), 3);
    }

    #[test]
    fn test_swap_to_later_timeline_restarts_at_first_step() {
        let mut policy = WrappingDrivingPolicy::new();
        let hourly = hourly_layer();
        policy.set_driving_layer(Some(&hourly));
        assert_eq!(policy.t_sim(), Some(ts(0, 0)));

        // Every step of the new timeline is in the future of t_sim
        let later = layer_with_steps("B07", &[(5, 0), (6, 0)]);
        policy.set_driving_layer(Some(&later));
        assert_eq!(policy.timeline_index(), 0);
        assert_eq!(policy.t_sim(), Some(ts(5, 0)));
    }

    // === Layer stack updates ===

    #[test]
    fn test_update_keeps_driving_layer_at_position_zero() {
        let mut policy = WrappingDrivingPolicy::new();
        let hourly = hourly_layer();
        policy.set_driving_layer(Some(&hourly));
        policy.compute_t_sim(false).unwrap();

        // Driving layer first in the stack: still present, nothing changes
        let other = layer_with_steps("B05", &[(0, 0), (0, 30)]);
        let changed = policy.on_layers_update(&[&hourly, &other]);
        assert!(!changed);
        assert_eq!(policy.driving_layer_uuid(), Some(hourly.uuid));
        assert_eq!(policy.t_sim(), Some(ts(1, 0)));
    }

    #[test]
    fn test_update_adopts_grown_timeline() {
        let mut policy = WrappingDrivingPolicy::new();
        let mut hourly = hourly_layer();
        policy.set_driving_layer(Some(&hourly));
        policy.jump_to(2).unwrap();

        hourly.add_dataset(Kind::Image, ts(3, 0));
        let changed = policy.on_layers_update(&[&hourly]);
        assert!(!changed);
        assert_eq!(policy.timeline().len(), 4);
        // Cursor still on the same simulated time
        assert_eq!(policy.t_sim(), Some(ts(2, 0)));
        assert_eq!(policy.timeline_index(), 2);
    }

    #[test]
    fn test_update_relocates_when_current_step_vanished() {
        let mut policy = WrappingDrivingPolicy::new();
        let layer = layer_with_steps("B02", &[(0, 0), (1, 0), (2, 0), (3, 0)]);
        policy.set_driving_layer(Some(&layer));
        policy.jump_to(2).unwrap();

        let mut shrunk = layer_with_steps("B02", &[(0, 0), (1, 0), (3, 0)]);
        shrunk.uuid = layer.uuid;
        policy.on_layers_update(&[&shrunk]);
        // 2:00 is gone, the nearest past is 1:00
        assert_eq!(policy.t_sim(), Some(ts(1, 0)));
        assert_eq!(policy.timeline_index(), 1);
    }

    #[test]
    fn test_update_reselects_when_driving_layer_vanished() {
        let mut policy = WrappingDrivingPolicy::new();
        let hourly = hourly_layer();
        policy.set_driving_layer(Some(&hourly));

        let replacement = layer_with_steps("B05", &[(0, 0), (0, 30)]);
        let changed = policy.on_layers_update(&[&replacement]);
        assert!(changed);
        assert_eq!(policy.driving_layer_uuid(), Some(replacement.uuid));
        assert_eq!(policy.timeline_index(), 0);
    }

    #[test]
    fn test_update_with_no_dynamic_layers_clears() {
        let mut policy = WrappingDrivingPolicy::new();
        let hourly = hourly_layer();
        policy.set_driving_layer(Some(&hourly));

        let changed = policy.on_layers_update(&[]);
        assert!(changed);
        assert_eq!(policy.driving_layer_uuid(), None);
        assert!(policy.t_sim().is_none());
    }
}
