//! Time Synchronization Tests
//!
//! End-to-end tests driving the layer model through the time manager the
//! way the surrounding application would: import datasets, pick a
//! timebase, animate, and observe the published events.

use std::sync::mpsc;

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use stratus::event::ModelEvent;
use stratus::model::{CompositeRecipe, DatasetInfo, Kind, LayerModel};
use stratus::time::TimeManager;

fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 15, hour, minute, 0).unwrap()
}

fn image_info(name: &str, hour: u32, minute: u32) -> DatasetInfo {
    DatasetInfo::new("GOES-16", "ABI", name, Kind::Image, ts(hour, minute))
}

fn layer_uuid_of(model: &LayerModel, name: &str) -> Uuid {
    model
        .layers()
        .iter()
        .find(|l| l.descriptor.ends_with(name))
        .map(|l| l.uuid)
        .unwrap()
}

/// Scheduled times of the currently active datasets of a layer.
fn active_times(model: &LayerModel, layer_uuid: Uuid) -> Vec<DateTime<Utc>> {
    model
        .get_layer(layer_uuid)
        .unwrap()
        .timeline()
        .iter()
        .filter(|(_, dataset)| dataset.is_active)
        .map(|(t, _)| *t)
        .collect()
}

fn drain(rx: &mpsc::Receiver<ModelEvent>) -> Vec<ModelEvent> {
    rx.try_iter().collect()
}

// === Matching scenarios ===

#[test]
fn test_hourly_driving_layer_against_offset_layer() {
    let mut model = LayerModel::new();
    for hour in 0..4 {
        model.add_dataset(&image_info("B02", hour, 0));
    }
    // X runs 15 minutes behind and ends early
    model.add_dataset(&image_info("B07", 0, 15));
    model.add_dataset(&image_info("B07", 1, 15));
    let b02 = layer_uuid_of(&model, "B02");
    let b07 = layer_uuid_of(&model, "B07");

    let mut manager = TimeManager::new();
    manager.change_timebase(&mut model, Some(b02));

    // At t_sim 0:00 nothing of B07 has happened yet
    assert_eq!(manager.t_sim(), Some(ts(0, 0)));
    assert!(active_times(&model, b07).is_empty());

    manager.step(&mut model, false);
    assert_eq!(manager.t_sim(), Some(ts(1, 0)));
    assert_eq!(active_times(&model, b02), vec![ts(1, 0)]);
    assert_eq!(active_times(&model, b07), vec![ts(0, 15)]);

    manager.step(&mut model, false);
    manager.step(&mut model, false);
    assert_eq!(manager.t_sim(), Some(ts(3, 0)));
    assert_eq!(active_times(&model, b02), vec![ts(3, 0)]);
    assert_eq!(active_times(&model, b07), vec![ts(1, 15)]);

    // One more step wraps the driving timeline back to its start
    manager.step(&mut model, false);
    assert_eq!(manager.t_sim(), Some(ts(0, 0)));
    assert_eq!(manager.timeline_index(), 0);
    assert!(active_times(&model, b07).is_empty());
}

#[test]
fn test_stepping_without_any_dynamic_layer_is_inert() {
    let mut model = LayerModel::new();
    model.init_system_layers();
    // A single-dataset layer never becomes dynamic
    model.add_dataset(&image_info("B02", 0, 0));
    let rx = model.subscribe();

    let mut manager = TimeManager::new();
    manager.on_layers_update(&mut model);
    assert_eq!(manager.driving_layer_uuid(), None);

    manager.step(&mut model, false);
    manager.step(&mut model, false);

    assert!(manager.t_sim().is_none());
    assert_eq!(manager.formatted_t_sim(), "--:--:--");
    let events = drain(&rx);
    // Nothing was ever active, so nothing flips
    assert!(!events
        .iter()
        .any(|e| matches!(e, ModelEvent::DatasetActivationChanged { .. })));
    assert!(events
        .iter()
        .all(|e| !matches!(e, ModelEvent::ActivationsApplied { activations }
            if activations.values().any(|frames| !frames.is_empty()))));
}

// === Timebase continuity ===

#[test]
fn test_timebase_swap_keeps_nearest_past_position() {
    let mut model = LayerModel::new();
    for hour in 0..4 {
        model.add_dataset(&image_info("B02", hour, 0));
    }
    for minute in [0, 15, 30, 45] {
        model.add_dataset(&image_info("B05", 0, minute));
    }
    model.add_dataset(&image_info("B05", 1, 30));
    let b02 = layer_uuid_of(&model, "B02");
    let b05 = layer_uuid_of(&model, "B05");

    let mut manager = TimeManager::new();
    manager.change_timebase(&mut model, Some(b02));
    manager.step(&mut model, false);
    assert_eq!(manager.t_sim(), Some(ts(1, 0)));

    // B05 has no step at 1:00; the cursor lands on its nearest past
    manager.change_timebase(&mut model, Some(b05));
    assert_eq!(manager.t_sim(), Some(ts(0, 45)));
    assert_eq!(manager.timeline_index(), 3);
    // And the synchronization pass reflects the relocated time
    assert_eq!(active_times(&model, b05), vec![ts(0, 45)]);
    assert_eq!(active_times(&model, b02), vec![ts(0, 0)]);
}

#[test]
fn test_timebase_swap_to_later_timeline_restarts() {
    let mut model = LayerModel::new();
    for hour in 0..2 {
        model.add_dataset(&image_info("B02", hour, 0));
    }
    for hour in 5..8 {
        model.add_dataset(&image_info("B13", hour, 0));
    }
    let b02 = layer_uuid_of(&model, "B02");
    let b13 = layer_uuid_of(&model, "B13");

    let mut manager = TimeManager::new();
    manager.change_timebase(&mut model, Some(b02));
    assert_eq!(manager.t_sim(), Some(ts(0, 0)));

    // Every B13 step lies in the future of t_sim, so playback restarts
    manager.change_timebase(&mut model, Some(b13));
    assert_eq!(manager.timeline_index(), 0);
    assert_eq!(manager.t_sim(), Some(ts(5, 0)));
}

// === Activation idempotence ===

#[test]
fn test_republishing_the_same_time_changes_nothing() {
    let mut model = LayerModel::new();
    for hour in 0..3 {
        model.add_dataset(&image_info("B02", hour, 0));
        model.add_dataset(&image_info("B03", hour, 0));
    }
    let b02 = layer_uuid_of(&model, "B02");

    let mut manager = TimeManager::new();
    manager.change_timebase(&mut model, Some(b02));
    let rx = model.subscribe();

    manager.step(&mut model, false);
    let first_pass = drain(&rx);
    let first_map = first_pass
        .iter()
        .find_map(|e| match e {
            ModelEvent::ActivationsApplied { activations } => Some(activations.clone()),
            _ => None,
        })
        .unwrap();

    // Jumping to the index we are already on republishes the same time
    manager.jump(&mut model, manager.timeline_index()).unwrap();
    let second_pass = drain(&rx);
    let second_map = second_pass
        .iter()
        .find_map(|e| match e {
            ModelEvent::ActivationsApplied { activations } => Some(activations.clone()),
            _ => None,
        })
        .unwrap();

    assert_eq!(first_map, second_map);
    assert!(!second_pass
        .iter()
        .any(|e| matches!(e, ModelEvent::DatasetActivationChanged { .. })));
}

#[test]
fn test_flips_are_delivered_before_the_applied_mapping() {
    let mut model = LayerModel::new();
    for hour in 0..3 {
        model.add_dataset(&image_info("B02", hour, 0));
    }
    let b02 = layer_uuid_of(&model, "B02");

    let mut manager = TimeManager::new();
    manager.change_timebase(&mut model, Some(b02));
    let rx = model.subscribe();

    manager.step(&mut model, false);
    let events = drain(&rx);

    let last_flip = events
        .iter()
        .rposition(|e| matches!(e, ModelEvent::DatasetActivationChanged { .. }))
        .unwrap();
    let applied = events
        .iter()
        .position(|e| matches!(e, ModelEvent::ActivationsApplied { .. }))
        .unwrap();
    let stepped = events
        .iter()
        .position(|e| matches!(e, ModelEvent::TimeStepped { .. }))
        .unwrap();
    assert!(last_flip < applied);
    assert!(applied < stepped);
}

// === Composite cascades during playback ===

#[test]
fn test_composite_layer_follows_its_inputs_through_playback() {
    let mut model = LayerModel::new();
    for hour in 0..3 {
        model.add_dataset(&image_info("B02", hour, 0));
    }
    for hour in 0..2 {
        model.add_dataset(&image_info("B03", hour, 0));
    }
    let b02 = layer_uuid_of(&model, "B02");
    let b03 = layer_uuid_of(&model, "B03");

    let rgb_uuid = model.create_rgb_composite_layer(CompositeRecipe::new(
        "True Color",
        Some(b02),
        Some(b03),
        None,
    ));
    // The derived timeline is the intersection of its inputs
    assert_eq!(
        model.get_layer(rgb_uuid).unwrap().timeline().len(),
        2,
        "composite must cover exactly the common time steps"
    );

    let mut manager = TimeManager::new();
    manager.change_timebase(&mut model, Some(b02));
    manager.step(&mut model, false);
    assert_eq!(active_times(&model, rgb_uuid), vec![ts(1, 0)]);

    // A new B03 frame extends the intersection while playing
    let rx = model.subscribe();
    model.add_dataset(&image_info("B03", 2, 0));
    manager.on_layers_update(&mut model);

    let rgb_times: Vec<_> = model
        .get_layer(rgb_uuid)
        .unwrap()
        .timeline()
        .times()
        .collect();
    assert_eq!(rgb_times, vec![ts(0, 0), ts(1, 0), ts(2, 0)]);
    let events = drain(&rx);
    assert!(events.iter().any(
        |e| matches!(e, ModelEvent::DatasetAdded { layer_uuid, .. } if *layer_uuid == rgb_uuid)
    ));

    manager.step(&mut model, false);
    assert_eq!(manager.t_sim(), Some(ts(2, 0)));
    assert_eq!(active_times(&model, rgb_uuid), vec![ts(2, 0)]);

    // Removing the input frame shrinks the composite again
    model.remove_dataset(b03, ts(2, 0)).unwrap();
    manager.on_layers_update(&mut model);

    let rgb_times: Vec<_> = model
        .get_layer(rgb_uuid)
        .unwrap()
        .timeline()
        .times()
        .collect();
    assert_eq!(rgb_times, vec![ts(0, 0), ts(1, 0)]);
    // t_sim is still 2:00, the composite falls back to its nearest past
    assert_eq!(active_times(&model, rgb_uuid), vec![ts(1, 0)]);
}
