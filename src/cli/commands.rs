//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use log::{info, warn};
use walkdir::WalkDir;

use crate::cli::catalog::Catalog;
use crate::cli::{MatcherArg, TimebaseArg};
use crate::error::{Result, StratusError};
use crate::event::ModelEvent;
use crate::model::LayerModel;
use crate::time::{NearestPolicy, TimeManager, TimeMatcher, TimeTransformer};

/// Load a catalog and print the resulting layer stack.
pub fn inspect(catalog_path: &Path) -> Result<()> {
    info!("Inspecting catalog: {}", catalog_path.display());

    let catalog = Catalog::load(catalog_path)?;
    let mut model = LayerModel::new();
    model.init_system_layers();
    catalog.load_into(&mut model)?;

    println!("Layer stack ({} layers, top first):", model.layers().len());
    for (index, layer) in model.layers().iter().enumerate() {
        let timeline = layer.timeline();
        let span = match (timeline.first_time(), timeline.last_time()) {
            (Some(first), Some(last)) => format!(
                "{} .. {}",
                first.format("%Y-%m-%d %H:%M:%S"),
                last.format("%Y-%m-%d %H:%M:%S")
            ),
            _ => "empty".to_string(),
        };
        println!(
            "  {:>2} [{:^9}] {:<32} {:>3} steps  {}{}",
            index,
            layer.kind.to_string(),
            layer.descriptor,
            timeline.len(),
            span,
            if model.is_layer_dynamic(layer) {
                "  (dynamic)"
            } else {
                ""
            },
        );
    }

    if let Some(layer) = model.most_frequent_dynamic_layer() {
        println!("Densest timeline: {}", layer.descriptor);
    }

    Ok(())
}

/// Load a catalog, choose a timebase and run an animation, printing the
/// frame assignment published after every step.
pub fn play(
    catalog_path: &Path,
    steps: usize,
    backwards: bool,
    timebase: Option<&TimebaseArg>,
    matcher: MatcherArg,
) -> Result<()> {
    info!("Playing catalog: {}", catalog_path.display());

    let catalog = Catalog::load(catalog_path)?;
    let mut model = LayerModel::new();
    model.init_system_layers();
    let events = model.subscribe();
    catalog.load_into(&mut model)?;

    let matcher = match matcher {
        MatcherArg::NearestPast => TimeMatcher::new(),
        MatcherArg::Nearest => TimeMatcher::with_policy(Box::new(NearestPolicy)),
    };
    let mut manager = TimeManager::with_parts(TimeTransformer::new(), matcher);

    match timebase {
        None => manager.on_layers_update(&mut model),
        Some(TimebaseArg::MostFrequent) => {
            let layer_uuid = model.most_frequent_dynamic_layer().map(|l| l.uuid);
            manager.change_timebase(&mut model, layer_uuid);
        }
        Some(TimebaseArg::Index(index)) => {
            let dynamic: Vec<_> = model.get_dynamic_layers().iter().map(|l| l.uuid).collect();
            let layer_uuid =
                dynamic
                    .get(*index)
                    .copied()
                    .ok_or(StratusError::InvalidIndex {
                        index: *index,
                        timeline_len: dynamic.len(),
                    })?;
            manager.change_timebase(&mut model, Some(layer_uuid));
        }
    }

    let driving = manager
        .driving_layer_uuid()
        .and_then(|uuid| model.get_layer(uuid))
        .map(|layer| layer.descriptor.clone());
    match driving {
        Some(descriptor) => println!(
            "Timebase: {} ({} time steps)",
            descriptor,
            manager.timeline().len()
        ),
        None => println!("Timebase: none (no dynamic layer available)"),
    }

    // Import and timebase selection produced events of their own
    drain(&events);

    for step in 1..=steps {
        manager.step(&mut model, backwards);
        println!(
            "step {:>3}: {} [index {}]",
            step,
            manager.formatted_t_sim(),
            manager.timeline_index()
        );
        print_frame_assignment(&model, &drain(&events));
    }

    Ok(())
}

/// Walk a directory tree collecting catalog files into one merged catalog
/// on stdout.
pub fn scan(dir: &Path) -> Result<()> {
    info!("Scanning for catalog files under: {}", dir.display());

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .map(|entry| entry.path().to_path_buf())
        .collect();
    paths.sort();

    let mut merged = Catalog::default();
    let mut merged_count = 0usize;
    for path in &paths {
        match Catalog::load(path) {
            Ok(catalog) => {
                merged.merge(catalog);
                merged_count += 1;
            }
            Err(err) => warn!("skipping {}: {}", path.display(), err),
        }
    }

    info!("merged {} of {} catalog files", merged_count, paths.len());
    println!("{}", serde_json::to_string_pretty(&merged)?);

    Ok(())
}

fn drain(rx: &mpsc::Receiver<ModelEvent>) -> Vec<ModelEvent> {
    rx.try_iter().collect()
}

/// Print the per-layer frame assignment carried by the activation events
/// of one step, in stack order.
fn print_frame_assignment(model: &LayerModel, events: &[ModelEvent]) {
    for event in events {
        let ModelEvent::ActivationsApplied { activations } = event else {
            continue;
        };
        let mut rows: Vec<(usize, String)> = Vec::new();
        for (layer_uuid, dataset_uuids) in activations {
            let Some(layer) = model.get_layer(*layer_uuid) else {
                continue;
            };
            let position = model
                .layers()
                .iter()
                .position(|l| l.uuid == *layer_uuid)
                .unwrap_or(usize::MAX);
            let frames: Vec<String> = dataset_uuids
                .iter()
                .filter_map(|uuid| layer.timeline().get_by_uuid(*uuid))
                .map(|dataset| dataset.sched_time.format("%H:%M:%S").to_string())
                .collect();
            let frames = if frames.is_empty() {
                "-".to_string()
            } else {
                frames.join(", ")
            };
            rows.push((position, format!("  {:<32} {}", layer.descriptor, frames)));
        }
        rows.sort();
        for (_, row) in rows {
            println!("{}", row);
        }
    }
}
