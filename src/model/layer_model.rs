//! The layer model
//!
//! Owns the flat, ordered layer stack and everything that mutates it:
//! grouping of imported datasets into layers, derived-timeline upkeep for
//! recipe layers, activation bookkeeping for the time manager and
//! presentation changes fanned out per dataset.
//!
//! Derived timelines are kept consistent by a remove/update/add diff
//! against the intersection of the input layers' timelines. Any mutation
//! of a layer's timeline re-runs that diff for every recipe layer that
//! takes the mutated layer as input; the recursion stops at passes that
//! change nothing. Recipe updates that would close a dependency cycle
//! are rejected up front, since a cycle of algebraic layers would mint
//! fresh dataset identities on every pass and never settle.

use std::collections::BTreeSet;
use std::sync::mpsc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, StratusError};
use crate::event::{ActivationMap, EventHub, ModelEvent};

use super::dataset::ProductDataset;
use super::layer::Layer;
use super::metadata::{
    DatasetInfo, GroupingPolicy, Kind, ProductFamilyKeyPolicy, BORDERS_DATASET_NAME,
    LATLON_GRID_DATASET_NAME,
};
use super::presentation::{ColorLimits, Gamma};
use super::recipe::{AlgebraicRecipe, CompositeRecipe, Recipe, RECIPE_CHANNELS};

/// Narrow interface to the external content workspace.
///
/// The model never touches pixel data; point probing asks the workspace
/// for the value of one dataset at one map position through this trait.
pub trait ContentSource {
    /// Value of the dataset at the given (x, y) position, if the position
    /// falls inside the dataset's extent.
    fn content_point(&self, dataset_uuid: Uuid, xy_pos: (f64, f64)) -> Option<f64>;
}

/// Diff of a derived layer's timeline against its inputs' common timeline.
#[derive(Debug, Default)]
struct TimelinePlan {
    to_remove: Vec<DateTime<Utc>>,
    to_update: Vec<(DateTime<Utc>, [Option<Uuid>; RECIPE_CHANNELS])>,
    to_add: Vec<(DateTime<Utc>, [Option<Uuid>; RECIPE_CHANNELS])>,
}

impl TimelinePlan {
    fn is_noop(&self) -> bool {
        self.to_remove.is_empty() && self.to_update.is_empty() && self.to_add.is_empty()
    }
}

/// The document core: ordered layer stack, grouping policy and event hub.
pub struct LayerModel {
    layers: Vec<Layer>,
    grouping_policy: Box<dyn GroupingPolicy>,
    events: EventHub,
}

impl Default for LayerModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerModel {
    /// Create an empty model with the default product-family grouping.
    pub fn new() -> Self {
        Self::with_policy(Box::new(ProductFamilyKeyPolicy))
    }

    /// Create an empty model with a custom grouping policy.
    pub fn with_policy(grouping_policy: Box<dyn GroupingPolicy>) -> Self {
        Self {
            layers: Vec::new(),
            grouping_policy,
            events: EventHub::new(),
        }
    }

    /// Register a new event subscriber.
    pub fn subscribe(&mut self) -> mpsc::Receiver<ModelEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&mut self, event: ModelEvent) {
        self.events.publish(event);
    }

    /// Create the layers whose existence is controlled by the system, not
    /// by the user: the latitude/longitude grid and the political borders.
    pub fn init_system_layers(&mut self) {
        for dataset_name in [LATLON_GRID_DATASET_NAME, BORDERS_DATASET_NAME] {
            let row = self.insert_layer(Layer::system(dataset_name));
            debug!(
                "installed system layer '{}' as {}",
                dataset_name, self.layers[row].uuid
            );
        }
    }

    // === Import path ===

    /// Import one dataset.
    ///
    /// The grouping policy resolves (or requires creation of) the owning
    /// layer; the dataset is inserted into that layer's timeline, replacing
    /// any previous entry at the same time step. Returns the new dataset's
    /// uuid. Recipe layers fed by the touched layer are updated afterwards.
    pub fn add_dataset(&mut self, info: &DatasetInfo) -> Uuid {
        let key = self.grouping_policy.grouping_key(info);
        let layer_kind = self.grouping_policy.layer_kind(info);

        let idx = match self
            .layers
            .iter()
            .position(|layer| layer.grouping_key.as_ref() == Some(&key))
        {
            Some(idx) => idx,
            None => self.insert_layer(Layer::from_info(info, layer_kind, key)),
        };
        let layer_uuid = self.layers[idx].uuid;

        let (dataset_uuid, replaced) = self.layers[idx].add_dataset(info.kind, info.sched_time);
        if let Some(old) = replaced {
            debug!(
                "dataset at known time step {} replaced in '{}'",
                info.sched_time, self.layers[idx].descriptor
            );
            self.events.publish(ModelEvent::DatasetRemoved {
                layer_uuid,
                dataset_uuid: old.uuid,
            });
        }
        self.events.publish(ModelEvent::DatasetAdded {
            layer_uuid,
            dataset_uuid,
            kind: info.kind,
            sched_time: info.sched_time,
        });

        // Static layers show their frame right away; dynamic layers wait
        // for the time manager to activate a matching frame.
        if !self.layers[idx].is_dynamic() {
            self.activate_dataset_at(idx, info.sched_time);
        }

        self.events.publish(ModelEvent::LayersUpdated);
        self.update_dependent_timelines(layer_uuid);
        dataset_uuid
    }

    fn activate_dataset_at(&mut self, idx: usize, sched_time: DateTime<Utc>) {
        let mut activated = None;
        if let Some(dataset) = self.layers[idx].timeline_mut().get_mut(&sched_time) {
            if !dataset.is_active {
                dataset.is_active = true;
                activated = Some(dataset.uuid);
            }
        }
        if let Some(dataset_uuid) = activated {
            self.events.publish(ModelEvent::DatasetActivationChanged {
                dataset_uuid,
                is_active: true,
            });
        }
    }

    /// Remove the dataset at `sched_time` from the given layer.
    ///
    /// Removing a time step the layer does not have is a no-op.
    pub fn remove_dataset(&mut self, layer_uuid: Uuid, sched_time: DateTime<Utc>) -> Result<()> {
        let idx = self.layer_index(layer_uuid)?;
        if let Some(old) = self.layers[idx].timeline_mut().remove(&sched_time) {
            self.events.publish(ModelEvent::DatasetRemoved {
                layer_uuid,
                dataset_uuid: old.uuid,
            });
            self.events.publish(ModelEvent::LayersUpdated);
            self.update_dependent_timelines(layer_uuid);
        }
        Ok(())
    }

    /// Remove the given datasets wherever they live in the layer stack.
    ///
    /// Unknown uuids are skipped. Recipe layers fed by the touched layers
    /// are updated once all removals are done.
    pub fn purge_datasets(&mut self, dataset_uuids: &[Uuid]) {
        let mut touched: Vec<Uuid> = Vec::new();
        for &dataset_uuid in dataset_uuids {
            let found = self.layers.iter().find_map(|layer| {
                layer
                    .timeline()
                    .get_by_uuid(dataset_uuid)
                    .map(|d| (layer.uuid, d.sched_time))
            });
            let Some((layer_uuid, sched_time)) = found else {
                debug!("no dataset {} to purge", dataset_uuid);
                continue;
            };
            if let Ok(idx) = self.layer_index(layer_uuid) {
                if self.layers[idx].timeline_mut().remove(&sched_time).is_some() {
                    self.events.publish(ModelEvent::DatasetRemoved {
                        layer_uuid,
                        dataset_uuid,
                    });
                    if !touched.contains(&layer_uuid) {
                        touched.push(layer_uuid);
                    }
                }
            }
        }
        if touched.is_empty() {
            return;
        }
        self.events.publish(ModelEvent::LayersUpdated);
        for layer_uuid in touched {
            self.update_dependent_timelines(layer_uuid);
        }
    }

    // === Recipe layers ===

    /// Create a layer deriving an RGB composite from up to three input
    /// layers and materialize its timeline.
    pub fn create_rgb_composite_layer(&mut self, recipe: CompositeRecipe) -> Uuid {
        let row = self.insert_layer(Layer::for_recipe(Recipe::Rgb(recipe)));
        let layer_uuid = self.layers[row].uuid;
        if let Err(err) = self.recompute_derived_timeline(layer_uuid) {
            warn!("initial composite timeline update failed: {}", err);
        }
        layer_uuid
    }

    /// Create a layer deriving a single band by formula from up to three
    /// input layers and materialize its timeline.
    pub fn create_algebraic_layer(&mut self, recipe: AlgebraicRecipe) -> Uuid {
        let row = self.insert_layer(Layer::for_recipe(Recipe::Algebraic(recipe)));
        let layer_uuid = self.layers[row].uuid;
        if let Err(err) = self.recompute_derived_timeline(layer_uuid) {
            warn!("initial algebraic timeline update failed: {}", err);
        }
        layer_uuid
    }

    /// Replace the recipe of the layer holding `recipe.id()` and bring its
    /// timeline (and display settings, for RGB recipes) up to date.
    ///
    /// An input assignment that would feed the layer back into itself,
    /// directly or through other recipe layers, is rejected with
    /// `CyclicRecipe` and leaves the layer untouched.
    pub fn update_recipe(&mut self, recipe: Recipe) -> Result<Uuid> {
        let recipe_id = recipe.id();
        let Some(idx) = self
            .layers
            .iter()
            .position(|l| l.recipe.as_ref().is_some_and(|r| r.id() == recipe_id))
        else {
            return Err(StratusError::RecipeNotFound { recipe_id });
        };
        let layer_uuid = self.layers[idx].uuid;
        if self.recipe_feeds_itself(layer_uuid, &recipe) {
            return Err(StratusError::CyclicRecipe { layer_uuid });
        }
        self.layers[idx].descriptor = recipe.name().to_string();

        if let Recipe::Rgb(composite) = &recipe {
            let climits = ColorLimits::PerChannel(composite.color_limits);
            let gamma = Gamma::PerChannel(composite.gammas);
            self.layers[idx].recipe = Some(recipe.clone());
            self.change_color_limits(layer_uuid, climits)?;
            self.change_gamma(layer_uuid, gamma)?;
        } else {
            self.layers[idx].recipe = Some(recipe);
        }

        self.recompute_derived_timeline(layer_uuid)?;
        Ok(layer_uuid)
    }

    // === Derived timeline upkeep ===

    /// Diff a recipe layer's timeline against the common timeline of its
    /// inputs. Pure computation; application happens separately.
    fn plan_derived_timeline(&self, layer_uuid: Uuid) -> Result<TimelinePlan> {
        let layer = self
            .get_layer(layer_uuid)
            .ok_or(StratusError::LayerNotFound { uuid: layer_uuid })?;
        let recipe = layer
            .recipe
            .as_ref()
            .ok_or(StratusError::NotARecipeLayer { layer_uuid })?;

        let channel_layers: Vec<Option<&Layer>> = recipe
            .input_layer_ids()
            .iter()
            .map(|id| id.and_then(|uuid| self.get_layer(uuid)))
            .collect();

        // Common timeline: intersection over the declared inputs. A recipe
        // with no declared inputs, or declaring a layer the model no longer
        // has, yields an empty derived timeline.
        let mut common: Option<BTreeSet<DateTime<Utc>>> = None;
        let mut declared_missing = false;
        for (channel_id, channel_layer) in recipe.input_layer_ids().iter().zip(&channel_layers) {
            if channel_id.is_none() {
                continue;
            }
            match channel_layer {
                Some(input) => {
                    let times: BTreeSet<DateTime<Utc>> = input.timeline().times().collect();
                    common = Some(match common {
                        None => times,
                        Some(acc) => acc.intersection(&times).copied().collect(),
                    });
                }
                None => declared_missing = true,
            }
        }
        let common = if declared_missing {
            BTreeSet::new()
        } else {
            common.unwrap_or_default()
        };

        let force_update = matches!(recipe, Recipe::Algebraic(r) if r.modified);

        let mut plan = TimelinePlan::default();
        for t in layer.timeline().times() {
            if !common.contains(&t) {
                plan.to_remove.push(t);
            }
        }
        for &t in &common {
            match Self::derived_inputs_at(&channel_layers, t) {
                Ok(inputs) => match layer.timeline().get(&t) {
                    Some(dataset) => {
                        if force_update || dataset.input_dataset_uuids.as_ref() != Some(&inputs) {
                            plan.to_update.push((t, inputs));
                        }
                    }
                    None => plan.to_add.push((t, inputs)),
                },
                Err(err) => {
                    warn!("dropping time step from '{}': {}", layer.descriptor, err);
                    if layer.timeline().get(&t).is_some() {
                        plan.to_remove.push(t);
                    }
                }
            }
        }
        Ok(plan)
    }

    /// Per-channel input dataset assignment at one time step. Fails when a
    /// declared input layer has no dataset there; the caller drops the
    /// time step in response.
    fn derived_inputs_at(
        channel_layers: &[Option<&Layer>],
        sched_time: DateTime<Utc>,
    ) -> Result<[Option<Uuid>; RECIPE_CHANNELS]> {
        let mut inputs = [None; RECIPE_CHANNELS];
        for (slot, channel_layer) in inputs.iter_mut().zip(channel_layers) {
            if let Some(input) = channel_layer {
                let dataset_uuid = input.timeline().get(&sched_time).map(|d| d.uuid).ok_or(
                    StratusError::IncompleteComposite {
                        sched_time,
                        reason: format!(
                            "input layer '{}' has no dataset at this time step",
                            input.descriptor
                        ),
                    },
                )?;
                *slot = Some(dataset_uuid);
            }
        }
        Ok(inputs)
    }

    /// Bring one recipe layer's timeline in line with its inputs, then
    /// cascade into recipe layers that depend on it if anything changed.
    fn recompute_derived_timeline(&mut self, layer_uuid: Uuid) -> Result<()> {
        let plan = self.plan_derived_timeline(layer_uuid)?;
        let idx = self.layer_index(layer_uuid)?;
        let kind = self.layers[idx].kind;
        let changed = !plan.is_noop();

        for t in &plan.to_remove {
            self.remove_derived_dataset(idx, *t);
        }

        for (t, inputs) in &plan.to_update {
            match kind {
                // RGB datasets are rewritten in place, keeping identity
                Kind::Rgb => {
                    let mut changed_dataset = None;
                    if let Some(dataset) = self.layers[idx].timeline_mut().get_mut(t) {
                        if dataset.update_inputs(*inputs) {
                            changed_dataset = Some(dataset.uuid);
                        }
                    }
                    if let Some(dataset_uuid) = changed_dataset {
                        self.events.publish(ModelEvent::CompositeDatasetChanged {
                            layer_uuid,
                            dataset_uuid,
                        });
                    }
                }
                // Algebraic datasets are recomputed, so they change identity
                _ => {
                    self.remove_derived_dataset(idx, *t);
                    self.insert_derived_dataset(idx, kind, *t, *inputs);
                }
            }
        }

        for (t, inputs) in &plan.to_add {
            self.insert_derived_dataset(idx, kind, *t, *inputs);
        }

        if let Some(Recipe::Algebraic(recipe)) = self.layers[idx].recipe.as_mut() {
            recipe.modified = false;
        }

        if changed {
            self.events.publish(ModelEvent::LayersUpdated);
            self.update_dependent_timelines(layer_uuid);
        }
        Ok(())
    }

    fn remove_derived_dataset(&mut self, idx: usize, sched_time: DateTime<Utc>) {
        let layer_uuid = self.layers[idx].uuid;
        if let Some(old) = self.layers[idx].timeline_mut().remove(&sched_time) {
            self.events.publish(ModelEvent::DatasetRemoved {
                layer_uuid,
                dataset_uuid: old.uuid,
            });
        }
    }

    fn insert_derived_dataset(
        &mut self,
        idx: usize,
        kind: Kind,
        sched_time: DateTime<Utc>,
        inputs: [Option<Uuid>; RECIPE_CHANNELS],
    ) {
        let layer_uuid = self.layers[idx].uuid;
        let dataset = ProductDataset::new_derived(layer_uuid, kind, sched_time, inputs);
        let dataset_uuid = dataset.uuid;
        self.layers[idx].timeline_mut().insert(dataset);
        self.events.publish(ModelEvent::DatasetAdded {
            layer_uuid,
            dataset_uuid,
            kind,
            sched_time,
        });
    }

    /// Re-run the derived-timeline diff for every recipe layer fed by the
    /// changed layer.
    fn update_dependent_timelines(&mut self, changed_layer_uuid: Uuid) {
        let dependents: Vec<Uuid> = self
            .layers
            .iter()
            .filter(|l| l.uuid != changed_layer_uuid)
            .filter(|l| {
                l.recipe
                    .as_ref()
                    .is_some_and(|r| r.depends_on(changed_layer_uuid))
            })
            .map(|l| l.uuid)
            .collect();
        for dependent in dependents {
            if let Err(err) = self.recompute_derived_timeline(dependent) {
                warn!(
                    "derived layer update after change to {} failed: {}",
                    changed_layer_uuid, err
                );
            }
        }
    }

    // === Activation ===

    /// Apply one activation mapping.
    ///
    /// For every listed layer exactly the listed datasets become active and
    /// all its other datasets inactive. Per-dataset events are emitted only
    /// for actual flips, so re-applying the same mapping is observationally
    /// a no-op apart from the final `ActivationsApplied`.
    pub fn apply_activation(&mut self, activations: &ActivationMap) {
        let mut flips: Vec<(Uuid, bool)> = Vec::new();
        for (layer_uuid, active_uuids) in activations {
            let Some(layer) = self.layers.iter_mut().find(|l| l.uuid == *layer_uuid) else {
                debug!("activation for unknown layer {}", layer_uuid);
                continue;
            };
            for dataset in layer.timeline_mut().datasets_mut() {
                let should_be_active = active_uuids.contains(&dataset.uuid);
                if dataset.is_active != should_be_active {
                    dataset.is_active = should_be_active;
                    flips.push((dataset.uuid, should_be_active));
                }
            }
        }
        for (dataset_uuid, is_active) in flips {
            self.events.publish(ModelEvent::DatasetActivationChanged {
                dataset_uuid,
                is_active,
            });
        }
        self.events.publish(ModelEvent::ActivationsApplied {
            activations: activations.clone(),
        });
    }

    // === Presentation ===

    /// Change the colormap of a layer family; every dataset of the layer is
    /// restyled at once.
    pub fn change_colormap(&mut self, layer_uuid: Uuid, colormap: Option<String>) -> Result<()> {
        let idx = self.layer_index(layer_uuid)?;
        self.layers[idx].presentation.colormap = colormap.clone();
        let changes = self.layers[idx]
            .dataset_uuids()
            .into_iter()
            .map(|uuid| (uuid, colormap.clone()))
            .collect();
        self.events.publish(ModelEvent::ColormapChanged { changes });
        Ok(())
    }

    /// Change the color limits of a layer family.
    pub fn change_color_limits(&mut self, layer_uuid: Uuid, climits: ColorLimits) -> Result<()> {
        let idx = self.layer_index(layer_uuid)?;
        self.layers[idx].presentation.climits = climits.clone();
        let changes = self.layers[idx]
            .dataset_uuids()
            .into_iter()
            .map(|uuid| (uuid, climits.clone()))
            .collect();
        self.events.publish(ModelEvent::ColorLimitsChanged { changes });
        Ok(())
    }

    /// Change the gamma of a layer family.
    pub fn change_gamma(&mut self, layer_uuid: Uuid, gamma: Gamma) -> Result<()> {
        let idx = self.layer_index(layer_uuid)?;
        self.layers[idx].presentation.gamma = gamma.clone();
        let changes = self.layers[idx]
            .dataset_uuids()
            .into_iter()
            .map(|uuid| (uuid, gamma.clone()))
            .collect();
        self.events.publish(ModelEvent::GammaChanged { changes });
        Ok(())
    }

    /// Show or hide a layer.
    pub fn set_layer_visible(&mut self, layer_uuid: Uuid, visible: bool) -> Result<()> {
        let idx = self.layer_index(layer_uuid)?;
        self.layers[idx].presentation.visible = visible;
        self.events
            .publish(ModelEvent::LayerVisibilityChanged { layer_uuid, visible });
        Ok(())
    }

    /// Change a layer's blend opacity; values are clamped to `[0.0, 1.0]`.
    pub fn set_layer_opacity(&mut self, layer_uuid: Uuid, opacity: f32) -> Result<()> {
        let idx = self.layer_index(layer_uuid)?;
        let opacity = opacity.clamp(0.0, 1.0);
        self.layers[idx].presentation.opacity = opacity;
        self.events
            .publish(ModelEvent::LayerOpacityChanged { layer_uuid, opacity });
        Ok(())
    }

    // === Probing ===

    /// Read the value under a point probe off every probeable layer's
    /// active dataset.
    pub fn set_point_probe(&mut self, source: &dyn ContentSource, xy_pos: (f64, f64)) {
        for layer in self.layers.iter_mut().filter(|l| l.is_probeable()) {
            let active = layer.first_active_dataset().map(|d| d.uuid);
            layer.probe_value = active.and_then(|uuid| source.content_point(uuid, xy_pos));
        }
    }

    /// Clear the point probe; probe values reset on every layer.
    pub fn clear_point_probe(&mut self) {
        for layer in self.layers.iter_mut().filter(|l| l.is_probeable()) {
            layer.probe_value = None;
        }
    }

    // === Queries ===

    /// Layer stack, top first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer uuids in stack order.
    pub fn layer_uuids(&self) -> Vec<Uuid> {
        self.layers.iter().map(|l| l.uuid).collect()
    }

    /// Layer by uuid.
    pub fn get_layer(&self, layer_uuid: Uuid) -> Option<&Layer> {
        self.layers.iter().find(|l| l.uuid == layer_uuid)
    }

    /// Layer owning the given recipe.
    pub fn get_layer_of_recipe(&self, recipe_id: Uuid) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| l.recipe.as_ref().is_some_and(|r| r.id() == recipe_id))
    }

    /// Dataset by uuid, wherever it lives in the stack.
    pub fn get_dataset(&self, dataset_uuid: Uuid) -> Option<&ProductDataset> {
        self.layers
            .iter()
            .find_map(|l| l.timeline().get_by_uuid(dataset_uuid))
    }

    /// Whether a layer should take part in time matching.
    ///
    /// A recipe layer also counts as dynamic while any of its present
    /// input layers is, covering the window before its own timeline is
    /// materialized.
    pub fn is_layer_dynamic(&self, layer: &Layer) -> bool {
        if layer.is_system() {
            return false;
        }
        if layer.is_dynamic() {
            return true;
        }
        layer.recipe.as_ref().is_some_and(|recipe| {
            recipe
                .declared_inputs()
                .filter_map(|uuid| self.get_layer(uuid))
                .any(|input| input.is_dynamic())
        })
    }

    /// Layers participating in time matching, in stack order.
    pub fn get_dynamic_layers(&self) -> Vec<&Layer> {
        self.layers
            .iter()
            .filter(|l| self.is_layer_dynamic(l))
            .collect()
    }

    /// Layers a point probe can read values off, in stack order.
    pub fn get_probeable_layers(&self) -> Vec<&Layer> {
        self.layers.iter().filter(|l| l.is_probeable()).collect()
    }

    /// Topmost probeable layer together with its active dataset, if any.
    pub fn top_probeable_layer_with_active_dataset(
        &self,
    ) -> Option<(&Layer, Option<&ProductDataset>)> {
        self.layers
            .iter()
            .find(|l| l.is_probeable())
            .map(|l| (l, l.first_active_dataset()))
    }

    /// The dynamic layer with the smallest mean gap between consecutive
    /// time steps; the preferred automatic timebase. Ties keep the layer
    /// higher in the stack.
    pub fn most_frequent_dynamic_layer(&self) -> Option<&Layer> {
        let mut best: Option<(&Layer, f64)> = None;
        for layer in self.layers.iter().filter(|l| self.is_layer_dynamic(l)) {
            let times: Vec<DateTime<Utc>> = layer.timeline().times().collect();
            if times.len() < 2 {
                continue;
            }
            let total: f64 = times
                .windows(2)
                .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 1000.0)
                .sum();
            let mean_gap = total / (times.len() - 1) as f64;
            if best.map_or(true, |(_, gap)| mean_gap < gap) {
                best = Some((layer, mean_gap));
            }
        }
        best.map(|(layer, _)| layer)
    }

    // === Internals ===

    /// Whether attaching `recipe` to the layer would make the layer an
    /// input of itself through a chain of recipe layers. Only recipe
    /// updates can close such a chain: a freshly created layer cannot
    /// already be anyone's input.
    fn recipe_feeds_itself(&self, layer_uuid: Uuid, recipe: &Recipe) -> bool {
        let mut pending: Vec<Uuid> = recipe.declared_inputs().collect();
        let mut visited: Vec<Uuid> = Vec::new();
        while let Some(input) = pending.pop() {
            if input == layer_uuid {
                return true;
            }
            if visited.contains(&input) {
                continue;
            }
            visited.push(input);
            if let Some(recipe) = self.get_layer(input).and_then(|l| l.recipe.as_ref()) {
                pending.extend(recipe.declared_inputs());
            }
        }
        false
    }

    fn layer_index(&self, layer_uuid: Uuid) -> Result<usize> {
        self.layers
            .iter()
            .position(|l| l.uuid == layer_uuid)
            .ok_or(StratusError::LayerNotFound { uuid: layer_uuid })
    }

    /// Insert a layer at its stack position and return the row it landed
    /// in: `Lines`/`Points` layers go on top, every other kind in front of
    /// the first non-favoured layer.
    fn insert_layer(&mut self, layer: Layer) -> usize {
        fn favoured(kind: Kind) -> bool {
            matches!(kind, Kind::Lines | Kind::Points)
        }

        let row = if favoured(layer.kind) {
            0
        } else {
            self.layers
                .iter()
                .position(|l| !favoured(l.kind))
                .unwrap_or(self.layers.len())
        };

        self.events.publish(ModelEvent::LayerCreated {
            layer_uuid: layer.uuid,
            descriptor: layer.descriptor.clone(),
            kind: layer.kind,
        });
        self.layers.insert(row, layer);
        self.events.publish(ModelEvent::LayersReordered {
            layer_uuids: self.layer_uuids(),
        });
        row
    }
}
