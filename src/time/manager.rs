//! Time orchestration
//!
//! `TimeManager` runs the synchronization cycle: move simulated time
//! through the [`TimeTransformer`], then match every dynamic layer's
//! timeline against the new time and hand the resulting activation
//! mapping to the model in one atomic publish. Layers whose timeline has
//! no step at or before the simulated time get an empty mapping entry,
//! never an error.

use chrono::{DateTime, Utc};
use log::debug;
use uuid::Uuid;

use crate::error::{Result, StratusError};
use crate::event::{ActivationMap, ModelEvent};
use crate::model::LayerModel;
use crate::time::matcher::TimeMatcher;
use crate::time::transformer::TimeTransformer;

pub struct TimeManager {
    transformer: TimeTransformer,
    matcher: TimeMatcher,
}

impl TimeManager {
    pub fn new() -> Self {
        Self {
            transformer: TimeTransformer::new(),
            matcher: TimeMatcher::new(),
        }
    }

    /// Build a manager from explicit strategy objects.
    pub fn with_parts(transformer: TimeTransformer, matcher: TimeMatcher) -> Self {
        Self {
            transformer,
            matcher,
        }
    }

    /// Animation callback: one forward step.
    pub fn tick(&mut self, model: &mut LayerModel) {
        self.step(model, false);
    }

    /// Step simulated time one driving-layer time step and synchronize
    /// activations. Without a driving layer the cursor stays put and the
    /// synchronization pass degrades to an empty activation mapping.
    pub fn step(&mut self, model: &mut LayerModel, backwards: bool) {
        if let Err(err) = self.transformer.step(backwards) {
            debug!("time step skipped: {}", err);
        }
        self.sync(model);
    }

    /// Jump simulated time to the given driving-layer timeline index and
    /// synchronize. An out-of-range index is reported without touching
    /// the cursor or the activation state.
    pub fn jump(&mut self, model: &mut LayerModel, index: usize) -> Result<()> {
        match self.transformer.jump(index) {
            Ok(_) => {}
            Err(err @ StratusError::InvalidIndex { .. }) => return Err(err),
            Err(err) => debug!("jump skipped: {}", err),
        }
        self.sync(model);
        Ok(())
    }

    /// Make the layer with `layer_uuid` the timebase; `None`, an unknown
    /// uuid or a non-dynamic layer all clear it.
    pub fn change_timebase(&mut self, model: &mut LayerModel, layer_uuid: Option<Uuid>) {
        let layer = layer_uuid
            .and_then(|uuid| model.get_layer(uuid))
            .filter(|layer| model.is_layer_dynamic(layer));
        if layer_uuid.is_some() && layer.is_none() {
            debug!("timebase request for an unknown or non-dynamic layer, clearing");
        }
        if self.transformer.change_timebase(layer) {
            model.publish(ModelEvent::TimebaseChanged {
                layer_uuid: self.transformer.driving_layer_uuid(),
            });
        }
        self.sync(model);
    }

    /// React to a layer stack or timeline change: revalidate the driving
    /// layer (falling back to the first dynamic layer if it vanished,
    /// adopting its current timeline if it grew or shrank) and
    /// resynchronize.
    pub fn on_layers_update(&mut self, model: &mut LayerModel) {
        let dynamic_layers = model.get_dynamic_layers();
        let changed = self.transformer.on_layers_update(&dynamic_layers);
        if changed {
            model.publish(ModelEvent::TimebaseChanged {
                layer_uuid: self.transformer.driving_layer_uuid(),
            });
        }
        self.sync(model);
    }

    /// Match all dynamic layers against the current simulated time and
    /// publish the result.
    ///
    /// The simulated time is read once so every layer of the cycle is
    /// matched against the same snapshot.
    pub fn sync(&self, model: &mut LayerModel) {
        let t_sim = self.transformer.t_sim();
        let activations: ActivationMap = model
            .get_dynamic_layers()
            .iter()
            .map(|layer| {
                let frames = t_sim
                    .and_then(|t| self.matcher.match_dataset(layer.timeline(), t))
                    .map(|dataset| vec![dataset.uuid])
                    .unwrap_or_default();
                (layer.uuid, frames)
            })
            .collect();
        model.apply_activation(&activations);
        model.publish(ModelEvent::TimeStepped {
            t_sim,
            timeline_index: self.transformer.timeline_index(),
        });
    }

    pub fn t_sim(&self) -> Option<DateTime<Utc>> {
        self.transformer.t_sim()
    }

    pub fn timeline_index(&self) -> usize {
        self.transformer.timeline_index()
    }

    pub fn timeline(&self) -> &[DateTime<Utc>] {
        self.transformer.timeline()
    }

    pub fn driving_layer_uuid(&self) -> Option<Uuid> {
        self.transformer.driving_layer_uuid()
    }

    /// Simulated time formatted for display.
    pub fn formatted_t_sim(&self) -> String {
        self.transformer.formatted_t_sim()
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new()
    }
}
