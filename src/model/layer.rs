//! Layers
//!
//! A layer is a named, typed owner of one timeline. Imported layers group
//! datasets of one product family; derived layers (RGB, algebraic) carry a
//! recipe and have their timeline maintained by the layer model's cascade;
//! system layers (grids, borders) are installed once and never animate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dataset::ProductDataset;
use super::metadata::{
    DatasetInfo, GroupingKey, Kind, SYSTEM_INSTRUMENT, SYSTEM_PLATFORM,
};
use super::presentation::{ColorLimits, Gamma, Presentation};
use super::recipe::Recipe;
use super::timeline::Timeline;

/// One display layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// Layer identity.
    pub uuid: Uuid,

    /// Kind of datasets this layer holds.
    pub kind: Kind,

    /// Human-readable name shown in layer lists and the timebase picker.
    pub descriptor: String,

    /// Key that groups arriving datasets into this layer; `None` for
    /// derived layers, which are fed by their recipe instead of imports.
    pub grouping_key: Option<GroupingKey>,

    /// Recipe of a derived layer.
    pub recipe: Option<Recipe>,

    /// Display settings shared by all datasets of the layer.
    pub presentation: Presentation,

    /// Last point-probe reading, if a probe is set.
    pub probe_value: Option<f64>,

    timeline: Timeline,
}

impl Layer {
    /// Create a layer for an imported product family.
    pub fn from_info(info: &DatasetInfo, kind: Kind, grouping_key: GroupingKey) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            descriptor: info.descriptor(),
            grouping_key: Some(grouping_key),
            recipe: None,
            presentation: Presentation::for_kind(kind),
            probe_value: None,
            timeline: Timeline::new(),
        }
    }

    /// Create a derived layer owned by the given recipe.
    pub fn for_recipe(recipe: Recipe) -> Self {
        let kind = match &recipe {
            Recipe::Rgb(_) => Kind::Rgb,
            Recipe::Algebraic(_) => Kind::Algebraic,
        };
        let mut presentation = Presentation::for_kind(kind);
        if let Recipe::Rgb(composite) = &recipe {
            presentation.climits = ColorLimits::PerChannel(composite.color_limits);
            presentation.gamma = Gamma::PerChannel(composite.gammas);
        }
        Self {
            uuid: Uuid::new_v4(),
            kind,
            descriptor: recipe.name().to_string(),
            grouping_key: None,
            recipe: Some(recipe),
            presentation,
            probe_value: None,
            timeline: Timeline::new(),
        }
    }

    /// Create a system layer (lat/lon grid, borders).
    pub fn system(dataset_name: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind: Kind::Lines,
            descriptor: dataset_name.to_string(),
            grouping_key: Some(GroupingKey {
                platform: SYSTEM_PLATFORM.to_string(),
                instrument: SYSTEM_INSTRUMENT.to_string(),
                name: dataset_name.to_string(),
            }),
            recipe: None,
            presentation: Presentation::for_kind(Kind::Lines),
            probe_value: None,
            timeline: Timeline::new(),
        }
    }

    /// Read access to the timeline.
    ///
    /// Mutation goes through the layer model so that derived timelines are
    /// only ever rewritten by the cascade.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub(crate) fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    /// Insert an imported dataset at `sched_time`; returns the new dataset
    /// uuid and any entry it replaced.
    pub(crate) fn add_dataset(
        &mut self,
        kind: Kind,
        sched_time: DateTime<Utc>,
    ) -> (Uuid, Option<ProductDataset>) {
        let dataset = ProductDataset::new(self.uuid, kind, sched_time);
        let dataset_uuid = dataset.uuid;
        let replaced = self.timeline.insert(dataset);
        (dataset_uuid, replaced)
    }

    /// Whether this layer was installed by the system rather than loaded.
    pub fn is_system(&self) -> bool {
        self.grouping_key
            .as_ref()
            .is_some_and(|key| key.platform == SYSTEM_PLATFORM)
    }

    /// Whether this layer has a timeline worth animating on its own.
    ///
    /// Derived layers can additionally count as dynamic through their
    /// inputs; that rule needs the whole model and lives in
    /// [`crate::model::LayerModel::is_layer_dynamic`].
    pub fn is_dynamic(&self) -> bool {
        !self.is_system() && self.timeline.len() > 1
    }

    /// Whether point probes can read a value off this layer.
    pub fn is_probeable(&self) -> bool {
        matches!(self.kind, Kind::Image | Kind::Algebraic)
    }

    /// First active dataset in time order, if any.
    pub fn first_active_dataset(&self) -> Option<&ProductDataset> {
        self.timeline.datasets().find(|d| d.is_active)
    }

    /// Uuids of the currently active datasets, in time order.
    pub fn active_dataset_uuids(&self) -> Vec<Uuid> {
        self.timeline
            .datasets()
            .filter(|d| d.is_active)
            .map(|d| d.uuid)
            .collect()
    }

    /// Uuids of all datasets, in time order.
    pub fn dataset_uuids(&self) -> Vec<Uuid> {
        self.timeline.datasets().map(|d| d.uuid).collect()
    }
}
