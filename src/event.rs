//! Model event notifications
//!
//! The model and time subsystem announce state changes through a small
//! pub/sub hub instead of direct observer coupling. Subscribers receive
//! events over `std::sync::mpsc` channels; everything runs on the one
//! control thread, so publishing is an ordinary synchronous fan-out.
//!
//! The activation result of one orchestration cycle travels as a single
//! `ActivationsApplied` event carrying the whole per-layer mapping, so
//! consumers never observe a partially updated frame assignment.

use std::collections::HashMap;
use std::sync::mpsc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::metadata::Kind;
use crate::model::presentation::{ColorLimits, Gamma};

/// Per-layer activation result of one orchestration cycle.
///
/// Maps a layer uuid to the datasets that should be the visible frames of
/// that layer. An empty list means "show nothing for this layer right now";
/// the default matching policy yields at most one entry per layer, but
/// accumulating products may activate several at once.
pub type ActivationMap = HashMap<Uuid, Vec<Uuid>>;

/// Events published by the layer model and the time manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A new layer was created (by grouping or as a recipe layer).
    LayerCreated {
        layer_uuid: Uuid,
        descriptor: String,
        kind: Kind,
    },

    /// The layer stack order changed; carries the full order, top first.
    LayersReordered { layer_uuids: Vec<Uuid> },

    /// Some layer's timeline changed (datasets added, removed or rewritten).
    LayersUpdated,

    /// A dataset was inserted into a layer's timeline.
    DatasetAdded {
        layer_uuid: Uuid,
        dataset_uuid: Uuid,
        kind: Kind,
        sched_time: DateTime<Utc>,
    },

    /// A dataset was removed from a layer's timeline.
    DatasetRemoved {
        layer_uuid: Uuid,
        dataset_uuid: Uuid,
    },

    /// A composite dataset's input assignment was rewritten in place.
    CompositeDatasetChanged {
        layer_uuid: Uuid,
        dataset_uuid: Uuid,
    },

    /// A single dataset flipped between active and inactive.
    DatasetActivationChanged { dataset_uuid: Uuid, is_active: bool },

    /// One atomic activation publish; all per-dataset flips of the cycle
    /// have already been delivered when this arrives.
    ActivationsApplied { activations: ActivationMap },

    /// The driving layer changed; `None` means the timebase was cleared.
    TimebaseChanged { layer_uuid: Option<Uuid> },

    /// The simulated time cursor moved (step or jump).
    TimeStepped {
        t_sim: Option<DateTime<Utc>>,
        timeline_index: usize,
    },

    /// Colormap changed for every dataset of a layer family.
    ColormapChanged {
        changes: HashMap<Uuid, Option<String>>,
    },

    /// Color limits changed for every dataset of a layer family.
    ColorLimitsChanged { changes: HashMap<Uuid, ColorLimits> },

    /// Gamma changed for every dataset of a layer family.
    GammaChanged { changes: HashMap<Uuid, Gamma> },

    /// Layer visibility toggled.
    LayerVisibilityChanged { layer_uuid: Uuid, visible: bool },

    /// Layer opacity changed.
    LayerOpacityChanged { layer_uuid: Uuid, opacity: f32 },
}

/// Synchronous fan-out hub for [`ModelEvent`]s.
///
/// Subscribers that dropped their receiver are silently forgotten on the
/// next publish.
#[derive(Debug, Default)]
pub struct EventHub {
    senders: Vec<mpsc::Sender<ModelEvent>>,
}

impl EventHub {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&mut self) -> mpsc::Receiver<ModelEvent> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    /// Deliver a clone of `event` to every live subscriber.
    pub fn publish(&mut self, event: ModelEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of subscribers still connected at the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}
