//! Product datasets
//!
//! A dataset is one observed (or derived) frame: the unit the view layer
//! renders. It lives at exactly one position in its owning layer's
//! timeline and carries the activation flag the time manager drives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metadata::Kind;
use super::recipe::RECIPE_CHANNELS;

/// One frame of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDataset {
    /// Dataset identity, referenced by activation maps and the content
    /// workspace.
    pub uuid: Uuid,

    /// Owning layer.
    pub layer_uuid: Uuid,

    /// Kind of data carried.
    pub kind: Kind,

    /// Observation time; key in the owning layer's timeline.
    pub sched_time: DateTime<Utc>,

    /// Whether this is the currently displayed frame of its layer.
    pub is_active: bool,

    /// For derived kinds: the input dataset per recipe channel at this
    /// time step. `None` entries mark channels whose input could not be
    /// resolved.
    pub input_dataset_uuids: Option<[Option<Uuid>; RECIPE_CHANNELS]>,
}

impl ProductDataset {
    /// Create an imported (non-derived) dataset.
    pub fn new(layer_uuid: Uuid, kind: Kind, sched_time: DateTime<Utc>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            layer_uuid,
            kind,
            sched_time,
            is_active: false,
            input_dataset_uuids: None,
        }
    }

    /// Create a derived dataset from a per-channel input assignment.
    pub fn new_derived(
        layer_uuid: Uuid,
        kind: Kind,
        sched_time: DateTime<Utc>,
        input_dataset_uuids: [Option<Uuid>; RECIPE_CHANNELS],
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            layer_uuid,
            kind,
            sched_time,
            is_active: false,
            input_dataset_uuids: Some(input_dataset_uuids),
        }
    }

    /// Rewrite the input assignment of a derived dataset in place, keeping
    /// its identity. Returns true if the assignment actually changed.
    pub fn update_inputs(&mut self, input_dataset_uuids: [Option<Uuid>; RECIPE_CHANNELS]) -> bool {
        if self.input_dataset_uuids.as_ref() == Some(&input_dataset_uuids) {
            return false;
        }
        self.input_dataset_uuids = Some(input_dataset_uuids);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_dataset_is_inactive() {
        let dataset = ProductDataset::new(Uuid::new_v4(), Kind::Image, noon());
        assert!(!dataset.is_active);
        assert!(dataset.input_dataset_uuids.is_none());
    }

    #[test]
    fn test_derived_dataset_keeps_channel_order() {
        let red = Uuid::new_v4();
        let blue = Uuid::new_v4();
        let dataset =
            ProductDataset::new_derived(Uuid::new_v4(), Kind::Rgb, noon(), [Some(red), None, Some(blue)]);
        assert_eq!(dataset.input_dataset_uuids, Some([Some(red), None, Some(blue)]));
    }

    #[test]
    fn test_update_inputs_reports_change() {
        let mut dataset =
            ProductDataset::new_derived(Uuid::new_v4(), Kind::Rgb, noon(), [None, None, None]);
        let uuid_before = dataset.uuid;
        let inputs = [Some(Uuid::new_v4()), None, None];

        assert!(dataset.update_inputs(inputs));
        // Identity survives an in-place rewrite
        assert_eq!(dataset.uuid, uuid_before);
        // Re-applying the same assignment is a no-op
        assert!(!dataset.update_inputs(inputs));
    }
}
