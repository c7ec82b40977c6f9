//! Dataset metadata and layer grouping
//!
//! Every imported dataset arrives with a small metadata record. A grouping
//! policy maps that record to a grouping key which decides whether the
//! dataset joins an existing layer or requires a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dataset name of the latitude/longitude grid system layer.
pub const LATLON_GRID_DATASET_NAME: &str = "Latitude/Longitude Grid";

/// Dataset name of the political borders system layer.
pub const BORDERS_DATASET_NAME: &str = "Political Borders";

/// Platform name used for system-generated layers.
pub const SYSTEM_PLATFORM: &str = "System";

/// Instrument name used for system-generated layers.
pub const SYSTEM_INSTRUMENT: &str = "Generated";

/// What a layer or dataset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Single-band raster image.
    Image,

    /// Multichannel (red/green/blue) composite derived from input layers.
    Rgb,

    /// Single-band composite computed by an algebraic formula.
    Algebraic,

    /// Vector line data (grids, borders, fronts).
    Lines,

    /// Vector point data (lightning strikes, reports).
    Points,
}

impl Kind {
    /// Whether datasets of this kind are derived from other layers rather
    /// than imported.
    pub fn is_derived(&self) -> bool {
        matches!(self, Kind::Rgb | Kind::Algebraic)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Image => write!(f, "Image"),
            Kind::Rgb => write!(f, "RGB"),
            Kind::Algebraic => write!(f, "Algebraic"),
            Kind::Lines => write!(f, "Lines"),
            Kind::Points => write!(f, "Points"),
        }
    }
}

/// Import metadata of a single dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Observation platform, e.g. a satellite name.
    pub platform: String,

    /// Observing instrument.
    pub instrument: String,

    /// Product/channel name, e.g. a spectral band.
    pub name: String,

    /// Kind of data carried by the dataset.
    pub kind: Kind,

    /// Scheduled observation time; the dataset's position in its layer's
    /// timeline.
    pub sched_time: DateTime<Utc>,
}

impl DatasetInfo {
    /// Construct import metadata for a single dataset.
    pub fn new(
        platform: impl Into<String>,
        instrument: impl Into<String>,
        name: impl Into<String>,
        kind: Kind,
        sched_time: DateTime<Utc>,
    ) -> Self {
        Self {
            platform: platform.into(),
            instrument: instrument.into(),
            name: name.into(),
            kind,
            sched_time,
        }
    }

    /// Display descriptor derived from the metadata.
    pub fn descriptor(&self) -> String {
        format!("{} {} {}", self.platform, self.instrument, self.name)
    }
}

/// Key deciding which layer a dataset belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupingKey {
    pub platform: String,
    pub instrument: String,
    pub name: String,
}

/// Strategy mapping dataset metadata to a grouping key.
///
/// Swapping the policy changes how arriving datasets are distributed over
/// layers without touching the layer model itself.
pub trait GroupingPolicy {
    /// Compute the grouping key for the given dataset metadata.
    fn grouping_key(&self, info: &DatasetInfo) -> GroupingKey;

    /// Kind of layer that should be created to hold a dataset with this
    /// metadata; by default the dataset's own kind.
    fn layer_kind(&self, info: &DatasetInfo) -> Kind {
        info.kind
    }
}

/// Default grouping policy: one layer per product family.
///
/// The product family key is the (platform, instrument, dataset name)
/// tuple, so successive observations of the same channel line up in one
/// layer's timeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProductFamilyKeyPolicy;

impl GroupingPolicy for ProductFamilyKeyPolicy {
    fn grouping_key(&self, info: &DatasetInfo) -> GroupingKey {
        GroupingKey {
            platform: info.platform.clone(),
            instrument: info.instrument.clone(),
            name: info.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn info_at(name: &str, hour: u32) -> DatasetInfo {
        DatasetInfo::new(
            "GOES-16",
            "ABI",
            name,
            Kind::Image,
            Utc.with_ymd_and_hms(2023, 6, 15, hour, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_same_family_same_key() {
        let policy = ProductFamilyKeyPolicy;
        let key_a = policy.grouping_key(&info_at("B02", 0));
        let key_b = policy.grouping_key(&info_at("B02", 1));
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn test_different_channel_different_key() {
        let policy = ProductFamilyKeyPolicy;
        let key_a = policy.grouping_key(&info_at("B02", 0));
        let key_b = policy.grouping_key(&info_at("B03", 0));
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn test_layer_kind_follows_dataset_kind() {
        let policy = ProductFamilyKeyPolicy;
        assert_eq!(policy.layer_kind(&info_at("B02", 0)), Kind::Image);
    }

    #[test]
    fn test_derived_kinds() {
        assert!(Kind::Rgb.is_derived());
        assert!(Kind::Algebraic.is_derived());
        assert!(!Kind::Image.is_derived());
        assert!(!Kind::Lines.is_derived());
    }

    #[test]
    fn test_kind_serde_round_trip() {
        let json = serde_json::to_string(&Kind::Algebraic).unwrap();
        assert_eq!(json, "\"algebraic\"");
        let back: Kind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Kind::Algebraic);
    }
}
