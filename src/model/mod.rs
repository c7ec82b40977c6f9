//! Document Model Module
//!
//! The metadata core of the application: layers, their timelines of
//! product datasets, grouping of imports into layers, recipes for derived
//! layers and the presentation settings shared per layer family.

pub mod dataset;
pub mod layer;
pub mod layer_model;
pub mod metadata;
pub mod presentation;
pub mod recipe;
pub mod timeline;

pub use dataset::ProductDataset;
pub use layer::Layer;
pub use layer_model::{ContentSource, LayerModel};
pub use metadata::{
    DatasetInfo, GroupingKey, GroupingPolicy, Kind, ProductFamilyKeyPolicy,
    BORDERS_DATASET_NAME, LATLON_GRID_DATASET_NAME,
};
pub use presentation::{ColorLimits, Gamma, Presentation};
pub use recipe::{AlgebraicOperation, AlgebraicRecipe, CompositeRecipe, Recipe, RECIPE_CHANNELS};
pub use timeline::Timeline;
