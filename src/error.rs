//! Error handling for Stratus
//!
//! Failures in this core must never take the whole application down: a
//! degraded display (a layer showing nothing at the current time) is always
//! preferred over stopping playback. Accordingly, "no match for this layer"
//! is *not* an error (matchers return `Option`); the variants below cover
//! the conditions that are.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for Stratus operations
pub type Result<T> = std::result::Result<T, StratusError>;

/// Main error type for Stratus operations
#[derive(Error, Debug)]
pub enum StratusError {
    // Time base errors
    #[error("index {index} out of range: valid range is 0..{timeline_len}")]
    InvalidIndex { index: usize, timeline_len: usize },

    #[error("no driving layer selected: simulated time is undefined")]
    NoDrivingLayer,

    // Layer/dataset lookup errors
    #[error("layer not found: {uuid}")]
    LayerNotFound { uuid: Uuid },

    #[error("dataset not found: {uuid}")]
    DatasetNotFound { uuid: Uuid },

    #[error("layer {layer_uuid} has no recipe attached")]
    NotARecipeLayer { layer_uuid: Uuid },

    #[error("no layer holds recipe {recipe_id}")]
    RecipeNotFound { recipe_id: Uuid },

    #[error("recipe for layer {layer_uuid} would feed the layer back into itself")]
    CyclicRecipe { layer_uuid: Uuid },

    // Composite recomputation errors
    #[error("incomplete composite at {sched_time}: {reason}")]
    IncompleteComposite {
        sched_time: DateTime<Utc>,
        reason: String,
    },

    // Catalog errors
    #[error("invalid catalog: {reason}")]
    InvalidCatalog { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StratusError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            StratusError::InvalidIndex { .. } => "INVALID_INDEX",
            StratusError::NoDrivingLayer => "NO_DRIVING_LAYER",
            StratusError::LayerNotFound { .. } => "LAYER_NOT_FOUND",
            StratusError::DatasetNotFound { .. } => "DATASET_NOT_FOUND",
            StratusError::NotARecipeLayer { .. } => "NOT_A_RECIPE_LAYER",
            StratusError::RecipeNotFound { .. } => "RECIPE_NOT_FOUND",
            StratusError::CyclicRecipe { .. } => "CYCLIC_RECIPE",
            StratusError::IncompleteComposite { .. } => "INCOMPLETE_COMPOSITE",
            StratusError::InvalidCatalog { .. } => "INVALID_CATALOG",
            StratusError::Io(_) => "IO_ERROR",
            StratusError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the model in a consistent state and playback
    /// may simply continue: a missing driving layer makes stepping a no-op,
    /// an incomplete composite results in the affected time step being
    /// dropped. `InvalidIndex` is a caller bug and is not recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StratusError::NoDrivingLayer => true,
            StratusError::IncompleteComposite { .. } => true,
            StratusError::LayerNotFound { .. } => true,
            StratusError::DatasetNotFound { .. } => true,
            StratusError::RecipeNotFound { .. } => true,
            StratusError::CyclicRecipe { .. } => true,
            _ => false,
        }
    }
}
