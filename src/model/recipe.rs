//! Composite layer recipes
//!
//! A recipe declares which input layers feed a derived layer and how; the
//! derived layer's timeline is never edited directly, it is kept in sync
//! with the intersection of its inputs' timelines by the layer model.
//!
//! Channels are positional: red/green/blue for RGB composites, x/y/z for
//! algebraic ones. A channel may be left unassigned (`None`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of recipe input channels.
pub const RECIPE_CHANNELS: usize = 3;

/// Recipe for a multichannel RGB composite layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRecipe {
    /// Recipe identity; the derived layer keeps a reference to it.
    pub id: Uuid,

    /// Display name of the composite.
    pub name: String,

    /// Input layers per channel, in red/green/blue order.
    pub input_layer_ids: [Option<Uuid>; RECIPE_CHANNELS],

    /// Per-channel color limits; `None` keeps the channel default.
    pub color_limits: [Option<(f32, f32)>; RECIPE_CHANNELS],

    /// Per-channel gamma.
    pub gammas: [f32; RECIPE_CHANNELS],
}

impl CompositeRecipe {
    /// Create an RGB recipe from the given channel assignment.
    pub fn new(name: impl Into<String>, red: Option<Uuid>, green: Option<Uuid>, blue: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            input_layer_ids: [red, green, blue],
            color_limits: [None; RECIPE_CHANNELS],
            gammas: [1.0; RECIPE_CHANNELS],
        }
    }
}

/// Formula kind of an algebraic composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgebraicOperation {
    /// `x - y`
    Difference,

    /// `x / y`
    Ratio,

    /// `(x - y) / (x + y)`
    NormalizedDifference,

    /// User-supplied formula over x, y, z.
    Custom,
}

impl AlgebraicOperation {
    /// Default formula string for the operation.
    pub fn default_formula(&self) -> &'static str {
        match self {
            AlgebraicOperation::Difference => "x - y",
            AlgebraicOperation::Ratio => "x / y",
            AlgebraicOperation::NormalizedDifference => "(x - y) / (x + y)",
            AlgebraicOperation::Custom => "",
        }
    }
}

/// Recipe for a single-band algebraic composite layer.
///
/// The formula itself is evaluated by the external content workspace; this
/// core only tracks which inputs feed it and when the derived timeline must
/// be recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgebraicRecipe {
    /// Recipe identity; the derived layer keeps a reference to it.
    pub id: Uuid,

    /// Display name of the composite.
    pub name: String,

    /// Input layers per operand, in x/y/z order.
    pub input_layer_ids: [Option<Uuid>; RECIPE_CHANNELS],

    /// Formula kind.
    pub operation: AlgebraicOperation,

    /// Formula string handed to the content workspace.
    pub operation_formula: String,

    /// Set when the formula changed; forces every common time step to be
    /// recomputed on the next cascade, after which the flag clears.
    pub modified: bool,
}

impl AlgebraicRecipe {
    /// Create an algebraic recipe from the given operand assignment.
    pub fn new(
        name: impl Into<String>,
        x: Option<Uuid>,
        y: Option<Uuid>,
        z: Option<Uuid>,
        operation: AlgebraicOperation,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            input_layer_ids: [x, y, z],
            operation,
            operation_formula: operation.default_formula().to_string(),
            modified: false,
        }
    }

    /// Replace the formula and mark the recipe modified.
    pub fn set_formula(&mut self, formula: impl Into<String>) {
        self.operation_formula = formula.into();
        self.operation = AlgebraicOperation::Custom;
        self.modified = true;
    }
}

/// Either kind of derived-layer recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "variant")]
pub enum Recipe {
    Rgb(CompositeRecipe),
    Algebraic(AlgebraicRecipe),
}

impl Recipe {
    /// Recipe identity.
    pub fn id(&self) -> Uuid {
        match self {
            Recipe::Rgb(r) => r.id,
            Recipe::Algebraic(r) => r.id,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Recipe::Rgb(r) => &r.name,
            Recipe::Algebraic(r) => &r.name,
        }
    }

    /// Channel-ordered input layer assignment.
    pub fn input_layer_ids(&self) -> &[Option<Uuid>; RECIPE_CHANNELS] {
        match self {
            Recipe::Rgb(r) => &r.input_layer_ids,
            Recipe::Algebraic(r) => &r.input_layer_ids,
        }
    }

    /// Input layers that are actually assigned.
    pub fn declared_inputs(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.input_layer_ids().iter().flatten().copied()
    }

    /// Whether `layer_uuid` feeds this recipe.
    pub fn depends_on(&self, layer_uuid: Uuid) -> bool {
        self.declared_inputs().any(|input| input == layer_uuid)
    }
}
