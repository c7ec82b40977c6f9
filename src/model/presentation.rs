//! Layer presentation settings
//!
//! Presentation is shared by every dataset of a layer family: changing the
//! colormap of a layer restyles all of its frames at once.

use serde::{Deserialize, Serialize};

use super::metadata::Kind;

/// Color limits applied when mapping data values to colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorLimits {
    /// One (low, high) pair for single-band data.
    Single(f32, f32),

    /// Independent limits per RGB channel; `None` leaves a channel at its
    /// data-derived default.
    PerChannel([Option<(f32, f32)>; 3]),
}

impl Default for ColorLimits {
    fn default() -> Self {
        ColorLimits::Single(0.0, 1.0)
    }
}

/// Gamma correction applied after color mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamma {
    /// One gamma for single-band data.
    Single(f32),

    /// Independent gamma per RGB channel.
    PerChannel([f32; 3]),
}

impl Default for Gamma {
    fn default() -> Self {
        Gamma::Single(1.0)
    }
}

/// How a layer (and thereby each of its datasets) is displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    /// Kind the presentation was created for.
    pub kind: Kind,

    /// Whether the layer is drawn at all.
    pub visible: bool,

    /// Blend opacity in `[0.0, 1.0]`.
    pub opacity: f32,

    /// Colormap name; `None` for kinds that do not use one (RGB, vectors).
    pub colormap: Option<String>,

    /// Color limits.
    pub climits: ColorLimits,

    /// Gamma correction.
    pub gamma: Gamma,
}

impl Presentation {
    /// Default presentation for a layer of the given kind.
    pub fn for_kind(kind: Kind) -> Self {
        let (colormap, climits, gamma) = match kind {
            Kind::Rgb => (None, ColorLimits::PerChannel([None; 3]), Gamma::PerChannel([1.0; 3])),
            Kind::Algebraic => (
                Some("grays".to_string()),
                ColorLimits::Single(-100.0, 100.0),
                Gamma::default(),
            ),
            Kind::Image => (Some("viridis".to_string()), ColorLimits::default(), Gamma::default()),
            Kind::Lines | Kind::Points => (None, ColorLimits::default(), Gamma::default()),
        };
        Self {
            kind,
            visible: true,
            opacity: 1.0,
            colormap,
            climits,
            gamma,
        }
    }
}
