//! Catalog files
//!
//! A catalog is a JSON description of an import session: the product
//! datasets to bring into the model plus the composite recipes to derive
//! from them. Composite inputs name layers by product name; resolution
//! happens after the datasets are imported, so a recipe can reference any
//! layer the same catalog creates.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StratusError};
use crate::model::{
    AlgebraicOperation, AlgebraicRecipe, CompositeRecipe, DatasetInfo, LayerModel,
};

/// An RGB composite declaration; channels name products, `null` leaves a
/// channel unassigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgbCompositeSpec {
    pub name: String,
    pub red: Option<String>,
    pub green: Option<String>,
    pub blue: Option<String>,
}

/// An algebraic composite declaration over operands x, y, z.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgebraicCompositeSpec {
    pub name: String,
    pub x: Option<String>,
    pub y: Option<String>,
    pub z: Option<String>,
    #[serde(default = "default_operation")]
    pub operation: AlgebraicOperation,
}

fn default_operation() -> AlgebraicOperation {
    AlgebraicOperation::Difference
}

/// On-disk import description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub datasets: Vec<DatasetInfo>,
    pub rgb_composites: Vec<RgbCompositeSpec>,
    pub algebraic_composites: Vec<AlgebraicCompositeSpec>,
}

impl Catalog {
    /// Read a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let catalog = serde_json::from_str(&text)?;
        Ok(catalog)
    }

    /// Fold another catalog's entries into this one.
    pub fn merge(&mut self, other: Catalog) {
        self.datasets.extend(other.datasets);
        self.rgb_composites.extend(other.rgb_composites);
        self.algebraic_composites.extend(other.algebraic_composites);
    }

    /// Import everything into `model`: datasets first, then the composite
    /// recipes, so recipe inputs resolve against the freshly created
    /// layers.
    pub fn load_into(&self, model: &mut LayerModel) -> Result<()> {
        for info in &self.datasets {
            model.add_dataset(info);
        }
        for spec in &self.rgb_composites {
            let recipe = CompositeRecipe::new(
                &spec.name,
                resolve_input(model, spec.red.as_deref())?,
                resolve_input(model, spec.green.as_deref())?,
                resolve_input(model, spec.blue.as_deref())?,
            );
            model.create_rgb_composite_layer(recipe);
        }
        for spec in &self.algebraic_composites {
            let recipe = AlgebraicRecipe::new(
                &spec.name,
                resolve_input(model, spec.x.as_deref())?,
                resolve_input(model, spec.y.as_deref())?,
                resolve_input(model, spec.z.as_deref())?,
                spec.operation,
            );
            model.create_algebraic_layer(recipe);
        }
        Ok(())
    }
}

/// Resolve a composite input name to the layer holding that product
/// family.
fn resolve_input(model: &LayerModel, name: Option<&str>) -> Result<Option<Uuid>> {
    match name {
        None => Ok(None),
        Some(name) => model
            .layers()
            .iter()
            .find(|layer| {
                layer
                    .grouping_key
                    .as_ref()
                    .is_some_and(|key| key.name == name)
            })
            .map(|layer| Some(layer.uuid))
            .ok_or_else(|| StratusError::InvalidCatalog {
                reason: format!("composite input '{}' does not name a loaded product", name),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Kind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "datasets": [
            {"platform": "GOES-16", "instrument": "ABI", "name": "B02",
             "kind": "image", "sched_time": "2023-06-15T00:00:00Z"},
            {"platform": "GOES-16", "instrument": "ABI", "name": "B02",
             "kind": "image", "sched_time": "2023-06-15T01:00:00Z"},
            {"platform": "GOES-16", "instrument": "ABI", "name": "B03",
             "kind": "image", "sched_time": "2023-06-15T00:00:00Z"},
            {"platform": "GOES-16", "instrument": "ABI", "name": "B03",
             "kind": "image", "sched_time": "2023-06-15T01:00:00Z"}
        ],
        "rgb_composites": [
            {"name": "True Color", "red": "B02", "green": "B03", "blue": null}
        ],
        "algebraic_composites": [
            {"name": "Veggie Diff", "x": "B03", "y": "B02", "z": null}
        ]
    }"#;

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.datasets.len(), 4);
        assert_eq!(catalog.rgb_composites.len(), 1);
        assert_eq!(catalog.algebraic_composites.len(), 1);
        // Omitted operation falls back to the difference
        assert_eq!(
            catalog.algebraic_composites[0].operation,
            AlgebraicOperation::Difference
        );
    }

    #[test]
    fn test_load_into_builds_layers_and_composites() {
        let catalog: Catalog = serde_json::from_str(SAMPLE).unwrap();
        let mut model = LayerModel::new();
        catalog.load_into(&mut model).unwrap();

        // B02, B03 and the two derived layers
        assert_eq!(model.layers().len(), 4);
        let rgb = model
            .layers()
            .iter()
            .find(|l| l.kind == Kind::Rgb)
            .unwrap();
        // Both inputs cover 0:00 and 1:00
        assert_eq!(rgb.timeline().len(), 2);
        let algebraic = model
            .layers()
            .iter()
            .find(|l| l.kind == Kind::Algebraic)
            .unwrap();
        assert_eq!(algebraic.timeline().len(), 2);
    }

    #[test]
    fn test_unknown_composite_input_is_rejected() {
        let mut catalog: Catalog = serde_json::from_str(SAMPLE).unwrap();
        catalog.rgb_composites[0].green = Some("B99".to_string());

        let mut model = LayerModel::new();
        let err = catalog.load_into(&mut model).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CATALOG");
        assert!(err.to_string().contains("B99"));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let catalog: Catalog = serde_json::from_str(r#"{"datasets": []}"#).unwrap();
        assert!(catalog.datasets.is_empty());
        assert!(catalog.rgb_composites.is_empty());
        assert!(catalog.algebraic_composites.is_empty());
    }

    #[test]
    fn test_merge_concatenates_sections() {
        let mut base: Catalog = serde_json::from_str(SAMPLE).unwrap();
        let other: Catalog = serde_json::from_str(
            r#"{"datasets": [{"platform": "GOES-16", "instrument": "ABI",
                 "name": "B05", "kind": "image",
                 "sched_time": "2023-06-15T00:00:00Z"}]}"#,
        )
        .unwrap();

        base.merge(other);
        assert_eq!(base.datasets.len(), 5);
        assert_eq!(base.rgb_composites.len(), 1);
    }
}
