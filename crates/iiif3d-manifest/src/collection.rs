//! Collection Documents
//!
//! The collection lists manifest summaries and, through `navPlace`, GeoJSON
//! points tagged with the manifest they belong to.

use serde::{Deserialize, Serialize};

use crate::document::OneOrMany;
use crate::label::{Label, label_text};
use crate::{ManifestError, ManifestResult};

/// IIIF collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: Option<Label>,
    pub items: Vec<ManifestSummary>,
    #[serde(default)]
    pub nav_place: Option<NavPlace>,
}

/// Manifest entry in a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub summary: Option<Label>,
    #[serde(default)]
    pub thumbnail: OneOrMany<ResourceRef>,
}

impl ManifestSummary {
    /// Label text
    pub fn title(&self) -> String {
        label_text(self.label.as_ref())
    }

    /// First thumbnail URL
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail.first().map(|thumb| thumb.id.as_str())
    }
}

/// Reference to another resource by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// GeoJSON feature collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavPlace {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// GeoJSON feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: FeatureProperties,
}

/// GeoJSON geometry; only points are interpreted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: serde_json::Value,
}

/// Feature properties written by the collection builder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub manifest: Option<String>,
    #[serde(default)]
    pub label: Option<Label>,
}

/// Geographic position of a manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub manifest_id: String,
    pub label: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl Collection {
    /// Parse and validate a collection document
    pub fn from_json_str(json: &str) -> ManifestResult<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)?;

        if raw.get("type").and_then(|t| t.as_str()) != Some("Collection") {
            return Err(ManifestError::Validation(
                "type must be \"Collection\"".to_string(),
            ));
        }
        if !raw.get("items").is_some_and(|items| items.is_array()) {
            return Err(ManifestError::Validation(
                "collection must contain an items array".to_string(),
            ));
        }

        Collection::deserialize(&raw)
            .map_err(|e| ManifestError::Validation(format!("unreadable collection structure: {e}")))
    }

    /// `(manifest id, title)` for every item
    pub fn summaries(&self) -> Vec<(&str, String)> {
        self.items.iter().map(|item| (item.id.as_str(), item.title())).collect()
    }

    /// Every point feature that names a manifest
    pub fn places(&self) -> Vec<Place> {
        let Some(nav_place) = &self.nav_place else {
            return Vec::new();
        };

        nav_place
            .features
            .iter()
            .filter_map(|feature| {
                let geometry = feature.geometry.as_ref().filter(|g| g.kind == "Point")?;
                let coordinates = geometry.coordinates.as_array()?;
                let longitude = coordinates.first()?.as_f64()?;
                let latitude = coordinates.get(1)?.as_f64()?;
                Some(Place {
                    manifest_id: feature.properties.manifest.clone()?,
                    label: label_text(feature.properties.label.as_ref()),
                    longitude,
                    latitude,
                })
            })
            .collect()
    }

    /// First place recorded for a manifest
    pub fn place_for(&self, manifest_id: &str) -> Option<Place> {
        self.places().into_iter().find(|place| place.manifest_id == manifest_id)
    }
}
