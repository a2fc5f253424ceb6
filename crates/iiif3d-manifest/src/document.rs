//! IIIF Document Types
//!
//! Typed view of the parts of a Presentation 3.0 manifest the viewer reads.
//! Everything below the validated top level is lenient: unexpected shapes
//! deserialize into catch-all variants instead of failing, so traversal never
//! has to report errors.

use serde::{Deserialize, Deserializer, Serialize};

use crate::label::Label;
use crate::{ManifestError, ManifestResult};

/// Resource type of a 3D model option
pub const MODEL_TYPE: &str = "Model";
/// Format of binary glTF assets
pub const GLTF_BINARY_FORMAT: &str = "model/gltf-binary";
/// Body type carrying alternative resources
pub const CHOICE_TYPE: &str = "Choice";

/// A single value or an array of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// First value, if any
    pub fn first(&self) -> Option<&T> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.first(),
        }
    }

    /// All values
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// Top-level manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub summary: Option<Label>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default)]
    pub rights: Option<String>,
    pub items: Vec<Canvas>,
}

/// `{label, value}` pair from the manifest's metadata block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub value: Option<Label>,
}

/// Canvas (scene) holding annotation pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub items: Vec<AnnotationPage>,
}

/// Annotation page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationPage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub items: Vec<Annotation>,
}

/// Painting annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub body: Option<AnnotationBody>,
}

impl Annotation {
    /// The body when it is a single `Choice` resource
    pub fn choice(&self) -> Option<&Resource> {
        match &self.body {
            Some(AnnotationBody::Single(resource)) if resource.is(CHOICE_TYPE) => Some(resource),
            _ => None,
        }
    }
}

/// Annotation body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationBody {
    Single(Box<Resource>),
    Many(Vec<Resource>),
    Other(serde_json::Value),
}

/// Content resource: a `Choice`, a `Model`, or anything else
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub service: OneOrMany<Service>,
    #[serde(default)]
    pub items: Vec<Resource>,
}

impl Resource {
    /// Check the resource type
    pub fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// A binary glTF model option
    pub fn is_gltf_model(&self) -> bool {
        self.is(MODEL_TYPE) && self.format.as_deref() == Some(GLTF_BINARY_FORMAT)
    }

    /// Declared size from the first service entry
    pub fn file_size(&self) -> Option<u64> {
        self.service.first().and_then(|service| service.file_size)
    }
}

/// Model service block carrying size and LOD hints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_size")]
    pub file_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lod_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quality: Option<String>,
}

/// Accept integer, float or numeric-string sizes; anything else is unknown
fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Check the minimal top-level shape and convert to typed form
pub fn validate_manifest(raw: &serde_json::Value) -> ManifestResult<Manifest> {
    match raw.get("type").and_then(|t| t.as_str()) {
        Some("Manifest") => {}
        _ => {
            return Err(ManifestError::Validation(
                "type must be \"Manifest\"".to_string(),
            ));
        }
    }

    if !raw.get("items").is_some_and(|items| items.is_array()) {
        return Err(ManifestError::Validation(
            "manifest must contain an items array".to_string(),
        ));
    }

    Manifest::deserialize(raw)
        .map_err(|e| ManifestError::Validation(format!("unreadable manifest structure: {e}")))
}
