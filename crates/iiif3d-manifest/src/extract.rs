//! Model Extraction
//!
//! Turns every rendering `Choice` in the canvas hierarchy into a model record
//! whose options are ranked by declared size and assigned to LOD levels.

use iiif3d_core::{AssetDescriptor, LodLevel, ModelConfiguration, ModelMetadata};
use indexmap::IndexMap;
use serde::Serialize;

use crate::ManifestResult;
use crate::document::{Manifest, Resource};
use crate::label::label_text;
use crate::rewrite::UrlRewriteTable;
use crate::settings::DEFAULT_MODEL_ID;

/// A model found in a manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRecord {
    /// `model` for the first record, `model-2`, `model-3`, ... after it
    pub id: String,
    pub name: String,
    pub description: String,
    /// Assets by level, smallest first
    pub lods: IndexMap<LodLevel, AssetDescriptor>,
    pub metadata: IndexMap<String, String>,
    /// Assets displaced from `extreme` when a choice had more options than levels
    pub collapsed: Vec<AssetDescriptor>,
}

impl ModelRecord {
    /// Build the loader configuration for this record
    pub fn to_configuration(&self, progressive: bool) -> ManifestResult<ModelConfiguration> {
        let metadata = ModelMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            fields: self.metadata.clone(),
        };
        let config = ModelConfiguration::new(
            self.lods.iter().map(|(level, asset)| (*level, asset.clone())),
            metadata,
        )?;
        Ok(config.with_progressive(progressive))
    }
}

/// Id given to the record at `index`
fn record_id(index: usize) -> String {
    match index {
        0 => DEFAULT_MODEL_ID.to_string(),
        n => format!("{}-{}", DEFAULT_MODEL_ID, n + 1),
    }
}

/// Extract every model record from a manifest
pub fn extract_models(manifest: &Manifest, rewrites: &UrlRewriteTable) -> Vec<ModelRecord> {
    let name = label_text(manifest.label.as_ref());
    let description = label_text(manifest.summary.as_ref());
    let metadata = extract_metadata(manifest);

    let mut models = Vec::new();

    for canvas in &manifest.items {
        let Some(page) = canvas.items.first() else {
            continue;
        };

        for annotation in &page.items {
            let Some(choice) = annotation.choice() else {
                continue;
            };

            let (lods, collapsed) = rank_options(choice, rewrites);
            if lods.is_empty() {
                continue;
            }

            models.push(ModelRecord {
                id: record_id(models.len()),
                name: name.clone(),
                description: description.clone(),
                lods,
                metadata: metadata.clone(),
                collapsed,
            });
        }
    }

    log::debug!("Extracted {} model(s) from manifest", models.len());
    models
}

/// Rank a choice's glTF options by size and assign them to levels.
///
/// Unknown sizes rank as zero and ties keep document order. Every option past
/// the fifth lands on `extreme`, so the largest one ends up displayed there and
/// the ones it displaces are returned separately. An option without an `id`
/// keeps its level with a blank URL, which the loader skips.
fn rank_options(
    choice: &Resource,
    rewrites: &UrlRewriteTable,
) -> (IndexMap<LodLevel, AssetDescriptor>, Vec<AssetDescriptor>) {
    let mut options: Vec<&Resource> = choice.items.iter().filter(|r| r.is_gltf_model()).collect();
    options.sort_by_key(|option| option.file_size().unwrap_or(0));

    let mut lods = IndexMap::new();
    let mut collapsed = Vec::new();

    for (rank, option) in options.into_iter().enumerate() {
        let level = LodLevel::from_rank(rank);
        let descriptor = describe(option, rewrites);

        if let Some(displaced) = lods.insert(level, descriptor) {
            log::warn!(
                "Choice has more than {} model options; {} collapsed into {}",
                LodLevel::ALL.len(),
                displaced.url,
                level
            );
            collapsed.push(displaced);
        }
    }

    (lods, collapsed)
}

fn describe(option: &Resource, rewrites: &UrlRewriteTable) -> AssetDescriptor {
    let service = option.service.first();
    let url = match option.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => rewrites.apply(id),
        _ => {
            log::warn!("Model option has no id, its level will not be loaded");
            String::new()
        }
    };
    AssetDescriptor {
        url,
        size_bytes: option.file_size(),
        description: label_text(option.label.as_ref()),
        original_lod: service.and_then(|s| s.lod_level.clone()),
        quality: service.and_then(|s| s.quality.clone()),
    }
}

/// `lowercase(label) -> value` for every complete metadata entry, plus `license`
pub fn extract_metadata(manifest: &Manifest) -> IndexMap<String, String> {
    let mut metadata = IndexMap::new();

    for entry in &manifest.metadata {
        let label = label_text(entry.label.as_ref());
        let value = label_text(entry.value.as_ref());
        if !label.is_empty() && !value.is_empty() {
            metadata.insert(label.to_lowercase(), value);
        }
    }

    if let Some(rights) = &manifest.rights {
        metadata.insert("license".to_string(), rights.clone());
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::validate_manifest;
    use serde_json::{Value, json};

    const MB: u64 = 1024 * 1024;

    fn option(id: &str, size: Option<u64>, lod_hint: &str) -> Value {
        let mut service = json!({"type": "ModelService", "lodLevel": lod_hint});
        if let Some(size) = size {
            service["fileSize"] = json!(size);
        }
        json!({
            "id": id,
            "type": "Model",
            "format": "model/gltf-binary",
            "label": {"en": [format!("Level {}", lod_hint.to_uppercase())]},
            "service": [service]
        })
    }

    fn manifest_with_choices(choices: Vec<Vec<Value>>) -> Manifest {
        let annotations: Vec<Value> = choices
            .into_iter()
            .map(|items| json!({"type": "Annotation", "body": {"type": "Choice", "items": items}}))
            .collect();
        validate_manifest(&json!({
            "type": "Manifest",
            "label": {"en": ["Sponza"]},
            "summary": {"en": ["Atrium"]},
            "rights": "http://creativecommons.org/licenses/by/4.0/",
            "metadata": [
                {"label": {"en": ["Attribution"]}, "value": {"en": ["Crytek"]}},
                {"label": {"en": ["Empty"]}, "value": {"en": [""]}}
            ],
            "items": [{"type": "Canvas", "items": [{"type": "AnnotationPage", "items": annotations}]}]
        }))
        .unwrap()
    }

    fn levels(record: &ModelRecord) -> Vec<(LodLevel, String)> {
        record.lods.iter().map(|(l, a)| (*l, a.url.clone())).collect()
    }

    #[test]
    fn test_smallest_asset_is_low_regardless_of_hints() {
        // Input order and embedded hints both disagree with size order
        let manifest = manifest_with_choices(vec![vec![
            option("/sponza/big.glb", Some(50 * MB), "lod3"),
            option("/sponza/small.glb", Some(2 * MB), "lod0"),
            option("/sponza/mid.glb", Some(10 * MB), "lod1"),
        ]]);

        let models = extract_models(&manifest, &UrlRewriteTable::default());
        assert_eq!(models.len(), 1);
        assert_eq!(
            levels(&models[0]),
            vec![
                (LodLevel::Low, "/data/models/sponza/small.glb".to_string()),
                (LodLevel::Medium, "/data/models/sponza/mid.glb".to_string()),
                (LodLevel::High, "/data/models/sponza/big.glb".to_string()),
            ]
        );
        assert_eq!(models[0].lods[&LodLevel::Low].original_lod.as_deref(), Some("lod0"));
        assert!(models[0].collapsed.is_empty());
    }

    #[test]
    fn test_ties_keep_document_order() {
        let manifest = manifest_with_choices(vec![vec![
            option("a.glb", Some(MB), "x"),
            option("b.glb", None, "x"),
            option("c.glb", Some(MB), "x"),
        ]]);

        let models = extract_models(&manifest, &UrlRewriteTable::identity());
        let urls: Vec<_> = models[0].lods.values().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["b.glb", "a.glb", "c.glb"]);
    }

    #[test]
    fn test_more_than_five_options_collapse_into_extreme() {
        let items = (1..=7)
            .map(|i| option(&format!("lod{i}.glb"), Some(i * MB), "x"))
            .collect();
        let manifest = manifest_with_choices(vec![items]);

        let models = extract_models(&manifest, &UrlRewriteTable::identity());
        let record = &models[0];
        assert_eq!(record.lods.len(), 5);
        assert_eq!(record.lods[&LodLevel::Extreme].url, "lod7.glb");
        let collapsed: Vec<_> = record.collapsed.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(collapsed, vec!["lod5.glb", "lod6.glb"]);
    }

    #[test]
    fn test_non_model_options_are_ignored() {
        let manifest = manifest_with_choices(vec![
            vec![
                json!({"id": "thumb.png", "type": "Image", "format": "image/png"}),
                json!({"id": "m.gltf", "type": "Model", "format": "model/gltf+json"}),
            ],
            vec![option("only.glb", Some(3), "lod0")],
        ]);

        let models = extract_models(&manifest, &UrlRewriteTable::identity());
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "model");
        assert_eq!(levels(&models[0]), vec![(LodLevel::Low, "only.glb".to_string())]);
    }

    #[test]
    fn test_record_ids_and_metadata() {
        let manifest = manifest_with_choices(vec![
            vec![option("a.glb", Some(1), "x")],
            vec![option("b.glb", Some(1), "x")],
        ]);

        let models = extract_models(&manifest, &UrlRewriteTable::identity());
        assert_eq!(models[0].id, "model");
        assert_eq!(models[1].id, "model-2");
        assert_eq!(models[0].name, "Sponza");
        assert_eq!(models[0].description, "Atrium");
        assert_eq!(models[0].metadata.get("attribution").map(String::as_str), Some("Crytek"));
        assert!(!models[0].metadata.contains_key("empty"));
        assert_eq!(
            models[0].metadata.get("license").map(String::as_str),
            Some("http://creativecommons.org/licenses/by/4.0/")
        );
    }

    #[test]
    fn test_option_without_id_has_no_url() {
        let mut unnamed = option("ignored", Some(1), "lod0");
        unnamed.as_object_mut().unwrap().remove("id");
        let manifest = manifest_with_choices(vec![vec![
            unnamed,
            option("/sponza/b.glb", Some(2), "lod1"),
        ]]);

        let record = &extract_models(&manifest, &UrlRewriteTable::default())[0];
        assert_eq!(record.lods[&LodLevel::Low].url, "");
        assert!(!record.lods[&LodLevel::Low].has_url());

        let config = record.to_configuration(true).unwrap();
        assert_eq!(config.lod_levels().as_slice(), &[LodLevel::Low, LodLevel::Medium]);
        assert_eq!(config.url(LodLevel::Low), None);
        assert_eq!(config.url(LodLevel::Medium), Some("/data/models/sponza/b.glb"));
    }

    #[test]
    fn test_to_configuration() {
        let manifest = manifest_with_choices(vec![vec![
            option("a.glb", Some(1), "x"),
            option("b.glb", Some(2), "x"),
        ]]);
        let record = &extract_models(&manifest, &UrlRewriteTable::identity())[0];

        let config = record.to_configuration(false).unwrap();
        assert_eq!(config.lod_levels().as_slice(), &[LodLevel::Low, LodLevel::Medium]);
        assert!(!config.progressive);
        assert_eq!(config.metadata.name, "Sponza");
        assert_eq!(config.url(LodLevel::Medium), Some("b.glb"));
    }
}
