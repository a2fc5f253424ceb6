//! Language Maps
//!
//! IIIF labels are either plain strings or `{language: [values]}` maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One or more values for a language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValues {
    One(String),
    Many(Vec<String>),
}

impl LabelValues {
    fn first(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value.as_str()),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }
}

/// A IIIF label, summary or metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Languages(IndexMap<String, LabelValues>),
    Other(serde_json::Value),
}

impl Label {
    /// Display text: the first English value, then `none`, then any language
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Languages(languages) => ["en", "none"]
                .iter()
                .find_map(|lang| languages.get(*lang).and_then(LabelValues::first))
                .or_else(|| languages.values().find_map(LabelValues::first))
                .unwrap_or(""),
            Self::Other(_) => "",
        }
    }
}

/// Text of an optional label, empty when absent
pub fn label_text(label: Option<&Label>) -> String {
    label.map(Label::text).unwrap_or_default().to_string()
}
