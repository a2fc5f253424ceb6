//! Asset URL Rewriting
//!
//! Manifests are authored against a placeholder host and a legacy path layout.
//! A fixed table of `{prefix -> target}` rules maps their identifiers onto the
//! viewer's asset paths. Rules only ever replace a leading prefix and run in
//! table order.

use serde::{Deserialize, Serialize};

/// Placeholder host used by generated manifests
pub const PLACEHOLDER_HOST: &str = "https://example.com/3d";

/// One prefix substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub prefix: String,
    pub target: String,
}

impl RewriteRule {
    /// Create a rule
    pub fn new(prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            target: target.into(),
        }
    }
}

/// Ordered rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlRewriteTable {
    rules: Vec<RewriteRule>,
}

impl UrlRewriteTable {
    /// Table with the given rules
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// Table that leaves every URL untouched
    pub fn identity() -> Self {
        Self { rules: Vec::new() }
    }

    /// The rules in application order
    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Apply every rule in order
    pub fn apply(&self, url: &str) -> String {
        self.rules.iter().fold(url.to_string(), |url, rule| {
            match url.strip_prefix(rule.prefix.as_str()) {
                Some(rest) => format!("{}{}", rule.target, rest),
                None => url,
            }
        })
    }
}

impl Default for UrlRewriteTable {
    fn default() -> Self {
        Self::new(vec![
            RewriteRule::new(PLACEHOLDER_HOST, ""),
            RewriteRule::new("/sponza/", "/data/models/sponza/"),
        ])
    }
}
