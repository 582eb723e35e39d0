use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::BuildTargetGroup;

/// A named group of features that are usually switched on together, eg. everything a
/// particular headset vendor needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Unique identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// A short description
    #[serde(default)]
    pub description: Option<String>,
    /// Build targets the set applies to. Empty means all of them.
    #[serde(default)]
    pub build_targets: BTreeSet<BuildTargetGroup>,
    /// Features that are enabled with the set and can't be disabled while it is enabled
    #[serde(default)]
    pub required_features: Vec<String>,
    /// Features that are enabled with the set but may be switched off afterwards
    #[serde(default)]
    pub default_features: Vec<String>,
}

impl FeatureSet {
    /// Is this set available on `target`?
    pub fn supports(&self, target: BuildTargetGroup) -> bool {
        self.build_targets.is_empty() || self.build_targets.contains(&target)
    }

    /// Does this set require the feature with the given id?
    pub fn requires(&self, feature_id: &str) -> bool {
        self.required_features
            .iter()
            .any(|id| id.eq_ignore_ascii_case(feature_id))
    }
}
