use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    ApiVersion, BuildTargetGroup, FeatureDescriptor, FeatureRegistry, FeatureResult, FeatureSet,
    PluginImport,
};

/// Stored feature state for one build target
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Ids of the features that are switched on
    pub enabled_features: BTreeSet<String>,
    /// Ids of the feature sets that are switched on
    pub feature_sets: BTreeSet<String>,
}

fn default_openxr_enabled() -> bool {
    true
}

/// Stored feature state for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// The API version of the default loader. Custom loaders must be newer to be chosen.
    #[serde(default)]
    pub loader_api_version: ApiVersion,
    /// Is OpenXR switched on at all?
    #[serde(default = "default_openxr_enabled")]
    pub openxr_enabled: bool,
    /// Per target feature state
    #[serde(default)]
    pub targets: BTreeMap<BuildTargetGroup, TargetConfig>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            loader_api_version: ApiVersion::DEFAULT_LOADER,
            openxr_enabled: true,
            targets: BTreeMap::new(),
        }
    }
}

impl FeatureConfig {
    /// Read a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> FeatureResult<Self> {
        let path = path.as_ref();
        debug!("[HOTHAM_XR_FEATURES] Loading configuration from {}", path.display());
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> FeatureResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration as pretty printed JSON
    pub fn to_json(&self) -> FeatureResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The stored state for `target`. Targets without any stored state get an empty one.
    pub fn target(&self, target: BuildTargetGroup) -> TargetConfig {
        self.targets.get(&target).cloned().unwrap_or_default()
    }
}

/// The features, feature sets and native plugins a project declares
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureManifest {
    /// Feature declarations
    pub features: Vec<FeatureDescriptor>,
    /// Feature set declarations
    pub feature_sets: Vec<FeatureSet>,
    /// Every native plugin in the project
    pub plugins: Vec<PluginImport>,
}

impl FeatureManifest {
    /// Read a manifest from a JSON file
    pub fn load(path: impl AsRef<Path>) -> FeatureResult<Self> {
        let path = path.as_ref();
        debug!("[HOTHAM_XR_FEATURES] Loading manifest from {}", path.display());
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Parse a manifest from JSON
    pub fn from_json(json: &str) -> FeatureResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// A registry with every declared feature and feature set. The features have no
    /// behaviour, which is all that build planning and validation need.
    pub fn registry(&self) -> FeatureResult<FeatureRegistry> {
        let mut registry = FeatureRegistry::new();
        for descriptor in &self.features {
            registry.register_declared(descriptor.clone())?;
        }
        for feature_set in &self.feature_sets {
            registry.register_feature_set(feature_set.clone())?;
        }
        Ok(registry)
    }
}
