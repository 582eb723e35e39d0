use std::{collections::BTreeSet, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::BuildTargetGroup;

/// Where a feature shows up in feature lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCategory {
    /// A general purpose feature
    #[default]
    Feature,
    /// An interaction profile
    Interaction,
}

/// A custom OpenXR runtime loader shipped by a feature instead of the default one
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomLoader {
    /// Build targets the loader is provided for
    pub build_targets: BTreeSet<BuildTargetGroup>,
    /// The OpenXR API version the loader supports, as declared.
    ///
    /// Leaving this out makes the loader an override: it wins arbitration outright. A string
    /// that is present but not a valid version takes the loader out of arbitration instead.
    pub version: Option<String>,
    /// Base name of the loader library, if it differs from `openxr_loader`
    pub library_name: Option<String>,
}

/// Static metadata describing an OpenXR feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    /// Unique reverse-DNS identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Who makes the feature
    #[serde(default)]
    pub company: Option<String>,
    /// Feature version, free form
    #[serde(default)]
    pub version: Option<String>,
    /// A short description
    #[serde(default)]
    pub description: Option<String>,
    /// A link to documentation for the feature
    #[serde(default)]
    pub documentation_link: Option<String>,
    /// Feature or interaction profile
    #[serde(default)]
    pub category: FeatureCategory,
    /// Higher priorities are dispatched first
    #[serde(default)]
    pub priority: i32,
    /// If a required feature fails to initialize, OpenXR startup should be abandoned
    #[serde(default)]
    pub required: bool,
    /// Build targets the feature is available on. Empty means all of them.
    #[serde(default)]
    pub build_targets: BTreeSet<BuildTargetGroup>,
    /// OpenXR extensions the feature needs
    #[serde(default)]
    pub openxr_extensions: Vec<String>,
    /// Directory containing the feature's native plugins
    #[serde(default)]
    pub plugin_path: Option<PathBuf>,
    /// A custom runtime loader provided by this feature
    #[serde(default)]
    pub custom_loader: Option<CustomLoader>,
}

impl FeatureDescriptor {
    /// Start building a descriptor for the feature with the given id
    pub fn builder(id: &str) -> FeatureDescriptorBuilder {
        FeatureDescriptorBuilder::new(id)
    }

    /// Is this feature available on `target`?
    pub fn supports(&self, target: BuildTargetGroup) -> bool {
        self.build_targets.is_empty() || self.build_targets.contains(&target)
    }

    /// Does this feature ship a custom loader for `target`?
    pub fn declares_loader_for(&self, target: BuildTargetGroup) -> bool {
        self.custom_loader
            .as_ref()
            .map_or(false, |loader| loader.build_targets.contains(&target))
    }

    /// The name used in logs: the display name, or the id if there isn't one
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Builder for [`FeatureDescriptor`]
#[derive(Debug, Clone)]
pub struct FeatureDescriptorBuilder {
    descriptor: FeatureDescriptor,
}

impl FeatureDescriptorBuilder {
    /// Create a builder for the feature with the given id
    pub fn new(id: &str) -> Self {
        Self {
            descriptor: FeatureDescriptor {
                id: id.to_string(),
                name: String::new(),
                company: None,
                version: None,
                description: None,
                documentation_link: None,
                category: FeatureCategory::Feature,
                priority: 0,
                required: false,
                build_targets: BTreeSet::new(),
                openxr_extensions: Vec::new(),
                plugin_path: None,
                custom_loader: None,
            },
        }
    }

    /// Set the display name
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.descriptor.name = name.to_string();
        self
    }

    /// Set the company
    pub fn company(&mut self, company: &str) -> &mut Self {
        self.descriptor.company = Some(company.to_string());
        self
    }

    /// Set the feature version
    pub fn version(&mut self, version: &str) -> &mut Self {
        self.descriptor.version = Some(version.to_string());
        self
    }

    /// Set the description
    pub fn description(&mut self, description: &str) -> &mut Self {
        self.descriptor.description = Some(description.to_string());
        self
    }

    /// Set the documentation link
    pub fn documentation_link(&mut self, link: &str) -> &mut Self {
        self.descriptor.documentation_link = Some(link.to_string());
        self
    }

    /// Set the category
    pub fn category(&mut self, category: FeatureCategory) -> &mut Self {
        self.descriptor.category = category;
        self
    }

    /// Set the priority
    pub fn priority(&mut self, priority: i32) -> &mut Self {
        self.descriptor.priority = priority;
        self
    }

    /// Mark the feature as required
    pub fn required(&mut self, required: bool) -> &mut Self {
        self.descriptor.required = required;
        self
    }

    /// Restrict the feature to the given build targets
    pub fn build_targets(
        &mut self,
        targets: impl IntoIterator<Item = BuildTargetGroup>,
    ) -> &mut Self {
        self.descriptor.build_targets = targets.into_iter().collect();
        self
    }

    /// Add an OpenXR extension the feature needs
    pub fn openxr_extension(&mut self, extension: &str) -> &mut Self {
        self.descriptor.openxr_extensions.push(extension.to_string());
        self
    }

    /// Set the directory containing the feature's native plugins
    pub fn plugin_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.descriptor.plugin_path = Some(path.into());
        self
    }

    /// Declare a custom loader
    pub fn custom_loader(&mut self, loader: CustomLoader) -> &mut Self {
        self.descriptor.custom_loader = Some(loader);
        self
    }

    /// Build the descriptor
    pub fn build(&mut self) -> FeatureDescriptor {
        self.descriptor.clone()
    }
}
