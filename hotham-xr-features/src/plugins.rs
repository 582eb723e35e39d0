use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    ApiVersion, BuildTargetGroup, FeatureError, FeatureResult, FeatureSettings, LoaderArbiter,
};

/// Base name of the default OpenXR loader library
pub const LOADER_LIBRARY_NAME: &str = "openxr_loader";

/// Base name of the native OpenXR provider library
pub const PROVIDER_LIBRARY_NAME: &str = "UnityOpenXR";

/// A native plugin file in the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginImport {
    /// Path to the library
    pub path: PathBuf,
    /// Build targets the library can be used on. Empty means all of them.
    #[serde(default)]
    pub targets: BTreeSet<BuildTargetGroup>,
    /// Can the library be loaded by the editor?
    #[serde(default)]
    pub editor: bool,
}

impl PluginImport {
    /// Is the library compatible with `target`?
    pub fn supports(&self, target: BuildTargetGroup) -> bool {
        self.targets.is_empty() || self.targets.contains(&target)
    }

    fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    fn is_loader(&self, loader_names: &BTreeSet<&str>) -> bool {
        let file_name = self.file_name();
        loader_names.iter().any(|name| file_name.contains(name))
    }

    fn is_provider(&self) -> bool {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map_or(false, |stem| {
                stem.trim_start_matches("lib") == PROVIDER_LIBRARY_NAME
            })
    }

    fn is_under(&self, directory: &Path) -> bool {
        self.path
            .parent()
            .map_or(false, |parent| parent.starts_with(directory))
    }
}

/// What goes into a build for one target
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildPlan {
    /// Id of the feature whose custom loader ships with the build, if any
    pub active_loader: Option<String>,
    /// Base name of the custom loader library, when it isn't `openxr_loader`
    pub custom_loader_name: Option<String>,
    /// The OpenXR API version to request from the runtime
    pub api_version: ApiVersion,
    /// Plugins to include
    pub included: Vec<PathBuf>,
    /// Plugins to leave out
    pub excluded: Vec<PathBuf>,
}

impl BuildPlan {
    /// Will `path` be part of the build?
    pub fn includes(&self, path: impl AsRef<Path>) -> bool {
        self.included.iter().any(|p| p == path.as_ref())
    }

    /// Is `path` explicitly left out of the build?
    pub fn excludes(&self, path: impl AsRef<Path>) -> bool {
        self.excluded.iter().any(|p| p == path.as_ref())
    }
}

/// Decide which loader and which native plugins go into a build for `settings`' target.
///
/// Plugins that no feature claims, and that aren't loaders or the provider library, appear
/// in neither list: the host decides what to do with them.
pub fn plan_build(
    settings: &FeatureSettings,
    imports: &[PluginImport],
    arbiter: &LoaderArbiter,
    openxr_enabled: bool,
) -> FeatureResult<BuildPlan> {
    let target = settings.target();
    let infos = settings.feature_info();
    let arbitration = arbiter.arbitrate(&infos);
    let winner = arbitration.winner.map(|info| info.descriptor);

    let mut plan = BuildPlan {
        active_loader: winner.map(|descriptor| descriptor.id.clone()),
        custom_loader_name: winner
            .and_then(|descriptor| descriptor.custom_loader.as_ref())
            .and_then(|loader| loader.library_name.clone()),
        api_version: arbitration.requested_api_version(arbiter.baseline()),
        ..Default::default()
    };

    let loader_names = loader_names(settings);
    let (loaders, plugins): (Vec<&PluginImport>, Vec<&PluginImport>) = imports
        .iter()
        .filter(|import| import.supports(target))
        .partition(|import| import.is_loader(&loader_names));

    // Every loader is left out, except the one that is chosen below
    let chosen: Vec<&PluginImport> = if openxr_enabled {
        let plugin_dirs = plugin_dirs(settings);
        match winner {
            Some(descriptor) => find_loaders_for(
                &loaders,
                &descriptor.id,
                descriptor.plugin_path.as_deref(),
            )?,
            None => find_default_loaders(&loaders, &plugin_dirs, target)?,
        }
    } else {
        Vec::new()
    };

    for loader in &loaders {
        if chosen.iter().any(|c| c.path == loader.path) {
            plan.included.push(loader.path.clone());
        } else {
            plan.excluded.push(loader.path.clone());
        }
    }

    for plugin in plugins {
        let mut include = None;
        if plugin.is_provider() {
            include = Some(openxr_enabled);
        }

        let mut seen = false;
        for feature in settings.features() {
            let Some(directory) = feature.descriptor().plugin_path.as_deref() else {
                continue;
            };
            if !plugin.is_under(directory) {
                continue;
            }
            if feature.enabled() {
                include = Some(openxr_enabled);
            } else if !seen {
                include = Some(false);
            }
            seen = true;
        }

        match include {
            Some(true) => plan.included.push(plugin.path.clone()),
            Some(false) => plan.excluded.push(plugin.path.clone()),
            None => {}
        }
    }

    info!(
        "[HOTHAM_XR_FEATURES] Build plan for {target}: loader {}, API version {}, {} plugin(s) included, {} excluded",
        plan.active_loader.as_deref().unwrap_or("default"),
        plan.api_version,
        plan.included.len(),
        plan.excluded.len()
    );
    Ok(plan)
}

/// The loader library the editor should load. The editor runs standalone builds only, so
/// `settings` for any other target are rejected with [`FeatureError::NotStandalone`].
pub fn editor_loader_path(
    settings: &FeatureSettings,
    imports: &[PluginImport],
    arbiter: &LoaderArbiter,
) -> FeatureResult<PathBuf> {
    let target = settings.target();
    if target != BuildTargetGroup::Standalone {
        return Err(FeatureError::NotStandalone(target));
    }
    let infos = settings.feature_info();
    let arbitration = arbiter.arbitrate(&infos);
    let loader_names = loader_names(settings);
    let loaders: Vec<&PluginImport> = imports
        .iter()
        .filter(|import| import.editor && import.is_loader(&loader_names))
        .collect();

    let chosen = match arbitration.winner {
        Some(info) => find_loaders_for(
            &loaders,
            &info.descriptor.id,
            info.descriptor.plugin_path.as_deref(),
        )?,
        None => find_default_loaders(&loaders, &plugin_dirs(settings), target)?,
    };

    chosen
        .first()
        .map(|loader| loader.path.clone())
        .ok_or(FeatureError::LoaderLibraryNotFound(target))
}

fn loader_names(settings: &FeatureSettings) -> BTreeSet<&str> {
    let mut names: BTreeSet<&str> = settings
        .features()
        .iter()
        .filter_map(|f| f.descriptor().custom_loader.as_ref())
        .filter_map(|loader| loader.library_name.as_deref())
        .collect();
    names.insert(LOADER_LIBRARY_NAME);
    names
}

fn plugin_dirs(settings: &FeatureSettings) -> Vec<&Path> {
    settings
        .features()
        .iter()
        .filter_map(|f| f.descriptor().plugin_path.as_deref())
        .collect()
}

fn find_loaders_for<'a>(
    loaders: &[&'a PluginImport],
    feature: &str,
    plugin_path: Option<&Path>,
) -> FeatureResult<Vec<&'a PluginImport>> {
    let found: Vec<&PluginImport> = match plugin_path {
        Some(directory) => loaders
            .iter()
            .copied()
            .filter(|loader| loader.is_under(directory))
            .collect(),
        None => Vec::new(),
    };

    if found.is_empty() {
        return Err(FeatureError::CustomLoaderLibraryNotFound {
            feature: feature.to_string(),
            path: plugin_path.map(Path::to_path_buf).unwrap_or_default(),
        });
    }
    debug!("[HOTHAM_XR_FEATURES] Using {} loader library(s) from {feature}", found.len());
    Ok(found)
}

fn find_default_loaders<'a>(
    loaders: &[&'a PluginImport],
    plugin_dirs: &[&Path],
    target: BuildTargetGroup,
) -> FeatureResult<Vec<&'a PluginImport>> {
    let found: Vec<&PluginImport> = loaders
        .iter()
        .copied()
        .filter(|loader| !plugin_dirs.iter().any(|dir| loader.is_under(dir)))
        .collect();

    if found.is_empty() {
        return Err(FeatureError::LoaderLibraryNotFound(target));
    }
    Ok(found)
}
