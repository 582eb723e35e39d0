//! Choosing which OpenXR runtime loader goes into a build.
//!
//! Features may ship their own loader library for some build targets. At most one of them can
//! be used, so the enabled candidates are arbitrated:
//!
//! 1. A single loader declared *without* an API version is an override and wins outright.
//!    Two or more overrides are a configuration error: it is logged and the overrides are
//!    ignored.
//! 2. Otherwise only loaders whose declared version is strictly newer than the default loader
//!    are considered, the newest version wins, and among loaders with that version the highest
//!    feature priority wins. Equal priorities are broken by the lowest feature id.
//! 3. If nothing survives, the default loader is used.
//!
//! Loaders whose declared version can't be parsed never take part.

use std::cmp::Reverse;

use log::{error, info, warn};

use crate::{ApiVersion, BuildTargetGroup, FeatureDescriptor};

/// How a feature declares its custom loader for one build target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderDeclaration {
    /// No API version given: the loader forces itself over every other one
    Override,
    /// A loader supporting the given API version
    Versioned(ApiVersion),
    /// A version was given but couldn't be parsed. The loader is never used.
    Malformed(String),
}

impl LoaderDeclaration {
    /// The declaration `descriptor` makes for `target`, if it ships a loader there
    pub fn for_target(descriptor: &FeatureDescriptor, target: BuildTargetGroup) -> Option<Self> {
        let loader = descriptor.custom_loader.as_ref()?;
        if !loader.build_targets.contains(&target) {
            return None;
        }

        let declaration = match loader.version.as_deref() {
            None => LoaderDeclaration::Override,
            Some(raw) => match ApiVersion::parse(raw) {
                Ok(version) => LoaderDeclaration::Versioned(version),
                Err(_) => LoaderDeclaration::Malformed(raw.to_string()),
            },
        };
        Some(declaration)
    }

    /// The declared version, if there is a valid one
    pub fn version(&self) -> Option<ApiVersion> {
        match self {
            LoaderDeclaration::Versioned(version) => Some(*version),
            _ => None,
        }
    }
}

/// A feature, as seen by the loader arbitrator
#[derive(Debug, Clone)]
pub struct FeatureInfo<'a> {
    /// The feature's metadata
    pub descriptor: &'a FeatureDescriptor,
    /// Is the feature enabled for the target?
    pub enabled: bool,
    /// The feature's custom loader for the target, if any
    pub loader: Option<LoaderDeclaration>,
}

impl<'a> FeatureInfo<'a> {
    /// Shorthand for `descriptor.id`
    pub fn id(&self) -> &'a str {
        &self.descriptor.id
    }
}

/// The outcome of loader arbitration
#[derive(Debug, Clone)]
pub struct LoaderArbitration<'i, 'a> {
    /// The feature whose loader should be used, or `None` for the default loader
    pub winner: Option<&'i FeatureInfo<'a>>,
    /// Names of the override loaders that conflicted with each other, if there were several
    pub conflicting_overrides: Vec<&'a str>,
    /// Ids of enabled features whose loader version couldn't be parsed
    pub malformed: Vec<&'a str>,
}

impl<'i, 'a> LoaderArbitration<'i, 'a> {
    /// The id of the winning feature, if any
    pub fn winner_id(&self) -> Option<&'a str> {
        self.winner.map(|info| info.id())
    }

    /// The OpenXR API version to request: the winning loader's, or `baseline` when the default
    /// loader or an override loader is used.
    pub fn requested_api_version(&self, baseline: ApiVersion) -> ApiVersion {
        self.winner
            .and_then(|info| info.loader.as_ref())
            .and_then(LoaderDeclaration::version)
            .unwrap_or(baseline)
    }
}

/// Picks the custom loader for a build, see the module docs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderArbiter {
    baseline: ApiVersion,
}

impl Default for LoaderArbiter {
    fn default() -> Self {
        Self::new(ApiVersion::DEFAULT_LOADER)
    }
}

impl LoaderArbiter {
    /// An arbiter comparing against the default loader's API version `baseline`
    pub fn new(baseline: ApiVersion) -> Self {
        Self { baseline }
    }

    /// The version of the default loader
    pub fn baseline(&self) -> ApiVersion {
        self.baseline
    }

    /// Choose between the custom loaders of the enabled features in `features`
    pub fn arbitrate<'i, 'a>(&self, features: &'i [FeatureInfo<'a>]) -> LoaderArbitration<'i, 'a> {
        let Candidates {
            overrides,
            versioned,
            malformed,
        } = Candidates::collect(features);

        for info in features.iter().filter(|info| info.enabled) {
            if let Some(LoaderDeclaration::Malformed(raw)) = &info.loader {
                warn!(
                    "[HOTHAM_XR_FEATURES] Ignoring the custom loader of {}: {raw:?} is not a valid OpenXR API version",
                    info.descriptor.display_name()
                );
            }
        }

        let mut conflicting_overrides = Vec::new();
        match overrides.as_slice() {
            [only] => {
                info!(
                    "[HOTHAM_XR_FEATURES] Using forced custom loader override provided by the OpenXR feature {}, with version null",
                    only.descriptor.display_name()
                );
                return LoaderArbitration {
                    winner: Some(*only),
                    conflicting_overrides,
                    malformed,
                };
            }
            [] => {}
            many => {
                conflicting_overrides = many.iter().map(|i| i.descriptor.display_name()).collect();
                error!(
                    "[HOTHAM_XR_FEATURES] Only one OpenXR feature may force a custom runtime loader override per platform. \
                     Verify that only one of the following features doesn't specify a custom loader OpenXR API version: {}",
                    conflicting_overrides.join(",")
                );
            }
        }

        // Newest version first, then highest priority, then lowest id. Sorting by value keeps
        // the result independent of the order features were given in.
        let winner = versioned
            .into_iter()
            .filter(|(version, _)| *version > self.baseline)
            .min_by_key(|(version, info)| {
                (Reverse(*version), Reverse(info.descriptor.priority), info.id())
            })
            .map(|(version, info)| {
                info!(
                    "[HOTHAM_XR_FEATURES] Using custom loader provided by the OpenXR feature {}, with version {version}",
                    info.descriptor.display_name()
                );
                info
            });

        LoaderArbitration {
            winner,
            conflicting_overrides,
            malformed,
        }
    }
}

/// Enabled features with a custom loader for the target, sorted by declaration kind
struct Candidates<'i, 'a> {
    overrides: Vec<&'i FeatureInfo<'a>>,
    versioned: Vec<(ApiVersion, &'i FeatureInfo<'a>)>,
    malformed: Vec<&'a str>,
}

impl<'i, 'a> Candidates<'i, 'a> {
    fn collect(features: &'i [FeatureInfo<'a>]) -> Self {
        let mut candidates = Candidates {
            overrides: Vec::new(),
            versioned: Vec::new(),
            malformed: Vec::new(),
        };
        for info in features.iter().filter(|info| info.enabled) {
            match &info.loader {
                Some(LoaderDeclaration::Override) => candidates.overrides.push(info),
                Some(LoaderDeclaration::Versioned(version)) => {
                    candidates.versioned.push((*version, info))
                }
                Some(LoaderDeclaration::Malformed(_)) => candidates.malformed.push(info.id()),
                None => {}
            }
        }
        candidates
    }
}

/// Custom loader declarations that need fixing, found without choosing a loader or logging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderProblems<'a> {
    /// Names of the enabled features that all force a loader override
    pub conflicting_overrides: Vec<&'a str>,
    /// Ids of enabled features whose loader version couldn't be parsed
    pub malformed: Vec<&'a str>,
}

impl<'a> LoaderProblems<'a> {
    /// Look for problems among the enabled features in `features`
    pub fn find(features: &[FeatureInfo<'a>]) -> Self {
        let candidates = Candidates::collect(features);
        let conflicting_overrides = if candidates.overrides.len() > 1 {
            candidates
                .overrides
                .iter()
                .map(|info| info.descriptor.display_name())
                .collect()
        } else {
            Vec::new()
        };
        Self {
            conflicting_overrides,
            malformed: candidates.malformed,
        }
    }

    /// Nothing to fix?
    pub fn is_empty(&self) -> bool {
        self.conflicting_overrides.is_empty() && self.malformed.is_empty()
    }
}
