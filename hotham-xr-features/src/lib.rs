//! OpenXR feature management for Hotham.
//!
//! Features are small pieces of OpenXR functionality (an extension, an interaction profile, a
//! vendor's runtime loader) that can be switched on and off per build target. This crate
//! keeps track of them and decides three things:
//!
//! - which custom OpenXR loader, if any, ships with a build ([`LoaderArbiter`]),
//! - which native plugins are included in a build ([`plan_build`]),
//! - in what order features hear about OpenXR lifecycle events ([`LifecycleDispatcher`]).
//!
//! # Getting started
//! Register your features with a [`FeatureRegistry`], create [`FeatureSettings`] for the
//! build target, enable what you need, and hand the settings to a [`LifecycleDispatcher`]
//! when OpenXR starts.

pub use openxr_sys as xr;

pub use api_version::{ApiVersion, ApiVersionError};
pub use build_target::BuildTargetGroup;
pub use config::{FeatureConfig, FeatureManifest, TargetConfig};
pub use descriptor::{CustomLoader, FeatureCategory, FeatureDescriptor, FeatureDescriptorBuilder};
pub use dispatch::LifecycleDispatcher;
pub use events::LifecycleEvent;
pub use feature::{DeclaredFeature, Feature};
pub use feature_error::FeatureError;
pub use feature_set::FeatureSet;
pub use loader::{FeatureInfo, LoaderArbiter, LoaderArbitration, LoaderDeclaration, LoaderProblems};
pub use native::{LoaderEvent, NativeConfig, NativeEvent};
pub use plugins::{editor_loader_path, plan_build, BuildPlan, PluginImport};
pub use registry::FeatureRegistry;
pub use settings::{FeatureInstance, FeatureSettings};
pub use validation::{validate, ValidationIssue, ValidationRule};

mod api_version;
mod build_target;
/// Stored feature configuration and feature manifests
pub mod config;
mod descriptor;
mod dispatch;
mod events;
mod feature;
mod feature_error;
mod feature_set;
/// Custom loader arbitration
pub mod loader;
/// Events and configuration coming from the native OpenXR provider
pub mod native;
/// Native plugin selection for builds
pub mod plugins;
mod registry;
mod settings;
/// Project validation
pub mod validation;

/// Result type for feature operations
pub type FeatureResult<T> = std::result::Result<T, FeatureError>;
