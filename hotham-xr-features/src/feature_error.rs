use std::path::PathBuf;

use thiserror::Error;

use crate::{api_version::ApiVersionError, BuildTargetGroup};

/// Everything that can go wrong while configuring or driving OpenXR features
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("No OpenXR feature with id {0} is registered")]
    UnknownFeature(String),
    #[error("An OpenXR feature with id {0} is already registered")]
    DuplicateFeature(String),
    #[error("An OpenXR feature set with id {0} is already registered")]
    DuplicateFeatureSet(String),
    #[error("No OpenXR feature set with id {0} is registered for this build target")]
    UnknownFeatureSet(String),
    #[error("OpenXR feature state cannot be changed while OpenXR is running")]
    RuntimeActive,
    #[error("OpenXR feature {feature} is required by the enabled feature set {feature_set}")]
    RequiredByFeatureSet { feature: String, feature_set: String },
    #[error("No OpenXR loader library found for {0}")]
    LoaderLibraryNotFound(BuildTargetGroup),
    #[error("The editor only runs standalone builds, got settings for {0}")]
    NotStandalone(BuildTargetGroup),
    #[error("No OpenXR loader library found for feature {feature}, expected one in {}", path.display())]
    CustomLoaderLibraryNotFound { feature: String, path: PathBuf },
    #[error("Unknown native event {0}")]
    UnknownNativeEvent(u32),
    #[error("OpenXR feature {feature} failed while handling {event}")]
    HookFailed {
        feature: String,
        event: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    InvalidApiVersion(#[from] ApiVersionError),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
