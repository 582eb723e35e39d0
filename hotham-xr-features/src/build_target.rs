use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A platform category whose OpenXR configuration is resolved independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTargetGroup {
    /// Windows, macOS and Linux desktop builds
    Standalone,
    /// Android, including standalone headsets like the Quest
    Android,
    /// iOS
    Ios,
    /// WebGL
    WebGl,
    /// Universal Windows Platform
    Wsa,
    /// PlayStation 5
    Ps5,
}

impl BuildTargetGroup {
    /// Every build target group, in declaration order
    pub const ALL: [BuildTargetGroup; 6] = [
        BuildTargetGroup::Standalone,
        BuildTargetGroup::Android,
        BuildTargetGroup::Ios,
        BuildTargetGroup::WebGl,
        BuildTargetGroup::Wsa,
        BuildTargetGroup::Ps5,
    ];

    /// The lowercase name used in configuration files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTargetGroup::Standalone => "standalone",
            BuildTargetGroup::Android => "android",
            BuildTargetGroup::Ios => "ios",
            BuildTargetGroup::WebGl => "webgl",
            BuildTargetGroup::Wsa => "wsa",
            BuildTargetGroup::Ps5 => "ps5",
        }
    }
}

impl fmt::Display for BuildTargetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTargetGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildTargetGroup::ALL
            .into_iter()
            .find(|target| target.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown build target group {s:?}"))
    }
}
