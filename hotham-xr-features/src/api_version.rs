use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An OpenXR API version: `major.minor.patch`, with field widths matching `XR_MAKE_VERSION`.
///
/// Ordering is lexicographic over (major, minor, patch). An absent version is modelled as
/// `Option<ApiVersion>` by callers, which sorts `None` below every concrete version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Patch version
    pub patch: u32,
}

/// Reasons a version string was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiVersionError {
    /// Nothing to parse
    #[error("The OpenXR API version string was empty")]
    Empty,
    /// Not exactly three dot separated tokens
    #[error("Expected an OpenXR API version of the form major.minor.patch, found {0} token(s) in {1:?}")]
    TokenCount(usize, String),
    /// A token that is not a plain decimal number, or does not fit its field
    #[error("Invalid {field} component {token:?} in OpenXR API version")]
    InvalidComponent {
        /// Which component was rejected
        field: &'static str,
        /// The offending token
        token: String,
        /// Why the integer parse failed, when it was attempted
        #[source]
        source: Option<ParseIntError>,
    },
}

impl ApiVersion {
    /// The version of the OpenXR loader shipped by default
    pub const DEFAULT_LOADER: ApiVersion = ApiVersion::new(1, 1, 49);

    /// Create a new version
    pub const fn new(major: u16, minor: u16, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a strict `major.minor.patch` string
    pub fn parse(version: &str) -> Result<Self, ApiVersionError> {
        if version.is_empty() {
            return Err(ApiVersionError::Empty);
        }

        let tokens: Vec<&str> = version.split('.').collect();
        let [major, minor, patch] = tokens.as_slice() else {
            return Err(ApiVersionError::TokenCount(tokens.len(), version.to_string()));
        };

        Ok(Self {
            major: parse_component("major", major)?,
            minor: parse_component("minor", minor)?,
            patch: parse_component("patch", patch)?,
        })
    }
}

// `u16::from_str` happily accepts a leading `+`, so check the digits ourselves first.
fn parse_component<T: FromStr<Err = ParseIntError>>(
    field: &'static str,
    token: &str,
) -> Result<T, ApiVersionError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiVersionError::InvalidComponent {
            field,
            token: token.to_string(),
            source: None,
        });
    }

    token
        .parse()
        .map_err(|e| ApiVersionError::InvalidComponent {
            field,
            token: token.to_string(),
            source: Some(e),
        })
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::DEFAULT_LOADER
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ApiVersion {
    type Err = ApiVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApiVersion::parse(s)
    }
}

impl From<ApiVersion> for openxr_sys::Version {
    fn from(version: ApiVersion) -> Self {
        openxr_sys::Version::new(version.major, version.minor, version.patch)
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let version: ApiVersion = "1.2.3".parse().unwrap();
        assert_eq!(version, ApiVersion::new(1, 2, 3));
        assert_eq!(version.to_string(), "1.2.3");

        for v in [
            ApiVersion::new(0, 0, 0),
            ApiVersion::DEFAULT_LOADER,
            ApiVersion::new(u16::MAX, u16::MAX, u32::MAX),
        ] {
            assert_eq!(ApiVersion::parse(&v.to_string()), Ok(v));
        }
    }

    #[test]
    fn test_parse_rejects_wrong_token_count() {
        assert_eq!(ApiVersion::parse(""), Err(ApiVersionError::Empty));
        assert!(matches!(
            ApiVersion::parse("1.2"),
            Err(ApiVersionError::TokenCount(2, _))
        ));
        assert!(matches!(
            ApiVersion::parse("1.2.3.4"),
            Err(ApiVersionError::TokenCount(4, _))
        ));
        assert!(matches!(
            ApiVersion::parse("1"),
            Err(ApiVersionError::TokenCount(1, _))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_components() {
        for bad in ["1..3", "1.2.", "a.2.3", "1.-2.3", "1.+2.3", " 1.2.3", "1.2.3 ", "1.2.x"] {
            assert!(
                matches!(
                    ApiVersion::parse(bad),
                    Err(ApiVersionError::InvalidComponent { .. })
                ),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        // 65536 doesn't fit in the u16 major/minor fields
        let err = ApiVersion::parse("65536.0.0").unwrap_err();
        assert!(matches!(
            err,
            ApiVersionError::InvalidComponent { field: "major", source: Some(_), .. }
        ));
        assert!(ApiVersion::parse("1.65536.0").is_err());
        assert!(ApiVersion::parse("1.1.4294967296").is_err());
        assert!(ApiVersion::parse("1.1.4294967295").is_ok());
    }

    #[test]
    fn test_ordering() {
        let v = ApiVersion::new;
        assert!(v(1, 0, 0) < v(1, 0, 1));
        assert!(v(1, 0, 9) < v(1, 1, 0));
        assert!(v(1, 9, 9) < v(2, 0, 0));
        assert!(v(1, 1, 49) >= v(1, 1, 49));
        assert_eq!(v(1, 2, 3), v(1, 2, 3));
        assert_ne!(v(1, 2, 3), v(1, 2, 4));

        // Absence sorts below every concrete version
        assert!(None < Some(v(0, 0, 0)));
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&ApiVersion::new(1, 0, 34)).unwrap();
        assert_eq!(json, "\"1.0.34\"");
        let version: ApiVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(version, ApiVersion::new(1, 0, 34));
        assert!(serde_json::from_str::<ApiVersion>("\"1.0\"").is_err());
    }

    #[test]
    fn test_into_openxr_version() {
        let version: openxr_sys::Version = ApiVersion::new(1, 1, 49).into();
        assert_eq!(version.major(), 1);
        assert_eq!(version.minor(), 1);
        assert_eq!(version.patch(), 49);
    }
}
