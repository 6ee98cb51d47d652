//! Kubernetes version parsing and ordering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VersionError;

/// A Kubernetes release version such as `v1.25` or `1.16.0`.
///
/// Keeps the text it was parsed from (used in prompts and documentation URLs)
/// alongside the numeric components. Equality and ordering only look at the
/// numbers, so `v1.16` == `1.16.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KubeVersion {
    raw: String,
    major: u64,
    minor: u64,
    patch: u64,
}

impl KubeVersion {
    /// Parse a version, stripping an optional leading `v`.
    ///
    /// Each component contributes its leading digits, so pre-release
    /// suffixes (`1.25.0-rc.1`) are ignored. Missing components are 0.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        let numeric = raw
            .strip_prefix('v')
            .or_else(|| raw.strip_prefix('V'))
            .unwrap_or(raw);
        if numeric.is_empty() {
            return Err(VersionError::Empty);
        }

        let mut parts = [0u64; 3];
        for (idx, component) in numeric.split('.').enumerate() {
            if idx >= parts.len() {
                return Err(VersionError::TooManyComponents(raw.to_string()));
            }
            let digits: String = component.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return Err(VersionError::NotNumeric {
                    input: raw.to_string(),
                    component: component.to_string(),
                });
            }
            parts[idx] = digits.parse().map_err(|_| VersionError::NotNumeric {
                input: raw.to_string(),
                component: component.to_string(),
            })?;
            // Stop at a pre-release suffix: "1.25.0-rc.1" must not spill into a 4th component.
            if digits.len() != component.len() {
                break;
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
        })
    }

    /// The text this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Version without the leading `v`, e.g. `1.25`.
    pub fn numeric(&self) -> &str {
        self.raw
            .strip_prefix('v')
            .or_else(|| self.raw.strip_prefix('V'))
            .unwrap_or(&self.raw)
    }

    /// `major.minor`, the granularity Kubernetes changelogs are published at.
    pub fn minor_series(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    pub fn components(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for KubeVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components() == other.components()
    }
}

impl Eq for KubeVersion {}

impl PartialOrd for KubeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KubeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components().cmp(&other.components())
    }
}

impl FromStr for KubeVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KubeVersion {
    type Error = VersionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<KubeVersion> for String {
    fn from(v: KubeVersion) -> Self {
        v.raw
    }
}

impl fmt::Display for KubeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
