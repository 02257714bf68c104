//! Namespace versions used for schema evolution.
//!
//! A namespace version is written `<namespace>-<version>`, e.g. `crm-1.2.0`,
//! where the version is a dot separated list of numbers.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A `(namespace, version)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespaceVersion {
    namespace: Cow<'static, str>,
    version: Cow<'static, str>,
}

impl NamespaceVersion {
    /// Creates a namespace version from static parts, for use in `static`
    /// type version providers. The parts are not validated here; the registry
    /// rejects providers for which [`is_valid`](Self::is_valid) is false.
    #[must_use]
    pub const fn of_static(namespace: &'static str, version: &'static str) -> Self {
        Self {
            namespace: Cow::Borrowed(namespace),
            version: Cow::Borrowed(version),
        }
    }

    /// Creates a validated namespace version.
    pub fn new(namespace: impl Into<String>, version: impl Into<String>) -> crate::Result<Self> {
        let namespace = namespace.into();
        let version = version.into();
        if namespace.is_empty() {
            return Err(Error::InvalidNamespaceVersion(format!(
                "empty namespace for version '{version}'"
            )));
        }
        if !is_valid_version(&version) {
            return Err(Error::InvalidNamespaceVersion(format!(
                "'{version}' is not a dot separated list of numbers"
            )));
        }
        Ok(Self {
            namespace: Cow::Owned(namespace),
            version: Cow::Owned(version),
        })
    }

    /// Parses `<namespace>-<version>`.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let (namespace, version) = s
            .rsplit_once('-')
            .ok_or_else(|| Error::InvalidNamespaceVersion(s.to_string()))?;
        Self::new(namespace, version)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns true for a non-empty namespace and a dot separated list of
    /// numbers as version.
    pub fn is_valid(&self) -> bool {
        !self.namespace.is_empty() && is_valid_version(&self.version)
    }

    fn segments(&self) -> impl Iterator<Item = u64> + '_ {
        self.version
            .split('.')
            .map(|segment| segment.parse().unwrap_or(0))
    }
}

fn is_valid_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .split('.')
            .all(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
}

impl Ord for NamespaceVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.segments().cmp(other.segments()))
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for NamespaceVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NamespaceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.namespace, self.version)
    }
}

impl FromStr for NamespaceVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NamespaceVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NamespaceVersion> for String {
    fn from(value: NamespaceVersion) -> Self {
        value.to_string()
    }
}
