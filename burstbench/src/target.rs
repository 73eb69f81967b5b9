//! Endpoints under test.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Placeholder in a target URL template that is replaced with the lower bound.
const FROM_PLACEHOLDER: &str = "{from}";
/// Placeholder in a target URL template that is replaced with the upper bound.
const TO_PLACEHOLDER: &str = "{to}";

/// Errors resolving a [`TargetSpec`] into a [`Target`].
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// The resolved URL could not be parsed.
    #[error("invalid URL for target `{name}`: {source}")]
    InvalidUrl {
        /// Name of the offending target.
        name: String,
        /// The underlying parse error.
        source: url::ParseError,
    },
    /// The URL does not use `http` or `https`.
    #[error("unsupported scheme `{scheme}` for target `{name}`")]
    UnsupportedScheme {
        /// Name of the offending target.
        name: String,
        /// The scheme found in the URL.
        scheme: String,
    },
}

/// Inclusive-exclusive bounds passed to the workload, e.g. `between/{from}/{to}`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Bounds {
    /// Lower bound.
    pub from: i64,
    /// Upper bound.
    pub to: i64,
}

impl Bounds {
    /// Creates bounds, returning `None` if `from` is greater than `to`.
    pub fn new(from: i64, to: i64) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// A configured endpoint whose URL may still contain bound placeholders.
///
/// ```yaml
/// targets:
///   - name: app-service
///     url: https://example.azurewebsites.net/api/prime/between/{from}/{to}
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TargetSpec {
    /// Symbolic name used to select the target and to group results.
    pub name: String,
    /// URL template. `{from}` and `{to}` are substituted with the session bounds.
    pub url: String,
}

impl TargetSpec {
    /// Substitutes the bounds into the URL template and validates the result.
    pub fn resolve(&self, bounds: Bounds) -> Result<Target, TargetError> {
        let raw = self
            .url
            .replace(FROM_PLACEHOLDER, &bounds.from.to_string())
            .replace(TO_PLACEHOLDER, &bounds.to.to_string());

        let url = Url::parse(&raw).map_err(|source| TargetError::InvalidUrl {
            name: self.name.clone(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TargetError::UnsupportedScheme {
                name: self.name.clone(),
                scheme: url.scheme().to_owned(),
            });
        }

        Ok(Target {
            name: self.name.clone(),
            url,
        })
    }
}

/// A named endpoint under test with a fully resolved URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    name: String,
    url: Url,
}

impl Target {
    /// Creates a target from a name and an already resolved URL.
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }

    /// The symbolic name, which is also the target's identity in the measurement store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The URL requests are sent to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The host part of the URL, used as a heading in reports.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.host())
    }
}
