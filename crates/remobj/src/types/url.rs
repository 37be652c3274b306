//! Object URLs: `scheme://authority/object-id`

use std::fmt;
use std::str::FromStr;

use super::{Result, RmiError};

/// Parsed object address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl {
    scheme: String,
    authority: String,
    object_id: String,
}

impl ObjectUrl {
    pub fn new(
        scheme: impl Into<String>,
        authority: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            authority: authority.into(),
            object_id: object_id.into(),
        }
    }

    /// Parse a full object URL; the object id must be present.
    pub fn parse(url: &str) -> Result<Self> {
        let (endpoint, object_id) = url
            .rsplit_once('/')
            .ok_or_else(|| RmiError::UnresolvableUrl(url.to_string()))?;
        let (scheme, authority) = split_endpoint(endpoint)
            .ok_or_else(|| RmiError::UnresolvableUrl(url.to_string()))?;
        if object_id.is_empty() {
            return Err(RmiError::UnresolvableUrl(url.to_string()));
        }
        Ok(Self::new(scheme, authority, object_id))
    }

    /// Parse a server endpoint, `scheme://authority`, with no object id.
    pub fn parse_endpoint(endpoint: &str) -> Result<(String, String)> {
        let trimmed = endpoint.strip_suffix('/').unwrap_or(endpoint);
        split_endpoint(trimmed)
            .map(|(s, a)| (s.to_string(), a.to_string()))
            .ok_or_else(|| RmiError::UnresolvableUrl(endpoint.to_string()))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// `scheme://authority`, the key connections are shared under
    pub fn endpoint(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }
}

fn split_endpoint(endpoint: &str) -> Option<(&str, &str)> {
    let (scheme, authority) = endpoint.split_once("://")?;
    let valid_scheme = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
    if !valid_scheme || authority.is_empty() || authority.contains('/') {
        return None;
    }
    Some((scheme, authority))
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.authority, self.object_id)
    }
}

impl FromStr for ObjectUrl {
    type Err = RmiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
