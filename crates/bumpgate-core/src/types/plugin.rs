use std::fmt;

use serde::Serialize;

use crate::error::BumpGateError;

/// Name of a plugin: its directory name directly below the plugins root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PluginName(String);

impl PluginName {
    /// Builds a plugin name from a single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`BumpGateError::Configuration`] if `name` is empty, is `.` or
    /// `..`, or contains a path separator.
    pub fn new(name: impl Into<String>) -> Result<Self, BumpGateError> {
        let name = name.into();
        if name.is_empty() || name == "." || name == ".." {
            return Err(BumpGateError::Configuration(format!(
                "Invalid plugin name: '{name}'"
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(BumpGateError::Configuration(format!(
                "Plugin name must be a single directory name, got '{name}'"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PluginName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
