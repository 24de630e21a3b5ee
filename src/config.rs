use serde::Deserialize;

use crate::error::Result;

/// Tunables for a [`Machine`](crate::Machine).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How deep `ffindall` may expand a sub-branch before giving up.
    pub max_findall_depth: usize,
}

impl Config {
    pub const DEFAULT_MAX_FINDALL_DEPTH: usize = 8;

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_findall_depth: Self::DEFAULT_MAX_FINDALL_DEPTH,
        }
    }
}
