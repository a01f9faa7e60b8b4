use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

pub const DEFAULT_TAG: &str = "json";

/// Plan options. Part of the plan cache key.
///
/// ```toml
/// tag = "db"
/// strict_types = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Tag key used for field naming. Empty means `json`.
    pub tag: String,

    /// Disable primitive conversion between distinct scalar types; such
    /// pairs go through the wire fallback instead.
    pub strict_types: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            strict_types: false,
        }
    }
}

impl Options {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn strict(mut self, strict_types: bool) -> Self {
        self.strict_types = strict_types;
        self
    }

    /// Options with an empty tag replaced by the default one.
    pub fn normalized(&self) -> Options {
        let mut out = self.clone();
        if out.tag.is_empty() {
            out.tag = DEFAULT_TAG.to_string();
        }
        out
    }

    /// Load options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|e| e.with_context(path.display()))
    }

    /// Parse options from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ConvertError> {
        let opts: Options =
            toml::from_str(toml_str).map_err(|e| ConvertError::Config(e.to_string()))?;
        Ok(opts.normalized())
    }
}
