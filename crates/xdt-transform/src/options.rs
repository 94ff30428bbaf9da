//! Options controlling how transforms touch the source document.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Transform options, loadable from TOML.
///
/// ```toml
/// indent_inserted = true
/// strip_directive_attributes = true
/// warn_on_unmatched = false
/// ```
///
/// Missing keys take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformOptions {
    /// Indent inserted elements like their siblings, and take the
    /// indentation of removed elements away with them.
    pub indent_inserted: bool,

    /// Remove `xdt:*` attributes and the `xmlns:xdt` declaration from
    /// content cloned out of the transform document.
    pub strip_directive_attributes: bool,

    /// Warn about transform elements that match nothing while their
    /// children carry directives.
    pub warn_on_unmatched: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            indent_inserted: true,
            strip_directive_attributes: true,
            warn_on_unmatched: true,
        }
    }
}

impl TransformOptions {
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| Error::OptionsIo {
            path: display.clone(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| Error::InvalidOptions {
            path: display,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TransformOptions::from_toml_str("").unwrap();
        assert_eq!(options, TransformOptions::default());
        assert!(options.indent_inserted);
        assert!(options.strip_directive_attributes);
        assert!(options.warn_on_unmatched);
    }

    #[test]
    fn test_partial_override() {
        let options = TransformOptions::from_toml_str("warn_on_unmatched = false\n").unwrap();
        assert!(!options.warn_on_unmatched);
        assert!(options.indent_inserted);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(TransformOptions::from_toml_str("indent = 4").is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xdt.toml");
        std::fs::write(&path, "indent_inserted = false").unwrap();
        assert!(!TransformOptions::from_path(&path).unwrap().indent_inserted);

        let err = TransformOptions::from_path(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::OptionsIo { .. }));

        std::fs::write(&path, "indent_inserted = 3").unwrap();
        let err = TransformOptions::from_path(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidOptions { .. }));
    }
}
