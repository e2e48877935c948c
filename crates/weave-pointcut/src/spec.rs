//! Aspect specification files
//!
//! An aspect specification names advice types and binds each to exactly one
//! pointcut pattern. It is decoded with serde; the format follows the file
//! extension (`.yaml`/`.yml`, `.json`, `.toml`).

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AspectError;

/// Package name advice implementations are imported under by default
pub const DEFAULT_ADVICE_PACKAGE: &str = "agaspect";

/// One advice type bound to its pointcut
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdviceBinding {
    /// Name of the advice type in the advice package
    pub advice: String,
    /// Regular expression over fully qualified signatures
    pub pointcut: String,
}

impl AdviceBinding {
    /// Bind `advice` to `pointcut`
    #[must_use]
    pub fn new(advice: impl Into<String>, pointcut: impl Into<String>) -> Self {
        Self {
            advice: advice.into(),
            pointcut: pointcut.into(),
        }
    }
}

/// Decoded aspect specification
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AspectSpec {
    /// Go unit holding the advice types, relocated into the advice package
    #[serde(default)]
    pub advice_source: Option<PathBuf>,
    /// Package name of the advice package
    #[serde(default)]
    pub advice_package: Option<String>,
    /// Advice bindings in declaration order
    #[serde(default)]
    pub aspects: Vec<AdviceBinding>,
}

/// Encoding of an aspect specification file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectFormat {
    Yaml,
    Json,
    Toml,
}

impl AspectFormat {
    /// Detect the format from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

impl Display for AspectFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
            Self::Toml => "TOML",
        };
        f.write_str(name)
    }
}

impl AspectSpec {
    /// Builder: add an advice binding
    #[must_use]
    pub fn with_aspect(mut self, advice: impl Into<String>, pointcut: impl Into<String>) -> Self {
        self.aspects.push(AdviceBinding::new(advice, pointcut));
        self
    }

    /// Builder: set the advice source unit
    #[must_use]
    pub fn with_advice_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.advice_source = Some(path.into());
        self
    }

    /// Read, decode and validate a specification file.
    ///
    /// A relative `advice_source` is resolved against the file's directory.
    ///
    /// # Errors
    /// Returns [`AspectError`] for unreadable files, unknown extensions,
    /// decode failures, and invalid contents.
    pub fn from_path(path: &Path) -> Result<Self, AspectError> {
        let format =
            AspectFormat::from_path(path).ok_or_else(|| AspectError::UnknownFormat(path.to_path_buf()))?;
        let text = fs::read_to_string(path).map_err(|e| AspectError::io_error(path, e))?;
        let mut spec = Self::parse(&text, format).map_err(|e| match e {
            AspectError::Decode { format, message, .. } => AspectError::Decode {
                path: Some(path.to_path_buf()),
                format,
                message,
            },
            other => other,
        })?;
        if let (Some(source), Some(dir)) = (&spec.advice_source, path.parent()) {
            if source.is_relative() {
                spec.advice_source = Some(dir.join(source));
            }
        }
        Ok(spec)
    }

    /// Decode and validate specification text.
    ///
    /// # Errors
    /// Returns [`AspectError::Decode`] or a validation error.
    pub fn parse(text: &str, format: AspectFormat) -> Result<Self, AspectError> {
        let decoded: Result<Self, String> = match format {
            AspectFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            AspectFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            AspectFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        };
        let spec = decoded.map_err(|message| AspectError::Decode {
            path: None,
            format,
            message,
        })?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check the contents are usable.
    ///
    /// # Errors
    /// Returns [`AspectError::NoAspects`] for an empty list and
    /// [`AspectError::InvalidAdviceName`] for names that are not Go
    /// identifiers.
    pub fn validate(&self) -> Result<(), AspectError> {
        if self.aspects.is_empty() {
            return Err(AspectError::NoAspects);
        }
        for (index, binding) in self.aspects.iter().enumerate() {
            if !is_go_identifier(&binding.advice) {
                return Err(AspectError::InvalidAdviceName {
                    index,
                    advice: binding.advice.clone(),
                });
            }
        }
        if let Some(package) = &self.advice_package {
            if !is_go_identifier(package) {
                return Err(AspectError::InvalidAdviceName {
                    index: 0,
                    advice: package.clone(),
                });
            }
        }
        Ok(())
    }

    /// Package name of the advice package
    #[must_use]
    pub fn advice_package_name(&self) -> &str {
        self.advice_package.as_deref().unwrap_or(DEFAULT_ADVICE_PACKAGE)
    }
}

fn is_go_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_yaml() {
        let text = r#"
advice_source: detreplay_aspect.go
aspects:
  - advice: DetAspect
    pointcut: '\(\*example\.com/app/worker\.W\)\..*'
  - advice: Trace
    pointcut: 'example\.com/app\.sayHello'
"#;
        let spec = AspectSpec::parse(text, AspectFormat::Yaml).unwrap();
        assert_eq!(spec.aspects.len(), 2);
        assert_eq!(spec.aspects[0].advice, "DetAspect");
        assert_eq!(spec.aspects[0].pointcut, r"\(\*example\.com/app/worker\.W\)\..*");
        assert_eq!(spec.advice_source, Some(PathBuf::from("detreplay_aspect.go")));
        assert_eq!(spec.advice_package_name(), "agaspect");
    }

    #[test]
    fn decodes_json_and_toml() {
        let json = r#"{"advice_package": "hooks", "aspects": [{"advice": "A", "pointcut": ".*"}]}"#;
        let spec = AspectSpec::parse(json, AspectFormat::Json).unwrap();
        assert_eq!(spec.advice_package_name(), "hooks");

        let toml = "[[aspects]]\nadvice = \"A\"\npointcut = \".*\"\n";
        let spec = AspectSpec::parse(toml, AspectFormat::Toml).unwrap();
        assert_eq!(spec.aspects, vec![AdviceBinding::new("A", ".*")]);
    }

    #[test]
    fn rejects_empty_and_bad_names() {
        assert!(matches!(
            AspectSpec::parse("aspects: []", AspectFormat::Yaml),
            Err(AspectError::NoAspects)
        ));
        assert!(matches!(
            AspectSpec::parse("aspects:\n  - advice: ''\n    pointcut: x\n", AspectFormat::Yaml),
            Err(AspectError::InvalidAdviceName { index: 0, .. })
        ));
        assert!(matches!(
            AspectSpec::parse("aspects:\n  - advice: not-ident\n    pointcut: x\n", AspectFormat::Yaml),
            Err(AspectError::InvalidAdviceName { .. })
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = AspectSpec::parse("aspects: []\nextra: 1\n", AspectFormat::Yaml).unwrap_err();
        assert!(matches!(err, AspectError::Decode { .. }));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(AspectFormat::from_path(Path::new("a.yml")), Some(AspectFormat::Yaml));
        assert_eq!(AspectFormat::from_path(Path::new("a.toml")), Some(AspectFormat::Toml));
        assert_eq!(AspectFormat::from_path(Path::new("a_aspect.go")), None);
    }
}
