//! Resolution configuration.
//!
//! Read from the `[generics]` table of a TOML file:
//!
//! ```toml
//! [generics]
//! protocol-signatures = "enabled"   # or "disabled" ("off"), "verify"
//! warn-implicit-overrides = false
//! max-conditional-depth = 64
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::desugar::{Desugarer, DEFAULT_MAX_CONDITIONAL_DEPTH};
use crate::module::Module;

/// Which resolver owns protocol-signature diagnostics.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequirementMachineMode {
    /// Authoritative: diagnostics from requirement lowering are emitted.
    #[default]
    #[serde(alias = "on")]
    Enabled,
    /// Legacy resolver only. Errors are collected and dropped.
    #[serde(alias = "off")]
    Disabled,
    /// Both resolvers run; the legacy one reports.
    Verify,
}

impl fmt::Display for RequirementMachineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementMachineMode::Enabled => write!(f, "enabled"),
            RequirementMachineMode::Disabled => write!(f, "disabled"),
            RequirementMachineMode::Verify => write!(f, "verify"),
        }
    }
}

impl FromStr for RequirementMachineMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" | "on" => Ok(RequirementMachineMode::Enabled),
            "disabled" | "off" => Ok(RequirementMachineMode::Disabled),
            "verify" => Ok(RequirementMachineMode::Verify),
            other => Err(ConfigError::Invalid(format!(
                "unknown protocol-signatures mode `{}`, expected enabled, disabled, or verify",
                other
            ))),
        }
    }
}

/// Options threaded into the protocol collectors.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ResolutionConfig {
    pub protocol_signatures: RequirementMachineMode,
    /// Warn about redeclared associated types even without an inheritance
    /// or `where` clause.
    pub warn_implicit_overrides: bool,
    /// Bound on nested conditional-conformance expansion.
    pub max_conditional_depth: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        ResolutionConfig {
            protocol_signatures: RequirementMachineMode::Enabled,
            warn_implicit_overrides: false,
            max_conditional_depth: DEFAULT_MAX_CONDITIONAL_DEPTH,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    generics: ResolutionConfig,
}

impl ResolutionConfig {
    pub fn with_mode(mut self, mode: RequirementMachineMode) -> Self {
        self.protocol_signatures = mode;
        self
    }

    /// Only the authoritative mode reports diagnostics.
    pub fn emits_diagnostics(&self) -> bool {
        self.protocol_signatures == RequirementMachineMode::Enabled
    }

    /// A desugarer over `module` honoring this configuration.
    pub fn desugarer<'m>(&self, module: &'m Module) -> Desugarer<'m> {
        Desugarer::new(module).with_max_conditional_depth(self.max_conditional_depth)
    }

    /// Read the `[generics]` table of a TOML file.
    pub fn from_file(path: &Path) -> Result<ResolutionConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        content.parse()
    }

    fn validate(self) -> Result<ResolutionConfig, ConfigError> {
        if self.max_conditional_depth == 0 {
            return Err(ConfigError::Invalid(
                "max-conditional-depth must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

impl FromStr for ResolutionConfig {
    type Err = ConfigError;

    /// Parse TOML text; a missing `[generics]` table yields the defaults.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let file: ConfigFile = toml::from_str(content).map_err(ConfigError::Parse)?;
        file.generics.validate()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "failed to read {}: {}", path, source),
            ConfigError::Parse(err) => write!(f, "failed to parse configuration: {}", err),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_table() {
        let toml = r#"
[generics]
protocol-signatures = "verify"
warn-implicit-overrides = true
max-conditional-depth = 8
"#;
        let config: ResolutionConfig = toml.parse().unwrap();
        assert_eq!(config.protocol_signatures, RequirementMachineMode::Verify);
        assert!(config.warn_implicit_overrides);
        assert_eq!(config.max_conditional_depth, 8);
        assert!(!config.emits_diagnostics());
    }

    #[test]
    fn missing_table_uses_defaults() {
        let config: ResolutionConfig = "[package]\nname = \"demo\"\n".parse().unwrap();
        assert_eq!(config, ResolutionConfig::default());
        assert!(config.emits_diagnostics());
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let config: ResolutionConfig =
            "[generics]\nwarn-implicit-overrides = true\n".parse().unwrap();
        assert!(config.warn_implicit_overrides);
        assert_eq!(config.protocol_signatures, RequirementMachineMode::Enabled);
        assert_eq!(config.max_conditional_depth, DEFAULT_MAX_CONDITIONAL_DEPTH);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = "[generics]\nprotocol-signature = \"on\"\n"
            .parse::<ResolutionConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_depth_is_invalid() {
        let err = "[generics]\nmax-conditional-depth = 0\n"
            .parse::<ResolutionConfig>()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: max-conditional-depth must be at least 1"
        );
    }

    #[test]
    fn mode_from_str() {
        let mode = |text: &str| text.parse::<RequirementMachineMode>();
        assert_eq!(mode("on").unwrap(), RequirementMachineMode::Enabled);
        assert_eq!(mode("disabled").unwrap(), RequirementMachineMode::Disabled);
        assert!("sometimes".parse::<RequirementMachineMode>().is_err());
        assert_eq!(RequirementMachineMode::Verify.to_string(), "verify");
    }

    #[test]
    fn toml_accepts_the_same_mode_spellings() {
        for (text, mode) in [
            ("on", RequirementMachineMode::Enabled),
            ("off", RequirementMachineMode::Disabled),
            ("verify", RequirementMachineMode::Verify),
        ] {
            let toml = format!("[generics]\nprotocol-signatures = \"{}\"\n", text);
            let config: ResolutionConfig = toml.parse().unwrap();
            assert_eq!(config.protocol_signatures, mode);
            assert_eq!(text.parse::<RequirementMachineMode>().unwrap(), mode);
        }
    }
}
