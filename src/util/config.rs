//! Configuration file support for portcfg.
//!
//! Two configuration file locations are read:
//! - Global: `~/.portcfg/config.toml` - User-wide defaults
//! - Project: `.portcfg/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::catalog::{DerivedConstant, DEFAULT_PREFIX};
use crate::core::signal::Signals;
use crate::emit::EmitOptions;
use crate::negotiate::detect::ProbeRequest;

/// portcfg configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Header output settings
    pub output: OutputConfig,

    /// Compiler probe settings
    pub probe: ProbeConfig,

    /// Values forced onto every signal set
    pub overrides: OverridesConfig,
}

/// Header output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Namespace prefix for emitted names (default `PORTCFG`)
    pub prefix: Option<String>,

    /// Include guard for the generated header
    pub guard: Option<String>,

    /// Default header path for `portcfg resolve`
    pub path: Option<PathBuf>,
}

/// Compiler probe settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Path to the C++ compiler (e.g., /usr/bin/clang++)
    pub cc: Option<PathBuf>,

    /// Standard headers to test-compile
    #[serde(default)]
    pub headers: Vec<String>,

    /// Additional compiler arguments (e.g., -std=c++17)
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Externally supplied values, as if passed with `-D`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverridesConfig {
    /// Force `HAVE_SSE2`
    pub sse2: Option<bool>,

    /// Force `HAVE_SSSE3`
    pub ssse3: Option<bool>,

    /// Suppress XRay instrumentation attributes
    #[serde(default)]
    pub no_xray: bool,
}

impl OverridesConfig {
    /// Apply the overrides to a signal set.
    pub fn apply(&self, signals: &mut Signals) {
        for (constant, value) in [
            (DerivedConstant::HaveSse2, self.sse2),
            (DerivedConstant::HaveSsse3, self.ssse3),
        ] {
            if let Some(value) = value {
                signals
                    .build
                    .predefined
                    .insert(constant.name().to_string(), u8::from(value).to_string());
            }
        }
        if self.no_xray {
            signals.build.no_xray = true;
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.output.prefix.is_some() {
            self.output.prefix = other.output.prefix;
        }
        if other.output.guard.is_some() {
            self.output.guard = other.output.guard;
        }
        if other.output.path.is_some() {
            self.output.path = other.output.path;
        }

        if other.probe.cc.is_some() {
            self.probe.cc = other.probe.cc;
        }
        if !other.probe.headers.is_empty() {
            self.probe.headers = other.probe.headers;
        }
        if !other.probe.extra_args.is_empty() {
            self.probe.extra_args = other.probe.extra_args;
        }

        if other.overrides.sse2.is_some() {
            self.overrides.sse2 = other.overrides.sse2;
        }
        if other.overrides.ssse3.is_some() {
            self.overrides.ssse3 = other.overrides.ssse3;
        }
        if other.overrides.no_xray {
            self.overrides.no_xray = true;
        }
    }

    /// The effective name prefix.
    pub fn prefix(&self) -> &str {
        self.output.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            prefix: self.prefix().to_string(),
            guard: self.output.guard.clone(),
        }
    }

    pub fn probe_request(&self) -> ProbeRequest {
        ProbeRequest {
            cc: self.probe.cc.clone(),
            headers: self.probe.headers.clone(),
            extra_args: self.probe.extra_args.clone(),
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.portcfg/config.toml)
/// 2. Global config (~/.portcfg/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global portcfg config directory (~/.portcfg).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".portcfg"))
}

/// Get the global config path (~/.portcfg/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.portcfg/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".portcfg").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.prefix(), "PORTCFG");
        assert!(config.probe.cc.is_none());
        assert!(!config.overrides.no_xray);
        assert_eq!(config.emit_options().guard(), "PORTCFG_CONFIG_H_");
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[output]
prefix = "PHMAP"
path = "include/phmap_config.h"

[probe]
cc = "/usr/bin/clang++"
extra_args = ["-std=c++17"]

[overrides]
sse2 = false
no_xray = true
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.prefix(), "PHMAP");
        assert_eq!(
            config.output.path,
            Some(PathBuf::from("include/phmap_config.h"))
        );
        assert_eq!(config.probe.cc, Some(PathBuf::from("/usr/bin/clang++")));
        assert_eq!(config.probe_request().extra_args, vec!["-std=c++17"]);
        assert_eq!(config.overrides.sse2, Some(false));
        assert!(config.overrides.no_xray);
    }

    #[test]
    fn test_config_rejects_unknown_types() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[overrides]\nsse2 = \"maybe\"\n").unwrap();

        assert!(Config::load(&config_path).is_err());
        assert_eq!(Config::load_or_default(&config_path), Config::default());
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.output.prefix = Some("BASE".to_string());
        base.probe.headers = vec!["optional".to_string()];

        let mut override_cfg = Config::default();
        override_cfg.output.prefix = Some("PROJECT".to_string());

        base.merge(override_cfg);

        assert_eq!(base.prefix(), "PROJECT");
        assert_eq!(base.probe.headers, vec!["optional"]); // Not overridden
    }

    #[test]
    fn test_overrides_apply() {
        let overrides = OverridesConfig {
            sse2: Some(true),
            ssse3: None,
            no_xray: true,
        };
        let mut signals = Signals::default();
        overrides.apply(&mut signals);

        assert_eq!(
            signals.build.predefined.get("HAVE_SSE2").map(String::as_str),
            Some("1")
        );
        assert!(!signals.build.predefined.contains_key("HAVE_SSSE3"));
        assert!(signals.build.no_xray);
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
[output]
prefix = "GLOBAL"
guard = "GLOBAL_GUARD"

[probe]
cc = "/usr/bin/g++"
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[output]
prefix = "LOCAL"
"#,
        )
        .unwrap();

        let config = load_config(Some(&global_path), &project_path);

        assert_eq!(config.prefix(), "LOCAL");
        assert_eq!(config.output.guard, Some("GLOBAL_GUARD".to_string()));
        assert_eq!(config.probe.cc, Some(PathBuf::from("/usr/bin/g++")));
    }
}
