use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Looked up in the current directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "photo-reducer.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Generate scripts but never run a tool.
    pub dry_run: bool,

    /// Zero disables the limit.
    pub tool_timeout_secs: u64,

    pub poll_interval_ms: u64,

    /// Editor the aperture-correction script opens its intermediate files in.
    #[serde(default = "default_editor")]
    pub editor: String,

    /// Logical tool name -> executable, overriding the built-in registry.
    pub tools: BTreeMap<String, String>,
}

fn default_editor() -> String {
    std::env::var("EDITOR").unwrap_or_else(|_| "vim".into())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: false,
            tool_timeout_secs: 1800,
            poll_interval_ms: 200,
            editor: default_editor(),
            tools: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse configuration YAML")
    }

    /// Read `path` if given, otherwise the default file when it exists,
    /// otherwise fall back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_yaml(&text)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        match self.tool_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_document_gives_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(1800)));
        assert_eq!(config.poll_interval(), Duration::from_millis(200));
        assert!(config.tools.is_empty());
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_yaml(
            "dry_run: true\ntool_timeout_secs: 0\npoll_interval_ms: 0\neditor: emacs\ntools:\n  daophot: /opt/dao/daophot\n",
        )
        .unwrap();
        assert!(config.dry_run);
        assert_eq!(config.tool_timeout(), None);
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.editor, "emacs");
        assert_eq!(config.tools["daophot"], "/opt/dao/daophot");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_yaml("dryrun: true\n").is_err());
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.yaml");
        fs::write(&path, "tool_timeout_secs: 5\n").unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn load_reports_missing_explicit_path() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(dir.path().join("absent.yaml").as_path())).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
