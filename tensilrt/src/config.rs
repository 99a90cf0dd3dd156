use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TensilError};
use crate::types::Device;

pub const ENV_NATIVE_PATH: &str = "TENSIL_NATIVE_PATH";
pub const ENV_BACKEND: &str = "TENSIL_BACKEND";
pub const ENV_DEVICE: &str = "TENSIL_DEVICE";

/// Engine settings, read from `tensil.toml` or the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TensilConfig {
    /// Dynamic library (or a directory holding it). Unset means the
    /// statically linked engine.
    pub library_path: Option<PathBuf>,
    /// `"reference"` or `"torch"`; unset keeps the native default.
    pub backend: Option<String>,
    pub default_device: String,
    /// Log a warning when a manager is dropped with live resources.
    pub warn_on_leak: bool,
}

impl Default for TensilConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            backend: None,
            default_device: "cpu".to_string(),
            warn_on_leak: true,
        }
    }
}

impl TensilConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| TensilError::invalid(format!("invalid config: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            TensilError::invalid(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults overridden by `TENSIL_NATIVE_PATH`, `TENSIL_BACKEND` and
    /// `TENSIL_DEVICE`.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_NATIVE_PATH).filter(|v| !v.is_empty()) {
            self.library_path = Some(PathBuf::from(path));
        }
        if let Some(backend) = lookup(ENV_BACKEND).filter(|v| !v.is_empty()) {
            self.backend = Some(backend);
        }
        if let Some(device) = lookup(ENV_DEVICE).filter(|v| !v.is_empty()) {
            self.default_device = device;
        }
        self
    }

    pub fn default_device(&self) -> Result<Device> {
        self.default_device.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_partial_toml() {
        let config = TensilConfig::from_toml_str(
            r#"
backend = "reference"
default_device = "gpu:1"
"#,
        )
        .unwrap();
        assert_eq!(config.backend.as_deref(), Some("reference"));
        assert_eq!(config.default_device().unwrap(), Device::gpu(1));
        assert!(config.warn_on_leak);
        assert!(config.library_path.is_none());
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(TensilConfig::from_toml_str("warn_on_leak = \"yes\"").is_err());
    }

    #[test]
    fn environment_overrides_defaults() {
        let env: HashMap<&str, &str> = [
            (ENV_NATIVE_PATH, "/opt/tensil"),
            (ENV_DEVICE, "cuda:0"),
            (ENV_BACKEND, ""),
        ]
        .into_iter()
        .collect();
        let config =
            TensilConfig::default().with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.library_path, Some(PathBuf::from("/opt/tensil")));
        assert_eq!(config.default_device().unwrap(), Device::gpu(0));
        assert!(config.backend.is_none());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tensil.toml");
        fs::write(&path, "warn_on_leak = false\n").unwrap();
        let config = TensilConfig::load(&path).unwrap();
        assert!(!config.warn_on_leak);
        assert!(TensilConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
