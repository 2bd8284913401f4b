use super::Config;
use crate::core::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration loader that layers file, profile, and env var sources.
pub struct ConfigLoader {
    /// Path to the TOML config file.
    config_file: Option<PathBuf>,
    /// Whether `BOOTABLE_*` env vars are applied.
    use_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    pub fn new() -> Self {
        Self {
            config_file: None,
            use_env: true,
        }
    }

    /// Set the configuration file path.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Ignore env var profile selection and overrides.
    pub fn no_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load configuration from all enabled sources.
    ///
    /// Priority (later sources override earlier):
    /// 1. Default values
    /// 2. TOML file
    /// 3. Profile overlay (`BOOTABLE_PROFILE`, from `[profiles.<name>]`)
    /// 4. Individual env var overrides (`BOOTABLE_*`)
    pub fn load(self) -> Result<Config> {
        let mut config = Config::default();
        let mut profiles: HashMap<String, serde_json::Value> = HashMap::new();

        if let Some(ref config_path) = self.config_file {
            let (file_config, file_profiles) = self.load_toml_file(config_path)?;
            config = file_config;
            profiles = file_profiles;
        }

        if !self.use_env {
            return Ok(config);
        }

        // Apply profile overlay if BOOTABLE_PROFILE is set
        if let Some(profile_name) = super::env::get_profile_name() {
            let profile_value = profiles.get(&profile_name).ok_or_else(|| {
                let mut available: Vec<&str> = profiles.keys().map(String::as_str).collect();
                available.sort_unstable();
                if available.is_empty() {
                    Error::config(format!(
                        "profile '{}' not found (no profiles defined)",
                        profile_name,
                    ))
                } else {
                    Error::config(format!(
                        "profile '{}' not found. Available profiles: {}",
                        profile_name,
                        available.join(", "),
                    ))
                }
            })?;

            let mut base_value = serde_json::to_value(&config)?;
            deep_merge(&mut base_value, profile_value);
            config = serde_json::from_value(base_value).map_err(|e| {
                Error::config(format!("failed to apply profile '{}': {}", profile_name, e))
            })?;
            tracing::debug!("Applied profile '{}'", profile_name);
        }

        // Apply individual env var overrides (highest priority)
        super::env::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Load configuration and its profile table from a TOML file.
    fn load_toml_file(&self, path: &Path) -> Result<(Config, HashMap<String, serde_json::Value>)> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read config file {}: {}", path.display(), e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::config(format!("failed to parse TOML config: {}", e)))?;

        let table: toml::Table = toml::from_str(&content)?;
        let mut profiles = HashMap::new();
        extract_profiles(&serde_json::to_value(&table)?, &mut profiles);

        Ok((config, profiles))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract profile definitions from a config value.
///
/// Profiles live at `value["profiles"]` as `{ name: { ...config fields... } }`.
fn extract_profiles(
    value: &serde_json::Value,
    profiles: &mut HashMap<String, serde_json::Value>,
) {
    if let Some(serde_json::Value::Object(map)) = value.get("profiles") {
        for (name, profile_value) in map {
            profiles.insert(name.clone(), profile_value.clone());
        }
    }
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Objects: keys are merged recursively (overlay keys win for conflicts).
/// - Scalars and arrays: overlay replaces base entirely.
pub(crate) fn deep_merge(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let entry = base_map
                    .entry(key.clone())
                    .or_insert(serde_json::Value::Null);
                deep_merge(entry, overlay_val);
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}
