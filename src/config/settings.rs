//! Settings Module
//!
//! Manages pkgbridge settings (disabled backends, elevation helper,
//! interpreter paths, timeouts, cache location).

use crate::core::Backend;
use crate::error::{PkgBridgeError, Result};
use crate::utils::paths;
use kdl::KdlDocument;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PYPI_URL: &str = "https://pypi.org/pypi";

const VALID_KEYS: &[&str] = &[
    "disabled",
    "elevator",
    "choco-path",
    "python",
    "command-timeout",
    "cache-dir",
    "pypi-url",
    "color",
];

/// Settings manager
#[derive(Debug, Clone)]
pub struct Settings {
    settings_file: PathBuf,
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Load settings from the default location, or fall back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(paths::settings_file()?)
    }

    pub fn load_from(settings_file: PathBuf) -> Result<Self> {
        let mut values = Self::defaults();
        if settings_file.exists() {
            values.extend(parse_settings(&settings_file)?);
        }

        Ok(Self {
            settings_file,
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.settings_file
    }

    /// Get a setting value; empty values count as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        validate_value(key, value)?;

        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    /// Reset a setting to default
    pub fn reset(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let default = Self::defaults().remove(key).unwrap_or_default();
        self.values.insert(key.to_string(), default);
        self.save()
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Backends listed under `disabled`. Unknown names are skipped.
    pub fn disabled_backends(&self) -> Vec<Backend> {
        self.get("disabled")
            .map(|raw| {
                raw.split(',')
                    .filter_map(|name| name.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn command_timeout_secs(&self) -> u64 {
        self.get("command-timeout")
            .and_then(|raw| raw.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS)
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        match self.get("cache-dir") {
            Some(dir) => paths::expand_home(Path::new(dir)),
            None => paths::cache_dir(),
        }
    }

    pub fn pypi_url(&self) -> &str {
        self.get("pypi-url").unwrap_or(DEFAULT_PYPI_URL)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_file.parent() {
            fs::create_dir_all(parent).map_err(|e| PkgBridgeError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut content = String::from(
            "// pkgbridge settings\n// Generated by `pkgbridge settings set`\n\nsettings {\n",
        );
        for (key, value) in &self.values {
            content.push_str(&format!("    {} {:?}\n", key, value));
        }
        content.push_str("}\n");

        fs::write(&self.settings_file, content).map_err(|e| PkgBridgeError::IoError {
            path: self.settings_file.clone(),
            source: e,
        })
    }

    fn defaults() -> BTreeMap<String, String> {
        let mut defaults = BTreeMap::new();
        defaults.insert("disabled".to_string(), String::new());
        defaults.insert("elevator".to_string(), String::new()); // Empty = platform default
        defaults.insert("choco-path".to_string(), String::new());
        defaults.insert("python".to_string(), String::new());
        defaults.insert(
            "command-timeout".to_string(),
            DEFAULT_COMMAND_TIMEOUT_SECS.to_string(),
        );
        defaults.insert("cache-dir".to_string(), String::new());
        defaults.insert("pypi-url".to_string(), DEFAULT_PYPI_URL.to_string());
        defaults.insert("color".to_string(), "auto".to_string());
        defaults
    }
}

fn validate_key(key: &str) -> Result<()> {
    if !VALID_KEYS.contains(&key) {
        return Err(PkgBridgeError::ConfigError(format!(
            "Unknown setting: '{}'. Valid settings: {}",
            key,
            VALID_KEYS.join(", ")
        )));
    }
    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<()> {
    let invalid = |hint: &str| {
        Err(PkgBridgeError::ConfigError(format!(
            "Invalid value for '{}': '{}'. {}",
            key, value, hint
        )))
    };

    match key {
        "disabled" => {
            for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                name.parse::<Backend>()?;
            }
        }
        "command-timeout" => {
            if !matches!(value.parse::<u64>(), Ok(secs) if secs > 0) {
                return invalid("Expected a positive number of seconds");
            }
        }
        "pypi-url" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return invalid("Expected an http(s) URL");
            }
        }
        "color" => {
            let valid = ["auto", "always", "never"];
            if !valid.contains(&value) {
                return invalid(&format!("Valid: {}", valid.join(", ")));
            }
        }
        _ => {}
    }

    Ok(())
}

/// Parse `settings { key "value" }` from a KDL file.
/// Top-level `key "value"` nodes are accepted too.
fn parse_settings(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path).map_err(|e| PkgBridgeError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let doc: KdlDocument = content.parse()?;
    let mut values = BTreeMap::new();

    for node in doc.nodes() {
        if node.name().value() == "settings" {
            if let Some(children) = node.children() {
                for child in children.nodes() {
                    if let Some(value) = node_value(child) {
                        values.insert(child.name().value().to_string(), value);
                    }
                }
            }
        } else if let Some(value) = node_value(node) {
            values.insert(node.name().value().to_string(), value);
        }
    }

    for key in values.keys() {
        if !VALID_KEYS.contains(&key.as_str()) {
            crate::ui::warning(&format!("Ignoring unknown setting '{}'", key));
        }
    }
    values.retain(|key, _| VALID_KEYS.contains(&key.as_str()));

    Ok(values)
}

fn node_value(node: &kdl::KdlNode) -> Option<String> {
    let entry = node.entries().first()?;
    let value = entry.value();
    if let Some(text) = value.as_string() {
        Some(text.to_string())
    } else if let Some(number) = value.as_integer() {
        Some(number.to_string())
    } else {
        value.as_bool().map(|flag| flag.to_string())
    }
}

#[cfg(test)]
mod tests;
