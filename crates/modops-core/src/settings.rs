//! Layered settings loading for the modops CLI.
//!
//! Settings come from an ordered list of env-style files. Layers are applied
//! in order and later layers overwrite earlier ones key-by-key. Every layer
//! is optional except the last, which must exist.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Well-known key for the general output directory.
pub const KEY_OUTPUT_DIRECTORY: &str = "OUTPUT_DIRECTORY";

/// Well-known key for the artifacts directory (traces, reports, scripts).
pub const KEY_ARTIFACTS_DIRECTORY: &str = "ARTIFACTS_DIRECTORY";

/// File name of the mandatory tool-level settings layer.
pub const TOOL_SETTINGS_FILE: &str = "modops.env";

/// Errors raised while loading or querying settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The mandatory (last) settings layer does not exist.
    #[error("configuration file not found: {path:?}")]
    MissingMandatoryLayer { path: PathBuf },

    /// A settings layer exists but could not be read.
    #[error("failed to read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// One or more required settings are absent.
    #[error("missing required setting(s): {}; set them in {TOOL_SETTINGS_FILE}", keys.join(", "))]
    MissingRequired { keys: Vec<String> },
}

/// Read-only key/value settings resolved from layered files.
///
/// Constructed once at process entry and passed by reference to everything
/// that needs it. There is no re-load and no runtime mutation.
#[derive(Debug, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Returns the standard layer list for a repository root: the shared
    /// repository `.env` (optional) followed by the tool-level
    /// `modops.env` (mandatory, wins on overlapping keys).
    pub fn standard_layers(root: &Path) -> Vec<PathBuf> {
        vec![root.join(".env"), root.join(TOOL_SETTINGS_FILE)]
    }

    /// Loads settings from the given layers, in order.
    ///
    /// A missing layer is skipped unless it is the last one, in which case
    /// loading fails. Within a layer, blank lines, `#` comments, and lines
    /// without a `=` are ignored; keys and values are trimmed of whitespace
    /// and one pair of surrounding quotes.
    pub fn load(layers: &[PathBuf]) -> Result<Self, SettingsError> {
        let mut values = HashMap::new();

        for (index, path) in layers.iter().enumerate() {
            let is_last = index + 1 == layers.len();
            if !path.exists() {
                if is_last {
                    return Err(SettingsError::MissingMandatoryLayer { path: path.clone() });
                }
                debug!("Settings layer {} not present, skipping", path.display());
                continue;
            }

            let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
                path: path.clone(),
                source,
            })?;
            let applied = apply_layer(&mut values, &content);
            debug!(
                "Loaded settings layer {} ({} entries)",
                path.display(),
                applied
            );
        }

        Ok(Self { values })
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the value for `key`, or `default` with a warning when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.values.get(key) {
            Some(value) => value,
            None => {
                warn!("Setting {key} not configured, using default '{default}'");
                default
            }
        }
    }

    /// Returns the value for `key` or fails, naming the key and the file
    /// where it is expected.
    pub fn get_required(&self, key: &str) -> Result<&str, SettingsError> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| SettingsError::MissingRequired {
                keys: vec![key.to_string()],
            })
    }
}

/// The two operational paths every artifact-producing task needs.
///
/// Validated in one pass so that a settings file missing both keys reports
/// both at once instead of failing on the first.
#[derive(Debug, Clone)]
pub struct OperationalPaths {
    pub output_dir: PathBuf,
    pub artifacts_dir: PathBuf,
}

impl OperationalPaths {
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let mut missing = Vec::new();
        let output = settings.get(KEY_OUTPUT_DIRECTORY);
        if output.is_none() {
            missing.push(KEY_OUTPUT_DIRECTORY.to_string());
        }
        let artifacts = settings.get(KEY_ARTIFACTS_DIRECTORY);
        if artifacts.is_none() {
            missing.push(KEY_ARTIFACTS_DIRECTORY.to_string());
        }
        if !missing.is_empty() {
            return Err(SettingsError::MissingRequired { keys: missing });
        }

        Ok(Self {
            output_dir: PathBuf::from(output.unwrap_or_default()),
            artifacts_dir: PathBuf::from(artifacts.unwrap_or_default()),
        })
    }
}

/// Applies one layer's content on top of the accumulated map.
///
/// Returns the number of entries set. Malformed lines are skipped, never
/// fatal.
fn apply_layer(values: &mut HashMap<String, String>, content: &str) -> usize {
    let mut applied = 0;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((raw_key, raw_value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = trim_quotes(raw_key.trim());
        if key.is_empty() {
            continue;
        }
        let value = trim_quotes(raw_value.trim());
        values.insert(key.to_string(), value.to_string());
        applied += 1;
    }
    applied
}

/// Strips one pair of matching surrounding quotes, if present.
fn trim_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_layer(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_later_layer_overrides_earlier() {
        let dir = TempDir::new().unwrap();
        let base = write_layer(&dir, "base.env", "A=1\nB=2\n");
        let over = write_layer(&dir, "over.env", "B=overridden\nC=3\n");

        let settings = Settings::load(&[base, over]).unwrap();
        assert_eq!(settings.get("A"), Some("1"));
        assert_eq!(settings.get("B"), Some("overridden"));
        assert_eq!(settings.get("C"), Some("3"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let layer = write_layer(
            &dir,
            "layer.env",
            "no equals here\n=missing-key\n   \nGOOD=yes\n",
        );

        let settings = Settings::load(&[layer]).unwrap();
        assert_eq!(settings.get("GOOD"), Some("yes"));
        assert_eq!(settings.get(""), None);
        assert_eq!(settings.get("no equals here"), None);
    }

    #[test]
    fn test_comments_and_blanks_ignored() {
        let dir = TempDir::new().unwrap();
        let layer = write_layer(&dir, "layer.env", "# comment\n   # indented comment\n\nK=v\n");

        let settings = Settings::load(&[layer]).unwrap();
        assert_eq!(settings.get("K"), Some("v"));
        assert_eq!(settings.get("# comment"), None);
    }

    #[test]
    fn test_quotes_and_whitespace_trimmed() {
        let dir = TempDir::new().unwrap();
        let layer = write_layer(
            &dir,
            "layer.env",
            "A = \"a value\" \nB='x'\nC=\"unbalanced\nD=plain\n",
        );

        let settings = Settings::load(&[layer]).unwrap();
        assert_eq!(settings.get("A"), Some("a value"));
        assert_eq!(settings.get("B"), Some("x"));
        // Unbalanced quote is kept as-is.
        assert_eq!(settings.get("C"), Some("\"unbalanced"));
        assert_eq!(settings.get("D"), Some("plain"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let dir = TempDir::new().unwrap();
        let layer = write_layer(&dir, "layer.env", "CONN=Server=db;Port=5432\n");

        let settings = Settings::load(&[layer]).unwrap();
        assert_eq!(settings.get("CONN"), Some("Server=db;Port=5432"));
    }

    #[test]
    fn test_missing_mandatory_layer_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("modops.env");

        let err = Settings::load(&[missing.clone()]).unwrap_err();
        match err {
            SettingsError::MissingMandatoryLayer { path } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_optional_layer_is_skipped() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join(".env");
        let mandatory = write_layer(&dir, "modops.env", "K=v\n");

        let settings = Settings::load(&[missing, mandatory]).unwrap();
        assert_eq!(settings.get("K"), Some("v"));
    }

    #[test]
    fn test_get_or_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let layer = write_layer(&dir, "modops.env", "PRESENT=here\n");

        let settings = Settings::load(&[layer]).unwrap();
        assert_eq!(settings.get_or("PRESENT", "unused"), "here");
        assert_eq!(settings.get_or("ABSENT", "fallback"), "fallback");
    }

    #[test]
    fn test_get_required() {
        let dir = TempDir::new().unwrap();
        let layer = write_layer(&dir, "modops.env", "OUTPUT_DIRECTORY=out\n");

        let settings = Settings::load(&[layer]).unwrap();
        assert_eq!(settings.get_required(KEY_OUTPUT_DIRECTORY).unwrap(), "out");

        let err = settings.get_required(KEY_ARTIFACTS_DIRECTORY).unwrap_err();
        assert!(err.to_string().contains("ARTIFACTS_DIRECTORY"));
        assert!(err.to_string().contains(TOOL_SETTINGS_FILE));
    }

    #[test]
    fn test_operational_paths_reports_all_missing_keys() {
        let dir = TempDir::new().unwrap();
        let layer = write_layer(&dir, "modops.env", "UNRELATED=1\n");

        let settings = Settings::load(&[layer]).unwrap();
        let err = OperationalPaths::from_settings(&settings).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("OUTPUT_DIRECTORY"));
        assert!(message.contains("ARTIFACTS_DIRECTORY"));
    }

    #[test]
    fn test_operational_paths_resolved() {
        let dir = TempDir::new().unwrap();
        let layer = write_layer(
            &dir,
            "modops.env",
            "OUTPUT_DIRECTORY=out\nARTIFACTS_DIRECTORY=artifacts\n",
        );

        let settings = Settings::load(&[layer]).unwrap();
        let paths = OperationalPaths::from_settings(&settings).unwrap();
        assert_eq!(paths.output_dir, PathBuf::from("out"));
        assert_eq!(paths.artifacts_dir, PathBuf::from("artifacts"));
    }

    #[test]
    fn test_standard_layers_order() {
        let layers = Settings::standard_layers(Path::new("/repo"));
        assert_eq!(layers[0], PathBuf::from("/repo/.env"));
        assert_eq!(layers[1], PathBuf::from("/repo/modops.env"));
    }
}
