use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "carve.yml";
pub const DEFAULT_MAX_INPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_OUT_DIR: &str = "extracted";

/// Extraction settings after merging the settings file, environment and flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSettings {
    /// Responses longer than this are truncated before scanning
    pub max_input_bytes: usize,
    /// Optional rules file extending the built-in signature table
    pub rules: Option<PathBuf>,
    /// Skip writing files that fail the structural checks
    pub reject_invalid: bool,
    pub out_dir: PathBuf,
    /// Forget manifest records before writing, so every file is rewritten
    pub clean: bool,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            rules: None,
            reject_invalid: false,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            clean: false,
        }
    }
}

/// Flag values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub out_dir: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub max_input_bytes: Option<usize>,
    pub reject_invalid: bool,
    pub clean: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    max_input_bytes: Option<usize>,
    rules: Option<PathBuf>,
    reject_invalid: Option<bool>,
    out_dir: Option<PathBuf>,
}

impl ExtractSettings {
    /// Settings file (if present), then `CARVE_*` environment variables, then flags.
    pub fn resolve(settings_path: &Path, overrides: SettingsOverrides) -> Result<Self> {
        let mut settings = Self::default();

        if settings_path.exists() {
            let content = fs::read_to_string(settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            settings.apply_file(&content).with_context(|| {
                format!("Failed to parse settings file {}", settings_path.display())
            })?;
        }

        settings.apply_env()?;
        settings.apply_overrides(overrides);
        Ok(settings)
    }

    fn apply_file(&mut self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Ok(());
        }
        let file: SettingsFile = serde_yaml::from_str(content)?;
        if let Some(max) = file.max_input_bytes {
            self.max_input_bytes = max;
        }
        if file.rules.is_some() {
            self.rules = file.rules;
        }
        if let Some(reject) = file.reject_invalid {
            self.reject_invalid = reject;
        }
        if let Some(out_dir) = file.out_dir {
            self.out_dir = out_dir;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(max) = env::var("CARVE_MAX_INPUT_BYTES") {
            self.max_input_bytes = max
                .trim()
                .parse()
                .with_context(|| format!("CARVE_MAX_INPUT_BYTES is not a number: {}", max))?;
        }
        if let Ok(rules) = env::var("CARVE_RULES") {
            if !rules.trim().is_empty() {
                self.rules = Some(PathBuf::from(rules));
            }
        }
        if let Ok(out_dir) = env::var("CARVE_OUT_DIR") {
            if !out_dir.trim().is_empty() {
                self.out_dir = PathBuf::from(out_dir);
            }
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: SettingsOverrides) {
        if let Some(out_dir) = overrides.out_dir {
            self.out_dir = out_dir;
        }
        if overrides.rules.is_some() {
            self.rules = overrides.rules;
        }
        if let Some(max) = overrides.max_input_bytes {
            self.max_input_bytes = max;
        }
        if overrides.reject_invalid {
            self.reject_invalid = true;
        }
        self.clean = overrides.clean;
    }
}
