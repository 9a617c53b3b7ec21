//! Record of extracted files written to an output directory
//!
//! Stores content hashes in `.carve/manifest.json` under the output directory
//! so unchanged files are not rewritten on repeated extraction.

use crate::data::{AttributionSource, ValidationOutcome};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_DIR: &str = ".carve";
const MANIFEST_FILE: &str = "manifest.json";

/// One extracted file as last written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// SHA-256 of the written code
    pub content_hash: String,
    /// Attribution stage that chose the filename
    pub source: String,
    /// Whether the structural checks passed
    pub valid: bool,
    /// Validation message, empty when valid
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Response the code was extracted from
    pub response: String,
    /// Timestamp of last write
    pub timestamp: String,
}

/// Manifest of all files written into one output directory
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    /// Maps: filename -> FileRecord
    files: BTreeMap<String, FileRecord>,
}

impl Manifest {
    /// Load the manifest for `out_dir`, or create an empty one
    pub fn load(out_dir: &Path) -> Result<Self> {
        let path = Self::manifest_path(out_dir);

        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read manifest {}", path.display()))?;
            let manifest: Manifest = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse manifest {}", path.display()))?;
            Ok(manifest)
        } else {
            Ok(Manifest::default())
        }
    }

    /// Save the manifest into `out_dir`
    pub fn save(&self, out_dir: &Path) -> Result<()> {
        let dir = out_dir.join(MANIFEST_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;

        fs::write(Self::manifest_path(out_dir), content).context("Failed to write manifest")?;

        Ok(())
    }

    fn manifest_path(out_dir: &Path) -> PathBuf {
        out_dir.join(MANIFEST_DIR).join(MANIFEST_FILE)
    }

    /// Check if `code` has to be written to `path`
    ///
    /// Returns true if:
    /// - The file doesn't exist
    /// - There's no record for it
    /// - The recorded hash differs from the new code
    pub fn needs_write(&self, filename: &str, code: &str, path: &Path) -> bool {
        if !path.exists() {
            return true;
        }

        let Some(record) = self.files.get(filename) else {
            return true;
        };

        record.content_hash != hash_content(code)
    }

    /// Record a written file
    pub fn record(
        &mut self,
        filename: &str,
        code: &str,
        source: AttributionSource,
        outcome: &ValidationOutcome,
        response: &str,
    ) {
        let timestamp = chrono::Utc::now().to_rfc3339();

        self.files.insert(
            filename.to_string(),
            FileRecord {
                content_hash: hash_content(code),
                source: source.label().to_string(),
                valid: outcome.ok,
                message: outcome.message.clone(),
                response: response.to_string(),
                timestamp,
            },
        );
    }

    pub fn get(&self, filename: &str) -> Option<&FileRecord> {
        self.files.get(filename)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Get a summary of recorded files
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        lines.push("Extraction Manifest:".to_string());

        for (name, record) in &self.files {
            let status = if record.valid { "ok" } else { "invalid" };
            lines.push(format!(
                "  {} ({}, {}, updated: {})",
                name, record.source, status, record.timestamp
            ));
        }

        if self.files.is_empty() {
            lines.push("  No recorded files".to_string());
        }

        lines.join("\n")
    }

    /// Remove all records. Returns number of entries removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.files.len();
        self.files.clear();
        removed
    }
}

/// SHA-256 of `code`, hex encoded
pub fn hash_content(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_content() {
        let hash1 = hash_content("int x;");
        let hash2 = hash_content("int x;");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, hash_content("int y;"));
    }

    #[test]
    fn test_record_and_needs_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zone.c");
        let mut manifest = Manifest::default();

        assert!(manifest.needs_write("zone.c", "int x;", &path));

        fs::write(&path, "int x;").unwrap();
        assert!(manifest.needs_write("zone.c", "int x;", &path));

        manifest.record(
            "zone.c",
            "int x;",
            AttributionSource::Signature,
            &ValidationOutcome::pass(),
            "response.md",
        );
        assert!(!manifest.needs_write("zone.c", "int x;", &path));
        assert!(manifest.needs_write("zone.c", "int y;", &path));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::default();
        manifest.record(
            "main.c",
            "}",
            AttributionSource::ImplementationFallback,
            &ValidationOutcome::fail("Unbalanced braces: -1"),
            "answer.txt",
        );
        manifest.save(dir.path()).unwrap();

        let loaded = Manifest::load(dir.path()).unwrap();
        let record = loaded.get("main.c").unwrap();
        assert!(!record.valid);
        assert_eq!(record.message, "Unbalanced braces: -1");
        assert_eq!(record.source, "implementation fallback");
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Manifest::load(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut manifest = Manifest::default();
        manifest.record("a.c", "x", AttributionSource::Hint, &ValidationOutcome::pass(), "r");
        assert_eq!(manifest.clear(), 1);
        assert!(manifest.summary().contains("No recorded files"));
    }
}
