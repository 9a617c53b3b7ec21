use super::attributor::Attributor;
use super::fence_scanner;
use crate::data::{AttributionResult, CodeBlock, RuleSet};
use std::fmt;

/// Errors that can occur while loading a rule table
#[derive(Debug)]
pub enum RegistryError {
    NotFound(String),
    InvalidYaml(String),
    InvalidPattern(String),
    InvalidFilename(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegistryError::NotFound(path) => {
                write!(f, "Rules file '{}' not found", path)
            }
            RegistryError::InvalidYaml(details) => {
                write!(f, "Rules file is not valid YAML: {}", details)
            }
            RegistryError::InvalidPattern(details) => {
                write!(f, "Invalid signature pattern: {}", details)
            }
            RegistryError::InvalidFilename(name) => {
                write!(
                    f,
                    "'{}' does not have a recognized source file extension",
                    name
                )
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Trait for loading the rule table used during extraction
pub trait RuleRegistry {
    fn load_rules(&self) -> Result<RuleSet, RegistryError>;
}

/// Extraction context: turns one model response into a `filename -> code` mapping.
///
/// Holds only a reference to the rule table, so one table can serve any
/// number of extractions, including concurrent ones.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'r> {
    rules: &'r RuleSet,
}

impl Default for Extractor<'static> {
    fn default() -> Self {
        Self::new(RuleSet::builtin())
    }
}

impl<'r> Extractor<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'r RuleSet {
        self.rules
    }

    /// Role method: scanner.scan
    pub fn scan(&self, response: &str) -> Vec<CodeBlock> {
        fence_scanner::scan(response)
    }

    /// Role method: attributor.attribute
    ///
    /// Never fails. A response without recognized fences yields an empty mapping.
    pub fn extract(&self, response: &str) -> AttributionResult {
        let blocks = self.scan(response);
        tracing::debug!(blocks = blocks.len(), "scanned response");
        Attributor::new(self.rules).attribute(&blocks)
    }
}
