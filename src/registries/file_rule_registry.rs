use crate::contexts::{RegistryError, RuleRegistry};
use crate::data::{is_source_filename, RuleSet, SignatureRule};
use std::fs;
use std::path::PathBuf;
use yaml_rust::{Yaml, YamlLoader};

/// File-based implementation of RuleRegistry
/// Loads extra signature rules and default filenames from a YAML file
#[derive(Clone, Debug)]
pub struct FileRuleRegistry {
    rules_path: PathBuf,
}

impl FileRuleRegistry {
    /// Creates a new FileRuleRegistry
    ///
    /// # Arguments
    /// * `rules_path` - Optional path to the rules file (defaults to "carve_rules.yml")
    pub fn new(rules_path: Option<PathBuf>) -> Self {
        Self {
            rules_path: rules_path.unwrap_or_else(|| PathBuf::from("carve_rules.yml")),
        }
    }
}

impl RuleRegistry for FileRuleRegistry {
    fn load_rules(&self) -> Result<RuleSet, RegistryError> {
        if !self.rules_path.exists() {
            return Err(RegistryError::NotFound(
                self.rules_path.display().to_string(),
            ));
        }

        let content = fs::read_to_string(&self.rules_path).map_err(|e| {
            RegistryError::InvalidYaml(format!(
                "Failed to read {}: {}",
                self.rules_path.display(),
                e
            ))
        })?;

        parse_rules(&content)
    }
}

/// Parses a rules file into a rule set. Rules from the file are evaluated
/// before the built-in ones.
///
/// Signature entries come in two forms:
/// `- pattern: '<regex>'` with `file: name.c`, or the shorthand
/// `- Identifier: name.c`, which matches `Identifier (`.
fn parse_rules(yaml_content: &str) -> Result<RuleSet, RegistryError> {
    let docs = YamlLoader::load_from_str(yaml_content)
        .map_err(|e| RegistryError::InvalidYaml(e.to_string()))?;

    let Some(doc) = docs.first() else {
        return Ok(RuleSet::builtin().clone());
    };

    let mut extra = Vec::new();
    match &doc["signatures"] {
        Yaml::Array(entries) => {
            for entry in entries {
                extra.push(parse_signature(entry)?);
            }
        }
        Yaml::BadValue | Yaml::Null => {}
        _ => {
            return Err(RegistryError::InvalidYaml(
                "'signatures' must be a list".to_string(),
            ))
        }
    }

    let mut rules = RuleSet::extended(extra);

    if let Some(header) = doc["defaults"]["header"].as_str() {
        rules.header_default = checked_filename(header)?;
    }
    if let Some(implementation) = doc["defaults"]["implementation"].as_str() {
        rules.implementation_default = checked_filename(implementation)?;
    }

    Ok(rules)
}

fn parse_signature(entry: &Yaml) -> Result<SignatureRule, RegistryError> {
    if let Some(pattern) = entry["pattern"].as_str() {
        let file = entry["file"].as_str().ok_or_else(|| {
            RegistryError::InvalidYaml(format!("signature '{}' has no 'file'", pattern))
        })?;
        let file = checked_filename(file)?;
        return SignatureRule::new(pattern, file)
            .map_err(|e| RegistryError::InvalidPattern(format!("{}: {}", pattern, e)));
    }

    // Shorthand: single-key map of identifier -> file
    if let Some(hash) = entry.as_hash() {
        if let Some((key, value)) = hash.iter().next().filter(|_| hash.len() == 1) {
            if let (Some(identifier), Some(file)) = (key.as_str(), value.as_str()) {
                return Ok(SignatureRule::for_identifier(
                    identifier,
                    checked_filename(file)?,
                ));
            }
        }
    }

    Err(RegistryError::InvalidYaml(format!(
        "unrecognized signature entry: {:?}",
        entry
    )))
}

fn checked_filename(name: &str) -> Result<String, RegistryError> {
    let name = name.trim();
    if is_source_filename(name) {
        Ok(name.to_string())
    } else {
        Err(RegistryError::InvalidFilename(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules_full_format() {
        let yaml = r#"
defaults:
  header: game.h
  implementation: game.c
signatures:
  - pattern: '\bG_RunFrame\s*\('
    file: g_main.c
  - G_Spawn: g_utils.c
"#;

        let rules = parse_rules(yaml).unwrap();
        assert_eq!(rules.header_default, "game.h");
        assert_eq!(rules.implementation_default, "game.c");
        assert_eq!(rules.signatures[0].filename, "g_main.c");
        assert!(rules.signatures[0].matches("G_RunFrame();"));
        assert_eq!(rules.signatures[1].filename, "g_utils.c");
        assert!(rules.signatures[1].matches("ent = G_Spawn ();"));
        assert_eq!(
            rules.signatures.len(),
            RuleSet::builtin().signatures.len() + 2
        );
    }

    #[test]
    fn test_parse_empty_rules() {
        let rules = parse_rules("").unwrap();
        assert_eq!(rules.signatures.len(), RuleSet::builtin().signatures.len());
        assert_eq!(rules.implementation_default, "main.c");
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let yaml = "signatures:\n  - Foo_Bar: foo.py\n";
        assert!(matches!(
            parse_rules(yaml),
            Err(RegistryError::InvalidFilename(name)) if name == "foo.py"
        ));
    }

    #[test]
    fn test_rejects_bad_regex() {
        let yaml = "signatures:\n  - pattern: 'Foo('\n    file: foo.c\n";
        assert!(matches!(
            parse_rules(yaml),
            Err(RegistryError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_rejects_non_list_signatures() {
        let yaml = "signatures: zone.c\n";
        assert!(matches!(parse_rules(yaml), Err(RegistryError::InvalidYaml(_))));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let registry = FileRuleRegistry::new(Some(PathBuf::from("/nonexistent/rules.yml")));
        assert!(matches!(
            registry.load_rules(),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        fs::write(&path, "defaults:\n  header: quakedef.h\n").unwrap();

        let rules = FileRuleRegistry::new(Some(path)).load_rules().unwrap();
        assert_eq!(rules.header_default, "quakedef.h");
    }
}
