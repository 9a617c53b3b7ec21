mod file_rule_registry;

pub use file_rule_registry::FileRuleRegistry;
