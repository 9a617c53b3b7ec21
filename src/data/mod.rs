mod code_block;
mod rules;

pub use code_block::{
    Attribution, AttributionResult, AttributionSource, CodeBlock, SectionMatch, ValidationOutcome,
};
pub use rules::{
    is_source_filename, RuleSet, SignatureRule, DEFAULT_HEADER_FILE, DEFAULT_IMPLEMENTATION_FILE,
    FILENAME_PATTERN, SOURCE_EXTENSIONS,
};
