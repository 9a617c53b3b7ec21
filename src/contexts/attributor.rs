use super::comment_header;
use super::content_classifier::{CodeShape, ContentClassifier};
use crate::data::{AttributionResult, AttributionSource, CodeBlock, RuleSet};

/// Assigns a filename to every scanned block.
///
/// Resolution stops at the first stage that produces a name:
/// fence hint, comment header, signature table, then one of the two
/// default filenames depending on whether the body looks like a header.
#[derive(Debug, Clone, Copy)]
pub struct Attributor<'r> {
    rules: &'r RuleSet,
    classifier: ContentClassifier<'r>,
}

impl<'r> Attributor<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self {
            rules,
            classifier: ContentClassifier::new(rules),
        }
    }

    /// Filename for a single block, and the stage that chose it. Always succeeds.
    pub fn resolve(&self, block: &CodeBlock) -> (String, AttributionSource) {
        if let Some(hint) = &block.hint {
            return (hint.trim().to_string(), AttributionSource::Hint);
        }

        if let Some(name) = comment_header::inspect(&block.body) {
            return (name, AttributionSource::CommentHeader);
        }

        if let Some(rule) = self.classifier.match_signature(&block.body) {
            return (rule.filename.clone(), AttributionSource::Signature);
        }

        match self.classifier.shape(&block.body) {
            CodeShape::HeaderLike => (
                self.rules.header_default.clone(),
                AttributionSource::HeaderFallback,
            ),
            CodeShape::ImplementationLike => (
                self.rules.implementation_default.clone(),
                AttributionSource::ImplementationFallback,
            ),
        }
    }

    /// Builds the mapping in block order. A later block resolving to an
    /// existing filename replaces the earlier code.
    pub fn attribute(&self, blocks: &[CodeBlock]) -> AttributionResult {
        let mut result = AttributionResult::new();

        for (index, block) in blocks.iter().enumerate() {
            let (filename, source) = self.resolve(block);
            tracing::debug!(
                block = index,
                file = %filename,
                via = source.label(),
                confident = source.is_confident(),
                "attributed code block"
            );

            if result.insert(filename.as_str(), block.body.as_str(), source).is_some() {
                tracing::debug!(file = %filename, block = index, "later block replaced earlier code");
            }
        }

        result
    }
}
