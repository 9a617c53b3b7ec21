use crate::data::{RuleSet, SignatureRule};
use regex::Regex;

/// Coarse shape of a code body, used only to pick a fallback filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeShape {
    HeaderLike,
    ImplementationLike,
}

/// Indicator counts behind a [`CodeShape`] decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShapeScore {
    pub header: usize,
    pub implementation: usize,
}

impl ShapeScore {
    /// Header-like only when header indicators strictly outnumber implementation ones.
    pub fn shape(&self) -> CodeShape {
        if self.header > self.implementation {
            CodeShape::HeaderLike
        } else {
            CodeShape::ImplementationLike
        }
    }
}

/// Matches bodies against the signature table and scores their shape.
#[derive(Debug, Clone, Copy)]
pub struct ContentClassifier<'r> {
    rules: &'r RuleSet,
}

impl<'r> ContentClassifier<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    /// First rule, in table order, whose pattern occurs anywhere in `body`.
    ///
    /// This is a plain occurrence test. A call site counts as much as a definition.
    pub fn match_signature(&self, body: &str) -> Option<&'r SignatureRule> {
        self.rules.signatures.iter().find(|rule| rule.matches(body))
    }

    pub fn score(&self, body: &str) -> ShapeScore {
        ShapeScore {
            header: count_present(&self.rules.header_indicators, body),
            implementation: count_present(&self.rules.implementation_indicators, body),
        }
    }

    pub fn shape(&self, body: &str) -> CodeShape {
        self.score(body).shape()
    }
}

/// Number of distinct patterns that occur at least once
fn count_present(patterns: &[Regex], body: &str) -> usize {
    patterns.iter().filter(|re| re.is_match(body)).count()
}
