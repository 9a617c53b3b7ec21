use serde::Serialize;

/// A fenced region pulled out of a model response.
///
/// `hint` is the filename token found on the opening fence line, if any.
/// `body` is the text between the fences with surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    pub hint: Option<String>,
    pub body: String,
}

impl CodeBlock {
    pub fn new(hint: Option<String>, body: impl Into<String>) -> Self {
        Self {
            hint: hint
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
            body: body.into().trim().to_string(),
        }
    }
}

/// Which stage of the attribution cascade produced a filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionSource {
    /// Filename given on the opening fence line
    Hint,
    /// Filename declared in a comment within the first lines of the body
    CommentHeader,
    /// Body contains an identifier from the signature table
    Signature,
    /// Nothing matched; body looked like a header
    HeaderFallback,
    /// Nothing matched; body looked like an implementation file
    ImplementationFallback,
}

impl AttributionSource {
    /// Fallback attributions mean the heuristics could not tell where the code belongs.
    pub fn is_confident(self) -> bool {
        !matches!(
            self,
            AttributionSource::HeaderFallback | AttributionSource::ImplementationFallback
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            AttributionSource::Hint => "fence hint",
            AttributionSource::CommentHeader => "comment header",
            AttributionSource::Signature => "signature",
            AttributionSource::HeaderFallback => "header fallback",
            AttributionSource::ImplementationFallback => "implementation fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribution {
    pub filename: String,
    pub code: String,
    pub source: AttributionSource,
}

/// Ordered `filename -> code` mapping.
///
/// Keys are unique. Inserting an existing filename replaces the earlier
/// entry's code and provenance in place (last write wins); the key keeps
/// the position where it was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributionResult {
    entries: Vec<Attribution>,
}

impl AttributionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry. Returns the code it replaced, if the filename was already present.
    pub fn insert(
        &mut self,
        filename: impl Into<String>,
        code: impl Into<String>,
        source: AttributionSource,
    ) -> Option<String> {
        let filename = filename.into();
        let code = code.into();

        if let Some(existing) = self.entries.iter_mut().find(|e| e.filename == filename) {
            existing.source = source;
            return Some(std::mem::replace(&mut existing.code, code));
        }

        self.entries.push(Attribution {
            filename,
            code,
            source,
        });
        None
    }

    pub fn get(&self, filename: &str) -> Option<&str> {
        self.entry(filename).map(|e| e.code.as_str())
    }

    pub fn entry(&self, filename: &str) -> Option<&Attribution> {
        self.entries.iter().find(|e| e.filename == filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entry(filename).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribution> {
        self.entries.iter()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.filename.as_str())
    }

    /// Plain `(filename, code)` pairs in discovery order
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.entries
            .into_iter()
            .map(|e| (e.filename, e.code))
            .collect()
    }
}

impl IntoIterator for AttributionResult {
    type Item = Attribution;
    type IntoIter = std::vec::IntoIter<Attribution>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttributionResult {
    type Item = &'a Attribution;
    type IntoIter = std::slice::Iter<'a, Attribution>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Result of the shallow structural checks on one code body.
/// `message` is empty when `ok` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub message: String,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// A filename mentioned in prose, with surrounding text for context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionMatch {
    pub filename: String,
    pub snippet: String,
}
