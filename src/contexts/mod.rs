mod attributor;
mod comment_header;
mod content_classifier;
mod extraction;
mod fence_scanner;
mod section_locator;
mod structural_validator;

pub use attributor::Attributor;
pub use comment_header::inspect as inspect_comment_header;
pub use content_classifier::{CodeShape, ContentClassifier, ShapeScore};
pub use extraction::{Extractor, RegistryError, RuleRegistry};
pub use fence_scanner::{scan, scan_regions, FencedRegion};
pub use section_locator::locate_sections;
pub use structural_validator::validate;
