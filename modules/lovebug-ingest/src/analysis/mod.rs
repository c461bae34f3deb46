//! Heuristic extraction collaborators: stateless text → signal functions.
//! No model calls, no network — keyword lexicons and regex patterns only.

pub mod location;
pub mod text;

pub use location::{extract_location, nearby_location_names};
pub use text::{
    analyze_text, classify_severity, extract_keywords, Intensity, TextAnalysis, LOVEBUG_KEYWORDS,
};
