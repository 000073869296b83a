//! Best-effort textual extraction of module facts.
//!
//! These patterns scrape two fields out of raw configuration text. They do not
//! parse the configuration language: nesting, comments and string escapes are
//! not understood, so commented-out or ambiguous declarations may be picked up.
//! Aggregation relies on these exact semantics, so keep them textual.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `source = "<value>"` with single or double quotes.
    static ref SOURCE_PATTERN: Regex =
        Regex::new(r#"source\s*=\s*["']([^"']+)["']"#).unwrap();

    /// `dependencies = { ... }`, braces may span lines. Stops at the first `}`.
    static ref DEPENDENCY_BLOCK_PATTERN: Regex =
        Regex::new(r#"(?s)dependencies\s*=\s*\{([^}]+)\}"#).unwrap();

    /// Any quoted string token.
    static ref QUOTED_PATTERN: Regex = Regex::new(r#"["']([^"']+)["']"#).unwrap();
}

/// Facts scraped from a single configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFacts {
    /// First module source declared in the file.
    pub source: Option<String>,
    /// Every quoted string inside the first dependency block, in order.
    pub dependencies: Vec<String>,
}

/// Scrape module source and dependency paths from configuration text.
pub fn extract_text_facts(content: &str) -> TextFacts {
    TextFacts {
        source: extract_source(content),
        dependencies: extract_dependencies(content),
    }
}

/// First `source = "..."` value in the text.
pub fn extract_source(content: &str) -> Option<String> {
    SOURCE_PATTERN
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Quoted strings inside the first `dependencies = { ... }` block.
pub fn extract_dependencies(content: &str) -> Vec<String> {
    let Some(block) = DEPENDENCY_BLOCK_PATTERN
        .captures(content)
        .and_then(|caps| caps.get(1))
    else {
        return Vec::new();
    };

    QUOTED_PATTERN
        .captures_iter(block.as_str())
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
