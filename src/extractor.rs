//! Command Extraction Module for iai_core
//!
//! Scans free-form model responses for substrings that look like GRASS
//! module invocations (g.*, r.*, v.*, ...), GDAL command-line tools, or
//! common shell utilities. Matching is deliberately heuristic: one regex
//! per pattern family, greedy, line-bounded, case-insensitive. It will
//! over-match trailing punctuation and under-match multi-line invocations.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The pattern family that produced a candidate
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchFamily {
    /// GRASS module namespace, carries the prefix ("g", "r", ...)
    Namespace(String),
    /// External tool family matched by name prefix ("gdal")
    ToolFamily(String),
    /// Bare shell utility name (wget, curl, tar, ...)
    ShellTool,
}

/// A command-looking substring extracted from response text
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CandidateCommand {
    /// Raw matched text, exactly as it appeared
    pub text: String,
    /// Which pattern family matched it
    pub family: MatchFamily,
    /// Byte offset of the first occurrence in the scanned text
    pub position: usize,
}

/// Extractor configuration, fixed at construction time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Module namespace prefixes, in declaration order
    pub namespace_prefixes: Vec<String>,
    /// Tool families matched by name prefix
    pub tool_family_prefixes: Vec<String>,
    /// Shell utilities matched by bare name
    pub shell_tools: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            namespace_prefixes: default_namespace_prefixes(),
            tool_family_prefixes: vec!["gdal".to_string()],
            shell_tools: default_shell_tools(),
        }
    }
}

/// The module families scanned for by default
pub fn default_namespace_prefixes() -> Vec<String> {
    ["g", "r", "v", "i", "db", "t", "m"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Shell utilities recognized by default
pub fn default_shell_tools() -> Vec<String> {
    ["wget", "curl", "unzip", "tar", "gzip", "awk", "sed", "grep"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

struct CompiledFamily {
    family: MatchFamily,
    regex: Regex,
    /// Some(n): candidate text is capture group n, not the whole match
    capture_group: Option<usize>,
}

/// Main command extractor
pub struct CommandExtractor {
    patterns: Vec<CompiledFamily>,
}

impl CommandExtractor {
    /// Create an extractor with the default pattern families
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    /// Create an extractor from explicit configuration
    pub fn with_config(config: ExtractorConfig) -> Self {
        let mut patterns = Vec::new();

        // Namespace families: prefix, dot-joined module name, then greedy
        // same-line key=value argument tokens.
        for prefix in &config.namespace_prefixes {
            let pattern = format!(
                r"(?i)\b{}\.[a-z0-9_]+(?:\.[a-z0-9_]+)*(?:[ \t]+[a-z0-9_.@-]+=[^\s]+)*",
                regex::escape(prefix)
            );
            if let Ok(regex) = Regex::new(&pattern) {
                patterns.push(CompiledFamily {
                    family: MatchFamily::Namespace(prefix.clone()),
                    regex,
                    capture_group: None,
                });
            }
        }

        // Tool families (gdalinfo, gdalwarp, ...): name prefix plus greedy
        // same-line tokens.
        for prefix in &config.tool_family_prefixes {
            let pattern = format!(
                r"(?i)\b{}[a-z0-9_]+(?:[ \t]+[^\s]+)*",
                regex::escape(prefix)
            );
            if let Ok(regex) = Regex::new(&pattern) {
                patterns.push(CompiledFamily {
                    family: MatchFamily::ToolFamily(prefix.clone()),
                    regex,
                    capture_group: None,
                });
            }
        }

        // Shell utilities: only the utility name itself is captured;
        // trailing arguments are consumed by the match but dropped.
        if !config.shell_tools.is_empty() {
            let names = config
                .shell_tools
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?i)\b({})\b(?:[ \t]+[^\s]+)*", names);
            if let Ok(regex) = Regex::new(&pattern) {
                patterns.push(CompiledFamily {
                    family: MatchFamily::ShellTool,
                    regex,
                    capture_group: Some(1),
                });
            }
        }

        Self { patterns }
    }

    /// Scan response text and return candidates in pattern-declaration
    /// order, deduplicated by exact text, first occurrence wins.
    pub fn extract(&self, text: &str) -> Vec<CandidateCommand> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();

        for compiled in &self.patterns {
            match compiled.capture_group {
                None => {
                    for mat in compiled.regex.find_iter(text) {
                        push_candidate(
                            &mut candidates,
                            &mut seen,
                            mat.as_str(),
                            &compiled.family,
                            mat.start(),
                        );
                    }
                }
                Some(group) => {
                    for caps in compiled.regex.captures_iter(text) {
                        if let Some(mat) = caps.get(group) {
                            push_candidate(
                                &mut candidates,
                                &mut seen,
                                mat.as_str(),
                                &compiled.family,
                                mat.start(),
                            );
                        }
                    }
                }
            }
        }

        candidates
    }
}

impl Default for CommandExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn push_candidate(
    candidates: &mut Vec<CandidateCommand>,
    seen: &mut HashSet<String>,
    text: &str,
    family: &MatchFamily,
    position: usize,
) {
    if seen.insert(text.to_string()) {
        candidates.push(CandidateCommand {
            text: text.to_string(),
            family: family.clone(),
            position,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matches_returns_empty() {
        let extractor = CommandExtractor::new();
        let candidates = extractor.extract("just a plain sentence about maps");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let extractor = CommandExtractor::new();
        assert!(extractor.extract("").is_empty());
    }

    #[test]
    fn test_module_with_and_without_args() {
        let extractor = CommandExtractor::new();
        let candidates =
            extractor.extract("Run g.region -p and then r.info map=elevation");
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["g.region", "r.info map=elevation"]);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let extractor = CommandExtractor::new();
        let candidates = extractor.extract("g.list type=raster then g.list type=raster");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "g.list type=raster");
        assert_eq!(candidates[0].position, 0);
    }

    #[test]
    fn test_family_order_beats_text_order() {
        // The wget appears first in the text, but namespace families are
        // declared before shell utilities.
        let extractor = CommandExtractor::new();
        let candidates =
            extractor.extract("wget http://example.com/dem.zip then r.info map=dem");
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["r.info map=dem", "wget"]);
    }

    #[test]
    fn test_shell_tool_captures_bare_name() {
        let extractor = CommandExtractor::new();
        let candidates = extractor.extract("tar -xzf landsat.tar.gz");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "tar");
        assert_eq!(candidates[0].family, MatchFamily::ShellTool);
    }

    #[test]
    fn test_gdal_family_keeps_args() {
        let extractor = CommandExtractor::new();
        let candidates = extractor.extract("gdalinfo input.tif");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "gdalinfo input.tif");
        assert_eq!(candidates[0].family, MatchFamily::ToolFamily("gdal".into()));
    }

    #[test]
    fn test_case_insensitive_match_preserves_raw_text() {
        let extractor = CommandExtractor::new();
        let candidates = extractor.extract("use GDALINFO dem.tif here");
        assert_eq!(candidates[0].text, "GDALINFO dem.tif here");
    }

    #[test]
    fn test_dotted_module_name() {
        let extractor = CommandExtractor::new();
        let candidates = extractor.extract("try r.slope.aspect elevation=dem");
        assert_eq!(candidates[0].text, "r.slope.aspect elevation=dem");
        assert_eq!(candidates[0].family, MatchFamily::Namespace("r".into()));
    }

    #[test]
    fn test_multiline_is_line_bounded() {
        let extractor = CommandExtractor::new();
        let candidates = extractor.extract("g.list type=raster\nmapset=PERMANENT");
        assert_eq!(candidates[0].text, "g.list type=raster");
    }

    #[test]
    fn test_namespace_recorded() {
        let extractor = CommandExtractor::new();
        let candidates = extractor.extract("db.tables -p");
        assert_eq!(candidates[0].family, MatchFamily::Namespace("db".into()));
        assert_eq!(candidates[0].text, "db.tables");
    }

    #[test]
    fn test_custom_config() {
        let extractor = CommandExtractor::with_config(ExtractorConfig {
            namespace_prefixes: vec!["x".into()],
            tool_family_prefixes: vec![],
            shell_tools: vec![],
        });
        let candidates = extractor.extract("run x.test input=a and g.region");
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["x.test input=a"]);
    }
}
