use std::path::PathBuf;

/// MediaWiki action API of the source wiki
pub const DEFAULT_API_URL: &str = "https://oldschool.runescape.wiki/api.php";

/// The wiki's acceptable-use policy asks for an identifying agent
pub const DEFAULT_USER_AGENT: &str =
    "wikistat/0.1 (https://github.com/real-limoges/wikistat) - contact via repository issues";

/// Minimum delay between two consecutive outbound requests
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 600;

/// Per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Category members requested per page (`max` lets the API pick its ceiling)
pub const CATEGORY_PAGE_LIMIT: &str = "max";

/// Highest `versionN` parameter probed on a multi-form page. Policy, not a
/// discovered limit: pages with more forms are truncated and reported.
pub const DEFAULT_MAX_VARIANTS: usize = 5;

/// Runtime knobs of one ingestion run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Final output location; the working checkpoint sits next to it
    pub output: PathBuf,
    /// Overrides the profile's categories when non-empty
    pub categories: Vec<String>,
    /// Stop after this many pages
    pub limit: Option<u64>,
    /// Seed the result set from the existing working checkpoint
    pub resume: bool,
    pub max_variants: usize,
}

impl PipelineConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            categories: Vec::new(),
            limit: None,
            resume: false,
            max_variants: DEFAULT_MAX_VARIANTS,
        }
    }
}
