use serde::Deserialize;

/// Main configuration structure for Ukiyo-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub output: OutputConfig,
}

/// Catalog traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Listing URL pattern with a `{page}` placeholder
    #[serde(rename = "page-template")]
    pub page_template: String,

    /// First page to request when no checkpoint is present
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Maximum fetch attempts per page before giving up the run
    #[serde(rename = "max-fetch-retries", default = "default_max_fetch_retries")]
    pub max_fetch_retries: u32,

    /// What to do when a block signal is detected
    #[serde(rename = "on-block", default)]
    pub on_block: BlockPolicy,

    /// Cooldown range in milliseconds before re-attempting a blocked page
    #[serde(rename = "block-cooldown-ms", default = "default_block_cooldown_ms")]
    pub block_cooldown_ms: [u64; 2],

    /// Maximum re-attempts of a blocked page under the `retry` policy
    #[serde(rename = "block-retry-limit", default = "default_block_retry_limit")]
    pub block_retry_limit: u32,
}

/// Reaction to a detected block signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockPolicy {
    /// Terminate the run; an external supervisor may start a new one later
    #[default]
    Stop,

    /// Cool down and re-attempt the same page a bounded number of times
    Retry,
}

/// Request cadence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    /// Delay range between records in milliseconds
    #[serde(rename = "record-delay-ms", default = "default_record_delay_ms")]
    pub record_delay_ms: [u64; 2],

    /// Delay range between listing pages in milliseconds
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: [u64; 2],

    /// Take a longer pause every Nth page
    #[serde(rename = "long-break-every", default = "default_long_break_every")]
    pub long_break_every: u32,

    /// Long pause range in milliseconds
    #[serde(rename = "long-break-ms", default = "default_long_break_ms")]
    pub long_break_ms: [u64; 2],
}

/// Content health classification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Substrings whose presence marks a page as actively blocked
    #[serde(rename = "block-markers", default = "default_block_markers")]
    pub block_markers: Vec<String>,

    /// CSS selector that matches one record container per listing item
    #[serde(rename = "record-container", default = "default_record_container")]
    pub record_container: String,
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// User-agent pool; one entry is sampled per session context
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Optional proxy URL (e.g. `socks5://127.0.0.1:9050`)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the CSV record store
    #[serde(rename = "store-path")]
    pub store_path: String,

    /// Path to the checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,
}

fn default_start_page() -> u32 {
    1
}

fn default_max_fetch_retries() -> u32 {
    3
}

fn default_block_cooldown_ms() -> [u64; 2] {
    [30_000, 90_000]
}

fn default_block_retry_limit() -> u32 {
    2
}

fn default_record_delay_ms() -> [u64; 2] {
    [1_500, 3_500]
}

fn default_page_delay_ms() -> [u64; 2] {
    [4_000, 8_000]
}

fn default_long_break_every() -> u32 {
    4
}

fn default_long_break_ms() -> [u64; 2] {
    [12_000, 22_000]
}

fn default_block_markers() -> Vec<String> {
    vec![
        "access denied".to_string(),
        "captcha".to_string(),
        "please verify".to_string(),
    ]
}

fn default_record_container() -> String {
    "li[data-js-job]".to_string()
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.7339.208 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0".to_string(),
    ]
}

fn default_request_timeout_ms() -> u64 {
    20_000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            record_delay_ms: default_record_delay_ms(),
            page_delay_ms: default_page_delay_ms(),
            long_break_every: default_long_break_every(),
            long_break_ms: default_long_break_ms(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            block_markers: default_block_markers(),
            record_container: default_record_container(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agents: default_user_agents(),
            proxy: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
