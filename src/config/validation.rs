use crate::config::types::{
    CatalogConfig, Config, FetcherConfig, HealthConfig, OutputConfig, PacingConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_pacing_config(&config.pacing)?;
    validate_health_config(&config.health)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates catalog traversal configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if !config.page_template.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "page-template must contain a {{page}} placeholder, got '{}'",
            config.page_template
        )));
    }

    // The template with the placeholder substituted must be a valid URL
    let probe = config.page_template.replace("{page}", "1");
    Url::parse(&probe)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid page-template: {}", e)))?;

    if config.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "start-page must be >= 1, got {}",
            config.start_page
        )));
    }

    if config.max_fetch_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-fetch-retries must be >= 1, got {}",
            config.max_fetch_retries
        )));
    }

    validate_range("block-cooldown-ms", config.block_cooldown_ms)?;

    if config.block_retry_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "block-retry-limit must be >= 1, got {}",
            config.block_retry_limit
        )));
    }

    Ok(())
}

/// Validates pacing configuration
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    validate_range("record-delay-ms", config.record_delay_ms)?;
    validate_range("page-delay-ms", config.page_delay_ms)?;
    validate_range("long-break-ms", config.long_break_ms)?;

    if config.long_break_every < 1 {
        return Err(ConfigError::Validation(format!(
            "long-break-every must be >= 1, got {}",
            config.long_break_every
        )));
    }

    Ok(())
}

/// Validates health classification configuration
fn validate_health_config(config: &HealthConfig) -> Result<(), ConfigError> {
    for marker in &config.block_markers {
        if marker.trim().is_empty() {
            return Err(ConfigError::Validation(
                "block-markers entries cannot be empty".to_string(),
            ));
        }
    }

    if Selector::parse(&config.record_container).is_err() {
        return Err(ConfigError::InvalidSelector(
            config.record_container.clone(),
        ));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents pool cannot be empty".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents entries cannot be empty".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy).map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy: {}", e)))?;
    }

    if config.request_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-ms must be >= 1000ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.store_path.is_empty() {
        return Err(ConfigError::Validation(
            "store-path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_range(name: &str, range: [u64; 2]) -> Result<(), ConfigError> {
    if range[0] > range[1] {
        return Err(ConfigError::Validation(format!(
            "{} range is inverted: [{}, {}]",
            name, range[0], range[1]
        )));
    }
    Ok(())
}
