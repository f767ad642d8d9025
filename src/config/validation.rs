use crate::config::types::{Config, CrawlerConfig, OutputConfig, SeedConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_seed_config(&config.seeds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 256 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 256, got {}",
            config.max_workers
        )));
    }

    if config.max_domain_concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "max-domain-concurrency must be >= 1, got {}",
            config.max_domain_concurrency
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_body_bytes < 1 {
        return Err(ConfigError::Validation(format!(
            "max-body-bytes must be >= 1, got {}",
            config.max_body_bytes
        )));
    }

    if config.max_retries > 20 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 20, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.domains_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "domains-dir cannot be empty".to_string(),
        ));
    }

    if config.tld_table.trim().is_empty() {
        return Err(ConfigError::Validation(
            "tld-table cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed sources
///
/// Individual seed URLs are not checked here: a bad seed is logged and
/// skipped when the frontier is built, it does not abort the run.
fn validate_seed_config(config: &SeedConfig) -> Result<(), ConfigError> {
    if let Some(file) = &config.file {
        if file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "seeds.file cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => {
            return Err(ConfigError::Validation(format!(
                "Invalid email format: '{}'",
                email
            )))
        }
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
