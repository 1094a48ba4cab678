use reqwest::header::HeaderValue;
use reqwest::Url;

use super::{
    types::{Config, CredentialSource},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Compute API base, metadata and generation-service URLs are http(s)
/// - Outbound timeouts are non-zero
/// - CORS origins are usable header values
/// - A static token is present when the static credential source is selected
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    validate_http_url("vm.api_base", &config.vm.api_base)?;
    validate_http_url("comfy.base_url", &config.comfy.base_url)?;
    validate_http_url("credentials.metadata_url", &config.credentials.metadata_url)?;

    if config.http.connect_timeout_secs == 0 || config.http.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "http timeouts must be greater than 0".to_string(),
        ));
    }

    for origin in &config.cors.allowed_origins {
        if HeaderValue::from_str(origin).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "cors.allowed_origins contains an invalid origin: {:?}",
                origin
            )));
        }
    }

    if config.credentials.source == CredentialSource::Static
        && config.credentials.static_token.is_none()
    {
        return Err(ConfigError::ValidationError(
            "credentials.static_token must be set when credentials.source = \"static\""
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::ValidationError(format!("{} is not a valid URL: {}", field, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::ValidationError(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}
