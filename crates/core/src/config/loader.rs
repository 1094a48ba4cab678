use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Flat variables a container platform sets, mapped onto config keys.
/// Read verbatim: `API_KEY=0123` must stay `"0123"`.
const DEPLOYMENT_ENV: &[(&str, &str)] = &[
    ("PROJECT_ID", "vm.project"),
    ("ZONE", "vm.zone"),
    ("INSTANCE", "vm.instance"),
    ("API_KEY", "auth.api_key"),
    ("ALLOWED_ORIGINS", "cors.allowed_origins"),
    ("COMFY_BASE_URL", "comfy.base_url"),
];

/// Secrets under the `VMCTL_` prefix, also read verbatim.
const PREFIXED_SECRETS: &[(&str, &str)] = &[
    ("VMCTL_AUTH__API_KEY", "auth.api_key"),
    ("VMCTL_CREDENTIALS__STATIC_TOKEN", "credentials.static_token"),
];

/// Load configuration from an optional TOML file with environment overrides.
///
/// Precedence, lowest first: built-in defaults, the file, the flat deployment
/// variables (`PROJECT_ID`, `ZONE`, ...), then `VMCTL_` nested overrides such as
/// `VMCTL_HTTP__MAX_RETRIES`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(raw_env(DEPLOYMENT_ENV))
        .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
        .merge(Env::prefixed("VMCTL_").split("__"))
        .merge(raw_env(PREFIXED_SECRETS))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// String values straight from the environment, skipping figment's value
/// parsing (which turns `0123` into the integer 123).
fn raw_env(vars: &[(&str, &str)]) -> Figment {
    vars.iter()
        .filter_map(|(name, key)| std::env::var(name).ok().map(|value| (*key, value)))
        .fold(Figment::new(), |figment, (key, value)| {
            figment.merge(Serialized::default(key, value))
        })
}
