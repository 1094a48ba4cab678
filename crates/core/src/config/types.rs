use serde::{Deserialize, Deserializer, Serialize};
use std::net::IpAddr;

/// Root configuration
///
/// Every section has defaults, so an empty file (or no file at all) is a valid
/// configuration. Deployments usually only set the flat environment variables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vm: VmConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub comfy: ComfyConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Default target VM. Each field can be overridden per request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VmConfig {
    #[serde(default, deserialize_with = "string_like")]
    pub project: String,
    #[serde(default, deserialize_with = "string_like")]
    pub zone: String,
    #[serde(default, deserialize_with = "string_like")]
    pub instance: String,
    /// Compute API root, e.g. "https://compute.googleapis.com/compute/v1"
    #[serde(default = "default_compute_api_base")]
    pub api_base: String,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            zone: String::new(),
            instance: String::new(),
            api_base: default_compute_api_base(),
        }
    }
}

fn default_compute_api_base() -> String {
    "https://compute.googleapis.com/compute/v1".to_string()
}

/// Caller authentication. No key means every request is accepted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default, deserialize_with = "optional_string_like")]
    pub api_key: Option<String>,
}

impl AuthConfig {
    pub fn method(&self) -> AuthMethod {
        match self.api_key {
            Some(_) => AuthMethod::ApiKey,
            None => AuthMethod::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Cross-origin settings. An empty list allows any origin.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default, deserialize_with = "origin_list")]
    pub allowed_origins: Vec<String>,
}

/// Image-generation service running on the VM.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComfyConfig {
    #[serde(default = "default_comfy_base_url")]
    pub base_url: String,
}

impl Default for ComfyConfig {
    fn default() -> Self {
        Self {
            base_url: default_comfy_base_url(),
        }
    }
}

fn default_comfy_base_url() -> String {
    "http://127.0.0.1:8188".to_string()
}

/// Outbound HTTP settings shared by every remote client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
    /// Extra attempts for idempotent requests answered with 429 or 5xx.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    500
}

/// Where outbound compute calls get their bearer token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub source: CredentialSource,
    /// Required when `source = "static"`.
    #[serde(default, deserialize_with = "optional_string_like")]
    pub static_token: Option<String>,
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            source: CredentialSource::default(),
            static_token: None,
            metadata_url: default_metadata_url(),
        }
    }
}

fn default_metadata_url() -> String {
    "http://metadata.google.internal".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Service-account token from the metadata server (Cloud Run, GCE).
    #[default]
    Metadata,
    Static,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub vm: VmConfig,
    pub auth: SanitizedAuthConfig,
    pub cors: CorsConfig,
    pub comfy: ComfyConfig,
    pub http: HttpConfig,
    pub credentials: SanitizedCredentialsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: AuthMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCredentialsConfig {
    pub source: CredentialSource,
    pub static_token_configured: bool,
    pub metadata_url: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            vm: config.vm.clone(),
            auth: SanitizedAuthConfig {
                method: config.auth.method(),
            },
            cors: config.cors.clone(),
            comfy: config.comfy.clone(),
            http: config.http.clone(),
            credentials: SanitizedCredentialsConfig {
                source: config.credentials.source,
                static_token_configured: config.credentials.static_token.is_some(),
                metadata_url: config.credentials.metadata_url.clone(),
            },
        }
    }
}

/// Scalar as it can arrive from TOML or a `VMCTL_` variable: `instance = 42`
/// must still land in a `String` field.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringLike {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl From<StringLike> for String {
    fn from(value: StringLike) -> Self {
        match value {
            StringLike::Str(s) => s,
            StringLike::Int(n) => n.to_string(),
            StringLike::UInt(n) => n.to_string(),
            StringLike::Float(n) => n.to_string(),
            StringLike::Bool(b) => b.to_string(),
        }
    }
}

fn string_like<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = StringLike::deserialize(deserializer)?;
    Ok(String::from(value).trim().to_string())
}

/// Blank values count as unset.
fn optional_string_like<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringLike>::deserialize(deserializer)?;
    Ok(value
        .map(|v| String::from(v).trim().to_string())
        .filter(|s| !s.is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OriginList {
    Csv(String),
    List(Vec<String>),
}

/// Accepts `"https://a.example,https://b.example"` as well as a TOML array.
fn origin_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match OriginList::deserialize(deserializer)? {
        OriginList::Csv(csv) => csv.split(',').map(str::to_string).collect::<Vec<_>>(),
        OriginList::List(list) => list,
    };
    Ok(raw
        .into_iter()
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect())
}
