pub mod auth;
pub mod comfy;
pub mod compute;
pub mod config;
pub mod credentials;
pub mod metrics;
pub mod remote;
pub mod testing;
pub mod wait;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use comfy::{ComfyClient, GenerationApi, ImageResult};
pub use compute::{ComputeApi, GceClient, InstanceRef, InstanceStatus, InstanceSummary, WaitTarget};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use credentials::{create_token_source, CredentialError, TokenSource};
pub use remote::{RemoteClient, RemoteError, UpstreamBody};
pub use wait::{wait_for_images, wait_for_status, PolicyError, ResultPolicy, WaitError, WaitPolicy};
