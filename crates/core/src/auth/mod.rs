mod api_key;
mod none;
mod traits;
mod types;

pub use api_key::*;
pub use none::*;
pub use traits::*;
pub use types::*;

use crate::config::AuthConfig;

/// Pick the authenticator for the configured API key (or lack of one).
pub fn create_authenticator(config: &AuthConfig) -> Box<dyn Authenticator> {
    match &config.api_key {
        Some(key) => Box::new(ApiKeyAuthenticator::new(key.clone())),
        None => Box::new(NoneAuthenticator::new()),
    }
}
