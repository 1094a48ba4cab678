use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Authenticated caller
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub caller: String,
    pub method: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            caller: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }
}
