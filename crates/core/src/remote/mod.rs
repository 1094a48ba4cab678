//! Remote-call proxy shared by the compute and generation-service clients.

mod client;
mod error;

pub use client::RemoteClient;
pub use error::*;
