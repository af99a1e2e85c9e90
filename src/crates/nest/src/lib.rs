//! nest client application library
//!
//! This crate provides the `nest` terminal client: the REST and WebSocket
//! collaborators for the `nest-sync` core, credential storage,
//! configuration and the command-line interface.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod push;
pub mod rest;
pub mod version;

pub use config::{ConfigLoader, NestConfig};
pub use credentials::{CredentialStore, StoredCredential};
pub use error::{NestError, Result};
pub use push::WsTransport;
pub use rest::RestClient;
