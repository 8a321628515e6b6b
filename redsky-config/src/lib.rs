//! Configuration for the Red Sky server.
//!
//! Values come from an optional TOML file, then environment variables
//! (after loading `.env`), then guard-rail validation. The server applies
//! CLI overrides on top of the loaded [`Config`].

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    Config, ConfigMetadata, CorsConfig, CrisisConfig, DatabaseConfig, FederationConfig,
    InstanceConfig, PeerTrust, ServerConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
