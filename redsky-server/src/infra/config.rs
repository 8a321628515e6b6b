pub use redsky_config::{
    Config, ConfigLoad, ConfigLoadError, ConfigLoader, ConfigMetadata, ConfigWarnings,
    CorsConfig, CrisisConfig, DatabaseConfig, FederationConfig, InstanceConfig, PeerTrust,
    ServerConfig, loader, models, validation,
};
