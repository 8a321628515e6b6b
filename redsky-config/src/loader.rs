use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use once_cell::sync::Lazy;
use redsky_core::crisis::{DepartedVoterPolicy, threshold::DEFAULT_THRESHOLD_PCT};
use redsky_core::federation::{
    DEFAULT_FAN_OUT_PARALLELISM, DEFAULT_PEER_TIMEOUT, normalize_instance_url,
};
use thiserror::Error;

use crate::models::{
    Config, ConfigMetadata, CorsConfig, CrisisConfig, DatabaseConfig, FederationConfig,
    InstanceConfig, PeerTrust, ServerConfig,
    sources::{EnvConfig, FileConfig},
};
use crate::util::RawVar;
use crate::validation::{self, ConfigGuardRailError, ConfigWarnings};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("redsky.toml"),
        PathBuf::from("config/redsky.toml"),
    ]
});

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_INSTANCE_NAME: &str = "Red Sky";

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, read the process environment and compose the config.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| ()),
            None => dotenvy::dotenv().map(|_| ()),
        };
        let env_file_loaded = match loaded {
            Ok(()) => true,
            Err(dotenvy::Error::Io(_)) => false,
            Err(err) => return Err(err.into()),
        };

        self.load_from_env(EnvConfig::gather(), env_file_loaded)
    }

    /// Compose the config from already gathered environment values.
    pub fn load_from_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            self.compose_config(file_config, env, config_path, env_file_loaded)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.as_ref().map(PathBuf::from));

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(found) => found.clone(),
                None => return Ok((None, None)),
            },
        };

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
        env_file_loaded: bool,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No redsky.toml detected; falling back to environment variables",
                "Create redsky.toml or point REDSKY_CONFIG_PATH at a configuration file",
            );
        }

        let FileConfig {
            server: file_server,
            database: file_database,
            cors: file_cors,
            crisis: file_crisis,
            federation: file_federation,
        } = file_config.unwrap_or_default();

        let port = match &env.server_port {
            Some(raw) => parse_env(raw)?,
            None => file_server.port.unwrap_or(DEFAULT_PORT),
        };
        let server = ServerConfig {
            host: env
                .server_host
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        };

        let database = DatabaseConfig {
            primary_url: env
                .database_url
                .or(file_database.url)
                .filter(|url| !url.trim().is_empty()),
        };

        let cors = CorsConfig {
            allowed_origins: env
                .cors_allowed_origins
                .or(file_cors.allowed_origins)
                .unwrap_or_else(default_cors_origins),
        };

        let threshold_pct = match &env.crisis_threshold_pct {
            Some(raw) => parse_env(raw)?,
            None => file_crisis.threshold_pct.unwrap_or(DEFAULT_THRESHOLD_PCT),
        };
        let departed_voters = match (&env.crisis_departed_voter_policy, file_crisis.departed_voter_policy) {
            (Some(raw), _) => parse_env::<DepartedVoterPolicy>(raw)?,
            (None, Some(value)) => parse_file("crisis.departed_voter_policy", &value)?,
            (None, None) => DepartedVoterPolicy::default(),
        };
        let crisis = CrisisConfig {
            threshold_pct,
            departed_voters,
        };

        let peer_timeout = match (&env.federation_peer_timeout, file_federation.peer_timeout) {
            (Some(raw), _) => parse_duration(raw.name, &raw.value)?,
            (None, Some(value)) => parse_duration("federation.peer_timeout", &value)?,
            (None, None) => DEFAULT_PEER_TIMEOUT,
        };
        let fan_out_parallelism = match &env.federation_fan_out {
            Some(raw) => parse_env(raw)?,
            None => file_federation
                .fan_out_parallelism
                .unwrap_or(DEFAULT_FAN_OUT_PARALLELISM),
        };
        let trust = match (&env.federation_trust, file_federation.trust) {
            (Some(raw), _) => parse_env::<PeerTrust>(raw)?,
            (None, Some(value)) => parse_file("federation.trust", &value)?,
            (None, None) => PeerTrust::default(),
        };

        let instance_url = match env.instance_url.or(file_federation.instance_url) {
            Some(raw) => normalize_instance_url(&raw).map_err(|err| {
                ConfigLoadError::InvalidValue {
                    name: "INSTANCE_URL".into(),
                    value: raw.clone(),
                    reason: err.to_string(),
                }
            })?,
            None => {
                warnings.push_with_hint(
                    "INSTANCE_URL not configured; peers will see a localhost address",
                    "Set INSTANCE_URL to the public base URL other instances use to reach this one",
                );
                format!("http://localhost:{}", server.port)
            }
        };
        let federation = FederationConfig {
            instance: InstanceConfig {
                url: instance_url,
                name: env
                    .instance_name
                    .or(file_federation.instance_name)
                    .unwrap_or_else(|| DEFAULT_INSTANCE_NAME.to_string()),
                description: env
                    .instance_description
                    .or(file_federation.instance_description),
                region: env.instance_region.or(file_federation.instance_region),
            },
            peer_timeout,
            fan_out_parallelism,
            trust,
        };

        let config = Config {
            server,
            database,
            cors,
            crisis,
            federation,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_env<T>(raw: &RawVar) -> Result<T, ConfigLoadError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|reason| ConfigLoadError::InvalidValue {
        name: raw.name.to_string(),
        value: raw.value.clone(),
        reason,
    })
}

fn parse_file<T>(name: &str, value: &str) -> Result<T, ConfigLoadError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err: T::Err| ConfigLoadError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: err.to_string(),
    })
}

fn parse_duration(name: &str, value: &str) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(value.trim()).map_err(|err| ConfigLoadError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: err.to_string(),
    })
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    fn load(file: Option<&Path>, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let loader = match file {
            Some(path) => ConfigLoader::new().with_config_path(path),
            None => ConfigLoader::new(),
        };
        loader.load_from_env(env, false)
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let ConfigLoad { config, warnings } = load(None, EnvConfig::default()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.crisis.threshold_pct, 60);
        assert_eq!(config.crisis.departed_voters, DepartedVoterPolicy::Retain);
        assert_eq!(config.federation.peer_timeout, Duration::from_secs(8));
        assert_eq!(config.federation.fan_out_parallelism, 16);
        assert_eq!(config.federation.trust, PeerTrust::Any);
        assert_eq!(config.federation.instance.url, "http://localhost:3000");

        let messages: Vec<_> = warnings.items.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("redsky.toml")));
        assert!(messages.iter().any(|m| m.contains("INSTANCE_URL")));
    }

    #[test]
    fn file_values_are_read_and_env_overrides_them() {
        let file = write_config(
            r#"
            [server]
            port = 8080

            [crisis]
            threshold_pct = 75
            departed_voter_policy = "exclude"

            [federation]
            instance_url = "https://berlin.redsky.example/"
            instance_name = "Berlin"
            peer_timeout = "5s"
            fan_out_parallelism = 4
            trust = "known"
            "#,
        );
        let env = EnvConfig {
            crisis_threshold_pct: Some(RawVar::new("CRISIS_THRESHOLD_PCT", "50")),
            federation_peer_timeout: Some(RawVar::new("FEDERATION_PEER_TIMEOUT", "12s")),
            ..EnvConfig::default()
        };

        let ConfigLoad { config, warnings } = load(Some(file.path()), env).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.crisis.threshold_pct, 50);
        assert_eq!(config.crisis.departed_voters, DepartedVoterPolicy::Exclude);
        assert_eq!(config.federation.peer_timeout, Duration::from_secs(12));
        assert_eq!(config.federation.fan_out_parallelism, 4);
        assert_eq!(config.federation.trust, PeerTrust::Known);
        assert_eq!(config.federation.instance.url, "https://berlin.redsky.example");
        assert_eq!(config.federation.instance.name, "Berlin");
        assert!(
            !warnings
                .items
                .iter()
                .any(|w| w.message.contains("INSTANCE_URL"))
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/redsky.toml")), EnvConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn threshold_outside_range_is_rejected() {
        let env = EnvConfig {
            crisis_threshold_pct: Some(RawVar::new("CRISIS_THRESHOLD_PCT", "0")),
            ..EnvConfig::default()
        };
        let err = load(None, env).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(ConfigGuardRailError::ThresholdOutOfRange { value: 0 })
        ));
    }

    #[test]
    fn peer_timeout_and_fan_out_limits() {
        let env = EnvConfig {
            federation_peer_timeout: Some(RawVar::new("FEDERATION_PEER_TIMEOUT", "2m")),
            ..EnvConfig::default()
        };
        assert!(matches!(
            load(None, env).unwrap_err(),
            ConfigLoadError::GuardRail(ConfigGuardRailError::PeerTimeoutOutOfRange { .. })
        ));

        let env = EnvConfig {
            federation_fan_out: Some(RawVar::new("FEDERATION_FAN_OUT", "0")),
            ..EnvConfig::default()
        };
        assert!(matches!(
            load(None, env).unwrap_err(),
            ConfigLoadError::GuardRail(ConfigGuardRailError::ZeroFanOut)
        ));
    }

    #[test]
    fn unparsable_env_value_names_the_variable() {
        let env = EnvConfig {
            crisis_departed_voter_policy: Some(RawVar::new(
                "CRISIS_DEPARTED_VOTER_POLICY",
                "forget",
            )),
            ..EnvConfig::default()
        };
        match load(None, env).unwrap_err() {
            ConfigLoadError::InvalidValue { name, value, .. } => {
                assert_eq!(name, "CRISIS_DEPARTED_VOTER_POLICY");
                assert_eq!(value, "forget");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
