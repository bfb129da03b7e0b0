//! `config.toml` persistence for [`MessengerConfig`].

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use messenger_bridge::config::MessengerConfig;
use tokio::{
    fs::{OpenOptions, create_dir_all, read_to_string},
    io::AsyncWriteExt,
};

/// Failures of the configuration file layer.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No home directory is known for the current user.
    #[error("no configuration directory for the current user")]
    NoConfigDirectory,
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not TOML, or a recognized key has the wrong type.
    #[error("malformed configuration in {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// `config.toml` under the per-user configuration directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("org", "messenger", "messenger")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Reads [`default_config_path`]. See [`load_config_from`].
pub async fn load_config() -> Result<MessengerConfig, ConfigError> {
    load_config_from(default_config_path()?).await
}

/// Reads the configuration stored at `path`. A missing file is created with
/// the default configuration, which is then returned.
pub async fn load_config_from(path: impl AsRef<Path>) -> Result<MessengerConfig, ConfigError> {
    let path = path.as_ref();
    log::info!("Loading configuration from {path:?}");

    if !path.exists() {
        let config = MessengerConfig::default();
        write_config(path, &config, false).await?;
        log::info!("Wrote the default configuration to {path:?}");
        return Ok(config);
    }

    let contents = read_to_string(path).await.map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `config` to `path`, replacing whatever is there.
pub async fn save_config_to(
    path: impl AsRef<Path>,
    config: &MessengerConfig,
) -> Result<(), ConfigError> {
    write_config(path.as_ref(), config, true).await
}

async fn write_config(
    path: &Path,
    config: &MessengerConfig,
    replace: bool,
) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config)?;
    let io = |source: std::io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        create_dir_all(parent).await.map_err(io)?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if replace {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options.open(path).await.map_err(io)?;
    file.write_all(contents.as_bytes()).await.map_err(io)?;
    file.sync_all().await.map_err(io)
}
