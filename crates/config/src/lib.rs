//! Adapter configuration.
//!
//! Read from `<config dir>/mtasa-debug/config.toml` unless a path is given
//! explicitly. A missing file means defaults; a malformed one is an error.
//!
//! ```toml
//! [backend]
//! host = "localhost"
//! port = 51237
//! executable = "/opt/mta/DebugServerLinux"
//! request_timeout_ms = 5000
//!
//! [session]
//! poll_interval_ms = 500
//! launch_retry_interval_ms = 200
//! launch_timeout_secs = 60
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use eyre::WrapErr;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "mtasa-debug";
const FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    pub backend: BackendConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    /// Debug server executable. Defaults to the one shipped next to the adapter.
    pub executable: Option<PathBuf>,
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 51237,
            executable: None,
            request_timeout_ms: 5000,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub poll_interval_ms: u64,
    pub launch_retry_interval_ms: u64,
    /// How long launch keeps probing a debug server that does not answer.
    pub launch_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            launch_retry_interval_ms: 200,
            launch_timeout_secs: 60,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn launch_retry_interval(&self) -> Duration {
        Duration::from_millis(self.launch_retry_interval_ms)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }
}

/// Default location of the config file, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
}

/// Load from `path`, or from [`default_path`] when `None`.
pub fn load(path: Option<&Path>) -> eyre::Result<AdapterConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) => path,
            None => {
                tracing::debug!("no config directory on this platform, using defaults");
                return Ok(AdapterConfig::default());
            }
        },
    };
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> eyre::Result<AdapterConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(AdapterConfig::default());
        }
        Err(e) => {
            return Err(e).wrap_err_with(|| format!("reading config file {}", path.display()));
        }
    };

    let config = from_str(&contents)
        .wrap_err_with(|| format!("parsing config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

pub fn from_str(contents: &str) -> eyre::Result<AdapterConfig> {
    let config: AdapterConfig = toml::from_str(contents).wrap_err("invalid toml")?;
    if config.session.poll_interval_ms == 0 || config.session.launch_retry_interval_ms == 0 {
        eyre::bail!("intervals must be greater than zero");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from_path(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, AdapterConfig::default());
        assert_eq!(config.backend.port, 51237);
        assert_eq!(config.session.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.session.launch_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\nport = 40000\n\n[session]\nlaunch_timeout_secs = 5").unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.backend.port, 40000);
        assert_eq!(config.backend.host, "localhost");
        assert_eq!(config.session.launch_timeout_secs, 5);
        assert_eq!(config.session.launch_retry_interval_ms, 200);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = from_str("[backend]\nprot = 1\n").unwrap_err();
        assert!(format!("{err:?}").contains("prot"), "{err:?}");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(from_str("[session]\npoll_interval_ms = 0\n").is_err());
    }

    #[test]
    fn executable_path_is_read() {
        let config = from_str("[backend]\nexecutable = \"/opt/mta/DebugServerLinux\"\n").unwrap();
        assert_eq!(
            config.backend.executable,
            Some(PathBuf::from("/opt/mta/DebugServerLinux"))
        );
    }
}
