//! Launch configuration handling
//!
//! Finds the `mtasa` launch configuration in a VS Code `launch.json` (or the
//! `launch` section of a `.code-workspace` file) and checks that it can be
//! used to start a debug session.

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use serde::Deserialize;

/// The configuration `type` handled by this adapter.
pub const CONFIGURATION_TYPE: &str = "mtasa";

/// Why a launch configuration cannot be used. The messages are shown to the
/// user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    #[error("Could not find a launch configuration. Please make sure you created one.")]
    NoLaunchConfiguration,
    #[error("Could not find a launch configuration of type 'mtasa'. Make sure you created one.")]
    NoMtasaConfiguration,
    #[error("Could not find an 'mtasa' launch configuration named '{0}'.")]
    NamedConfigurationNotFound(String),
    #[error(
        "The path to the MTA:SA server directory is missing. Make sure you added one to your launch configuration."
    )]
    MissingServerPath,
    #[error(
        "The value of the 'serverpath' variable is invalid. It either doesn't exist or it is not a directory"
    )]
    InvalidServerPath(PathBuf),
}

#[derive(Deserialize)]
struct VsCodeLaunchConfiguration {
    configurations: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFormat {
    VsCodeWorkspace { launch: VsCodeLaunchConfiguration },
    VsCode(VsCodeLaunchConfiguration),
}

impl ConfigFormat {
    fn configurations(self) -> Option<Vec<serde_json::Value>> {
        match self {
            ConfigFormat::VsCodeWorkspace { launch } => launch.configurations,
            ConfigFormat::VsCode(launch) => launch.configurations,
        }
    }
}

/// An `mtasa` entry of a launch configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MtasaConfiguration {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub serverpath: Option<String>,
    #[serde(default)]
    pub stop_on_entry: Option<bool>,
    #[serde(default)]
    pub trace: Option<bool>,
}

impl MtasaConfiguration {
    /// Expand `${workspaceFolder}` in `serverpath` against `root`.
    pub fn resolve(&mut self, root: impl AsRef<Path>) {
        let root = root.as_ref().to_string_lossy();
        if let Some(serverpath) = &mut self.serverpath {
            *serverpath = serverpath.replace("${workspaceFolder}", &root);
        }
    }

    /// The server directory, if it is set and exists.
    pub fn validate(&self) -> Result<PathBuf, LaunchError> {
        let serverpath = match self.serverpath.as_deref() {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => return Err(LaunchError::MissingServerPath),
        };

        if !serverpath.is_dir() {
            return Err(LaunchError::InvalidServerPath(serverpath));
        }
        Ok(serverpath)
    }
}

/// Pick the configuration called `name`, or the first `mtasa` one.
pub fn load(
    name: Option<&str>,
    mut r: impl std::io::Read,
) -> eyre::Result<Result<MtasaConfiguration, LaunchError>> {
    let mut contents = String::new();
    r.read_to_string(&mut contents)
        .wrap_err("reading configuration contents")?;
    let config = jsonc_to_serde(&contents).wrap_err("parsing launch configuration")?;
    Ok(select(name, config))
}

/// Like [`load`], resolving `${workspaceFolder}` relative to the file.
pub fn load_from_path(
    name: Option<&str>,
    path: impl AsRef<Path>,
) -> eyre::Result<Result<MtasaConfiguration, LaunchError>> {
    let path = path.as_ref();
    let f = std::fs::File::open(path)
        .wrap_err_with(|| format!("opening {}", path.display()))?;
    let chosen = load(name, f).wrap_err("loading file from given path")?;

    Ok(chosen.map(|mut configuration| {
        configuration.resolve(workspace_root(path));
        configuration
    }))
}

/// The folder `${workspaceFolder}` refers to for a given configuration file.
fn workspace_root(config_path: &Path) -> PathBuf {
    let Some(parent) = config_path.parent() else {
        return PathBuf::from(".");
    };
    match parent.file_name() {
        Some(dir) if dir == ".vscode" => parent.parent().unwrap_or(parent).to_path_buf(),
        _ => parent.to_path_buf(),
    }
}

fn select(name: Option<&str>, config: ConfigFormat) -> Result<MtasaConfiguration, LaunchError> {
    let configurations = config
        .configurations()
        .ok_or(LaunchError::NoLaunchConfiguration)?;

    let mut candidates = configurations
        .into_iter()
        .filter(|c| c.get("type").and_then(|t| t.as_str()) == Some(CONFIGURATION_TYPE))
        .filter_map(|c| match serde_json::from_value::<MtasaConfiguration>(c) {
            Ok(configuration) => Some(configuration),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed mtasa configuration");
                None
            }
        });

    match name {
        Some(name) => candidates
            .find(|c| c.name.as_deref() == Some(name))
            .ok_or_else(|| LaunchError::NamedConfigurationNotFound(name.to_string())),
        None => candidates.next().ok_or(LaunchError::NoMtasaConfiguration),
    }
}

fn jsonc_to_serde(input: &str) -> eyre::Result<ConfigFormat> {
    let value = jsonc_parser::parse_to_serde_value(input, &Default::default())
        .wrap_err("parsing jsonc configuration")?;
    let Some(config_format_value) = value else {
        eyre::bail!("no configuration found");
    };

    let config_format =
        serde_json::from_value(config_format_value).wrap_err("deserializing jsonc::Value value")?;
    Ok(config_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_root_skips_dot_vscode() {
        assert_eq!(
            workspace_root(Path::new("/proj/.vscode/launch.json")),
            PathBuf::from("/proj")
        );
        assert_eq!(
            workspace_root(Path::new("/proj/mta.code-workspace")),
            PathBuf::from("/proj")
        );
    }

    #[test]
    fn resolve_expands_workspace_folder() {
        let mut configuration = MtasaConfiguration {
            name: None,
            request: None,
            serverpath: Some("${workspaceFolder}/server".to_string()),
            stop_on_entry: None,
            trace: None,
        };
        configuration.resolve("/home/me/proj");
        assert_eq!(
            configuration.serverpath.as_deref(),
            Some("/home/me/proj/server")
        );
    }
}
