use std::path::PathBuf;

use launch_configuration::{LaunchError, MtasaConfiguration};

#[ctor::ctor]
fn init() {
    let _ = color_eyre::install();
}

#[test]
fn test_first_mtasa_configuration_is_chosen() {
    let path = "./testdata/vscode/launch.json";
    let config = launch_configuration::load_from_path(None, path)
        .unwrap()
        .unwrap();

    assert_eq!(config.name.as_deref(), Some("Launch MTA:SA server"));
    assert_eq!(config.serverpath.as_deref(), Some("/opt/mta-server"));
    assert_eq!(config.trace, Some(true));
}

#[test]
fn test_named_configuration_resolves_workspace_folder() {
    let path = "./testdata/vscode/launch.json";
    let config = launch_configuration::load_from_path(Some("Local server"), path)
        .unwrap()
        .unwrap();

    assert_eq!(config.stop_on_entry, Some(true));
    assert_eq!(
        config.serverpath.map(PathBuf::from),
        Some(PathBuf::from("./testdata/vscode/server"))
    );
}

#[test]
fn test_read_code_workspace() {
    let path = "./testdata/vscode/mta.code-workspace";
    let config = launch_configuration::load_from_path(Some("Workspace server"), path)
        .unwrap()
        .unwrap();

    assert_eq!(config.request.as_deref(), Some("launch"));
}

#[test]
fn test_unknown_name() {
    let path = "./testdata/vscode/launch.json";
    let result = launch_configuration::load_from_path(Some("Nope"), path).unwrap();
    assert_eq!(
        result,
        Err(LaunchError::NamedConfigurationNotFound("Nope".to_string()))
    );
}

#[test]
fn test_no_configurations_key() {
    let input = br#"{"version": "0.2.0"}"# as &[u8];
    let result = launch_configuration::load(None, input).unwrap();
    assert_eq!(result, Err(LaunchError::NoLaunchConfiguration));
}

#[test]
fn test_no_mtasa_configuration() {
    let input = br#"{"configurations": [{"type": "python", "name": "py"}]}"# as &[u8];
    let result = launch_configuration::load(None, input).unwrap();
    assert_eq!(result, Err(LaunchError::NoMtasaConfiguration));
}

#[test]
fn test_malformed_json() {
    let input = b"not valid json {{{" as &[u8];
    let result = launch_configuration::load(None, input);
    assert!(result.is_err());
}

#[test]
fn test_empty_input() {
    let input = b"" as &[u8];
    let result = launch_configuration::load(None, input);
    assert!(result.is_err());
}

fn with_serverpath(serverpath: Option<String>) -> MtasaConfiguration {
    MtasaConfiguration {
        name: Some("test".to_string()),
        request: Some("launch".to_string()),
        serverpath,
        stop_on_entry: None,
        trace: None,
    }
}

#[test]
fn test_validate_serverpath() {
    let dir = tempfile::tempdir().unwrap();

    let valid = with_serverpath(Some(dir.path().to_string_lossy().into_owned()));
    assert_eq!(valid.validate().unwrap(), dir.path());

    assert_eq!(
        with_serverpath(None).validate(),
        Err(LaunchError::MissingServerPath)
    );
    assert_eq!(
        with_serverpath(Some(" ".to_string())).validate(),
        Err(LaunchError::MissingServerPath)
    );

    let file = dir.path().join("MTA Server.exe");
    std::fs::write(&file, b"").unwrap();
    assert_eq!(
        with_serverpath(Some(file.to_string_lossy().into_owned())).validate(),
        Err(LaunchError::InvalidServerPath(file.clone()))
    );

    let missing = dir.path().join("missing");
    assert!(matches!(
        with_serverpath(Some(missing.to_string_lossy().into_owned())).validate(),
        Err(LaunchError::InvalidServerPath(_))
    ));
}
