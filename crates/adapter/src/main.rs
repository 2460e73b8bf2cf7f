use std::{
    fs::File,
    io::IsTerminal,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use backend::HttpBackend;
use clap::{Parser, Subcommand};
use debugger::SessionSettings;
use eyre::WrapErr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use transport::StdioTransport;

/// Debug adapter for MTA:SA Lua scripts.
///
/// Speaks the Debug Adapter Protocol on stdio unless a port is given.
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    /// Serve a single editor connection on this TCP port
    #[clap(short, long)]
    port: Option<u16>,

    /// Path to the config file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Port of the debug server, overriding the config file
    #[clap(long)]
    backend_port: Option<u16>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a launch configuration and print its server path
    Validate {
        /// launch.json or .code-workspace file
        #[clap(long)]
        launch_json: PathBuf,

        /// Name of the launch configuration to choose
        #[clap(short, long)]
        name: Option<String>,
    },
}

// stdout may carry the protocol, so logs never go there
fn init_logging(log_file: Option<&Path>) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("creating log file {}", path.display()))?;
            builder.json().with_writer(Mutex::new(file)).try_init()
        }
        None if std::io::stderr().is_terminal() => {
            builder.with_writer(std::io::stderr).try_init()
        }
        None => builder.json().with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| eyre::eyre!("installing log subscriber: {e}"))
}

fn validate(launch_json: &Path, name: Option<&str>) -> eyre::Result<()> {
    let configuration = launch_configuration::load_from_path(name, launch_json)
        .wrap_err_with(|| format!("reading {}", launch_json.display()))?;
    let serverpath = configuration.and_then(|c| c.validate())?;
    println!("{}", serverpath.display());
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    tracing::debug!(?args, "parsed command line arguments");

    if let Some(Command::Validate { launch_json, name }) = &args.command {
        return validate(launch_json, name.as_deref());
    }

    let config = config::load(args.config.as_deref()).wrap_err("loading config")?;
    let backend_port = args.backend_port.unwrap_or(config.backend.port);
    let executable = match &config.backend.executable {
        Some(executable) => executable.clone(),
        None => server::default_executable()?,
    };

    let backend = Arc::new(
        HttpBackend::new(
            &config.backend.host,
            backend_port,
            config.backend.request_timeout(),
        )
        .wrap_err("creating debug server client")?,
    );
    tracing::info!(url = backend.base_url(), executable = %executable.display(), "starting adapter");

    let settings = SessionSettings {
        executable,
        backend_port,
        timing: config.session,
    };

    match args.port {
        Some(port) => {
            let listener = TcpListener::bind(("127.0.0.1", port))
                .await
                .wrap_err_with(|| format!("binding port {port}"))?;
            tracing::info!(port, "waiting for editor connection");
            let (stream, peer) = listener
                .accept()
                .await
                .wrap_err("accepting editor connection")?;
            tracing::info!(%peer, "editor connected");
            debugger::run(stream, backend, settings).await
        }
        None => debugger::run(StdioTransport::new(), backend, settings).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tcp_mode() {
        let args = Args::try_parse_from(["mtasa-debug-adapter", "--port", "4711", "--backend-port", "9000"])
            .unwrap();
        assert_eq!(args.port, Some(4711));
        assert_eq!(args.backend_port, Some(9000));
        assert!(args.command.is_none());
    }

    #[test]
    fn parse_validate() {
        let args = Args::try_parse_from([
            "mtasa-debug-adapter",
            "validate",
            "--launch-json",
            ".vscode/launch.json",
            "--name",
            "Local server",
        ])
        .unwrap();
        let Some(Command::Validate { launch_json, name }) = args.command else {
            panic!("expected validate subcommand");
        };
        assert_eq!(launch_json, PathBuf::from(".vscode/launch.json"));
        assert_eq!(name.as_deref(), Some("Local server"));
    }

    #[test]
    fn logging_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.log");

        // a subscriber may already be installed by another test
        let _ = init_logging(Some(&path));
        assert!(path.exists());

        let err = init_logging(Some(&dir.path().join("missing/adapter.log"))).unwrap_err();
        assert!(format!("{err:#}").contains("creating log file"), "{err:#}");
    }

    #[test]
    fn validate_reports_missing_file() {
        let err = validate(Path::new("/nonexistent/.vscode/launch.json"), None).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/.vscode/launch.json"));
    }
}
