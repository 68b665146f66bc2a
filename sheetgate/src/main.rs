mod config;
mod logging;

use clap::{Args, Parser};
use config::{Config, ConfigError, MetricsConfig};
use logging::LoggingError;
use metrics_exporter_statsd::StatsdBuilder;
use proxy::ProxyError;
use proxy::config::ValidationError;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
enum CliCommand {
    /// Serve spreadsheet values over HTTP
    Proxy(ConfigArgs),
    /// Load and validate a config file, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("config file has no proxy section")]
    MissingProxyConfig,
    #[error("invalid proxy configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

fn main() {
    let cli = CliCommand::parse();

    let result = match cli {
        CliCommand::Proxy(args) => run_proxy(args),
        CliCommand::CheckConfig(args) => check_config(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_proxy(args: ConfigArgs) -> Result<(), CliError> {
    let config = Config::from_file(&args.config_file_path)?;
    let proxy_config = config.proxy.ok_or(CliError::MissingProxyConfig)?;

    // Held until exit so buffered Sentry events are flushed.
    let _sentry_guard = logging::init(config.common.logging.as_ref())?;

    if let Some(metrics_config) = &config.common.metrics {
        init_metrics(metrics_config)?;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(serve(proxy_config))
}

async fn serve(proxy_config: proxy::config::Config) -> Result<(), CliError> {
    tracing::info!("Starting proxy");
    tokio::select! {
        result = proxy::run(proxy_config) => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Received Ctrl-C, shutting down");
        }
    }
    Ok(())
}

fn check_config(args: ConfigArgs) -> Result<(), CliError> {
    let config = Config::from_file(&args.config_file_path)?;
    let proxy_config = config.proxy.ok_or(CliError::MissingProxyConfig)?;
    proxy_config.validate()?;

    println!("{} is valid", args.config_file_path.display());
    Ok(())
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("sheetgate"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    shared::metrics_defs::describe_metrics(proxy::metrics_defs::ALL_METRICS);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn cli_definition_is_valid() {
        CliCommand::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let cli = CliCommand::try_parse_from([
            "sheetgate",
            "check-config",
            "--config-file-path",
            "/etc/sheetgate.yaml",
        ])
        .unwrap();
        assert!(matches!(
            cli,
            CliCommand::CheckConfig(ConfigArgs { ref config_file_path })
                if config_file_path == &PathBuf::from("/etc/sheetgate.yaml")
        ));

        assert!(CliCommand::try_parse_from(["sheetgate", "proxy"]).is_err());
    }

    #[test]
    fn check_config_reports_invalid_port() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            tmp,
            "proxy:\n  listener:\n    host: 0.0.0.0\n    port: 0\n  admin_listener:\n    host: 0.0.0.0\n    port: 8081\n"
        )
        .expect("write yaml");

        let err = check_config(ConfigArgs {
            config_file_path: tmp.path().to_path_buf(),
        })
        .unwrap_err();
        assert!(matches!(err, CliError::InvalidConfig(ValidationError::InvalidPort)));
    }

    #[test]
    fn check_config_requires_proxy_section() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "metrics:\n  statsd_host: localhost\n  statsd_port: 8125\n")
            .expect("write yaml");

        let err = check_config(ConfigArgs {
            config_file_path: tmp.path().to_path_buf(),
        })
        .unwrap_err();
        assert!(matches!(err, CliError::MissingProxyConfig));
    }
}
