use std::backtrace::Backtrace;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use sw_vehicle_installer::app::Installer;
use sw_vehicle_installer::config::ConfigLoader;
use sw_vehicle_installer::error::InstallError;
use sw_vehicle_installer::source::HttpXmlSource;
use sw_vehicle_installer::tui::Window;

#[derive(Parser)]
#[command(name = "sw-install")]
#[command(about = "Install a Stormworks vehicle XML from a raw URL into a Steam Workshop item folder")]
#[command(version, author)]
struct Cli {
    /// Settings file holding the workshop content path
    #[arg(long)]
    config: Option<String>,

    /// Directory for the daily rolling log file
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<InstallError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

/// Config problems are shown in the window's log, so only client setup can fail here.
fn map_exit_code(error: &InstallError) -> u8 {
    match error {
        InstallError::FetchTransport(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir)?;

    // The terminal belongs to the window; panics go to the log file instead of stderr.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {info}\n{}", Backtrace::force_capture());
    }));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sw-install starting");

    let config = ConfigLoader::new(cli.config.as_deref());
    let source = HttpXmlSource::new()?;
    let window = Window::new(Installer::new(source), config);
    window.run()
}

fn init_logging(log_dir: Option<PathBuf>) -> miette::Result<WorkerGuard> {
    let log_dir = log_dir
        .or_else(|| {
            directories::ProjectDirs::from("", "", "sw-vehicle-installer")
                .map(|dirs| dirs.data_dir().to_path_buf())
        })
        .unwrap_or_else(|| std::env::temp_dir().join("sw-vehicle-installer"));
    std::fs::create_dir_all(&log_dir).into_diagnostic()?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "sw-install.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sw_vehicle_installer=info,sw_install=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking)
        .init();
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_setup_failure_has_its_own_exit_code() {
        assert_eq!(map_exit_code(&InstallError::FetchTransport("tls".into())), 3);
        assert_eq!(map_exit_code(&InstallError::Unexpected("boom".into())), 1);
    }
}
