use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use waitup::config::{Clients, SessionConfig};
use waitup::error::WaitupError;
use waitup::handoff;
use waitup::output::{Console, Reporter};
use waitup::poll::{self, Outcome, PollSettings};

const AFTER_HELP: &str = "\
Examples:
    waitup server1.example.com                 Monitor server1.example.com (SSH/RDP)
    waitup 192.168.1.100                       Monitor IP address 192.168.1.100 (SSH/RDP)
    waitup server1 -p 8080                     Monitor specific port 8080
    waitup 10.0.0.1 -p 443                     Monitor specific port 443
    waitup server1 --quiet --timeout 30s       Wait up to 30 seconds silently
    waitup server1 -q -t 5m                    Wait up to 5 minutes silently

Exit Codes:
    0    Connection established successfully
    1    Timeout reached or error occurred

The program will continuously check the specified port(s) until one becomes available.
A dot will be displayed every 5 seconds while waiting (unless --quiet is used).";

/// waitup — wait for a system to come back up over SSH, RDP or a specific TCP port.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "waitup",
    about = "A tool to monitor system availability via SSH or RDP",
    long_about = None,
    after_help = AFTER_HELP
)]
struct Cli {
    /// Hostname or IP address to wait for.
    #[arg(value_name = "HOSTNAME|IP")]
    hosts: Vec<String>,

    /// Check if a system is available on a specific port.
    #[arg(short, long, value_name = "PORT")]
    port: Option<String>,

    /// Suppress normal output, only exit with status code.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Maximum time to wait before exiting (e.g., 30s, 5m, 1h).
    #[arg(short, long, value_name = "DURATION")]
    timeout: Option<String>,

    /// Diagnostic log level written to stderr (RUST_LOG takes precedence).
    #[arg(long = "log-level", default_value = "warn")]
    log_level: String,

    /// Show version information.
    #[arg(short = 'v', long, default_value_t = false)]
    version: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    if cli.version {
        println!("waitup version {}", env!("CARGO_PKG_VERSION"));
        println!("{}", env!("CARGO_PKG_REPOSITORY"));
        return ExitCode::SUCCESS;
    }

    init_logging(&cli.log_level);

    if cli.hosts.len() > 1 {
        report_error(&WaitupError::Usage(
            "multiple hostnames provided".to_string(),
        ));
        return ExitCode::FAILURE;
    }

    let config = match SessionConfig::from_args(
        cli.hosts.first().map(String::as_str).unwrap_or(""),
        cli.port.as_deref(),
        cli.timeout.as_deref(),
        cli.quiet,
    ) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e);
            return ExitCode::FAILURE;
        }
    };
    let clients = Clients::detect_for(&config.ports);
    let config = config.with_clients(clients);

    match run(&config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn report_error(e: &WaitupError) {
    eprintln!("Error: {e}");
    match e {
        WaitupError::Usage(_) => eprintln!("Try 'waitup --help' for more information"),
        WaitupError::Validation(v) => {
            if let Some(hint) = v.guidance() {
                eprintln!("{hint}");
            }
        }
    }
}

fn run(config: &SessionConfig) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let mut console = Console::new(config.quiet);
    let outcome = runtime.block_on(async {
        let cancel = CancellationToken::new();

        // Ctrl-C ends the wait with a summary instead of killing the process.
        let cancel_ctrlc = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel_ctrlc.cancel();
        });

        poll::wait_for_host(config, &PollSettings::default(), &mut console, cancel).await
    });

    let Outcome::Connected { reachable, .. } = outcome else {
        return Ok(ExitCode::from(outcome.exit_code()));
    };

    // The SIGINT handler installed above stays in place for the life of the
    // process, so the prompts have to race it explicitly.
    let handoff_config = config.clone();
    let handoff = runtime.block_on(async move {
        let prompt = tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut out = io::stdout();
            handoff::offer(&handoff_config, &reachable, &mut input, &mut out)
        });
        tokio::select! {
            res = prompt => Some(res),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    match handoff {
        Some(res) => {
            if let Err(e) = res.context("client handoff task failed")? {
                debug!(error = %e, "client handoff failed");
                console.handoff_failed(&e);
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            debug!("interrupted during client handoff");
            let _ = writeln!(io::stdout());
            // The prompt thread is still blocked on stdin; do not wait for it.
            runtime.shutdown_background();
            Ok(ExitCode::FAILURE)
        }
    }
}
