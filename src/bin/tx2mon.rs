use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tx2mon::config::interval_from_secs;
use tx2mon::core::constants::{interval, DEVICE_ROOT};
use tx2mon::{RenderMode, Session, SessionConfig, StopFlag, Tx2monError};

/// ThunderX2 SoC telemetry monitor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Show extra frequency fields (mem/net and SOC clock domains)
    #[arg(short = 'x')]
    extra: bool,

    /// Sampling interval in seconds, fractional values allowed [0.0001..9999]
    #[arg(short = 'd', value_name = "DELAY", value_parser = parse_delay)]
    delay: Option<f64>,

    /// Log samples to a CSV file instead of drawing the live panel
    #[arg(short = 'f', value_name = "CSV_FILE")]
    file: Option<PathBuf>,

    /// Directory holding the socinfo and node<N>_raw files
    #[arg(long, env = "TX2MON_DEVICE", default_value = DEVICE_ROOT, hide = true)]
    device: PathBuf,
}

fn parse_delay(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|_| format!("invalid delay {s:?}"))?;
    interval_from_secs(secs)
        .map(|_| secs)
        .map_err(|err| err.to_string())
}

/// Usage text for parse errors whose rendering leaves it out, such as
/// value validation failures.
fn missing_usage(err: &clap::Error) -> Option<String> {
    if err.to_string().contains("Usage:") {
        return None;
    }
    Some(Args::command().render_usage().to_string())
}

impl Args {
    fn into_config(self) -> tx2mon::Result<SessionConfig> {
        let mut builder = SessionConfig::builder()
            .extra(self.extra)
            .interval_secs(self.delay.unwrap_or(interval::DEFAULT.as_secs_f64()))
            .device_root(self.device);
        if let Some(path) = self.file {
            builder = builder.csv_output(path);
        }
        builder.build()
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => {
                    if let Some(usage) = missing_usage(&err) {
                        eprintln!("\n{usage}");
                    }
                    ExitCode::from(1)
                }
            };
        }
    };

    let config = match args.into_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            return ExitCode::from(1);
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.is_truncated_read() {
                eprintln!("{}", "Unexpected read error!".red());
            }
            eprintln!("{}", err.to_string().red());
            ExitCode::from(1)
        }
    }
}

fn run(config: &SessionConfig) -> Result<(), Tx2monError> {
    let stop = StopFlag::new();
    stop.install_signal_handler()?;

    let mut session = Session::open(config, stop)?;

    if let RenderMode::Batch(path) = &config.mode {
        println!(
            "Saving to {}, use INTR key to stop.",
            path.display().to_string().green()
        );
    }

    // Cleanup runs on both the normal and the error path
    let result = session.run();
    let closed = session.close();
    let samples = result?;
    closed?;

    if !config.is_interactive() {
        println!("\n{} samples saved.", samples.to_string().cyan());
    }
    Ok(())
}
