use crate::config::Preset;
use crate::startup::open_logger;
use clap::{Arg, ArgMatches, Command};
use std::error::Error;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub target: PathBuf,
}

pub fn command(preset: Preset) -> Command {
    let (value_name, help) = if preset.takes_directory() {
        ("DIR", "Directory for log.txt and captured frames")
    } else {
        ("FILE", "File to append log lines to")
    };
    Command::new(preset.name())
        .version(env!("CARGO_PKG_VERSION"))
        .about(preset.about())
        .arg(
            Arg::new("target")
                .value_name(value_name)
                .help(help)
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

fn args_from(matches: &ArgMatches) -> Option<Args> {
    matches
        .get_one::<PathBuf>("target")
        .cloned()
        .map(|target| Args { target })
}

/// Parses an argument list for `preset` without exiting the process.
pub fn parse_args<I, T>(preset: Preset, argv: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut cmd = command(preset);
    let matches = cmd.try_get_matches_from_mut(argv)?;
    args_from(&matches)
        .ok_or_else(|| cmd.error(clap::error::ErrorKind::MissingRequiredArgument, "missing target"))
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "sim")]
fn camera_bus() -> pgcam::sim::SimulatedBus {
    tracing::warn!("Using the simulated camera bus, saved frames are synthetic");
    pgcam::sim::SimulatedBus::single()
}

#[cfg(not(feature = "sim"))]
fn camera_bus() -> pgcam::UnboundBus {
    pgcam::UnboundBus
}

/// Entry point shared by every rig binary.
///
/// Usage errors exit through clap before anything is opened. Startup failures
/// are reported and exit with status 1. Otherwise this never returns.
pub fn run(preset: Preset) -> ExitCode {
    let args = match parse_args(preset, std::env::args_os()) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    init_tracing();

    let config = preset.config(&args.target);
    let mut bus = camera_bus();

    match open_logger(&config, &mut bus) {
        Ok(mut logger) => logger.run(),
        Err(e) => {
            error!("{}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
