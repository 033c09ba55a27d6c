use clap::Parser;
use serial_line::{list_ports, LineSource, ReadOutcome, SerialLineSource};
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Echo lines from a serial sensor to stdout.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial device, e.g. /dev/ttyO2. Omit to list available ports.
    device: Option<String>,

    #[arg(short, long, default_value_t = 57600)]
    baud: u32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let Some(device) = args.device else {
        let ports = list_ports();
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for port in ports {
            println!("{}", port);
        }
        return ExitCode::SUCCESS;
    };

    let mut source = match SerialLineSource::open(&device, args.baud) {
        Ok(source) => source,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    loop {
        match source.read_line() {
            ReadOutcome::Line(line) => println!("{}", line),
            ReadOutcome::NoData => {}
            ReadOutcome::Failed(e) => warn!("{}: {}", source.name(), e),
        }
    }
}
