use clap::Parser;
use pgcam::sim::SimulatedBus;
use pgcam::{CameraBus, CaptureMode};
use std::error::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Connect to the first camera on the bus, print its details and fire a few
/// software triggers.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of frames to trigger and retrieve
    #[arg(short, long, default_value_t = 10)]
    frames: u32,

    /// Pull buffers from a free-running stream instead of triggering
    #[arg(long)]
    free_running: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mode = if args.free_running {
        CaptureMode::FreeRunning
    } else {
        CaptureMode::SoftwareTrigger
    };

    let mut bus = SimulatedBus::single();
    println!("Number of cameras detected: {}", bus.num_cameras()?);
    println!("Connecting to 1st one ...");

    let mut cam = bus.connect(0, mode)?;
    println!("\n{}\n", cam.info()?);

    cam.start_capture()?;

    for i in 0..args.frames {
        if mode == CaptureMode::SoftwareTrigger {
            cam.fire_trigger()?;
        }
        let frame = cam.retrieve_buffer()?;
        info!(
            "Frame {}: {}x{} {} ({} bytes, seq {})",
            i,
            frame.width,
            frame.height,
            frame.format,
            frame.data.len(),
            frame.sequence
        );
        println!("Fired and Captured!");
    }

    cam.stop_capture()?;
    println!("Finished grabbing images");
    Ok(())
}
