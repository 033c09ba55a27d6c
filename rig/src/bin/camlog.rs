use rig::Preset;
use std::process::ExitCode;

fn main() -> ExitCode {
    rig::cli::run(Preset::Camlog)
}
