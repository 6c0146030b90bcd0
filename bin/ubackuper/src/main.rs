#![deny(unsafe_code)]

use std::process::ExitCode;

use clap::Parser;
use cli::{run_server, ServerArgs};

fn main() -> ExitCode {
    let args = ServerArgs::parse();
    match run_server(args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("ubackuper: {e}");
            ExitCode::from(e.exit_code().clamp(0, 255) as u8)
        }
    }
}
