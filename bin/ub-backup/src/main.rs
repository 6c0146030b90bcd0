#![deny(unsafe_code)]

use std::process::ExitCode;

use clap::Parser;
use cli::{run_client, ClientArgs};

fn main() -> ExitCode {
    let args = ClientArgs::parse();
    match run_client(args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("ub-backup: {e}");
            ExitCode::from(e.exit_code().clamp(0, 255) as u8)
        }
    }
}
