use std::io::{BufRead, BufReader, Write};

use camino::Utf8Path;
use engine::{commit, dispatch, exit_status, start_session, Outcome};
use protocol::Record;

use crate::args::ServerArgs;
use crate::error::CliError;

pub fn run_server(args: ServerArgs) -> Result<i32, CliError> {
    logging::init_server("ubackuper")?;

    let backup_root = Utf8Path::new(&args.backup_dir);
    tracing::info!(backup_root = %backup_root, "session started");
    let mut ctx = start_session(backup_root)?;

    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            tracing::warn!("stdin closed before THANK_YOU; committing what was received");
            break;
        }

        let record = match Record::decode(&line) {
            Ok((record, _)) => record,
            Err(e) => {
                tracing::error!(error = %e, "malformed request line");
                ctx.had_failure = true;
                write_reply(&mut writer, protocol::Reply::Ng)?;
                continue;
            }
        };

        let outcome = if matches!(record, Record::Body { .. }) {
            dispatch(&mut ctx, record, &mut reader)
        } else {
            dispatch(&mut ctx, record, &mut std::io::empty())
        };

        match outcome {
            Ok(Outcome::Reply(reply)) => {
                if matches!(reply, protocol::Reply::Ng) {
                    ctx.had_failure = true;
                }
                write_reply(&mut writer, reply)?;
            }
            Ok(Outcome::ThankYou) => break,
            Err(e) => {
                tracing::error!(error = %e, "record handler failed");
                ctx.had_failure = true;
                write_reply(&mut writer, protocol::Reply::Ng)?;
            }
        }
    }

    let committed = commit(&ctx)?;
    tracing::info!(dir = %committed, had_failure = ctx.had_failure, "session committed");
    Ok(exit_status(&ctx))
}

fn write_reply(writer: &mut impl Write, reply: protocol::Reply) -> std::io::Result<()> {
    writer.write_all(&reply.encode())?;
    writer.flush()
}
